use std::fs;
use std::path::{Path, PathBuf};

use parzip_core::format::{decode, DecodedContainer};
use parzip_core::{MergeOutcome, Merger, Mode, ResultBlock};

fn block(path: &Path, block_id: u64, block_count: u64, payload: &[u8]) -> ResultBlock {
    ResultBlock {
        path: path.to_path_buf(),
        block_id,
        block_count,
        payload: payload.to_vec(),
        last_block_original_size: 99,
    }
}

fn finalize_in_order(dir: &Path, name: &str, order: &[u64]) -> Vec<u8> {
    let input = dir.join(name);
    let payloads: [&[u8]; 3] = [b"alpha", b"bravo charlie", b"d"];

    let mut merger = Merger::new(Mode::Compress, false);
    let mut output = None;
    for &id in order {
        let outcome = merger
            .accept(block(&input, id, 3, payloads[(id - 1) as usize]))
            .expect("accept");
        if let MergeOutcome::Finalized { path, .. } = outcome {
            output = Some(path);
        }
    }
    assert!(output.is_some(), "file never finalized");
    assert_eq!(merger.in_flight(), 0);

    fs::read(PathBuf::from(format!("{}.pz", input.display()))).expect("read output")
}

#[test]
fn arrival_order_does_not_change_the_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let in_order = finalize_in_order(dir.path(), "a.bin", &[1, 2, 3]);
    let reversed = finalize_in_order(dir.path(), "b.bin", &[3, 2, 1]);
    let shuffled = finalize_in_order(dir.path(), "c.bin", &[2, 3, 1]);

    assert_eq!(in_order, reversed);
    assert_eq!(in_order, shuffled);
    Ok(())
}

#[test]
fn compressed_output_carries_a_decodable_header() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bytes = finalize_in_order(dir.path(), "h.bin", &[3, 1, 2]);

    match decode(&bytes)? {
        DecodedContainer::Multi(header, slices) => {
            assert_eq!(header.block_count, 3);
            assert_eq!(header.block_sizes, vec![5, 13, 1]);
            assert_eq!(header.last_block_original_size, 99);
            assert_eq!(&bytes[slices[0].offset..slices[0].offset + slices[0].len], b"alpha");
        }
        other => panic!("expected multi-block container, got {other:?}"),
    }
    Ok(())
}

#[test]
fn decompress_mode_concatenates_payloads_raw() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("doc.txt.pz");

    let mut merger = Merger::new(Mode::Decompress, false);
    assert!(matches!(
        merger.accept(block(&input, 2, 2, b" world"))?,
        MergeOutcome::Accumulating
    ));
    let outcome = merger.accept(block(&input, 1, 2, b"hello"))?;
    assert!(matches!(outcome, MergeOutcome::Finalized { .. }));

    let restored = fs::read(dir.path().join("doc.txt"))?;
    assert_eq!(restored, b"hello world");
    Ok(())
}

#[test]
fn files_accumulate_independently() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");

    let mut merger = Merger::new(Mode::Compress, false);
    merger.accept(block(&first, 1, 2, b"f1"))?;
    merger.accept(block(&second, 1, 2, b"s1"))?;
    assert_eq!(merger.in_flight(), 2);

    // Completing the second file must not disturb the first.
    let outcome = merger.accept(block(&second, 2, 2, b"s2"))?;
    assert!(matches!(outcome, MergeOutcome::Finalized { .. }));
    assert_eq!(merger.in_flight(), 1);
    assert!(dir.path().join("second.bin.pz").exists());
    assert!(!dir.path().join("first.bin.pz").exists());

    let pending = merger.drain_pending();
    assert_eq!(pending, vec![first]);
    assert_eq!(merger.in_flight(), 0);
    Ok(())
}

#[test]
fn remove_original_deletes_the_input_after_finalize() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("victim.bin");
    fs::write(&input, b"original contents")?;

    let mut merger = Merger::new(Mode::Compress, true);
    merger.accept(block(&input, 1, 2, b"p1"))?;
    merger.accept(block(&input, 2, 2, b"p2"))?;

    assert!(!input.exists());
    assert!(dir.path().join("victim.bin.pz").exists());
    Ok(())
}

#[test]
#[should_panic(expected = "duplicate block id")]
fn duplicate_block_id_panics() {
    let input = PathBuf::from("/nonexistent/dup.bin");
    let mut merger = Merger::new(Mode::Compress, false);
    merger.accept(block(&input, 1, 3, b"x")).expect("accept");
    let _ = merger.accept(block(&input, 1, 3, b"x"));
}

#[test]
#[should_panic(expected = "block count changed mid-file")]
fn mismatched_block_count_panics() {
    let input = PathBuf::from("/nonexistent/mismatch.bin");
    let mut merger = Merger::new(Mode::Compress, false);
    merger.accept(block(&input, 1, 3, b"x")).expect("accept");
    let _ = merger.accept(block(&input, 2, 4, b"y"));
}
