use parzip_core::format::{
    decode, encode, ContainerHeader, DecodedContainer, SingleBlockHeader,
    SINGLE_BLOCK_HEADER_SIZE,
};

fn multi_container(payloads: &[&[u8]], last_block_original_size: u64) -> Vec<u8> {
    encode(payloads, last_block_original_size)
}

fn single_container(payload: &[u8], original_size: u64) -> Vec<u8> {
    let header = SingleBlockHeader::new(payload.len() as u64, original_size);
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

#[test]
fn decodes_multi_block_container() {
    let bytes = multi_container(&[b"aaaa", b"bb", b"c"], 1);

    match decode(&bytes).expect("decode") {
        DecodedContainer::Multi(header, slices) => {
            assert_eq!(header.block_count, 3);
            assert_eq!(header.block_sizes, vec![4, 2, 1]);
            assert_eq!(header.last_block_original_size, 1);
            assert_eq!(slices.len(), 3);
            assert_eq!(&bytes[slices[0].offset..slices[0].offset + slices[0].len], b"aaaa");
            assert_eq!(&bytes[slices[1].offset..slices[1].offset + slices[1].len], b"bb");
            assert_eq!(&bytes[slices[2].offset..slices[2].offset + slices[2].len], b"c");
        }
        other => panic!("expected multi-block container, got {other:?}"),
    }
}

#[test]
fn decodes_single_block_container() {
    let bytes = single_container(b"payload", 4096);

    match decode(&bytes).expect("decode") {
        DecodedContainer::Single(header, slice) => {
            assert_eq!(header.compressed_size, 7);
            assert_eq!(header.original_size, 4096);
            assert_eq!(slice.offset, SINGLE_BLOCK_HEADER_SIZE);
            assert_eq!(&bytes[slice.offset..slice.offset + slice.len], b"payload");
        }
        other => panic!("expected single-block container, got {other:?}"),
    }
}

#[test]
fn multi_block_decode_then_reencode_is_byte_identical() {
    let original = multi_container(&[b"first block", b"second", b"x"], 1);

    let (header, slices) = match decode(&original).expect("decode") {
        DecodedContainer::Multi(header, slices) => (header, slices),
        other => panic!("expected multi-block container, got {other:?}"),
    };

    let mut reencoded = header.to_bytes();
    for slice in &slices {
        reencoded.extend_from_slice(&original[slice.offset..slice.offset + slice.len]);
    }
    assert_eq!(reencoded, original);
}

#[test]
fn single_block_decode_then_reencode_is_byte_identical() {
    let original = single_container(b"only block", 10);

    let (header, slice) = match decode(&original).expect("decode") {
        DecodedContainer::Single(header, slice) => (header, slice),
        other => panic!("expected single-block container, got {other:?}"),
    };

    let mut reencoded = header.to_bytes().to_vec();
    reencoded.extend_from_slice(&original[slice.offset..slice.offset + slice.len]);
    assert_eq!(reencoded, original);
}

#[test]
fn rejects_buffer_shorter_than_marker() {
    assert!(decode(&[]).is_err());
    assert!(decode(&[1, 2, 3]).is_err());
}

#[test]
fn rejects_truncated_single_block_header() {
    let bytes = [0u8; SINGLE_BLOCK_HEADER_SIZE - 1];
    assert!(decode(&bytes).is_err());
}

#[test]
fn rejects_truncated_single_block_payload() {
    let mut bytes = single_container(b"payload", 7);
    bytes.pop();
    assert!(decode(&bytes).is_err());
}

#[test]
fn rejects_trailing_bytes_after_single_block_payload() {
    let mut bytes = single_container(b"payload", 7);
    bytes.push(0);
    assert!(decode(&bytes).is_err());
}

#[test]
fn rejects_header_longer_than_container() {
    // Declares 1000 blocks but carries only the count field.
    let bytes = 1000u64.to_le_bytes();
    assert!(decode(&bytes).is_err());
}

#[test]
fn rejects_truncated_block_payload() {
    let mut bytes = multi_container(&[b"aaaa", b"bb"], 2);
    bytes.truncate(bytes.len() - 1);
    assert!(decode(&bytes).is_err());
}

#[test]
fn rejects_trailing_bytes_after_last_block_payload() {
    let mut bytes = multi_container(&[b"aaaa", b"bb"], 2);
    bytes.push(0xff);
    assert!(decode(&bytes).is_err());
}

#[test]
fn zero_first_field_always_selects_the_single_block_layout() {
    // Bytes that would parse as a 2-block container if the leading zero
    // were read as a block count.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&2u64.to_le_bytes());
    bytes.extend_from_slice(&2u64.to_le_bytes());
    bytes.extend_from_slice(b"ab");

    match decode(&bytes).expect("decode") {
        DecodedContainer::Single(header, slice) => {
            assert_eq!(header.compressed_size, 2);
            assert_eq!(&bytes[slice.offset..slice.offset + slice.len], b"ab");
        }
        DecodedContainer::Multi(..) => panic!("zero marker decoded as multi-block"),
    }
}

#[test]
fn header_encoded_len_matches_to_bytes() {
    let header = ContainerHeader::new(vec![10, 20, 30], 5);
    assert_eq!(header.to_bytes().len(), header.encoded_len());
    assert_eq!(header.encoded_len(), (3 + 2) * 8);
}
