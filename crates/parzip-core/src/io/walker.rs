use std::path::Path;

use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::io::{is_container_path, MmapInput};
use crate::types::{FileDescriptor, Mode, Result};

/// File sets at or above this size are mapped in parallel.
const PARALLEL_MAP_THRESHOLD: usize = 256;

/// Discovers and maps the input files for one run.
///
/// Compression skips files that already carry the container suffix;
/// decompression selects only files that carry it. A file that cannot be
/// opened is logged and skipped, it never aborts discovery.
pub fn discover_files(root: &Path, mode: Mode) -> Result<Vec<FileDescriptor>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if selects(entry.path(), mode) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let descriptors: Vec<Option<FileDescriptor>> = if paths.len() >= PARALLEL_MAP_THRESHOLD {
        paths.par_iter().map(|path| map_one(path)).collect()
    } else {
        paths.iter().map(|path| map_one(path)).collect()
    };

    Ok(descriptors.into_iter().flatten().collect())
}

/// Splits the discovered files into `count` disjoint groups, one per splitter.
pub fn partition_files(files: Vec<FileDescriptor>, count: usize) -> Vec<Vec<FileDescriptor>> {
    let count = count.max(1);
    let mut groups: Vec<Vec<FileDescriptor>> = (0..count).map(|_| Vec::new()).collect();
    for (index, file) in files.into_iter().enumerate() {
        groups[index % count].push(file);
    }
    groups
}

fn selects(path: &Path, mode: Mode) -> bool {
    match mode {
        Mode::Compress => !is_container_path(path),
        Mode::Decompress => is_container_path(path),
    }
}

fn map_one(path: &Path) -> Option<FileDescriptor> {
    match MmapInput::open(path).and_then(|input| {
        let data = input.as_block_data()?;
        Ok(FileDescriptor::new(path, data))
    }) {
        Ok(descriptor) => Some(descriptor),
        Err(error) => {
            warn!(path = %path.display(), %error, "skipping unreadable input file");
            None
        }
    }
}
