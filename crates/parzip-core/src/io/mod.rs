mod mmap;
mod walker;

pub use mmap::MmapInput;
pub use walker::{discover_files, partition_files};

use std::path::{Path, PathBuf};

use crate::config::CONTAINER_SUFFIX;
use crate::types::Mode;

/// True when the file name carries the container extension.
pub fn is_container_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == &CONTAINER_SUFFIX[1..])
        .unwrap_or(false)
}

/// Derives the output path for a processed file.
///
/// Compression appends the container suffix; decompression strips it. The
/// strip works on the path's extension, so non-UTF-8 file stems pass
/// through unchanged.
pub fn output_path(input: &Path, mode: Mode) -> PathBuf {
    match mode {
        Mode::Compress => {
            let mut name = input.as_os_str().to_os_string();
            name.push(CONTAINER_SUFFIX);
            PathBuf::from(name)
        }
        Mode::Decompress => {
            if is_container_path(input) {
                let mut out = input.to_path_buf();
                out.set_extension("");
                if out != input {
                    return out;
                }
            }
            let mut name = input.as_os_str().to_os_string();
            name.push(".out");
            PathBuf::from(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_suffix_when_compressing() {
        assert_eq!(
            output_path(Path::new("/tmp/data.bin"), Mode::Compress),
            PathBuf::from("/tmp/data.bin.pz")
        );
    }

    #[test]
    fn strips_suffix_when_decompressing() {
        assert_eq!(
            output_path(Path::new("/tmp/data.bin.pz"), Mode::Decompress),
            PathBuf::from("/tmp/data.bin")
        );
    }

    #[test]
    fn falls_back_when_suffix_is_missing() {
        assert_eq!(
            output_path(Path::new("/tmp/data.bin"), Mode::Decompress),
            PathBuf::from("/tmp/data.bin.out")
        );
    }

    #[cfg(unix)]
    #[test]
    fn preserves_non_utf8_stems() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = Path::new(OsStr::from_bytes(b"/tmp/data\xff.bin.pz"));
        assert_eq!(
            output_path(input, Mode::Decompress),
            PathBuf::from(OsStr::from_bytes(b"/tmp/data\xff.bin").to_os_string())
        );

        let raw = Path::new(OsStr::from_bytes(b"/tmp/data\xff.bin"));
        assert_eq!(
            output_path(raw, Mode::Compress),
            PathBuf::from(OsStr::from_bytes(b"/tmp/data\xff.bin.pz").to_os_string())
        );
    }
}
