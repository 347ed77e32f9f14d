//! Byte-buffer-in/byte-buffer-out zlib primitive used by the codec workers.

use std::io::Write;

use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use crate::error::ParzipError;
use crate::types::Result;

/// Upper-bound estimate for the compressed size of `len` input bytes.
///
/// Mirrors zlib's deflateBound arithmetic with headroom for the stream
/// wrapper, so the scratch buffer rarely reallocates.
pub fn compress_bound(len: usize) -> usize {
    len + len / 1000 + 64
}

/// Compresses one block into `scratch`, returning the filled buffer.
///
/// `scratch` is cleared first; passing a recycled buffer avoids a fresh
/// allocation per block.
pub fn compress_into(data: &[u8], mut scratch: Vec<u8>) -> Result<Vec<u8>> {
    scratch.clear();
    scratch.reserve(compress_bound(data.len()));

    let mut encoder = ZlibEncoder::new(scratch, Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|err| ParzipError::Compression(format!("zlib deflate failed: {err}")))
}

/// Decompresses one block, verifying it expands to exactly `expected_len` bytes.
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Vec::with_capacity(expected_len));
    let output = decoder
        .write_all(data)
        .and_then(|_| decoder.finish())
        .map_err(|err| ParzipError::Decompression(format!("zlib inflate failed: {err}")))?;

    if output.len() != expected_len {
        return Err(ParzipError::Decompression(format!(
            "decompressed size mismatch (expected {expected_len}, actual {})",
            output.len()
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_block() {
        let data: Vec<u8> = (0..u8::MAX).cycle().take(10_000).collect();
        let compressed = compress_into(&data, Vec::new()).expect("compress");
        let restored = decompress(&compressed, data.len()).expect("decompress");
        assert_eq!(restored, data);
    }

    #[test]
    fn round_trips_the_empty_block() {
        let compressed = compress_into(&[], Vec::new()).expect("compress");
        let restored = decompress(&compressed, 0).expect("decompress");
        assert!(restored.is_empty());
    }

    #[test]
    fn rejects_wrong_expected_size() {
        let compressed = compress_into(b"hello parzip", Vec::new()).expect("compress");
        assert!(decompress(&compressed, 5).is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(decompress(&[0xde, 0xad, 0xbe, 0xef], 16).is_err());
    }
}
