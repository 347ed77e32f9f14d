//! Binary container envelope around one file's blocks.
//!
//! Two layouts share the first field. A multi-block container starts with a
//! nonzero block count:
//!
//! ```text
//! [block_count][block_size_1]..[block_size_n][last_block_original_size][payload_1]..[payload_n]
//! ```
//!
//! A single-block container starts with a reserved zero marker:
//!
//! ```text
//! [marker = 0][compressed_size][original_size][payload]
//! ```
//!
//! All fields are little-endian `u64`. The decoder branches on the first
//! field and never copies payload bytes; it hands back offsets into the
//! input buffer.

use std::io::Write;

use crate::error::ParzipError;
use crate::types::Result;

/// Width of every header field in bytes.
pub const FIELD_SIZE: usize = 8;
/// Reserved first-field value identifying the single-block layout.
pub const SINGLE_BLOCK_MARKER: u64 = 0;
/// Fixed size of the single-block header.
pub const SINGLE_BLOCK_HEADER_SIZE: usize = 3 * FIELD_SIZE;

/// Header of a multi-block container. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub block_count: u64,
    pub block_sizes: Vec<u64>,
    pub last_block_original_size: u64,
}

impl ContainerHeader {
    pub fn new(block_sizes: Vec<u64>, last_block_original_size: u64) -> Self {
        Self {
            block_count: block_sizes.len() as u64,
            block_sizes,
            last_block_original_size,
        }
    }

    /// Encoded header length in bytes: count, per-block sizes, trailing size.
    pub fn encoded_len(&self) -> usize {
        (self.block_sizes.len() + 2) * FIELD_SIZE
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.block_count.to_le_bytes());
        for size in &self.block_sizes {
            bytes.extend_from_slice(&size.to_le_bytes());
        }
        bytes.extend_from_slice(&self.last_block_original_size.to_le_bytes());
        bytes
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}

/// Header of a single-block container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleBlockHeader {
    pub compressed_size: u64,
    pub original_size: u64,
}

impl SingleBlockHeader {
    pub fn new(compressed_size: u64, original_size: u64) -> Self {
        Self {
            compressed_size,
            original_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; SINGLE_BLOCK_HEADER_SIZE] {
        let mut bytes = [0u8; SINGLE_BLOCK_HEADER_SIZE];
        bytes[..8].copy_from_slice(&SINGLE_BLOCK_MARKER.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.compressed_size.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.original_size.to_le_bytes());
        bytes
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}

/// Encodes one file's blocks into a multi-block container buffer.
///
/// Total for any input: sizes are derived from the payloads themselves.
pub fn encode(payloads: &[&[u8]], last_block_original_size: u64) -> Vec<u8> {
    let sizes: Vec<u64> = payloads.iter().map(|payload| payload.len() as u64).collect();
    let header = ContainerHeader::new(sizes, last_block_original_size);

    let mut bytes = header.to_bytes();
    bytes.reserve(payloads.iter().map(|payload| payload.len()).sum());
    for payload in payloads {
        bytes.extend_from_slice(payload);
    }
    bytes
}

/// Byte range of one block payload inside a container buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSlice {
    pub offset: usize,
    pub len: usize,
}

/// Result of decoding a container buffer: header plus payload offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedContainer {
    Single(SingleBlockHeader, BlockSlice),
    Multi(ContainerHeader, Vec<BlockSlice>),
}

/// Decodes a container buffer without copying payload bytes.
pub fn decode(bytes: &[u8]) -> Result<DecodedContainer> {
    if bytes.len() < FIELD_SIZE {
        return Err(ParzipError::InvalidFormat("container shorter than marker"));
    }

    let first = read_u64(bytes, 0);
    if first == SINGLE_BLOCK_MARKER {
        decode_single(bytes)
    } else {
        decode_multi(bytes, first)
    }
}

fn decode_single(bytes: &[u8]) -> Result<DecodedContainer> {
    if bytes.len() < SINGLE_BLOCK_HEADER_SIZE {
        return Err(ParzipError::InvalidFormat("truncated single-block header"));
    }

    let header = SingleBlockHeader {
        compressed_size: read_u64(bytes, FIELD_SIZE),
        original_size: read_u64(bytes, 2 * FIELD_SIZE),
    };

    let payload_len = usize::try_from(header.compressed_size)
        .map_err(|_| ParzipError::InvalidFormat("single-block payload size overflow"))?;
    let end = SINGLE_BLOCK_HEADER_SIZE
        .checked_add(payload_len)
        .ok_or(ParzipError::InvalidFormat("single-block offset overflow"))?;
    if end > bytes.len() {
        return Err(ParzipError::InvalidFormat("truncated single-block payload"));
    }
    if end != bytes.len() {
        return Err(ParzipError::InvalidFormat(
            "trailing bytes after single-block payload",
        ));
    }

    Ok(DecodedContainer::Single(
        header,
        BlockSlice {
            offset: SINGLE_BLOCK_HEADER_SIZE,
            len: payload_len,
        },
    ))
}

fn decode_multi(bytes: &[u8], block_count: u64) -> Result<DecodedContainer> {
    let count = usize::try_from(block_count)
        .map_err(|_| ParzipError::InvalidFormat("block count overflow"))?;
    let header_len = count
        .checked_add(2)
        .and_then(|fields| fields.checked_mul(FIELD_SIZE))
        .ok_or(ParzipError::InvalidFormat("header length overflow"))?;
    if header_len > bytes.len() {
        return Err(ParzipError::InvalidFormat(
            "declared header exceeds container length",
        ));
    }

    let mut block_sizes = Vec::with_capacity(count);
    for i in 0..count {
        block_sizes.push(read_u64(bytes, (1 + i) * FIELD_SIZE));
    }
    let last_block_original_size = read_u64(bytes, (1 + count) * FIELD_SIZE);

    let mut slices = Vec::with_capacity(count);
    let mut offset = header_len;
    for &size in &block_sizes {
        let len = usize::try_from(size)
            .map_err(|_| ParzipError::InvalidFormat("block size overflow"))?;
        let end = offset
            .checked_add(len)
            .ok_or(ParzipError::InvalidFormat("payload offset overflow"))?;
        if end > bytes.len() {
            return Err(ParzipError::InvalidFormat("truncated block payload"));
        }
        slices.push(BlockSlice { offset, len });
        offset = end;
    }

    if offset != bytes.len() {
        return Err(ParzipError::InvalidFormat(
            "trailing bytes after last block payload",
        ));
    }

    Ok(DecodedContainer::Multi(
        ContainerHeader {
            block_count,
            block_sizes,
            last_block_original_size,
        },
        slices,
    ))
}

#[inline]
fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; FIELD_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + FIELD_SIZE]);
    u64::from_le_bytes(raw)
}
