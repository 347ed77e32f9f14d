mod container;

pub use container::{
    decode, encode, BlockSlice, ContainerHeader, DecodedContainer, SingleBlockHeader, FIELD_SIZE,
    SINGLE_BLOCK_HEADER_SIZE, SINGLE_BLOCK_MARKER,
};
