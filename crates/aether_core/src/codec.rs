//! Versioned binary encoding of grid blocks.
//!
//! Layout (bincode): a fixed header followed by the materialized slices as flat
//! cell arrays in outer order. Decoding checks the header and that every slice has
//! exactly the canonical cell count for its outer coordinate.

use crate::block::{BlockRange, GridBlock};
use crate::error::{AetherError, Result};
use crate::slice::SliceBuffer;
use crate::traits::Quantity;
use serde::{Deserialize, Serialize};

pub const BLOCK_MAGIC: [u8; 4] = *b"AETB";
pub const BLOCK_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BlockHeader {
    magic: [u8; 4],
    version: u32,
    quantity: String,
    free_dims: u32,
    range: BlockRange,
}

#[derive(Serialize)]
struct EncodedBlockRef<'a, Q> {
    header: BlockHeader,
    slices: Vec<&'a [Q]>,
}

#[derive(Deserialize)]
struct EncodedBlock<Q> {
    header: BlockHeader,
    slices: Vec<Vec<Q>>,
}

pub fn encode_block<Q: Quantity>(block: &GridBlock<Q>) -> Result<Vec<u8>> {
    let encoded = EncodedBlockRef {
        header: BlockHeader {
            magic: BLOCK_MAGIC,
            version: BLOCK_FORMAT_VERSION,
            quantity: Q::TYPE_NAME.to_string(),
            free_dims: block.free_dims() as u32,
            range: block.range(),
        },
        slices: block.slices().iter().map(SliceBuffer::cells).collect(),
    };
    Ok(bincode::serialize(&encoded)?)
}

pub fn decode_block<Q: Quantity>(bytes: &[u8]) -> Result<GridBlock<Q>> {
    let decoded: EncodedBlock<Q> = bincode::deserialize(bytes)?;
    let header = decoded.header;
    if header.magic != BLOCK_MAGIC {
        return Err(AetherError::Serialization(
            "Not a grid block (bad magic)".to_string(),
        ));
    }
    if header.version != BLOCK_FORMAT_VERSION {
        return Err(AetherError::Serialization(format!(
            "Unsupported grid block format version {} (expected {BLOCK_FORMAT_VERSION})",
            header.version
        )));
    }
    if header.quantity != Q::TYPE_NAME {
        return Err(AetherError::Serialization(format!(
            "Grid block holds {} values, expected {}",
            header.quantity,
            Q::TYPE_NAME
        )));
    }
    let free_dims = header.free_dims as usize;
    let range = header.range;
    let slices = decoded
        .slices
        .into_iter()
        .enumerate()
        .map(|(offset, cells)| {
            let outer = range.min_outer + offset as i64;
            let len = cells.len();
            SliceBuffer::from_cells(outer, free_dims, cells).ok_or_else(|| {
                AetherError::Serialization(format!(
                    "Slice at outer coordinate {outer} has {len} cells, which is not a canonical slice"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    GridBlock::from_parts(range, free_dims, slices)
}
