//! Contiguous, memory-bounded ranges of slices.

use crate::error::{AetherError, Result};
use crate::slice::{estimated_slice_bytes, SliceBuffer};
use crate::traits::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fewest slices a block may hold. The sweep reads one slice past the block it is
/// finishing, so a single-slice block would need three resident blocks.
pub const MIN_BLOCK_LENGTH: usize = 2;

/// Slices kept out of every block budget for the sliding window of new slices.
const WINDOW_RESERVE: usize = 2;

const FILE_PREFIX: &str = "minOuter=";
const FILE_SEPARATOR: &str = "_maxOuter=";
const FILE_EXTENSION: &str = ".bin";

/// Inclusive range of outer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockRange {
    pub min_outer: i64,
    pub max_outer: i64,
}

impl BlockRange {
    pub fn new(min_outer: i64, max_outer: i64) -> Self {
        Self {
            min_outer,
            max_outer,
        }
    }

    pub fn contains(&self, outer: i64) -> bool {
        self.min_outer <= outer && outer <= self.max_outer
    }

    pub fn len(&self) -> usize {
        (self.max_outer - self.min_outer + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.max_outer < self.min_outer
    }

    /// The part of this range not beyond `max_outer`.
    pub fn clipped_to(&self, max_outer: i64) -> Option<BlockRange> {
        (self.min_outer <= max_outer)
            .then(|| BlockRange::new(self.min_outer, self.max_outer.min(max_outer)))
    }

    pub fn file_name(&self) -> String {
        format!(
            "{FILE_PREFIX}{}{FILE_SEPARATOR}{}{FILE_EXTENSION}",
            self.min_outer, self.max_outer
        )
    }

    pub fn parse_file_name(name: &str) -> Option<BlockRange> {
        let rest = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_EXTENSION)?;
        let (min, max) = rest.split_once(FILE_SEPARATOR)?;
        let range = BlockRange::new(min.parse().ok()?, max.parse().ok()?);
        (!range.is_empty()).then_some(range)
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min_outer, self.max_outer)
    }
}

/// Number of slices a block starting at `min_outer` may hold within `budget_bytes`.
pub fn block_length_for_budget<Q: Quantity>(
    min_outer: i64,
    free_dims: usize,
    budget_bytes: u64,
) -> usize {
    let mut used = std::mem::size_of::<GridBlock<Q>>() as u64;
    let mut fitting = 0usize;
    loop {
        let next = estimated_slice_bytes::<Q>(min_outer + fitting as i64, free_dims);
        if used + next > budget_bytes {
            break;
        }
        used += next;
        fitting += 1;
    }
    fitting.saturating_sub(WINDOW_RESERVE)
}

/// A range of consecutive slices.
///
/// Slices are materialized from `min_outer` upward as they are committed; slices
/// past the materialized end read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridBlock<Q> {
    range: BlockRange,
    free_dims: usize,
    slices: Vec<SliceBuffer<Q>>,
}

impl<Q: Quantity> GridBlock<Q> {
    /// An empty block sized to the budget.
    pub fn new(min_outer: i64, free_dims: usize, budget_bytes: u64) -> Result<Self> {
        let length = block_length_for_budget::<Q>(min_outer, free_dims, budget_bytes);
        if length < MIN_BLOCK_LENGTH {
            return Err(AetherError::Capacity {
                min_outer,
                min_length: MIN_BLOCK_LENGTH,
                budget_bytes,
            });
        }
        Ok(Self {
            range: BlockRange::new(min_outer, min_outer + length as i64 - 1),
            free_dims,
            slices: Vec::new(),
        })
    }

    /// Reassembles a block, checking that the slices are consecutive from `range.min_outer`.
    pub fn from_parts(
        range: BlockRange,
        free_dims: usize,
        slices: Vec<SliceBuffer<Q>>,
    ) -> Result<Self> {
        if range.is_empty() || slices.len() > range.len() {
            return Err(AetherError::Serialization(format!(
                "{} slices do not fit block range {range}",
                slices.len()
            )));
        }
        for (offset, slice) in slices.iter().enumerate() {
            if slice.outer() != range.min_outer + offset as i64 || slice.free_dims() != free_dims {
                return Err(AetherError::Serialization(format!(
                    "Slice at outer coordinate {} is out of place in block {range}",
                    slice.outer()
                )));
            }
        }
        Ok(Self {
            range,
            free_dims,
            slices,
        })
    }

    pub fn range(&self) -> BlockRange {
        self.range
    }

    pub fn min_outer(&self) -> i64 {
        self.range.min_outer
    }

    pub fn max_outer(&self) -> i64 {
        self.range.max_outer
    }

    pub fn free_dims(&self) -> usize {
        self.free_dims
    }

    pub fn slices(&self) -> &[SliceBuffer<Q>] {
        &self.slices
    }

    /// `None` when the slice was never written or lies outside this block.
    pub fn slice(&self, outer: i64) -> Option<&SliceBuffer<Q>> {
        if !self.range.contains(outer) {
            return None;
        }
        self.slices.get((outer - self.range.min_outer) as usize)
    }

    /// Replaces the slice at `slice.outer()`, materializing any empty slices before it.
    pub fn set_slice(&mut self, slice: SliceBuffer<Q>) {
        let outer = slice.outer();
        debug_assert!(self.range.contains(outer), "{outer} outside {}", self.range);
        let offset = (outer - self.range.min_outer) as usize;
        while self.slices.len() < offset {
            let next = self.range.min_outer + self.slices.len() as i64;
            self.slices.push(SliceBuffer::new(next, self.free_dims));
        }
        if offset < self.slices.len() {
            self.slices[offset] = slice;
        } else {
            self.slices.push(slice);
        }
    }

    pub fn get(&self, outer: i64, tail: &[i64]) -> Q {
        self.slice(outer)
            .map(|slice| slice.get(tail).clone())
            .unwrap_or_else(Q::zero)
    }

    pub fn estimated_bytes(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
            + self.slices.iter().map(SliceBuffer::estimated_bytes).sum::<u64>()
    }
}
