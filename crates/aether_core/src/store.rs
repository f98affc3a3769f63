//! At most two resident grid blocks over a durable block storage.

use crate::block::{BlockRange, GridBlock};
use crate::error::{AetherError, Result};
use crate::slice::SliceBuffer;
use crate::storage::BlockStorage;
use crate::traits::Quantity;
use std::marker::PhantomData;

/// Keeps the grid addressable while only a `current` block and a `lookahead`
/// block are in memory.
///
/// The current block is the one a sweep is working through; the lookahead holds
/// the next range, or the previous one right after [`advance`](Self::advance).
/// A block leaving memory is always saved first, unless the storage is a
/// read-only backup (nothing has been mutated then).
#[derive(Debug)]
pub struct PagedGridStore<Q, S> {
    storage: S,
    free_dims: usize,
    block_budget: u64,
    current: Option<GridBlock<Q>>,
    lookahead: Option<GridBlock<Q>>,
    /// Highest outer coordinate covered by any block created so far.
    frontier: i64,
    _quantity: PhantomData<Q>,
}

impl<Q: Quantity, S: BlockStorage<Q>> PagedGridStore<Q, S> {
    /// Store for a fresh grid whose first block is `origin_block`.
    pub fn with_origin_block(
        storage: S,
        free_dims: usize,
        block_budget: u64,
        origin_block: GridBlock<Q>,
    ) -> Self {
        let frontier = origin_block.max_outer();
        Self {
            storage,
            free_dims,
            block_budget,
            current: Some(origin_block),
            lookahead: None,
            frontier,
            _quantity: PhantomData,
        }
    }

    /// Store over blocks already held by `storage`. Loads the origin block.
    pub fn open(storage: S, free_dims: usize, block_budget: u64) -> Result<Self> {
        let frontier = storage
            .ranges()?
            .iter()
            .map(|range| range.max_outer)
            .max()
            .unwrap_or(-1);
        let mut store = Self {
            storage,
            free_dims,
            block_budget,
            current: None,
            lookahead: None,
            frontier,
            _quantity: PhantomData,
        };
        store.current = Some(store.load_required(0)?);
        Ok(store)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn free_dims(&self) -> usize {
        self.free_dims
    }

    pub fn current(&self) -> Option<&GridBlock<Q>> {
        self.current.as_ref()
    }

    pub fn lookahead(&self) -> Option<&GridBlock<Q>> {
        self.lookahead.as_ref()
    }

    /// The current block's range.
    pub fn current_range(&self) -> Result<BlockRange> {
        self.current
            .as_ref()
            .map(GridBlock::range)
            .ok_or_else(|| self.missing(0))
    }

    fn missing(&self, min_outer: i64) -> AetherError {
        AetherError::MissingBlock {
            min_outer,
            location: self.storage.location(),
        }
    }

    fn load_required(&self, min_outer: i64) -> Result<GridBlock<Q>> {
        self.storage
            .load(min_outer)?
            .ok_or_else(|| self.missing(min_outer))
    }

    fn load_or_build(&mut self, min_outer: i64) -> Result<GridBlock<Q>> {
        if let Some(block) = self.storage.load(min_outer)? {
            return Ok(block);
        }
        if min_outer <= self.frontier {
            // this range was created before, so it must have been saved
            return Err(self.missing(min_outer));
        }
        let block = GridBlock::new(min_outer, self.free_dims, self.block_budget)?;
        tracing::debug!("Built grid block {}", block.range());
        self.frontier = self.frontier.max(block.max_outer());
        Ok(block)
    }

    fn evict(&mut self, block: GridBlock<Q>) -> Result<()> {
        if !self.storage.is_read_only() {
            self.storage.save(&block)?;
        }
        tracing::debug!("Evicted grid block {}", block.range());
        Ok(())
    }

    /// Makes the origin block current.
    pub fn rewind(&mut self) -> Result<()> {
        if self.current.as_ref().is_some_and(|b| b.min_outer() == 0) {
            return Ok(());
        }
        if self.lookahead.as_ref().is_some_and(|b| b.min_outer() == 0) {
            std::mem::swap(&mut self.current, &mut self.lookahead);
            return Ok(());
        }
        if let Some(block) = self.current.take() {
            self.evict(block)?;
        }
        self.current = Some(self.load_required(0)?);
        Ok(())
    }

    /// Makes the lookahead the block right after the current one.
    pub fn ensure_next(&mut self) -> Result<()> {
        let next_min = self.current_range()?.max_outer + 1;
        if self
            .lookahead
            .as_ref()
            .is_some_and(|b| b.min_outer() == next_min)
        {
            return Ok(());
        }
        if let Some(block) = self.lookahead.take() {
            self.evict(block)?;
        }
        self.lookahead = Some(self.load_or_build(next_min)?);
        Ok(())
    }

    /// Moves on to the next block. The previous block stays resident as lookahead
    /// until something else needs the slot.
    pub fn advance(&mut self) -> Result<()> {
        let next_min = self.current_range()?.max_outer + 1;
        if !self
            .lookahead
            .as_ref()
            .is_some_and(|b| b.min_outer() == next_min)
        {
            return Err(self.missing(next_min));
        }
        std::mem::swap(&mut self.current, &mut self.lookahead);
        tracing::debug!("Advanced to grid block starting at {next_min}");
        Ok(())
    }

    fn resident(&self, outer: i64) -> Option<&GridBlock<Q>> {
        [self.current.as_ref(), self.lookahead.as_ref()]
            .into_iter()
            .flatten()
            .find(|block| block.range().contains(outer))
    }

    pub fn is_resident(&self, outer: i64) -> bool {
        self.resident(outer).is_some()
    }

    /// A resident slice; `None` when it is all zero or not resident.
    pub fn slice(&self, outer: i64) -> Option<&SliceBuffer<Q>> {
        self.resident(outer).and_then(|block| block.slice(outer))
    }

    /// Replaces a slice of one of the resident blocks.
    pub fn commit_slice(&mut self, slice: SliceBuffer<Q>) -> Result<()> {
        let outer = slice.outer();
        let block = [self.current.as_mut(), self.lookahead.as_mut()]
            .into_iter()
            .flatten()
            .find(|block| block.range().contains(outer));
        match block {
            Some(block) => {
                block.set_slice(slice);
                Ok(())
            }
            None => Err(AetherError::MissingBlock {
                min_outer: outer,
                location: self.storage.location(),
            }),
        }
    }

    /// Brings the block containing `outer` into memory, using the lookahead slot.
    /// Returns `false` when no block covers `outer`.
    pub fn ensure_resident(&mut self, outer: i64) -> Result<bool> {
        if self.is_resident(outer) {
            return Ok(true);
        }
        let Some(range) = self
            .storage
            .ranges()?
            .into_iter()
            .find(|range| range.contains(outer))
        else {
            return Ok(false);
        };
        if let Some(block) = self.lookahead.take() {
            self.evict(block)?;
        }
        self.lookahead = Some(self.load_required(range.min_outer)?);
        Ok(true)
    }

    /// Saves both resident blocks without evicting them.
    pub fn save_resident(&mut self) -> Result<()> {
        if self.storage.is_read_only() {
            return Ok(());
        }
        for block in [self.current.as_ref(), self.lookahead.as_ref()]
            .into_iter()
            .flatten()
        {
            self.storage.save(block)?;
        }
        Ok(())
    }

    /// Ranges of every block, stored or resident, ascending.
    pub fn block_ranges(&self) -> Result<Vec<BlockRange>> {
        let mut ranges = self.storage.ranges()?;
        for block in [self.current.as_ref(), self.lookahead.as_ref()]
            .into_iter()
            .flatten()
        {
            ranges.push(block.range());
        }
        ranges.sort();
        ranges.dedup();
        Ok(ranges)
    }

    /// Copies the storage to a writable location if it is a read-only backup.
    pub fn make_writable(&mut self) -> Result<()> {
        if self.storage.is_read_only() {
            self.storage.make_writable()?;
        }
        Ok(())
    }
}
