use crate::block::{BlockRange, GridBlock};
use crate::slice::{tail_index, SliceBuffer};
use crate::traits::Quantity;

/// Read-only view of a finalized range of the fundamental domain, handed to
/// region processors.
#[derive(Debug, Clone)]
pub struct GridRegion<'a, Q> {
    range: BlockRange,
    step: u64,
    dimension: usize,
    slices: &'a [SliceBuffer<Q>],
}

impl<'a, Q: Quantity> GridRegion<'a, Q> {
    /// The part of `block` not beyond `max_outer`, or `None` when nothing is left.
    pub fn of_block(block: &'a GridBlock<Q>, max_outer: i64, step: u64) -> Option<Self> {
        let range = block.range().clipped_to(max_outer)?;
        let materialized = block.slices().len().min(range.len());
        Some(Self {
            range,
            step,
            dimension: block.free_dims() + 1,
            slices: &block.slices()[..materialized],
        })
    }

    pub fn range(&self) -> BlockRange {
        self.range
    }

    /// Step the values belong to.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Value at a canonical point of this region.
    pub fn value_at(&self, point: &[i64]) -> Q {
        debug_assert_eq!(point.len(), self.dimension);
        let offset = point[0] - self.range.min_outer;
        if offset < 0 || point[0] > self.range.max_outer {
            return Q::zero();
        }
        self.slices
            .get(offset as usize)
            .map(|slice| slice.cells()[tail_index(&point[1..])].clone())
            .unwrap_or_else(Q::zero)
    }

    /// Visits every stored canonical cell in storage order.
    pub fn for_each_cell(&self, mut visit: impl FnMut(&[i64], &Q)) {
        let mut point = vec![0i64; self.dimension];
        for slice in self.slices {
            point[0] = slice.outer();
            for coordinate in point.iter_mut().skip(1) {
                *coordinate = 0;
            }
            for value in slice.cells() {
                visit(&point, value);
                // advance the tail odometer
                for k in (1..self.dimension).rev() {
                    if point[k] < point[k - 1] {
                        point[k] += 1;
                        for coordinate in point.iter_mut().skip(k + 1) {
                            *coordinate = 0;
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Smallest and largest stored values, `None` for an empty region.
    pub fn value_bounds(&self) -> Option<(Q, Q)> {
        let mut bounds: Option<(Q, Q)> = None;
        for value in self.slices.iter().flat_map(|slice| slice.cells()) {
            bounds = Some(match bounds {
                None => (value.clone(), value.clone()),
                Some((min, max)) => (
                    if *value < min { value.clone() } else { min },
                    if *value > max { value.clone() } else { max },
                ),
            });
        }
        bounds
    }
}
