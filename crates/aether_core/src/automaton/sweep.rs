//! Toppling of one slice against the sliding window of next-generation slices.

use crate::domain::{FundamentalDomain, Point};
use crate::slice::{CanonicalPoints, SliceBuffer};
use crate::topple::{Neighbor, ToppleEngine};
use crate::traits::Quantity;
use std::mem;

/// Next-generation slices at `o - 1`, `o` and `o + 1` while slice `o` is toppled.
#[derive(Debug)]
pub(crate) struct NewSliceWindow<Q> {
    left: Option<SliceBuffer<Q>>,
    center: SliceBuffer<Q>,
    right: SliceBuffer<Q>,
}

impl<Q: Quantity> NewSliceWindow<Q> {
    /// Window for toppling the origin slice.
    pub(crate) fn start(free_dims: usize) -> Self {
        Self {
            left: None,
            center: SliceBuffer::new(0, free_dims),
            right: SliceBuffer::new(1, free_dims),
        }
    }

    /// Shifts the window one slice outward, with `fresh` as the new right slice.
    pub(crate) fn slide(&mut self, fresh: SliceBuffer<Q>) {
        debug_assert!(self.left.is_none(), "left slice was not committed");
        let right = mem::replace(&mut self.right, fresh);
        self.left = Some(mem::replace(&mut self.center, right));
    }

    /// The left slice, which no later toppling writes to.
    pub(crate) fn take_left(&mut self) -> Option<SliceBuffer<Q>> {
        self.left.take()
    }

    pub(crate) fn into_remaining(self) -> (SliceBuffer<Q>, SliceBuffer<Q>) {
        (self.center, self.right)
    }

    fn slice_mut(&mut self, relative_outer: i64) -> Option<&mut SliceBuffer<Q>> {
        match relative_outer {
            -1 => self.left.as_mut(),
            0 => Some(&mut self.center),
            1 => Some(&mut self.right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SliceOutcome {
    pub toppled: bool,
    /// Something was sent to or from the outermost tracked shell.
    pub reached_frontier: bool,
}

/// Current-generation slices at `o - 1`, `o` and `o + 1`; `None` reads as zero.
pub(crate) type OldSlices<'a, Q> = [Option<&'a SliceBuffer<Q>>; 3];

fn old_value<Q: Quantity, const N: usize>(old: &OldSlices<'_, Q>, outer: i64, point: &Point<N>) -> Q {
    let relative = point[0] - outer + 1;
    match usize::try_from(relative).ok().and_then(|i| old.get(i).copied().flatten()) {
        Some(slice) => slice.get(&point[1..]).clone(),
        None => Q::zero(),
    }
}

fn note_extent<const N: usize>(extents: &mut [i64; N], point: &Point<N>) {
    for (extent, &c) in extents.iter_mut().zip(point) {
        *extent = (*extent).max(c);
    }
}

/// Toppling workspace reused across slices and steps.
#[derive(Debug)]
pub(crate) struct SliceSweeper<Q, const N: usize> {
    engine: ToppleEngine<Q>,
    neighbors: Vec<Neighbor<Q>>,
    targets: Vec<Point<N>>,
}

impl<Q: Quantity, const N: usize> SliceSweeper<Q, N> {
    pub(crate) fn new() -> Self {
        Self {
            engine: ToppleEngine::new(),
            neighbors: Vec::with_capacity(2 * N),
            targets: Vec::with_capacity(2 * N),
        }
    }

    /// Topples every cell of slice `outer`, accumulating results into `window`.
    pub(crate) fn topple_slice(
        &mut self,
        domain: &FundamentalDomain<N>,
        old: OldSlices<'_, Q>,
        outer: i64,
        frontier: i64,
        window: &mut NewSliceWindow<Q>,
        extents: &mut [i64; N],
    ) -> SliceOutcome {
        let mut outcome = SliceOutcome::default();
        for point in CanonicalPoints::<N>::new(outer) {
            let current = old_value(&old, outer, &point);
            self.neighbors.clear();
            self.targets.clear();
            for slot in domain.slots(&point) {
                self.neighbors.push(Neighbor {
                    value: old_value(&old, outer, &slot.representative),
                    share_multiplier: slot.share_multiplier,
                    symmetry_weight: slot.symmetry_weight,
                });
                self.targets.push(slot.representative);
            }

            let (value, toppled) = self.engine.topple(&current, &self.neighbors);
            if !value.is_zero() {
                window.center.accumulate(&point[1..], &value);
                note_extent(extents, &point);
            }
            if !toppled {
                continue;
            }
            outcome.toppled = true;
            if outer >= frontier {
                outcome.reached_frontier = true;
            }
            for (target, amount) in self.targets.iter().zip(self.engine.amounts()) {
                if amount.is_zero() {
                    continue;
                }
                if target[0] >= frontier {
                    outcome.reached_frontier = true;
                }
                match window.slice_mut(target[0] - outer) {
                    Some(slice) => slice.accumulate(&target[1..], amount),
                    None => debug_assert!(false, "{target:?} is not adjacent to slice {outer}"),
                }
                note_extent(extents, target);
            }
        }
        outcome
    }
}
