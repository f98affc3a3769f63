//! Symmetry reduction of the lattice to its fundamental domain.
//!
//! A single source configuration is invariant under every permutation of the axes and
//! every sign flip, so only points with `c0 >= c1 >= ... >= c(N-1) >= 0` are stored.
//! Values sent to and received from folded-away images are scaled so the reduced
//! computation is numerically identical to simulating the full lattice:
//!
//! - the *symmetry weight* of a neighbor slot is how many of the source's real
//!   neighbor directions fold onto that representative neighbor (it counts toward the
//!   share count);
//! - the *share multiplier* is how many of the representative neighbor's own real
//!   neighbors are images of the source (it scales what the neighbor receives).
//!
//! Both only depend on which coordinates are equal, adjacent or close to zero, so they
//! are tabulated once per gap pattern instead of being hand-derived per position type.

use crate::error::{AetherError, Result};

/// A lattice point.
pub type Point<const N: usize> = [i64; N];

/// Largest supported lattice dimension.
pub const MAX_DIMENSION: usize = 8;

/// One of the `2N` axis-aligned neighbor directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    pub axis: usize,
    pub positive: bool,
}

impl Direction {
    pub fn step(&self) -> i64 {
        if self.positive {
            1
        } else {
            -1
        }
    }

    /// All directions, `+axis` before `-axis`, axes in order.
    pub fn all<const N: usize>() -> impl Iterator<Item = Direction> {
        (0..N).flat_map(|axis| {
            [true, false]
                .into_iter()
                .map(move |positive| Direction { axis, positive })
        })
    }
}

/// Sign and permutation needed to map a representative back onto the original point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetryMap<const N: usize> {
    /// `permutation[k]` is the original axis holding the representative's coordinate `k`
    permutation: [usize; N],
    /// indexed by original axis
    negated: [bool; N],
}

impl<const N: usize> SymmetryMap<N> {
    pub fn apply(&self, representative: &Point<N>) -> Point<N> {
        let mut point = [0i64; N];
        for (k, &axis) in self.permutation.iter().enumerate() {
            let magnitude = representative[k];
            point[axis] = if self.negated[axis] {
                -magnitude
            } else {
                magnitude
            };
        }
        point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonical<const N: usize> {
    pub representative: Point<N>,
    pub map: SymmetryMap<N>,
}

/// Sorts absolute values in descending order, keeping the undo information.
///
/// `i64::MIN` has no absolute value and folds onto `i64::MAX`.
pub fn canonicalize<const N: usize>(point: &Point<N>) -> Canonical<N> {
    let mut permutation = [0usize; N];
    for (k, slot) in permutation.iter_mut().enumerate() {
        *slot = k;
    }
    // stable, so equal magnitudes keep axis order
    permutation.sort_by(|&a, &b| point[b].saturating_abs().cmp(&point[a].saturating_abs()));
    let mut representative = [0i64; N];
    let mut negated = [false; N];
    for (k, &axis) in permutation.iter().enumerate() {
        representative[k] = point[axis].saturating_abs();
        negated[axis] = point[axis] < 0;
    }
    Canonical {
        representative,
        map: SymmetryMap {
            permutation,
            negated,
        },
    }
}

/// The representative only, without undo information. Saturates like [`canonicalize`].
pub fn representative<const N: usize>(point: &Point<N>) -> Point<N> {
    let mut rep = *point;
    for c in rep.iter_mut() {
        *c = c.saturating_abs();
    }
    rep.sort_unstable_by(|a, b| b.cmp(a));
    rep
}

pub fn is_canonical<const N: usize>(point: &Point<N>) -> bool {
    point.iter().all(|&c| c >= 0) && point.windows(2).all(|w| w[0] >= w[1])
}

/// Number of distinct sign/permutation images of a representative point.
pub fn symmetry_count<const N: usize>(rep: &Point<N>) -> u64 {
    let mut count = factorial(N);
    let mut run = 1u64;
    for k in 1..N {
        if rep[k] == rep[k - 1] {
            run += 1;
        } else {
            count /= factorial(run as usize);
            run = 1;
        }
    }
    count /= factorial(run as usize);
    let non_zero = rep.iter().filter(|&&c| c != 0).count() as u32;
    count << non_zero
}

fn factorial(n: usize) -> u64 {
    (1..=n as u64).product()
}

fn neighbor_of<const N: usize>(point: &Point<N>, direction: Direction) -> Point<N> {
    let mut neighbor = *point;
    neighbor[direction.axis] += direction.step();
    neighbor
}

/// Folding information for one neighbor of a representative point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborInfo<const N: usize> {
    pub representative: Point<N>,
    pub share_multiplier: u32,
    pub symmetry_weight: u32,
}

/// One deduplicated neighbor of a representative point.
pub type NeighborSlot<const N: usize> = NeighborInfo<N>;

/// Number of real neighbors of `point` that fold onto `target`.
fn folded_neighbor_count<const N: usize>(point: &Point<N>, target: &Point<N>) -> u32 {
    Direction::all::<N>()
        .filter(|&d| representative(&neighbor_of(point, d)) == *target)
        .count() as u32
}

/// Direct enumeration of the neighbor information of `rep` along one direction.
pub fn neighbor_info<const N: usize>(rep: &Point<N>, direction: Direction) -> NeighborInfo<N> {
    let neighbor = representative(&neighbor_of(rep, direction));
    NeighborInfo {
        representative: neighbor,
        share_multiplier: folded_neighbor_count(&neighbor, rep),
        symmetry_weight: folded_neighbor_count(rep, &neighbor),
    }
}

/// Direct enumeration of the deduplicated neighbor slots of `rep`, in direction order.
pub fn enumerate_slots<const N: usize>(rep: &Point<N>) -> Vec<NeighborSlot<N>> {
    let mut slots: Vec<NeighborSlot<N>> = Vec::with_capacity(2 * N);
    for direction in Direction::all::<N>() {
        let neighbor = representative(&neighbor_of(rep, direction));
        if slots.iter().any(|s| s.representative == neighbor) {
            continue;
        }
        slots.push(neighbor_info(rep, direction));
    }
    slots
}

#[derive(Debug, Clone, Copy)]
struct SlotTemplate<const N: usize> {
    offset: Point<N>,
    share_multiplier: u32,
    symmetry_weight: u32,
}

/// Table of neighbor slots keyed by the gap pattern of a representative point.
///
/// The pattern records, for each adjacent coordinate pair, whether the gap is 0, 1 or
/// larger, and whether the last coordinate is 0, 1 or larger. Points sharing a
/// pattern have the same slot offsets, weights and multipliers.
#[derive(Debug, Clone)]
pub struct FundamentalDomain<const N: usize> {
    table: Vec<Vec<SlotTemplate<N>>>,
}

impl<const N: usize> FundamentalDomain<N> {
    pub fn new() -> Result<Self> {
        if N == 0 || N > MAX_DIMENSION {
            return Err(AetherError::Configuration(format!(
                "Grid dimension must be between 1 and {MAX_DIMENSION}, got {N}."
            )));
        }
        let patterns = 3usize.pow(N as u32);
        let table = (0..patterns)
            .map(|key| {
                let exemplar = Self::exemplar(key);
                enumerate_slots(&exemplar)
                    .into_iter()
                    .map(|slot| {
                        let mut offset = [0i64; N];
                        for k in 0..N {
                            offset[k] = slot.representative[k] - exemplar[k];
                        }
                        SlotTemplate {
                            offset,
                            share_multiplier: slot.share_multiplier,
                            symmetry_weight: slot.symmetry_weight,
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(Self { table })
    }

    pub fn dimension(&self) -> usize {
        N
    }

    fn pattern_key(rep: &Point<N>) -> usize {
        let mut key = 0usize;
        let mut radix = 1usize;
        for k in 0..N {
            let gap = if k + 1 < N { rep[k] - rep[k + 1] } else { rep[k] };
            key += gap.min(2) as usize * radix;
            radix *= 3;
        }
        key
    }

    /// Smallest point with the given gap pattern.
    fn exemplar(key: usize) -> Point<N> {
        let mut classes = [0i64; N];
        let mut rest = key;
        for class in classes.iter_mut() {
            *class = (rest % 3) as i64;
            rest /= 3;
        }
        let mut point = [0i64; N];
        let mut running = 0i64;
        for k in (0..N).rev() {
            running += classes[k];
            point[k] = running;
        }
        point
    }

    /// Deduplicated neighbor slots of a representative point.
    pub fn slots<'a>(&'a self, rep: &'a Point<N>) -> impl Iterator<Item = NeighborSlot<N>> + 'a {
        debug_assert!(is_canonical(rep), "{rep:?} is not a representative");
        self.table[Self::pattern_key(rep)].iter().map(move |t| {
            let mut neighbor = *rep;
            for k in 0..N {
                neighbor[k] += t.offset[k];
            }
            NeighborSlot {
                representative: neighbor,
                share_multiplier: t.share_multiplier,
                symmetry_weight: t.symmetry_weight,
            }
        })
    }
}
