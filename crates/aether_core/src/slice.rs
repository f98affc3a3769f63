//! Dense storage of one outer-coordinate hyperplane of the fundamental domain.
//!
//! The cells of the slice at outer coordinate `o` are the canonical tails
//! `o >= a1 >= a2 >= ... >= am >= 0` (`m = N - 1`). They are stored flat, in
//! lexicographic tail order, using the combinatorial number system as index, so a
//! slice never holds a non-canonical cell.

use crate::domain::Point;
use crate::traits::Quantity;

/// `n choose k`.
pub fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k as u128 {
        result = result * (n as u128 - i) / (i + 1);
    }
    result as u64
}

/// Number of cells in the slice at `outer` when `free_dims` coordinates follow it.
pub fn slice_len(outer: i64, free_dims: usize) -> usize {
    binomial(outer as u64 + free_dims as u64, free_dims as u64) as usize
}

/// Flat index of a canonical tail.
pub fn tail_index(tail: &[i64]) -> usize {
    let m = tail.len() as u64;
    tail.iter()
        .enumerate()
        .map(|(j, &a)| binomial(a as u64 + m - 1 - j as u64, m - j as u64))
        .sum::<u64>() as usize
}

/// Estimated heap plus inline footprint of one slice.
pub fn estimated_slice_bytes<Q: Quantity>(outer: i64, free_dims: usize) -> u64 {
    std::mem::size_of::<SliceBuffer<Q>>() as u64
        + slice_len(outer, free_dims) as u64 * Q::estimated_cell_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceBuffer<Q> {
    outer: i64,
    free_dims: usize,
    cells: Vec<Q>,
}

impl<Q: Quantity> SliceBuffer<Q> {
    /// An all-zero slice sized for exactly the canonical cells of `outer`.
    pub fn new(outer: i64, free_dims: usize) -> Self {
        Self {
            outer,
            free_dims,
            cells: vec![Q::zero(); slice_len(outer, free_dims)],
        }
    }

    /// Wraps decoded cells. Returns `None` when the length does not match the shape.
    pub fn from_cells(outer: i64, free_dims: usize, cells: Vec<Q>) -> Option<Self> {
        (cells.len() == slice_len(outer, free_dims)).then_some(Self {
            outer,
            free_dims,
            cells,
        })
    }

    pub fn outer(&self) -> i64 {
        self.outer
    }

    pub fn free_dims(&self) -> usize {
        self.free_dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Q] {
        &self.cells
    }

    pub fn get(&self, tail: &[i64]) -> &Q {
        debug_assert_eq!(tail.len(), self.free_dims);
        debug_assert!(tail.first().map_or(true, |&a| a <= self.outer));
        &self.cells[tail_index(tail)]
    }

    pub fn accumulate(&mut self, tail: &[i64], amount: &Q) {
        debug_assert_eq!(tail.len(), self.free_dims);
        self.cells[tail_index(tail)].add_assign_ref(amount);
    }

    pub fn is_all_zero(&self) -> bool {
        self.cells.iter().all(Q::is_zero)
    }

    pub fn estimated_bytes(&self) -> u64 {
        estimated_slice_bytes::<Q>(self.outer, self.free_dims)
    }
}

/// Canonical points of the slice at `outer`, in storage order.
#[derive(Debug, Clone)]
pub struct CanonicalPoints<const N: usize> {
    next: Option<Point<N>>,
}

impl<const N: usize> CanonicalPoints<N> {
    pub fn new(outer: i64) -> Self {
        let mut first = [0i64; N];
        if N > 0 {
            first[0] = outer;
        }
        Self {
            next: (N > 0 && outer >= 0).then_some(first),
        }
    }
}

impl<const N: usize> Iterator for CanonicalPoints<N> {
    type Item = Point<N>;

    fn next(&mut self) -> Option<Point<N>> {
        let current = self.next?;
        let mut point = current;
        // odometer over the tail, each coordinate bounded by the one before it
        self.next = None;
        for k in (1..N).rev() {
            if point[k] < point[k - 1] {
                point[k] += 1;
                for coordinate in point.iter_mut().skip(k + 1) {
                    *coordinate = 0;
                }
                self.next = Some(point);
                break;
            }
        }
        Some(current)
    }
}
