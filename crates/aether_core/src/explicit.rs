//! Unfolded reference simulation over the full lattice.
//!
//! Every cell is stored and every axis neighbor is its own slot, so no symmetry
//! factors are involved. Slow and memory hungry, but easy to check by hand.

use crate::domain::{Direction, Point};
use crate::error::Result;
use crate::limits::validate_single_source;
use crate::topple::{Neighbor, ToppleEngine};
use crate::traits::{EvolvingModel, Quantity};
use std::collections::HashMap;

/// Every point of the cube `[-radius, radius]^N`.
pub(crate) fn cube_points<const N: usize>(radius: i64) -> impl Iterator<Item = Point<N>> {
    let mut next = (N > 0).then_some([-radius; N]);
    std::iter::from_fn(move || {
        let current = next?;
        let mut point = current;
        next = None;
        for k in (0..N).rev() {
            if point[k] < radius {
                point[k] += 1;
                for coordinate in point.iter_mut().skip(k + 1) {
                    *coordinate = -radius;
                }
                next = Some(point);
                break;
            }
        }
        Some(current)
    })
}

#[derive(Debug, Clone)]
pub struct ExplicitAether<Q, const N: usize> {
    seed: Q,
    cells: HashMap<Point<N>, Q>,
    /// Largest coordinate magnitude of any non-zero cell so far.
    extent: i64,
    step: u64,
    engine: ToppleEngine<Q>,
    neighbors: Vec<Neighbor<Q>>,
}

impl<Q: Quantity, const N: usize> ExplicitAether<Q, N> {
    pub fn new(seed: Q) -> Result<Self> {
        validate_single_source(N, &seed)?;
        let mut cells = HashMap::new();
        if !seed.is_zero() {
            cells.insert([0i64; N], seed.clone());
        }
        Ok(Self {
            seed,
            cells,
            extent: 0,
            step: 0,
            engine: ToppleEngine::new(),
            neighbors: Vec::with_capacity(2 * N),
        })
    }

    pub fn seed(&self) -> &Q {
        &self.seed
    }

    pub fn extent(&self) -> i64 {
        self.extent
    }

    /// Sum of all cell values.
    pub fn total(&self) -> Q {
        self.cells
            .values()
            .fold(Q::zero(), |sum, value| sum.add_ref(value))
    }

    fn value(&self, point: &Point<N>) -> Q {
        self.cells.get(point).cloned().unwrap_or_else(Q::zero)
    }
}

impl<Q: Quantity, const N: usize> EvolvingModel<Q, N> for ExplicitAether<Q, N> {
    fn next_step(&mut self) -> Result<bool> {
        let mut next: HashMap<Point<N>, Q> = HashMap::with_capacity(self.cells.len() * 2);
        let mut changed = false;
        let mut targets: Vec<Point<N>> = Vec::with_capacity(2 * N);
        // zero cells further out than extent + 1 have only zero neighbors
        for point in cube_points::<N>(self.extent + 1) {
            self.neighbors.clear();
            targets.clear();
            for direction in Direction::all::<N>() {
                let mut neighbor = point;
                neighbor[direction.axis] += direction.step();
                let value = self.value(&neighbor);
                self.neighbors.push(Neighbor::plain(value));
                targets.push(neighbor);
            }
            let current = self.value(&point);
            let (value, toppled) = self.engine.topple(&current, &self.neighbors);
            next.entry(point).or_insert_with(Q::zero).add_assign_ref(&value);
            if toppled {
                changed = true;
                for (target, amount) in targets.iter().zip(self.engine.amounts()) {
                    if !amount.is_zero() {
                        next.entry(*target)
                            .or_insert_with(Q::zero)
                            .add_assign_ref(amount);
                    }
                }
            }
        }
        next.retain(|_, value| !value.is_zero());
        for point in next.keys() {
            let magnitude = point.iter().map(|c| c.abs()).max().unwrap_or(0);
            self.extent = self.extent.max(magnitude);
        }
        self.cells = next;
        self.step += 1;
        Ok(changed)
    }

    fn step(&self) -> u64 {
        self.step
    }

    fn value_at(&mut self, point: &[i64; N]) -> Result<Q> {
        Ok(self.value(point))
    }
}
