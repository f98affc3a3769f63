//! The toppling rule.
//!
//! A cell shares its value with the neighbors holding strictly less, one distinct
//! neighbor value at a time from the highest down. At each level the excess over that
//! level is divided among the cell itself and every neighbor at or below it; the
//! remainder of the division stays with the cell, so nothing is lost or created.

use crate::traits::Quantity;
use serde::{Deserialize, Serialize};

/// A neighbor as seen by the cell being toppled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor<Q> {
    pub value: Q,
    /// Real neighbor instances the receiving slot stands for.
    pub share_multiplier: u32,
    /// Real neighbor directions of the toppling cell folded onto this slot.
    pub symmetry_weight: u32,
}

impl<Q> Neighbor<Q> {
    /// A neighbor of the unfolded lattice.
    pub fn plain(value: Q) -> Self {
        Self {
            value,
            share_multiplier: 1,
            symmetry_weight: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToppleOutcome<Q> {
    pub value: Q,
    /// `(neighbor index, amount)` for every neighbor receiving a non-zero amount.
    pub outputs: Vec<(usize, Q)>,
}

impl<Q> ToppleOutcome<Q> {
    pub fn toppled(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Reusable toppling workspace. Keeps its buffers between cells so the hot loop does
/// not allocate.
#[derive(Debug, Clone)]
pub struct ToppleEngine<Q> {
    relevant: Vec<usize>,
    amounts: Vec<Q>,
}

impl<Q: Quantity> Default for ToppleEngine<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Quantity> ToppleEngine<Q> {
    pub fn new() -> Self {
        Self {
            relevant: Vec::new(),
            amounts: Vec::new(),
        }
    }

    /// Topples one cell, returning its new value and whether anything was shared.
    ///
    /// Afterwards `amounts()[i]` is what `neighbors[i]` receives (zero for neighbors
    /// that were not lower than `current`).
    pub fn topple(&mut self, current: &Q, neighbors: &[Neighbor<Q>]) -> (Q, bool) {
        self.relevant.clear();
        self.amounts.clear();
        self.amounts.resize(neighbors.len(), Q::zero());

        let mut share_count: u32 = 1;
        for (index, neighbor) in neighbors.iter().enumerate() {
            if neighbor.value < *current {
                self.relevant.push(index);
                share_count += neighbor.symmetry_weight;
            }
        }
        if self.relevant.is_empty() {
            return (current.clone(), false);
        }
        self.relevant
            .sort_by(|&a, &b| neighbors[b].value.cmp(&neighbors[a].value));

        let mut value = current.clone();
        let mut toppled = false;
        let mut previous_level: Option<&Q> = None;
        for position in 0..self.relevant.len() {
            let neighbor = &neighbors[self.relevant[position]];
            // tied neighbors share one level
            if previous_level != Some(&neighbor.value) {
                let to_share = value.sub_ref(&neighbor.value);
                let (share, remainder) = to_share.div_rem_count(share_count);
                if !share.is_zero() {
                    toppled = true;
                    value = value.sub_ref(&to_share).add_ref(&remainder).add_ref(&share);
                    for &index in &self.relevant[position..] {
                        let amount = share.mul_count(neighbors[index].share_multiplier);
                        self.amounts[index].add_assign_ref(&amount);
                    }
                }
                previous_level = Some(&neighbor.value);
            }
            share_count -= neighbor.symmetry_weight;
        }
        (value, toppled)
    }

    pub fn amounts(&self) -> &[Q] {
        &self.amounts
    }
}

/// Allocating convenience wrapper around [`ToppleEngine::topple`].
pub fn topple<Q: Quantity>(current: &Q, neighbors: &[Neighbor<Q>]) -> ToppleOutcome<Q> {
    let mut engine = ToppleEngine::new();
    let (value, _) = engine.topple(current, neighbors);
    let outputs = engine
        .amounts()
        .iter()
        .enumerate()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(index, amount)| (index, amount.clone()))
        .collect();
    ToppleOutcome { value, outputs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_rational::BigRational;
    use proptest::prelude::*;

    fn plain(values: &[i64]) -> Vec<Neighbor<i64>> {
        values.iter().copied().map(Neighbor::plain).collect()
    }

    #[test]
    fn single_source_splits_evenly_with_remainder_kept() {
        let outcome = topple(&100i64, &plain(&[0; 6]));
        assert_eq!(outcome.value, 100 - 6 * 14);
        assert_eq!(outcome.outputs.len(), 6);
        assert!(outcome.outputs.iter().all(|(_, amount)| *amount == 14));
    }

    #[test]
    fn stable_cell_is_a_no_op() {
        let outcome = topple(&5i64, &plain(&[5, 7, 9, 5]));
        assert_eq!(outcome.value, 5);
        assert!(!outcome.toppled());
    }

    #[test]
    fn too_small_excess_does_not_topple() {
        // 2 / 3 == 0
        let outcome = topple(&2i64, &plain(&[0, 0]));
        assert_eq!(outcome.value, 2);
        assert!(!outcome.toppled());
    }

    #[test]
    fn levels_are_processed_from_highest_down() {
        // level 6: (10 - 6) / 3 = 1 r 1 -> value 8, both get 1
        // level 2: (8 - 2) / 2 = 3 -> value 5, lower neighbor gets 3 more
        let outcome = topple(&10i64, &plain(&[2, 6]));
        assert_eq!(outcome.value, 5);
        assert_eq!(outcome.outputs, vec![(0, 4), (1, 1)]);
    }

    #[test]
    fn tied_neighbors_receive_identical_shares() {
        let outcome = topple(&50i64, &plain(&[10, 3, 10, 60]));
        let first = outcome.outputs.iter().find(|(i, _)| *i == 0).map(|(_, a)| *a);
        let second = outcome.outputs.iter().find(|(i, _)| *i == 2).map(|(_, a)| *a);
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(outcome.outputs.iter().all(|(i, _)| *i != 3));
    }

    #[test]
    fn folded_slot_counts_weight_and_scales_by_multiplier() {
        // origin of a 3D grid: one folded slot standing for six directions
        let neighbors = vec![Neighbor {
            value: 0i64,
            share_multiplier: 1,
            symmetry_weight: 6,
        }];
        let outcome = topple(&100i64, &neighbors);
        assert_eq!(outcome.value, 16);
        assert_eq!(outcome.outputs, vec![(0, 14)]);

        // (1, 0, 0) sending back to the origin stands for six senders
        let back = vec![Neighbor {
            value: 0i64,
            share_multiplier: 6,
            symmetry_weight: 1,
        }];
        let outcome = topple(&14i64, &back);
        assert_eq!(outcome.outputs, vec![(0, 7 * 6)]);
    }

    #[test]
    fn rational_shares_are_exact() {
        let whole = |n: i64| BigRational::from_integer(BigInt::from(n));
        let neighbors = vec![Neighbor::plain(whole(0)), Neighbor::plain(whole(0))];
        let outcome = topple(&whole(1), &neighbors);
        assert_eq!(outcome.value, BigRational::new(BigInt::from(1), BigInt::from(3)));
        assert_eq!(outcome.outputs.len(), 2);
    }

    #[test]
    fn negative_values_topple_toward_lower_neighbors() {
        let outcome = topple(&0i64, &plain(&[-30, 0, 0]));
        // (0 - -30) / 2 = 15
        assert_eq!(outcome.value, -15);
        assert_eq!(outcome.outputs, vec![(0, 15)]);
    }

    #[test]
    fn engine_reuses_buffers_between_cells() {
        let mut engine = ToppleEngine::new();
        let (value, toppled) = engine.topple(&100i64, &plain(&[0, 0, 0]));
        assert!(toppled);
        assert_eq!(value, 25);
        let (value, toppled) = engine.topple(&1i64, &plain(&[4]));
        assert!(!toppled);
        assert_eq!(value, 1);
        assert_eq!(engine.amounts(), &[0]);
    }

    fn neighbor_strategy() -> impl Strategy<Value = Neighbor<i64>> {
        (-1_000i64..1_000, 1u32..4).prop_map(|(value, symmetry_weight)| Neighbor {
            value,
            share_multiplier: 1,
            symmetry_weight,
        })
    }

    proptest! {
        #[test]
        fn toppling_conserves_mass(
            current in -1_000i64..1_000,
            neighbors in prop::collection::vec(neighbor_strategy(), 0..8),
        ) {
            let mut engine = ToppleEngine::new();
            let (value, _) = engine.topple(&current, &neighbors);
            let sent: i64 = engine
                .amounts()
                .iter()
                .zip(&neighbors)
                .map(|(amount, n)| amount * n.symmetry_weight as i64)
                .sum();
            prop_assert_eq!(value + sent, current);
        }

        #[test]
        fn toppling_only_feeds_lower_neighbors(
            current in -1_000i64..1_000,
            values in prop::collection::vec(-1_000i64..1_000, 0..8),
        ) {
            let neighbors = plain(&values);
            let outcome = topple(&current, &neighbors);
            prop_assert!(outcome.value <= current);
            for (index, amount) in &outcome.outputs {
                prop_assert!(neighbors[*index].value < current);
                prop_assert!(*amount > 0);
            }
            if values.iter().all(|v| *v >= current) {
                prop_assert_eq!(outcome.value, current);
                prop_assert!(outcome.outputs.is_empty());
            }
        }
    }
}
