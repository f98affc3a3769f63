use crate::error::Result;
use crate::region::GridRegion;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

/// A trait for the exact values held by lattice cells.
/// Must be totally ordered and support exact subtraction and division by a small count
/// with a remainder, so that redistributing a cell never loses or creates quantity.
pub trait Quantity:
    Zero + Clone + Ord + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name stored in run properties so a checkpoint is never restored with another type.
    const TYPE_NAME: &'static str;

    fn add_ref(&self, other: &Self) -> Self;

    fn sub_ref(&self, other: &Self) -> Self;

    fn add_assign_ref(&mut self, other: &Self);

    /// Multiplies by a small non-negative factor (share multipliers, symmetry counts).
    fn mul_count(&self, factor: u32) -> Self;

    /// Divides by `divisor` returning `(quotient, remainder)` with
    /// `quotient * divisor + remainder == self`. Exact types return a zero remainder.
    fn div_rem_count(&self, divisor: u32) -> (Self, Self);

    /// The exact integer value, if this quantity is an integer.
    fn to_bigint(&self) -> Option<BigInt>;

    /// Largest representable value, `None` when unbounded.
    fn upper_bound() -> Option<BigInt>;

    /// Smallest representable value, `None` when unbounded.
    fn lower_bound() -> Option<BigInt>;

    /// Approximate heap footprint of one stored cell, used against the memory budget.
    fn estimated_cell_bytes() -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}

/// A model that can be advanced one generation at a time and queried at any lattice point.
pub trait EvolvingModel<Q: Quantity, const N: usize> {
    /// Advances one step. Returns whether any cell changed value.
    fn next_step(&mut self) -> Result<bool>;

    /// Number of steps computed so far.
    fn step(&self) -> u64;

    /// Value at any lattice point, canonical or not. Zero outside the occupied region.
    fn value_at(&mut self, point: &[i64; N]) -> Result<Q>;
}

/// External collaborator notified with read-only views of finalized grid regions
/// (e.g. image rendering).
pub trait RegionProcessor<Q: Quantity> {
    fn before_processing(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn process_region(&mut self, region: &GridRegion<'_, Q>) -> anyhow::Result<()>;

    fn after_processing(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
