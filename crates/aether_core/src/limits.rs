//! Safe seed ranges for fixed-width quantities.
//!
//! With a single source at the origin the largest difference between two neighboring
//! cells is reached right after the first topplings. Every intermediate of the toppling
//! rule is bounded by that difference, so checking it once at construction is enough to
//! rule out overflow for the whole run.

use crate::error::{AetherError, Result};
use crate::traits::Quantity;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Maximum value difference between neighbors throughout the evolution of a
/// single source configuration.
///
/// Non-negative sources never produce a difference larger than the source itself.
pub fn max_neighboring_values_difference(dimension: usize, source: &BigInt) -> BigInt {
    if source.is_negative() {
        if dimension > 1 {
            let two = BigInt::from(2);
            let fan_out = BigInt::from(dimension) * &two + BigInt::one();
            (source + (-source / &two) * fan_out).abs()
        } else {
            -source
        }
    } else {
        source.clone()
    }
}

/// Smallest single source value whose maximum neighboring difference stays within
/// `max_allowed`.
pub fn min_allowed_single_source_value(dimension: usize, max_allowed: &BigInt) -> Result<BigInt> {
    if max_allowed.is_negative() {
        return Err(AetherError::Configuration(
            "Max allowed value cannot be less than zero.".to_string(),
        ));
    }
    if max_allowed.is_zero() {
        return Ok(BigInt::zero());
    }
    if dimension == 0 {
        return Err(AetherError::Configuration(
            "Grid dimension must be greater than zero.".to_string(),
        ));
    }
    if dimension == 1 {
        return Ok(-max_allowed);
    }
    let two = BigInt::from(2);
    let double_dimension_minus_one = BigInt::from(dimension) * &two - BigInt::one();
    if *max_allowed < double_dimension_minus_one {
        return Ok(-BigInt::one());
    }
    // the exact bound alternates between the two candidates, it can be off by one
    let candidate = &two * max_allowed / -&double_dimension_minus_one;
    let lower_candidate = &candidate - BigInt::one();
    if max_neighboring_values_difference(dimension, &lower_candidate) > *max_allowed {
        Ok(candidate)
    } else {
        Ok(lower_candidate)
    }
}

/// Rejects seeds whose evolution could overflow the quantity type.
pub fn validate_single_source<Q: Quantity>(dimension: usize, seed: &Q) -> Result<()> {
    if dimension == 0 {
        return Err(AetherError::Configuration(
            "Grid dimension must be greater than zero.".to_string(),
        ));
    }
    let (Some(value), Some(max)) = (seed.to_bigint(), Q::upper_bound()) else {
        return Ok(());
    };
    let difference = max_neighboring_values_difference(dimension, &value);
    if difference > max {
        let min_allowed = min_allowed_single_source_value(dimension, &max)?;
        return Err(AetherError::Configuration(format!(
            "Resulting max value difference between neighboring positions ({difference}) exceeds \
             the {} limit ({max}). Use an initial value of at least {min_allowed} or a wider quantity type.",
            Q::TYPE_NAME
        )));
    }
    Ok(())
}
