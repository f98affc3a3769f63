//! `Quantity` implementations for the supported cell value types.

use crate::traits::Quantity;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::Zero;

macro_rules! impl_fixed_width_quantity {
    ($t:ty, $name:expr) => {
        impl Quantity for $t {
            const TYPE_NAME: &'static str = $name;

            fn add_ref(&self, other: &Self) -> Self {
                *self + *other
            }

            fn sub_ref(&self, other: &Self) -> Self {
                *self - *other
            }

            fn add_assign_ref(&mut self, other: &Self) {
                *self += *other;
            }

            fn mul_count(&self, factor: u32) -> Self {
                *self * factor as $t
            }

            fn div_rem_count(&self, divisor: u32) -> (Self, Self) {
                Integer::div_rem(self, &(divisor as $t))
            }

            fn to_bigint(&self) -> Option<BigInt> {
                Some(BigInt::from(*self))
            }

            fn upper_bound() -> Option<BigInt> {
                Some(BigInt::from(<$t>::MAX))
            }

            fn lower_bound() -> Option<BigInt> {
                Some(BigInt::from(<$t>::MIN))
            }
        }
    };
}

impl_fixed_width_quantity!(i16, "i16");
impl_fixed_width_quantity!(i32, "i32");
impl_fixed_width_quantity!(i64, "i64");

impl Quantity for BigInt {
    const TYPE_NAME: &'static str = "bigint";

    fn add_ref(&self, other: &Self) -> Self {
        self + other
    }

    fn sub_ref(&self, other: &Self) -> Self {
        self - other
    }

    fn add_assign_ref(&mut self, other: &Self) {
        *self += other;
    }

    fn mul_count(&self, factor: u32) -> Self {
        self * factor
    }

    fn div_rem_count(&self, divisor: u32) -> (Self, Self) {
        Integer::div_rem(self, &BigInt::from(divisor))
    }

    fn to_bigint(&self) -> Option<BigInt> {
        Some(self.clone())
    }

    fn upper_bound() -> Option<BigInt> {
        None
    }

    fn lower_bound() -> Option<BigInt> {
        None
    }

    fn estimated_cell_bytes() -> u64 {
        // inline header plus a couple of heap digits
        std::mem::size_of::<BigInt>() as u64 + 16
    }
}

impl Quantity for BigRational {
    const TYPE_NAME: &'static str = "bigrational";

    fn add_ref(&self, other: &Self) -> Self {
        self + other
    }

    fn sub_ref(&self, other: &Self) -> Self {
        self - other
    }

    fn add_assign_ref(&mut self, other: &Self) {
        *self = &*self + other;
    }

    fn mul_count(&self, factor: u32) -> Self {
        self * BigRational::from_integer(BigInt::from(factor))
    }

    fn div_rem_count(&self, divisor: u32) -> (Self, Self) {
        (
            self / BigRational::from_integer(BigInt::from(divisor)),
            BigRational::zero(),
        )
    }

    fn to_bigint(&self) -> Option<BigInt> {
        if self.is_integer() {
            Some(self.to_integer())
        } else {
            None
        }
    }

    fn upper_bound() -> Option<BigInt> {
        None
    }

    fn lower_bound() -> Option<BigInt> {
        None
    }

    fn estimated_cell_bytes() -> u64 {
        std::mem::size_of::<BigRational>() as u64 + 32
    }
}
