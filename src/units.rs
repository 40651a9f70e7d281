//! This module defines various unit types and their conversions.
//!
//! All quantities are thin wrappers around `f64`. Arithmetic between them is only defined where it
//! is physically meaningful (e.g. power multiplied by a duration gives an energy).
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Div, Mul, Neg};

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite (i.e. neither infinite nor NaN)
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The larger of two values
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// The smaller of two values
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// The absolute value
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                Self(-self.0)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_dimensionless_ops {
    ($name:ident) => {
        impl Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

unit_struct!(
    /// A dimensionless quantity, such as an efficiency or a discount rate.
    Dimensionless
);

impl Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless(self.0.powi(rhs))
    }
}

// Base quantities
unit_struct!(
    /// An amount of money, in the scenario's currency
    Money
);
unit_struct!(
    /// Power in kW
    Power
);
unit_struct!(
    /// Energy in kWh
    Energy
);
unit_struct!(
    /// A duration in hours
    Hours
);

// Derived quantities
unit_struct!(
    /// An energy price in currency per kWh
    MoneyPerEnergy
);
unit_struct!(
    /// A demand charge rate in currency per kW per month
    MoneyPerPower
);

impl_dimensionless_ops!(Money);
impl_dimensionless_ops!(Power);
impl_dimensionless_ops!(Energy);
impl_dimensionless_ops!(Hours);
impl_dimensionless_ops!(MoneyPerEnergy);
impl_dimensionless_ops!(MoneyPerPower);

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(Energy, MoneyPerEnergy, Money);
impl_mul!(Power, MoneyPerPower, Money);

// Division rules
impl_div!(Energy, Hours, Power);
impl_div!(Energy, Power, Hours);
impl_div!(Money, Energy, MoneyPerEnergy);

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_power_times_hours() {
        assert_eq!(Power(125.0) * Hours(2.0), Energy(250.0));
        assert_eq!(Hours(2.0) * Power(125.0), Energy(250.0));
    }

    #[test]
    fn test_energy_over_power() {
        assert_eq!(Energy(522.0) / Power(261.0), Hours(2.0));
    }

    #[test]
    fn test_energy_price() {
        assert_approx_eq!(Money, Energy(100.0) * MoneyPerEnergy(0.3), Money(30.0));
        assert_eq!(Money(30.0) / Energy(100.0), MoneyPerEnergy(0.3));
    }

    #[test]
    fn test_ratio_of_like_units() {
        assert_eq!(Money(50.0) / Money(200.0), Dimensionless(0.25));
    }

    #[test]
    fn test_sum_and_neg() {
        let total: Money = [Money(1.0), Money(2.5), -Money(0.5)].into_iter().sum();
        assert_eq!(total, Money(3.0));
    }
}
