//! Physical quantities used by the model.
//!
//! Each quantity is a newtype around an `f64`, so that e.g. a price cannot accidentally be used
//! where a flow is expected. Flows are expressed per time step (e.g. MWh per hour), so a flow and
//! the energy moved in one step have the same value.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

macro_rules! define_unit {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Create from an `f64` value
            pub fn new(value: f64) -> Self {
                $name(value)
            }

            /// Get the underlying `f64` value
            pub fn value(&self) -> f64 {
                self.0
            }

            /// Returns true if the value is neither infinite nor NaN
            pub fn is_finite(&self) -> bool {
                self.0.is_finite()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add for $name {
            type Output = $name;

            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = $name;

            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl Neg for $name {
            type Output = $name;

            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;

            fn mul(self, rhs: f64) -> $name {
                $name(self.0 * rhs)
            }
        }

        impl Div for $name {
            type Output = Dimensionless;

            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name(iter.map(|x| x.0).sum())
            }
        }
    };
}

define_unit!(Dimensionless);
define_unit!(Flow);
define_unit!(Money);
define_unit!(MoneyPerFlow);

impl Mul<MoneyPerFlow> for Flow {
    type Output = Money;

    fn mul(self, rhs: MoneyPerFlow) -> Money {
        Money(self.0 * rhs.0)
    }
}

impl Mul<Flow> for Dimensionless {
    type Output = Flow;

    fn mul(self, rhs: Flow) -> Flow {
        Flow(self.0 * rhs.0)
    }
}
