use std::{fmt, sync::Arc};

use ordered_float::NotNan;

use crate::error::{Error, Result};

macro_rules! impl_quant {
    ($t:ident, $what:literal) => {
        #[doc = concat!("A finite ", $what, ".")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $t(NotNan<f64>);

        impl $t {
            pub const ZERO: Self = Self(unsafe { NotNan::new_unchecked(0.0) });
            pub const ONE: Self = Self(unsafe { NotNan::new_unchecked(1.0) });

            /// # Errors
            ///
            /// Returns [`Error::NotFinite`] if `value` is NaN or infinite.
            pub fn new(value: f64) -> Result<Self> {
                let err = || Error::NotFinite { what: $what, value };
                if !value.is_finite() {
                    return Err(err());
                }
                NotNan::new(value).map(Self).map_err(|_| err())
            }

            #[must_use]
            pub fn value(&self) -> f64 {
                self.0.into_inner()
            }
        }

        impl From<$t> for f64 {
            fn from(q: $t) -> Self {
                q.value()
            }
        }

        impl TryFrom<f64> for $t {
            type Error = Error;

            fn try_from(value: f64) -> Result<Self> {
                Self::new(value)
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.value(), f)
            }
        }
    };
}

impl_quant!(Time, "time");
impl_quant!(AngularFrequency, "angular frequency");
impl_quant!(Amplitude, "amplitude");
impl_quant!(Phase, "phase");

impl Time {
    /// # Errors
    ///
    /// Returns [`Error::NotFinite`] if the sum overflows.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        Self::new(self.value() + rhs.value())
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFinite`] if the product overflows.
    pub fn checked_mul(self, rhs: f64) -> Result<Self> {
        Self::new(self.value() * rhs)
    }
}

impl AngularFrequency {
    /// Frequency in cycles per time unit, `ω / 2π`.
    #[must_use]
    pub fn real(&self) -> f64 {
        self.value() / std::f64::consts::TAU
    }
}

/// Label of an energy level, e.g. `"0"`, `"1"` or `"g"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(Arc<str>);

impl Level {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<&str> for Level {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Level {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Pair of levels a pulse couples, always stored with the smaller label first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionLevels {
    lower: Level,
    upper: Level,
}

impl TransitionLevels {
    pub fn new(a: impl Into<Level>, b: impl Into<Level>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    #[must_use]
    pub fn lower(&self) -> &Level {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &Level {
        &self.upper
    }
}

impl<A: Into<Level>, B: Into<Level>> From<(A, B)> for TransitionLevels {
    fn from((a, b): (A, B)) -> Self {
        Self::new(a, b)
    }
}

impl fmt::Display for TransitionLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lower, self.upper)
    }
}
