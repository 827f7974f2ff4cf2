mod interp;

use std::{f64::consts::PI, fmt, sync::Arc};

#[cfg(test)]
use mockall::automock;

pub use interp::LinearInterp;

use crate::{
    error::{Error, Result},
    quant::Time,
};

/// A user supplied envelope, evaluated at absolute time.
#[cfg_attr(test, automock)]
pub trait EnvelopeFn {
    fn value(&self, t: f64) -> f64;
}

impl<F> EnvelopeFn for F
where
    F: Fn(f64) -> f64,
{
    fn value(&self, t: f64) -> f64 {
        self(t)
    }
}

pub type SharedEnvelopeFn = Arc<dyn EnvelopeFn + Send + Sync>;

/// Envelope of a single pulse.
#[derive(Clone)]
pub enum Envelope {
    BoxRamp(BoxRamp),
    Gaussian(Gaussian),
    IqInterpolated(IqInterpolated),
    Custom(SharedEnvelopeFn),
}

/// Envelope value at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeValue {
    Scalar(f64),
    Iq { i: f64, q: f64 },
}

impl Envelope {
    #[must_use]
    pub fn value(&self, t: f64) -> EnvelopeValue {
        match self {
            Self::BoxRamp(e) => EnvelopeValue::Scalar(e.value(t)),
            Self::Gaussian(e) => EnvelopeValue::Scalar(e.value(t)),
            Self::Custom(e) => EnvelopeValue::Scalar(e.value(t)),
            Self::IqInterpolated(e) => {
                let (i, q) = e.value(t);
                EnvelopeValue::Iq { i, q }
            }
        }
    }

    #[must_use]
    pub const fn is_iq(&self) -> bool {
        matches!(self, Self::IqInterpolated(_))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoxRamp(e) => f.debug_tuple("BoxRamp").field(e).finish(),
            Self::Gaussian(e) => f.debug_tuple("Gaussian").field(e).finish(),
            Self::IqInterpolated(e) => f.debug_tuple("IqInterpolated").field(e).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    RampUp,
    Flat,
    RampDown,
}

/// Flat-top pulse with `sin²` ramps at both ends.
///
/// With `t' = t - start`:
///
/// | interval                       | value                             |
/// |--------------------------------|-----------------------------------|
/// | `0 <= t' < rise`               | `sin²(π t' / (2 rise))`           |
/// | `rise <= t' < duration - rise` | `1`                               |
/// | `duration - rise <= t' < duration` | `sin²(π (duration - t') / (2 rise))` |
/// | otherwise                      | `0`                               |
///
/// The first matching row wins, so with `rise > duration / 2` there is no
/// flat top and the down ramp starts at `rise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxRamp {
    start: Time,
    duration: Time,
    rise_time: Time,
}

impl BoxRamp {
    pub(crate) const fn new(start: Time, duration: Time, rise_time: Time) -> Self {
        Self {
            start,
            duration,
            rise_time,
        }
    }

    pub(crate) fn check(duration: Time, rise_time: Time) -> Result<()> {
        if rise_time < Time::ZERO {
            return Err(Error::InvalidPulseParameter(format!(
                "Invalid rise_time {rise_time}"
            )));
        }
        if rise_time > duration {
            return Err(Error::InvalidPulseParameter(format!(
                "rise_time {rise_time} is longer than duration {duration}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn start(&self) -> Time {
        self.start
    }

    #[must_use]
    pub const fn duration(&self) -> Time {
        self.duration
    }

    #[must_use]
    pub const fn rise_time(&self) -> Time {
        self.rise_time
    }

    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        let duration = self.duration.value();
        let rise = self.rise_time.value();
        let tp = t - self.start.value();
        if (0.0..rise).contains(&tp) {
            (PI * tp / (2.0 * rise)).sin().powi(2)
        } else if (rise..duration - rise).contains(&tp) {
            1.0
        } else if (duration - rise..duration).contains(&tp) {
            (PI * (duration - tp) / (2.0 * rise)).sin().powi(2)
        } else {
            0.0
        }
    }

    /// Non-empty segments as `(segment, lo, hi)`, covering `[lo, hi)` in
    /// pulse-local time. Bounds are computed exactly as [`Self::value`]
    /// compares against them.
    pub(crate) fn segments(&self) -> Vec<(Segment, f64, f64)> {
        let duration = self.duration.value();
        let rise = self.rise_time.value();
        let flat_end = duration - rise;
        [
            (Segment::RampUp, 0.0, rise),
            (Segment::Flat, rise, flat_end),
            (Segment::RampDown, rise.max(flat_end), duration),
        ]
        .into_iter()
        .filter(|(_, lo, hi)| lo < hi)
        .collect()
    }
}

/// Gaussian centred `2 sigma` after the pulse start. The pulse is booked as
/// `6 sigma` long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gaussian {
    center: Time,
    sigma: Time,
    duration: Time,
}

impl Gaussian {
    pub(crate) fn new(start: Time, sigma: Time) -> Result<Self> {
        Ok(Self {
            center: start.checked_add(sigma.checked_mul(2.0)?)?,
            sigma,
            duration: sigma.checked_mul(6.0)?,
        })
    }

    #[must_use]
    pub const fn sigma(&self) -> Time {
        self.sigma
    }

    #[must_use]
    pub const fn center(&self) -> Time {
        self.center
    }

    #[must_use]
    pub const fn duration(&self) -> Time {
        self.duration
    }

    #[must_use]
    pub fn value(&self, t: f64) -> f64 {
        let x = t - self.center().value();
        let sigma = self.sigma.value();
        (-(x * x) / (2.0 * sigma * sigma)).exp()
    }
}

/// In-phase and quadrature envelopes, read at absolute time.
#[derive(Debug, Clone)]
pub struct IqInterpolated {
    i: Arc<LinearInterp>,
    q: Arc<LinearInterp>,
}

impl IqInterpolated {
    pub(crate) const fn new(i: Arc<LinearInterp>, q: Arc<LinearInterp>) -> Self {
        Self { i, q }
    }

    #[must_use]
    pub fn i(&self) -> &LinearInterp {
        &self.i
    }

    #[must_use]
    pub fn q(&self) -> &LinearInterp {
        &self.q
    }

    /// `(I, Q)` at absolute time `t`.
    #[must_use]
    pub fn value(&self, t: f64) -> (f64, f64) {
        (self.i.value(t), self.q.value(t))
    }
}
