use std::sync::Arc;

use ndarray::{Array, ArrayBase, Data, Dimension, Zip};
use rayon::prelude::*;

use crate::{
    envelope::{Envelope, EnvelopeFn, EnvelopeValue, LinearInterp, SharedEnvelopeFn},
    error::{Error, Result},
    quant::{Amplitude, AngularFrequency, Phase, Time, TransitionLevels},
    symbolic::Expr,
};

/// Where a pulse starts relative to the sequence cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Placement {
    offset: Time,
    start: Option<Time>,
}

impl Placement {
    /// Explicit start if set, otherwise `cursor + offset`.
    pub fn resolve(&self, cursor: Time) -> Result<Time> {
        self.start.map_or_else(|| cursor.checked_add(self.offset), Ok)
    }

    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        self.start.is_some()
    }
}

/// Fields shared by every pulse request.
#[derive(Debug, Clone)]
pub(crate) struct PulseCommon {
    pub(crate) angular_frequency: AngularFrequency,
    pub(crate) amplitude: Amplitude,
    pub(crate) levels: TransitionLevels,
    pub(crate) channel: Option<usize>,
    pub(crate) placement: Placement,
    pub(crate) phase: Phase,
}

impl PulseCommon {
    fn new(angular_frequency: f64, amplitude: f64, levels: TransitionLevels) -> Result<Self> {
        Ok(Self {
            angular_frequency: AngularFrequency::new(angular_frequency)?,
            amplitude: Amplitude::new(amplitude)?,
            levels,
            channel: None,
            placement: Placement::default(),
            phase: Phase::ZERO,
        })
    }
}

fn positive_time(value: f64, what: &str) -> Result<Time> {
    let time = Time::new(value)?;
    if time <= Time::ZERO {
        return Err(Error::InvalidPulseParameter(format!(
            "Invalid {what} {value}, must be positive"
        )));
    }
    Ok(time)
}

macro_rules! impl_common_setters {
    ($t:ident) => {
        impl $t {
            /// Drive line index, checked against the sequence's channel count on
            /// append.
            #[must_use]
            pub fn with_channel(mut self, channel: usize) -> Self {
                self.common.channel = Some(channel);
                self
            }

            /// Start `offset` after the cursor. Ignored when an explicit start is
            /// set.
            ///
            /// # Errors
            ///
            /// Returns an error if `offset` is not finite.
            pub fn with_offset(mut self, offset: f64) -> Result<Self> {
                self.common.placement.offset = Time::new(offset)?;
                Ok(self)
            }

            /// Start at an absolute time instead of at the cursor.
            ///
            /// # Errors
            ///
            /// Returns an error if `start` is not finite.
            pub fn with_start(mut self, start: f64) -> Result<Self> {
                self.common.placement.start = Some(Time::new(start)?);
                Ok(self)
            }

            /// Carrier phase in radians.
            ///
            /// # Errors
            ///
            /// Returns an error if `phase` is not finite.
            pub fn with_phase(mut self, phase: f64) -> Result<Self> {
                self.common.phase = Phase::new(phase)?;
                Ok(self)
            }
        }
    };
}

/// Flat-top pulse with `sin²` ramps, or a caller supplied envelope.
#[derive(Clone)]
pub struct ConstPulse {
    pub(crate) common: PulseCommon,
    pub(crate) duration: Time,
    pub(crate) rise_time: Option<Time>,
    pub(crate) envelope: Option<SharedEnvelopeFn>,
}

impl ConstPulse {
    /// # Errors
    ///
    /// Returns an error if a value is not finite or `duration` is not positive.
    pub fn new(
        angular_frequency: f64,
        amplitude: f64,
        duration: f64,
        levels: impl Into<TransitionLevels>,
    ) -> Result<Self> {
        Ok(Self {
            common: PulseCommon::new(angular_frequency, amplitude, levels.into())?,
            duration: positive_time(duration, "duration")?,
            rise_time: None,
            envelope: None,
        })
    }

    /// # Errors
    ///
    /// Returns an error if `rise_time` is negative or not finite, or if a
    /// custom envelope was set.
    pub fn with_rise_time(mut self, rise_time: f64) -> Result<Self> {
        let rise_time = Time::new(rise_time)?;
        if rise_time < Time::ZERO {
            return Err(Error::InvalidPulseParameter(format!(
                "Invalid rise_time {rise_time}"
            )));
        }
        if self.envelope.is_some() {
            return Err(Error::InvalidPulseParameter(
                "rise_time has no effect on a custom envelope".into(),
            ));
        }
        self.rise_time = Some(rise_time);
        Ok(self)
    }

    /// Replaces the ramped box by `envelope`, evaluated at absolute time. Pulses
    /// with a custom envelope have no expression.
    ///
    /// # Errors
    ///
    /// Returns an error if a rise time was set.
    pub fn with_envelope<E>(mut self, envelope: E) -> Result<Self>
    where
        E: EnvelopeFn + Send + Sync + 'static,
    {
        if self.rise_time.is_some() {
            return Err(Error::InvalidPulseParameter(
                "rise_time has no effect on a custom envelope".into(),
            ));
        }
        self.envelope = Some(Arc::new(envelope));
        Ok(self)
    }
}

impl_common_setters!(ConstPulse);

/// Gaussian pulse lasting `6 sigma`, peaked `2 sigma` after its start.
#[derive(Debug, Clone)]
pub struct GaussianPulse {
    pub(crate) common: PulseCommon,
    pub(crate) sigma: Time,
}

impl GaussianPulse {
    /// # Errors
    ///
    /// Returns an error if a value is not finite or `sigma` is not positive.
    pub fn new(
        angular_frequency: f64,
        amplitude: f64,
        sigma: f64,
        levels: impl Into<TransitionLevels>,
    ) -> Result<Self> {
        Ok(Self {
            common: PulseCommon::new(angular_frequency, amplitude, levels.into())?,
            sigma: positive_time(sigma, "sigma")?,
        })
    }
}

impl_common_setters!(GaussianPulse);

/// Pulse with sampled in-phase and quadrature envelopes.
///
/// The envelopes are read at absolute time, like the carrier. The last sample
/// time is the pulse duration.
#[derive(Debug, Clone)]
pub struct IqPulse {
    pub(crate) common: PulseCommon,
    pub(crate) duration: Time,
    pub(crate) i: Arc<LinearInterp>,
    pub(crate) q: Arc<LinearInterp>,
}

impl IqPulse {
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the arrays differ in length, have
    /// fewer than two samples or `times` is not strictly increasing, and
    /// [`Error::InvalidPulseParameter`] if the last sample time is not positive.
    pub fn new(
        angular_frequency: f64,
        amplitude: f64,
        levels: impl Into<TransitionLevels>,
        times: &[f64],
        i_values: &[f64],
        q_values: &[f64],
    ) -> Result<Self> {
        let common = PulseCommon::new(angular_frequency, amplitude, levels.into())?;
        if i_values.len() != q_values.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} I values but {} Q values",
                i_values.len(),
                q_values.len()
            )));
        }
        let i = LinearInterp::new(times, i_values)?;
        let q = LinearInterp::new(times, q_values)?;
        let duration = positive_time(i.domain().1, "duration")?;
        Ok(Self {
            common,
            duration,
            i: Arc::new(i),
            q: Arc::new(q),
        })
    }
}

impl_common_setters!(IqPulse);

/// Modulated drive of one pulse, `t -> value`.
///
/// Scalar envelopes give `A e(t) sin(ωt - φ)`, I/Q envelopes give
/// `A I(t) sin(ωt - φ) + A Q(t) cos(ωt - φ)`.
#[derive(Debug, Clone)]
pub struct Drive {
    envelope: Envelope,
    amplitude: f64,
    omega: f64,
    phase: f64,
}

impl Drive {
    pub(crate) fn new(
        envelope: Envelope,
        amplitude: Amplitude,
        angular_frequency: AngularFrequency,
        phase: Phase,
    ) -> Self {
        Self {
            envelope,
            amplitude: amplitude.value(),
            omega: angular_frequency.value(),
            phase: phase.value(),
        }
    }

    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[must_use]
    pub fn eval(&self, t: f64) -> f64 {
        // Same operation order as the rendered expression `A*sin(w*t-p)*e`.
        #[expect(clippy::suboptimal_flops, reason = "Must match the expression")]
        let arg = self.omega * t - self.phase;
        match self.envelope.value(t) {
            EnvelopeValue::Scalar(e) => self.amplitude * arg.sin() * e,
            EnvelopeValue::Iq { i, q } => {
                let (sin, cos) = arg.sin_cos();
                self.amplitude * i * sin + self.amplitude * q * cos
            }
        }
    }

    /// Evaluates every element of `times`, keeping its shape.
    pub fn sample<S, D>(&self, times: &ArrayBase<S, D>) -> Array<f64, D>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        times.mapv(|t| self.eval(t))
    }
}

/// Sum of the drives of every pulse appended before it was taken.
///
/// Later appends to the sequence don't change an existing `TotalDrive`.
#[derive(Debug, Clone)]
pub struct TotalDrive(Arc<[Drive]>);

impl TotalDrive {
    pub(crate) fn new(drives: impl IntoIterator<Item = Drive>) -> Self {
        Self(drives.into_iter().collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn eval(&self, t: f64) -> f64 {
        self.0.iter().map(|d| d.eval(t)).sum()
    }

    /// Evaluates every element of `times` in parallel, keeping its shape.
    pub fn sample<S, D>(&self, times: &ArrayBase<S, D>) -> Array<f64, D>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        Zip::from(times).par_map_collect(|&t| self.eval(t))
    }

    /// Evaluates a list of time points in parallel.
    #[must_use]
    pub fn sample_slice(&self, times: &[f64]) -> Vec<f64> {
        times.par_iter().map(|&t| self.eval(t)).collect()
    }
}

/// Immutable ledger entry for one appended pulse.
#[derive(Debug, Clone)]
pub struct PulseRecord {
    pub(crate) index: usize,
    pub(crate) levels: TransitionLevels,
    pub(crate) channel: usize,
    pub(crate) angular_frequency: AngularFrequency,
    pub(crate) amplitude: Amplitude,
    pub(crate) phase: Phase,
    pub(crate) start_time: Time,
    pub(crate) duration: Time,
    pub(crate) end_time: Time,
    pub(crate) expression: Option<Expr>,
    pub(crate) drive: Drive,
}

impl PulseRecord {
    /// Position in the sequence, starting at 0.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn transition_levels(&self) -> &TransitionLevels {
        &self.levels
    }

    #[must_use]
    pub const fn channel(&self) -> usize {
        self.channel
    }

    #[must_use]
    pub const fn angular_frequency(&self) -> AngularFrequency {
        self.angular_frequency
    }

    /// Carrier frequency in cycles per time unit.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.angular_frequency.real()
    }

    #[must_use]
    pub const fn amplitude(&self) -> Amplitude {
        self.amplitude
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn start_time(&self) -> Time {
        self.start_time
    }

    #[must_use]
    pub const fn duration(&self) -> Time {
        self.duration
    }

    #[must_use]
    pub const fn end_time(&self) -> Time {
        self.end_time
    }

    #[must_use]
    pub const fn envelope(&self) -> &Envelope {
        self.drive.envelope()
    }

    /// Closed-form drive, present only for built-in box pulses.
    #[must_use]
    pub const fn expression(&self) -> Option<&Expr> {
        self.expression.as_ref()
    }

    #[must_use]
    pub const fn drive(&self) -> &Drive {
        &self.drive
    }
}
