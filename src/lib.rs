//! Time-domain drive pulse sequences for quantum system simulation.
//!
//! A [`PulseSequence`] appends pulses in time order while tracking a time
//! cursor. Every pulse becomes an immutable [`PulseRecord`] holding its
//! metadata and its modulated [`Drive`]. Ramped box pulses also carry an
//! equivalent closed-form [`Expr`] for solvers that compile string
//! expressions.
//!
//! ```
//! use std::f64::consts::TAU;
//!
//! use pulse_sequence::{ConstPulse, PulseSequence};
//!
//! let mut seq = PulseSequence::new();
//! seq.const_pulse(
//!     ConstPulse::new(TAU * 5.0, 0.1, 20.0, ("1", "0"))?
//!         .with_rise_time(2.0)?,
//! )?;
//! seq.wait(5.0)?;
//! seq.const_pulse(ConstPulse::new(TAU * 5.0, 0.1, 10.0, ("0", "1"))?)?;
//! assert_eq!(seq.cursor().value(), 35.0);
//!
//! let drive = seq.total_drive();
//! let _ = drive.eval(12.0);
//! let per_channel = seq.channel_expressions()?;
//! assert_eq!(per_channel[0], "0");
//! # Ok::<(), pulse_sequence::Error>(())
//! ```
mod config;
mod envelope;
mod error;
mod pulse;
mod quant;
mod sequence;
mod symbolic;

pub use config::{SequenceConfig, SequenceConfigBuilder};
pub use envelope::{
    BoxRamp, Envelope, EnvelopeFn, EnvelopeValue, Gaussian, IqInterpolated, LinearInterp,
    SharedEnvelopeFn,
};
pub use error::{Error, Result};
pub use pulse::{ConstPulse, Drive, GaussianPulse, IqPulse, PulseRecord, TotalDrive};
pub use quant::{Amplitude, AngularFrequency, Level, Phase, Time, TransitionLevels};
pub use sequence::PulseSequence;
pub use symbolic::{Expr, heaviside};
