use float_cmp::approx_eq;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools as _;
use log::{debug, warn};

use crate::{
    config::SequenceConfig,
    envelope::{BoxRamp, Envelope, Gaussian, IqInterpolated},
    error::{Error, Result},
    pulse::{ConstPulse, Drive, GaussianPulse, IqPulse, PulseCommon, PulseRecord, TotalDrive},
    quant::{Amplitude, AngularFrequency, Time, TransitionLevels},
    symbolic::{self, Expr},
};

/// Builder of a time-ordered pulse sequence.
///
/// Each append resolves its start from the time cursor (or an explicit start),
/// adds one immutable [`PulseRecord`] and moves the cursor to the end of that
/// pulse. Appends take `&mut self`; share a finished sequence, or the
/// [`TotalDrive`] and views taken from it, for concurrent reads.
#[derive(Debug, Clone)]
pub struct PulseSequence {
    config: SequenceConfig,
    cursor: Time,
    records: Vec<PulseRecord>,
}

struct Appended {
    duration: Time,
    envelope: Envelope,
    expression: Option<Expr>,
}

impl PulseSequence {
    /// Empty sequence with the default configuration: 4 channels, cursor at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SequenceConfig) -> Self {
        Self {
            cursor: config.start_time(),
            config,
            records: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// End of the sequence so far.
    #[must_use]
    pub const fn cursor(&self) -> Time {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[PulseRecord] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, index: usize) -> Option<&PulseRecord> {
        self.records.get(index)
    }

    /// Advances the cursor by `duration` without driving anything.
    ///
    /// # Errors
    ///
    /// Returns an error if `duration` is negative or not finite, or if the
    /// cursor would overflow.
    pub fn wait(&mut self, duration: f64) -> Result<()> {
        let duration = Time::new(duration)?;
        if duration < Time::ZERO {
            return Err(Error::InvalidPulseParameter(format!(
                "Invalid wait duration {duration}"
            )));
        }
        self.cursor = self.cursor.checked_add(duration)?;
        debug!("wait {duration}, cursor at {}", self.cursor);
        Ok(())
    }

    /// Appends a box pulse with `sin²` ramps, or with the pulse's custom
    /// envelope. Only the ramped box gets an expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of range or a time overflows.
    /// A rise time longer than the pulse, including the configured default
    /// applied to a short pulse, is rejected with
    /// [`Error::InvalidPulseParameter`]: such a pulse would end partway up
    /// its ramp, with no flat top or ramp down.
    pub fn const_pulse(&mut self, pulse: ConstPulse) -> Result<&PulseRecord> {
        let ConstPulse {
            common,
            duration,
            rise_time,
            envelope,
        } = pulse;
        let rise_time = rise_time.unwrap_or_else(|| self.config.default_rise_time());
        if envelope.is_none() {
            BoxRamp::check(duration, rise_time)?;
        }
        let (amplitude, omega, phase) = (
            common.amplitude.value(),
            common.angular_frequency.value(),
            common.phase.value(),
        );
        self.append(common, |start| {
            Ok(match envelope {
                Some(custom) => Appended {
                    duration,
                    envelope: Envelope::Custom(custom),
                    expression: None,
                },
                None => {
                    let ramp = BoxRamp::new(start, duration, rise_time);
                    let env = symbolic::box_ramp_envelope(&ramp);
                    Appended {
                        duration,
                        envelope: Envelope::BoxRamp(ramp),
                        expression: Some(symbolic::modulated(amplitude, omega, phase, env)),
                    }
                }
            })
        })
    }

    /// Appends a Gaussian pulse of `6 sigma`, peaked at `start + 2 sigma`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of range or a time overflows.
    pub fn gaussian_pulse(&mut self, pulse: GaussianPulse) -> Result<&PulseRecord> {
        let GaussianPulse { common, sigma } = pulse;
        self.append(common, |start| {
            let gaussian = Gaussian::new(start, sigma)?;
            Ok(Appended {
                duration: gaussian.duration(),
                envelope: Envelope::Gaussian(gaussian),
                expression: None,
            })
        })
    }

    /// Appends a pulse driven by interpolated I and Q envelopes, read at
    /// absolute time.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of range or a time overflows.
    pub fn pulse_iq(&mut self, pulse: IqPulse) -> Result<&PulseRecord> {
        let IqPulse {
            common,
            duration,
            i,
            q,
        } = pulse;
        self.append(common, |_| {
            Ok(Appended {
                duration,
                envelope: Envelope::IqInterpolated(IqInterpolated::new(i, q)),
                expression: None,
            })
        })
    }

    /// Exponential-form I/Q pulse, `(i I(t) + Q(t)) e^{-iωt}/2` plus its
    /// conjugate. Its real drive is the same as [`Self::pulse_iq`].
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is out of range or a time overflows.
    pub fn pulse_iq_exp(&mut self, pulse: IqPulse) -> Result<&PulseRecord> {
        self.pulse_iq(pulse)
    }

    fn append(
        &mut self,
        common: PulseCommon,
        build: impl FnOnce(Time) -> Result<Appended>,
    ) -> Result<&PulseRecord> {
        let PulseCommon {
            angular_frequency,
            amplitude,
            levels,
            channel,
            placement,
            phase,
        } = common;
        let channel = channel.unwrap_or_else(|| self.config.default_channel());
        self.config.check_channel(channel)?;
        let start_time = placement.resolve(self.cursor)?;
        let Appended {
            duration,
            envelope,
            expression,
        } = build(start_time)?;
        let end_time = start_time.checked_add(duration)?;

        if let Some(prev) = self.records.iter().rev().find(|r| r.channel == channel) {
            let prev_end = prev.end_time().value();
            let start = start_time.value();
            if start < prev_end && !approx_eq!(f64, start, prev_end, ulps = 4) {
                warn!(
                    "Pulse {} on channel {channel} starts at {start_time}, before pulse {} ends at {prev_end}",
                    self.records.len(),
                    prev.index
                );
            }
        }

        let index = self.records.len();
        debug!(
            "Pulse {index} {envelope:?} on channel {channel}, {levels}, start {start_time} ({}), duration {duration}",
            if placement.is_explicit() { "explicit" } else { "from cursor" }
        );
        self.records.push(PulseRecord {
            index,
            levels,
            channel,
            angular_frequency,
            amplitude,
            phase,
            start_time,
            duration,
            end_time,
            expression,
            drive: Drive::new(envelope, amplitude, angular_frequency, phase),
        });
        self.cursor = end_time;
        Ok(&self.records[index])
    }

    /// Drive of the whole sequence, summed over all pulses and channels.
    #[must_use]
    pub fn total_drive(&self) -> TotalDrive {
        TotalDrive::new(self.records.iter().map(|r| r.drive.clone()))
    }

    /// One expression per channel: `"0"` followed by `+<expr>` for each pulse
    /// on that channel, in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedAggregation`] if any pulse has no expression
    /// (Gaussian, I/Q or custom envelope pulses).
    pub fn channel_expressions(&self) -> Result<Vec<String>> {
        let mut channels = vec![vec!["0".to_owned()]; self.config.channel_count()];
        for r in &self.records {
            let expr = r.expression.as_ref().ok_or(Error::UnsupportedAggregation {
                channel: r.channel,
                index: r.index,
                start: r.start_time,
            })?;
            channels[r.channel].push(expr.to_string());
        }
        Ok(channels.into_iter().map(|terms| terms.join("+")).collect())
    }

    /// Duration of the most recently appended pulse.
    #[must_use]
    pub fn last_duration(&self) -> Option<Time> {
        self.records.last().map(|r| r.duration)
    }

    #[must_use]
    pub fn transitions(&self) -> Vec<TransitionLevels> {
        self.records.iter().map(|r| r.levels.clone()).collect()
    }

    #[must_use]
    pub fn channels(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.channel).collect()
    }

    /// Carrier frequencies in cycles per time unit.
    #[must_use]
    pub fn frequencies(&self) -> Vec<f64> {
        self.records.iter().map(PulseRecord::frequency).collect()
    }

    #[must_use]
    pub fn angular_frequencies(&self) -> Vec<AngularFrequency> {
        self.records.iter().map(|r| r.angular_frequency).collect()
    }

    #[must_use]
    pub fn amplitudes(&self) -> Vec<Amplitude> {
        self.records.iter().map(|r| r.amplitude).collect()
    }

    #[must_use]
    pub fn durations(&self) -> Vec<Time> {
        self.records.iter().map(|r| r.duration).collect()
    }

    #[must_use]
    pub fn start_times(&self) -> Vec<Time> {
        self.records.iter().map(|r| r.start_time).collect()
    }

    #[must_use]
    pub fn envelopes(&self) -> Vec<&Envelope> {
        self.records.iter().map(PulseRecord::envelope).collect()
    }

    #[must_use]
    pub fn drives(&self) -> Vec<&Drive> {
        self.records.iter().map(PulseRecord::drive).collect()
    }

    /// Each transition once, in order of first use.
    #[must_use]
    pub fn distinct_transitions(&self) -> Vec<TransitionLevels> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| &r.levels)
            .filter(|levels| seen.insert(*levels))
            .cloned()
            .collect()
    }

    /// Channel of the first pulse on each transition.
    #[must_use]
    pub fn channels_by_transition(&self) -> HashMap<TransitionLevels, usize> {
        self.first_by_transition(|r| r.channel)
    }

    /// Frequency (cycles per time unit) of the first pulse on each transition.
    #[must_use]
    pub fn frequencies_by_transition(&self) -> HashMap<TransitionLevels, f64> {
        self.first_by_transition(PulseRecord::frequency)
    }

    /// Amplitude of the first pulse on each transition.
    #[must_use]
    pub fn amplitudes_by_transition(&self) -> HashMap<TransitionLevels, Amplitude> {
        self.first_by_transition(|r| r.amplitude)
    }

    /// Later pulses on a transition never replace the first one's value.
    fn first_by_transition<T>(&self, f: impl Fn(&PulseRecord) -> T) -> HashMap<TransitionLevels, T> {
        let mut map = HashMap::new();
        for r in &self.records {
            map.entry(r.levels.clone()).or_insert_with(|| f(r));
        }
        map
    }

    /// Records on `channel`, in sequence order.
    pub fn records_on(&self, channel: usize) -> impl Iterator<Item = &PulseRecord> {
        self.records.iter().filter(move |r| r.channel == channel)
    }

    /// Number of pulses on each channel.
    #[must_use]
    pub fn channel_counts(&self) -> Vec<usize> {
        let counts = self.records.iter().counts_by(|r| r.channel);
        (0..self.config.channel_count())
            .map(|c| counts.get(&c).copied().unwrap_or_default())
            .collect()
    }
}

impl Default for PulseSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SequenceConfig> for PulseSequence {
    fn from(config: SequenceConfig) -> Self {
        Self::with_config(config)
    }
}
