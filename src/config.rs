use crate::{
    error::{Error, Result},
    quant::Time,
};

/// Sequence-wide settings fixed at construction.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    channel_count: usize,
    start_time: Time,
    default_channel: usize,
    default_rise_time: Time,
}

#[derive(Debug, Clone)]
pub struct SequenceConfigBuilder(SequenceConfig);

impl SequenceConfig {
    #[must_use]
    pub fn builder() -> SequenceConfigBuilder {
        SequenceConfigBuilder::new()
    }

    /// Number of drive lines. Valid channel indices are `0..channel_count`.
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Initial value of the time cursor.
    #[must_use]
    pub const fn start_time(&self) -> Time {
        self.start_time
    }

    /// Channel used by pulses that don't set one.
    #[must_use]
    pub const fn default_channel(&self) -> usize {
        self.default_channel
    }

    /// Ramp time used by box pulses that don't set one.
    #[must_use]
    pub const fn default_rise_time(&self) -> Time {
        self.default_rise_time
    }

    pub(crate) fn check_channel(&self, channel: usize) -> Result<()> {
        if channel >= self.channel_count {
            return Err(Error::InvalidChannel {
                channel,
                channel_count: self.channel_count,
            });
        }
        Ok(())
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            channel_count: 4,
            start_time: Time::ZERO,
            default_channel: 1,
            default_rise_time: Time::ONE,
        }
    }
}

impl SequenceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_count(&mut self, channel_count: usize) -> &mut Self {
        self.0.channel_count = channel_count;
        self
    }

    pub fn start_time(&mut self, start_time: Time) -> &mut Self {
        self.0.start_time = start_time;
        self
    }

    pub fn default_channel(&mut self, default_channel: usize) -> &mut Self {
        self.0.default_channel = default_channel;
        self
    }

    pub fn default_rise_time(&mut self, default_rise_time: Time) -> &mut Self {
        self.0.default_rise_time = default_rise_time;
        self
    }

    fn validate(&self) -> Result<()> {
        let v = &self.0;
        if v.channel_count == 0 {
            return Err(Error::InvalidPulseParameter(
                "channel_count must be at least 1".into(),
            ));
        }
        v.check_channel(v.default_channel)?;
        if v.default_rise_time < Time::ZERO {
            return Err(Error::InvalidPulseParameter(format!(
                "Invalid default_rise_time {}",
                v.default_rise_time
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if there are no channels, the default channel is out of range or
    /// the default rise time is negative.
    pub fn build(&self) -> Result<SequenceConfig> {
        self.validate()?;
        Ok(self.0.clone())
    }
}

impl Default for SequenceConfigBuilder {
    fn default() -> Self {
        Self(SequenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SequenceConfig::default();
        assert_eq!(config.channel_count(), 4);
        assert_eq!(config.start_time(), Time::ZERO);
        assert_eq!(config.default_channel(), 1);
        assert_eq!(config.default_rise_time().value(), 1.0);
    }

    #[test]
    fn builder_validates() {
        assert!(matches!(
            SequenceConfig::builder().channel_count(0).build(),
            Err(Error::InvalidPulseParameter(_))
        ));
        assert_eq!(
            SequenceConfig::builder()
                .channel_count(2)
                .default_channel(2)
                .build()
                .unwrap_err(),
            Error::InvalidChannel {
                channel: 2,
                channel_count: 2
            }
        );
        let config = SequenceConfig::builder()
            .channel_count(8)
            .default_channel(7)
            .start_time(Time::new(5.0).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.channel_count(), 8);
        assert_eq!(config.start_time().value(), 5.0);
    }
}
