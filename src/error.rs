use thiserror::Error;

use crate::quant::Time;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid {what}: {value} is not finite")]
    NotFinite { what: &'static str, value: f64 },
    #[error("Invalid channel {channel}, sequence has {channel_count} channels")]
    InvalidChannel { channel: usize, channel_count: usize },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Invalid pulse parameter: {0}")]
    InvalidPulseParameter(String),
    #[error("Channel {channel} contains pulse {index} (start {start}) without an expression")]
    UnsupportedAggregation {
        channel: usize,
        index: usize,
        start: Time,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
