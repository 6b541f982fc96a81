//! Pure, side-effect-free indicator calculators.
//!
//! Every function here operates on a finite ordered slice of prices (or
//! high/low/close triples) and returns either a scalar (the latest value) or
//! a sequence aligned to the input minus its warmup. None of them hold
//! state across calls, and none of them produce `NaN` or `±∞` — division
//! guards return `InsufficientData` instead.
//!
//! Each indicator additionally exposes a *signal projection*: a mapping from
//! its latest value to `{direction, strength}` with the thresholds the
//! engine specifies.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod volume;

pub use adx::{AdxOutput, adx};
pub use atr::atr;
pub use bollinger::{BollingerBands, bollinger_bands};
pub use macd::{MacdOutput, macd};
pub use moving_average::{ema, sma};
pub use rsi::rsi;
pub use volume::{VolumeOutput, volume_profile};

use crate::domain::errors::EngineError;

/// Direction projected from an indicator's latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

/// An indicator's opinion: a direction and a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalProjection {
    pub direction: Direction,
    pub strength: f64,
}

impl SignalProjection {
    pub fn neutral() -> Self {
        Self {
            direction: Direction::Neutral,
            strength: 0.0,
        }
    }
}

pub(crate) fn require_len(len: usize, need: usize) -> Result<(), EngineError> {
    if len < need {
        Err(EngineError::InsufficientData { need, have: len })
    } else {
        Ok(())
    }
}
