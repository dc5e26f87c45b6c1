use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry threshold: |z| beyond this opens a position
pub const ENTRY_Z_THRESHOLD: f64 = 2.0;
/// Exit band: |z| strictly inside this closes a position
pub const EXIT_Z_BAND: f64 = 0.5;

/// Classified trading signal for one time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// Spread is cheap: buy the dependent leg, sell the independent leg
    Long,
    /// Spread is rich: sell the dependent leg, buy the independent leg
    Short,
    /// Spread has reverted near its mean
    Close,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Close => write!(f, "CLOSE"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// The three boolean signal flags carried by every spread point.
///
/// Long and short require a valid (large enough) spread move; close does not.
/// The long/short ranges never overlap the close band, so at most one flag
/// is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFlags {
    pub long: bool,
    pub short: bool,
    pub close: bool,
}

impl SignalFlags {
    pub fn evaluate(z_score: f64, valid_signal: bool) -> Self {
        Self {
            long: valid_signal && z_score < -ENTRY_Z_THRESHOLD,
            short: valid_signal && z_score > ENTRY_Z_THRESHOLD,
            close: z_score > -EXIT_Z_BAND && z_score < EXIT_Z_BAND,
        }
    }

    /// Collapse the flags into a single signal in priority order
    pub fn signal(&self) -> Signal {
        if self.long {
            Signal::Long
        } else if self.short {
            Signal::Short
        } else if self.close {
            Signal::Close
        } else {
            Signal::Hold
        }
    }
}

/// Classify a z-score. `valid_signal` gates LONG/SHORT only.
pub fn classify(z_score: f64, valid_signal: bool) -> Signal {
    SignalFlags::evaluate(z_score, valid_signal).signal()
}
