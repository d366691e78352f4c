// =============================================================================
// Verdict bands: score to verdict / strategy / advice
// =============================================================================

use serde::{Deserialize, Serialize};

use super::rules::ScoringResult;
use crate::engine_config::VerdictBands;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    AggressiveBuy,
    BuyTheDip,
    Accumulate,
    Wait,
    Reduce,
    FallingKnife,
    PanicExit,
}

impl Verdict {
    /// Step function over the score.  Monotonic: a higher score never maps
    /// to a more bearish band.
    pub fn from_score(score: i32, dip: bool, panic: bool, bands: &VerdictBands) -> Self {
        if score >= bands.aggressive_buy {
            Self::AggressiveBuy
        } else if score >= bands.accumulate {
            if dip {
                Self::BuyTheDip
            } else {
                Self::Accumulate
            }
        } else if score >= bands.wait {
            Self::Wait
        } else if score <= bands.avoid {
            if panic {
                Self::PanicExit
            } else {
                Self::FallingKnife
            }
        } else {
            Self::Reduce
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AggressiveBuy => "Aggressive Buy",
            Self::BuyTheDip => "Buy the Dip",
            Self::Accumulate => "Accumulate",
            Self::Wait => "Neutral / Wait",
            Self::Reduce => "Reduce / Bearish Pressure",
            Self::FallingKnife => "Falling Knife / Avoid",
            Self::PanicExit => "Panic Exit",
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::AggressiveBuy => "Trend Following",
            Self::BuyTheDip => "Buy on Weakness",
            Self::Accumulate => "Scale In Gradually",
            Self::Wait => "Wait for Confirmation",
            Self::Reduce => "Tighten Stops / Reduce Exposure",
            Self::FallingKnife => "Stay Out",
            Self::PanicExit => "Exit Immediately",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::AggressiveBuy | Self::BuyTheDip | Self::Accumulate)
    }

    fn headline(&self) -> &'static str {
        match self {
            Self::AggressiveBuy => "Trend, momentum and structure agree; entries on strength are supported",
            Self::BuyTheDip => "Uptrend intact and price is at a pullback worth buying",
            Self::Accumulate => "Bias is positive but not decisive; build the position in steps",
            Self::Wait => "Signals are mixed; wait for a clearer setup",
            Self::Reduce => "Sellers have the edge; protect open positions",
            Self::FallingKnife => "Price is falling hard; do not try to catch the bottom",
            Self::PanicExit => "Panic selling on extreme volume; exit before further damage",
        }
    }

    /// Advice text: the band headline followed by the reasons that drove it.
    pub fn advice(&self, scoring: &ScoringResult) -> String {
        let reasons: Vec<&str> = match self {
            Self::AggressiveBuy | Self::BuyTheDip | Self::Accumulate => {
                scoring.bullish_reasons.iter().map(String::as_str).collect()
            }
            Self::Wait => scoring
                .bullish_reasons
                .iter()
                .chain(scoring.bearish_reasons.iter())
                .map(String::as_str)
                .collect(),
            Self::Reduce | Self::FallingKnife | Self::PanicExit => {
                scoring.bearish_reasons.iter().map(String::as_str).collect()
            }
        };

        if reasons.is_empty() {
            format!("{}.", self.headline())
        } else {
            let top: Vec<&str> = reasons.into_iter().take(3).collect();
            format!("{}. Key factors: {}.", self.headline(), top.join("; "))
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
