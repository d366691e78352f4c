// =============================================================================
// Shared types used across the signal engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Directional leaning of a pattern, rule, or zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Default for Bias {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Which side of the current price a level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Support,
    Resistance,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Resistance => write!(f, "resistance"),
        }
    }
}

/// Bar interval of the series being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::Daily
    }
}

impl Timeframe {
    /// Interval code understood by the chart endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Weekly and longer bars: EMA200 defines the trend and cannot be skipped.
    pub fn is_weekly_or_longer(&self) -> bool {
        matches!(self, Self::Weekly | Self::Monthly)
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "d" | "daily" => Ok(Self::Daily),
            "1wk" | "w" | "weekly" => Ok(Self::Weekly),
            "1mo" | "m" | "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown timeframe '{other}' (expected 1d, 1wk or 1mo)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_parses_selector_codes() {
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("1WK".parse::<Timeframe>().unwrap(), Timeframe::Weekly);
        assert_eq!("monthly".parse::<Timeframe>().unwrap(), Timeframe::Monthly);
        assert!("4h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn timeframe_serialises_as_interval_code() {
        let json = serde_json::to_string(&Timeframe::Weekly).unwrap();
        assert_eq!(json, "\"1wk\"");
        assert!(Timeframe::Monthly.is_weekly_or_longer());
        assert!(!Timeframe::Daily.is_weekly_or_longer());
    }
}
