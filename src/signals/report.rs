// =============================================================================
// Signal Report: the engine's only externally visible artifact
// =============================================================================
//
// Captures the score, the verdict and every reason behind it so a
// presentation layer can render the decision without recomputing anything.
// Holds no timestamps of its own: identical bars give an identical report.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::rules::ScoringResult;
use super::verdict::Verdict;
use crate::levels::{Level, LevelBook};
use crate::market_data::InstrumentMeta;
use crate::patterns::Pattern;
use crate::types::Timeframe;
use crate::zones::{Zone, ZoneSet};

/// Stop-loss / take-profit pair for a long position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEnvelope {
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Stop is anchored under a demand zone rather than a plain ATR offset.
    pub zone_anchored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    /// Instrument annotation from the data provider.  Never scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<InstrumentMeta>,

    pub timeframe: Timeframe,

    /// Close of the last bar.
    pub price: f64,

    /// Percent change against the previous close; `None` when undefined.
    pub change_pct: Option<f64>,

    /// Last volume over the preceding 20-bar average; `None` when undefined.
    pub relative_volume: Option<f64>,

    pub score: i32,
    pub verdict: Verdict,
    pub strategy: String,
    pub advice: String,

    pub bullish_reasons: Vec<String>,
    pub bearish_reasons: Vec<String>,

    /// Clauses skipped because an input was undefined.
    pub notes: Vec<String>,

    pub stop_loss: f64,
    pub take_profit: f64,

    pub pattern: Pattern,

    pub supports: Vec<Level>,
    pub resistances: Vec<Level>,

    pub demand_zones: Vec<Zone>,
    pub supply_zones: Vec<Zone>,
}

/// Pieces the engine has resolved for one evaluation.
pub struct ReportParts {
    pub instrument: Option<InstrumentMeta>,
    pub timeframe: Timeframe,
    pub price: f64,
    pub change_pct: Option<f64>,
    pub relative_volume: Option<f64>,
    pub scoring: ScoringResult,
    pub verdict: Verdict,
    pub risk: RiskEnvelope,
    pub pattern: Pattern,
    pub levels: LevelBook,
    pub zones: ZoneSet,
}

impl SignalReport {
    pub fn assemble(parts: ReportParts) -> Self {
        let advice = parts.verdict.advice(&parts.scoring);
        let ScoringResult {
            score,
            bullish_reasons,
            bearish_reasons,
            notes,
            ..
        } = parts.scoring;

        Self {
            instrument: parts.instrument,
            timeframe: parts.timeframe,
            price: parts.price,
            change_pct: parts.change_pct,
            relative_volume: parts.relative_volume,
            score,
            verdict: parts.verdict,
            strategy: parts.verdict.strategy().to_string(),
            advice,
            bullish_reasons,
            bearish_reasons,
            notes,
            stop_loss: parts.risk.stop_loss,
            take_profit: parts.risk.take_profit,
            pattern: parts.pattern,
            supports: parts.levels.supports,
            resistances: parts.levels.resistances,
            demand_zones: parts.zones.demand,
            supply_zones: parts.zones.supply,
        }
    }

    /// One-line summary for logs and terminals.
    pub fn headline(&self) -> String {
        let name = self
            .instrument
            .as_ref()
            .map(|m| m.symbol.as_str())
            .unwrap_or("?");
        format!(
            "{name} [{}] {:.2} | score {:+} | {} | SL {:.2} | TP {:.2}",
            self.timeframe, self.price, self.score, self.verdict, self.stop_loss, self.take_profit
        )
    }
}
