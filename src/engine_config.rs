// =============================================================================
// Engine Configuration: tunable thresholds with atomic save
// =============================================================================
//
// Every heuristic cut point used by the engine lives here: zone sizing, level
// merge tolerance, scoring thresholds, verdict bands and the risk envelope.
// Indicator windows (EMA20/50/200, RSI14, ...) are fixed and not configurable.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EngineError;
use crate::indicators::series::ATR_PERIOD;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_min_bars() -> usize {
    50
}

fn default_swing_strength() -> usize {
    2
}

fn default_zone_atr_buffer() -> f64 {
    0.25
}

fn default_zone_max_distance_pct() -> f64 {
    25.0
}

fn default_merge_tolerance_pct() -> f64 {
    1.0
}

fn default_level_max_distance_pct() -> f64 {
    30.0
}

fn default_max_levels() -> usize {
    4
}

fn default_vip_labels() -> Vec<String> {
    vec!["EMA200".to_string()]
}

fn default_adx_trend_threshold() -> f64 {
    25.0
}

fn default_rsi_trend_strength() -> f64 {
    75.0
}

fn default_rsi_trend_dip() -> f64 {
    45.0
}

fn default_rsi_overbought() -> f64 {
    65.0
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_high_volume_ratio() -> f64 {
    1.5
}

fn default_panic_volume_ratio() -> f64 {
    2.5
}

fn default_panic_score() -> i32 {
    -10
}

fn default_obv_slope_threshold() -> f64 {
    0.05
}

fn default_confluence_tolerance_pct() -> f64 {
    1.0
}

fn default_band_aggressive_buy() -> i32 {
    6
}

fn default_band_accumulate() -> i32 {
    4
}

fn default_band_wait() -> i32 {
    1
}

fn default_band_avoid() -> i32 {
    -4
}

fn default_stop_atr_multiplier() -> f64 {
    2.0
}

fn default_zone_stop_atr_buffer() -> f64 {
    0.5
}

fn default_take_profit_atr_multiplier() -> f64 {
    3.0
}

// =============================================================================
// ZoneParams
// =============================================================================

/// Supply/demand zone detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneParams {
    /// Bars on each side a swing extreme must beat.
    #[serde(default = "default_swing_strength")]
    pub swing_strength: usize,

    /// Zone thickness as a multiple of ATR at the swing bar.
    #[serde(default = "default_zone_atr_buffer")]
    pub atr_buffer: f64,

    /// Zones whose midpoint is further than this (percent of price) are dropped.
    #[serde(default = "default_zone_max_distance_pct")]
    pub max_distance_pct: f64,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            swing_strength: default_swing_strength(),
            atr_buffer: default_zone_atr_buffer(),
            max_distance_pct: default_zone_max_distance_pct(),
        }
    }
}

// =============================================================================
// LevelParams
// =============================================================================

/// Support/resistance aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    /// Candidates closer than this (percent of price) merge into one level.
    #[serde(default = "default_merge_tolerance_pct")]
    pub merge_tolerance_pct: f64,

    /// Alternative tolerance in ATR multiples; the larger of the two applies.
    /// 0 disables it.
    #[serde(default)]
    pub merge_tolerance_atr: f64,

    /// Candidates further than this (percent of price) are not reported.
    #[serde(default = "default_level_max_distance_pct")]
    pub max_distance_pct: f64,

    /// Levels reported per side.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,

    /// Labels exempt from the minimum-spacing merge.
    #[serde(default = "default_vip_labels")]
    pub vip_labels: Vec<String>,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            merge_tolerance_pct: default_merge_tolerance_pct(),
            merge_tolerance_atr: 0.0,
            max_distance_pct: default_level_max_distance_pct(),
            max_levels: default_max_levels(),
            vip_labels: default_vip_labels(),
        }
    }
}

// =============================================================================
// ScoringParams
// =============================================================================

/// Thresholds read by the rule table.  Weights are fixed in the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParams {
    /// ADX above this is a trending regime.
    #[serde(default = "default_adx_trend_threshold")]
    pub adx_trend_threshold: f64,

    /// In a trend, RSI above this confirms strength.
    #[serde(default = "default_rsi_trend_strength")]
    pub rsi_trend_strength: f64,

    /// In an uptrend, RSI below this is a buyable dip.
    #[serde(default = "default_rsi_trend_dip")]
    pub rsi_trend_dip: f64,

    /// In a range, RSI above this is overbought.
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// In a range, RSI below this is oversold.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// Relative volume at or above this counts as heavy.
    #[serde(default = "default_high_volume_ratio")]
    pub high_volume_ratio: f64,

    /// Relative volume at or above this on a down close is a panic.
    #[serde(default = "default_panic_volume_ratio")]
    pub panic_volume_ratio: f64,

    /// Score forced by the panic override.
    #[serde(default = "default_panic_score")]
    pub panic_score: i32,

    /// |OBV slope / average volume| needed to call a divergence.
    #[serde(default = "default_obv_slope_threshold")]
    pub obv_slope_threshold: f64,

    /// EMA50/EMA200 within this (percent of price) of a demand zone is confluence.
    #[serde(default = "default_confluence_tolerance_pct")]
    pub confluence_tolerance_pct: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            adx_trend_threshold: default_adx_trend_threshold(),
            rsi_trend_strength: default_rsi_trend_strength(),
            rsi_trend_dip: default_rsi_trend_dip(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            high_volume_ratio: default_high_volume_ratio(),
            panic_volume_ratio: default_panic_volume_ratio(),
            panic_score: default_panic_score(),
            obv_slope_threshold: default_obv_slope_threshold(),
            confluence_tolerance_pct: default_confluence_tolerance_pct(),
        }
    }
}

// =============================================================================
// VerdictBands
// =============================================================================

/// Lower bounds of the score bands, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictBands {
    #[serde(default = "default_band_aggressive_buy")]
    pub aggressive_buy: i32,

    #[serde(default = "default_band_accumulate")]
    pub accumulate: i32,

    #[serde(default = "default_band_wait")]
    pub wait: i32,

    /// Scores at or below this are "avoid" (or "panic exit").
    #[serde(default = "default_band_avoid")]
    pub avoid: i32,
}

impl Default for VerdictBands {
    fn default() -> Self {
        Self {
            aggressive_buy: default_band_aggressive_buy(),
            accumulate: default_band_accumulate(),
            wait: default_band_wait(),
            avoid: default_band_avoid(),
        }
    }
}

// =============================================================================
// RiskParams
// =============================================================================

/// Stop-loss / take-profit sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Stop distance below price when not inside a demand zone.
    #[serde(default = "default_stop_atr_multiplier")]
    pub stop_atr_multiplier: f64,

    /// Stop distance below the demand zone bottom.
    #[serde(default = "default_zone_stop_atr_buffer")]
    pub zone_stop_atr_buffer: f64,

    /// Target distance above price.
    #[serde(default = "default_take_profit_atr_multiplier")]
    pub take_profit_atr_multiplier: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_atr_multiplier: default_stop_atr_multiplier(),
            zone_stop_atr_buffer: default_zone_stop_atr_buffer(),
            take_profit_atr_multiplier: default_take_profit_atr_multiplier(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the signal engine.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Series shorter than this are refused outright.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    #[serde(default)]
    pub zones: ZoneParams,

    #[serde(default)]
    pub levels: LevelParams,

    #[serde(default)]
    pub scoring: ScoringParams,

    #[serde(default)]
    pub bands: VerdictBands,

    #[serde(default)]
    pub risk: RiskParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bars: default_min_bars(),
            zones: ZoneParams::default(),
            levels: LevelParams::default(),
            scoring: ScoringParams::default(),
            bands: VerdictBands::default(),
            risk: RiskParams::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("engine config at {} is invalid", path.display()))?;

        info!(
            path = %path.display(),
            min_bars = config.min_bars,
            panic_volume_ratio = config.scoring.panic_volume_ratio,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Reject tunables that would make the engine meaningless.
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        let fail = |msg: String| -> std::result::Result<(), EngineError> {
            Err(EngineError::InvalidConfig(msg))
        };

        if self.min_bars < ATR_PERIOD + 1 {
            return fail(format!(
                "min_bars must be at least {} (ATR window), got {}",
                ATR_PERIOD + 1,
                self.min_bars
            ));
        }
        if self.zones.swing_strength == 0 {
            return fail("zones.swing_strength must be >= 1".into());
        }

        let positive = [
            ("zones.atr_buffer", self.zones.atr_buffer),
            ("zones.max_distance_pct", self.zones.max_distance_pct),
            ("levels.merge_tolerance_pct", self.levels.merge_tolerance_pct),
            ("levels.max_distance_pct", self.levels.max_distance_pct),
            ("scoring.high_volume_ratio", self.scoring.high_volume_ratio),
            ("scoring.panic_volume_ratio", self.scoring.panic_volume_ratio),
            ("scoring.confluence_tolerance_pct", self.scoring.confluence_tolerance_pct),
            ("risk.stop_atr_multiplier", self.risk.stop_atr_multiplier),
            ("risk.take_profit_atr_multiplier", self.risk.take_profit_atr_multiplier),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return fail(format!("{name} must be a positive number, got {value}"));
            }
        }

        let non_negative = [
            ("levels.merge_tolerance_atr", self.levels.merge_tolerance_atr),
            ("scoring.obv_slope_threshold", self.scoring.obv_slope_threshold),
            ("risk.zone_stop_atr_buffer", self.risk.zone_stop_atr_buffer),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return fail(format!("{name} must be >= 0, got {value}"));
            }
        }

        if self.levels.max_levels == 0 {
            return fail("levels.max_levels must be >= 1".into());
        }
        if self.scoring.rsi_oversold >= self.scoring.rsi_overbought {
            return fail("scoring.rsi_oversold must be below scoring.rsi_overbought".into());
        }
        if self.scoring.high_volume_ratio > self.scoring.panic_volume_ratio {
            return fail("scoring.high_volume_ratio must not exceed scoring.panic_volume_ratio".into());
        }

        let b = &self.bands;
        if !(b.aggressive_buy > b.accumulate && b.accumulate > b.wait && b.wait > b.avoid) {
            return fail(format!(
                "verdict bands must be strictly descending, got {} / {} / {} / {}",
                b.aggressive_buy, b.accumulate, b.wait, b.avoid
            ));
        }
        if self.scoring.panic_score > b.avoid {
            return fail(format!(
                "scoring.panic_score ({}) must fall in the avoid band (<= {})",
                self.scoring.panic_score, b.avoid
            ));
        }

        Ok(())
    }
}
