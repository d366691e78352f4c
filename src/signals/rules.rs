// =============================================================================
// Rule Table Scorer: additive signal scoring
// =============================================================================
//
// Every scoring heuristic is one row of `RULES`: a name and a pure function
// from the scoring context to an outcome.  Rows are evaluated once, in table
// order, and every firing row records its delta and reason.
//
// Effects:
//   Add(d)       score += d
//   Veto(d)      score = min(score, 0) + d   (erases bullish factors so far)
//   AddCap(d)    score += d, and the final score is capped at 0
//   Force(v)     the final score is v, whatever else fired
//
// Rows whose inputs are undefined are skipped with a note; they never
// contribute a penalty.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::engine_config::ScoringParams;
use crate::market_data::Bar;
use crate::patterns::{Pattern, PatternKind};
use crate::types::Bias;
use crate::zones::{Zone, ZoneSet};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything a rule may look at, resolved for the current bar.  Undefined
/// indicator values are `None`.
#[derive(Debug, Clone)]
pub struct ScoreContext<'a> {
    pub price: f64,
    pub bar: &'a Bar,
    pub previous_close: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub obv_slope: Option<f64>,
    pub volume_sma: Option<f64>,
    /// Current volume over the preceding 20-bar volume average.
    pub relative_volume: Option<f64>,
    pub pattern: &'a Pattern,
    pub zones: &'a ZoneSet,
    pub params: &'a ScoringParams,
}

impl ScoreContext<'_> {
    fn high_volume(&self) -> bool {
        self.relative_volume
            .is_some_and(|rv| rv >= self.params.high_volume_ratio)
    }

    /// Above EMA200 when it is defined, otherwise above EMA50.
    fn in_uptrend(&self) -> Option<bool> {
        self.ema200
            .or(self.ema50)
            .map(|ema| self.price > ema)
    }

    fn touched_demand(&self) -> Option<&Zone> {
        self.zones.demand_touching(self.bar).next()
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Effect {
    Add(i32),
    Veto(i32),
    AddCap(i32),
    Force(i32),
}

impl Effect {
    /// Signed weight used to file the reason as bullish or bearish.
    pub fn delta(&self) -> i32 {
        match self {
            Self::Add(d) | Self::Veto(d) | Self::AddCap(d) | Self::Force(d) => *d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub effect: Effect,
    pub reason: String,
    /// Counts as a "buy the dip" contributor.
    pub dip: bool,
}

impl Firing {
    fn add(delta: i32, reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Add(delta),
            reason: reason.into(),
            dip: false,
        }
    }

    fn dip(mut self) -> Self {
        self.dip = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Inputs defined, condition not met.
    Pass,
    /// A required input is undefined.
    Skipped(String),
    Fired(Firing),
}

pub struct Rule {
    pub name: &'static str,
    pub evaluate: fn(&ScoreContext<'_>) -> RuleOutcome,
}

/// The contribution of a single rule to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub rule: String,
    pub effect: Effect,
    pub bias: Bias,
    pub reason: String,
}

/// Result of one pass over the rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub score: i32,
    pub contributions: Vec<SignalContribution>,
    pub bullish_reasons: Vec<String>,
    pub bearish_reasons: Vec<String>,
    pub notes: Vec<String>,
    /// A dip-buying contributor fired.
    pub dip: bool,
    /// The panic override forced the score.
    pub panic: bool,
    /// A divergence capped the score at zero.
    pub capped: bool,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn trend_ema200(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let Some(ema) = ctx.ema200 else {
        return RuleOutcome::Skipped("EMA200 undefined: long-term trend not scored".into());
    };
    if ctx.price > ema {
        RuleOutcome::Fired(Firing::add(3, "Price above EMA200: long-term uptrend"))
    } else {
        RuleOutcome::Fired(Firing::add(-3, "Price below EMA200: long-term downtrend"))
    }
}

fn trend_ema50(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let Some(ema) = ctx.ema50 else {
        return RuleOutcome::Skipped("EMA50 undefined: medium-term trend not scored".into());
    };
    if ctx.price > ema {
        RuleOutcome::Fired(Firing::add(2, "Price above EMA50: medium-term strength"))
    } else {
        RuleOutcome::Fired(Firing::add(-1, "Price below EMA50: medium-term weakness"))
    }
}

fn candle_pattern(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let kind = ctx.pattern.kind;
    let name = kind.label();
    let firing = match kind {
        PatternKind::ThreeWhiteSoldiers | PatternKind::MorningStar => Firing::add(3, format!("{name} pattern")),
        PatternKind::ThreeBlackCrows | PatternKind::EveningStar => Firing::add(-3, format!("{name} pattern")),
        PatternKind::BullishEngulfing | PatternKind::Hammer => Firing::add(2, format!("{name} pattern")),
        PatternKind::BearishEngulfing | PatternKind::ShootingStar => Firing::add(-2, format!("{name} pattern")),
        PatternKind::BigBullishCandle if ctx.high_volume() => {
            Firing::add(2, "Big bullish candle on high volume: strong buying")
        }
        PatternKind::BigBullishCandle => Firing::add(1, "Big bullish candle"),
        PatternKind::BigBearishCandle if ctx.high_volume() => Firing {
            effect: Effect::Veto(-3),
            reason: "Big bearish candle on high volume: heavy distribution overrides bullish factors".into(),
            dip: false,
        },
        PatternKind::BigBearishCandle => Firing::add(-1, "Big bearish candle"),
        PatternKind::Doji | PatternKind::Normal | PatternKind::Indeterminate => return RuleOutcome::Pass,
    };
    let firing = if kind.is_dip_reversal() { firing.dip() } else { firing };
    RuleOutcome::Fired(firing)
}

fn macd_cross(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let (Some(macd), Some(signal)) = (ctx.macd, ctx.macd_signal) else {
        return RuleOutcome::Skipped("MACD undefined: momentum cross not scored".into());
    };
    if macd > signal {
        RuleOutcome::Fired(Firing::add(1, "MACD above signal line"))
    } else if macd < signal {
        RuleOutcome::Fired(Firing::add(-1, "MACD below signal line"))
    } else {
        RuleOutcome::Pass
    }
}

fn rsi_context(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let Some(rsi) = ctx.rsi else {
        return RuleOutcome::Skipped("RSI undefined: momentum regime not scored".into());
    };
    let Some(adx) = ctx.adx else {
        return RuleOutcome::Skipped("ADX undefined: RSI regime cannot be read".into());
    };
    let p = ctx.params;

    if adx > p.adx_trend_threshold {
        if rsi > p.rsi_trend_strength {
            return RuleOutcome::Fired(Firing::add(
                1,
                format!("RSI {rsi:.1} in a strong trend (ADX {adx:.1}): strength, not exhaustion"),
            ));
        }
        if rsi < p.rsi_trend_dip && ctx.in_uptrend() == Some(true) {
            return RuleOutcome::Fired(
                Firing::add(2, format!("RSI {rsi:.1} pulled back inside an uptrend: buyable dip")).dip(),
            );
        }
        return RuleOutcome::Pass;
    }

    if rsi > p.rsi_overbought {
        RuleOutcome::Fired(Firing::add(-1, format!("RSI {rsi:.1} overbought in a range")))
    } else if rsi < p.rsi_oversold {
        RuleOutcome::Fired(Firing::add(1, format!("RSI {rsi:.1} oversold in a range")))
    } else {
        RuleOutcome::Pass
    }
}

fn obv_divergence(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let (Some(slope), Some(avg), Some(ema20)) = (ctx.obv_slope, ctx.volume_sma, ctx.ema20) else {
        return RuleOutcome::Skipped("OBV slope undefined: volume divergence not scored".into());
    };
    if avg <= 0.0 {
        return RuleOutcome::Skipped("Average volume is zero: volume divergence not scored".into());
    }
    let normalized = slope / avg;
    let threshold = ctx.params.obv_slope_threshold;

    if normalized > threshold && ctx.price < ema20 {
        RuleOutcome::Fired(Firing::add(2, "OBV rising while price sits below EMA20: accumulation"))
    } else if normalized < -threshold && ctx.price > ema20 {
        RuleOutcome::Fired(Firing {
            effect: Effect::AddCap(-2),
            reason: "OBV falling while price holds above EMA20: distribution, score capped at 0".into(),
            dip: false,
        })
    } else {
        RuleOutcome::Pass
    }
}

fn demand_zone(ctx: &ScoreContext<'_>) -> RuleOutcome {
    match ctx.touched_demand() {
        Some(zone) => RuleOutcome::Fired(
            Firing::add(3, format!("Inside demand zone {:.2}-{:.2}", zone.bottom, zone.top)).dip(),
        ),
        None => RuleOutcome::Pass,
    }
}

fn zone_confluence(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let Some(zone) = ctx.touched_demand() else {
        return RuleOutcome::Pass;
    };
    let tolerance = ctx.price * ctx.params.confluence_tolerance_pct / 100.0;
    let near = |ema: Option<f64>| {
        ema.is_some_and(|e| e >= zone.bottom - tolerance && e <= zone.top + tolerance)
    };
    let label = match (near(ctx.ema50), near(ctx.ema200)) {
        (_, true) => "EMA200",
        (true, false) => "EMA50",
        (false, false) => return RuleOutcome::Pass,
    };
    RuleOutcome::Fired(Firing::add(1, format!("Demand zone coincides with {label}: confluence")))
}

fn supply_zone(ctx: &ScoreContext<'_>) -> RuleOutcome {
    match ctx.zones.supply_touching(ctx.bar).next() {
        Some(zone) => RuleOutcome::Fired(Firing::add(
            -2,
            format!("Inside supply zone {:.2}-{:.2}", zone.bottom, zone.top),
        )),
        None => RuleOutcome::Pass,
    }
}

fn panic_volume(ctx: &ScoreContext<'_>) -> RuleOutcome {
    let (Some(rv), Some(prev)) = (ctx.relative_volume, ctx.previous_close) else {
        return RuleOutcome::Skipped("Relative volume undefined: panic check not run".into());
    };
    if rv >= ctx.params.panic_volume_ratio && ctx.price < prev {
        RuleOutcome::Fired(Firing {
            effect: Effect::Force(ctx.params.panic_score),
            reason: format!("Panic selling: down close on {:.1}x average volume", rv),
            dip: false,
        })
    } else {
        RuleOutcome::Pass
    }
}

/// Evaluated top to bottom, once.
pub const RULES: &[Rule] = &[
    Rule { name: "trend_ema200", evaluate: trend_ema200 },
    Rule { name: "trend_ema50", evaluate: trend_ema50 },
    Rule { name: "candle_pattern", evaluate: candle_pattern },
    Rule { name: "macd_cross", evaluate: macd_cross },
    Rule { name: "rsi_context", evaluate: rsi_context },
    Rule { name: "obv_divergence", evaluate: obv_divergence },
    Rule { name: "demand_zone", evaluate: demand_zone },
    Rule { name: "zone_confluence", evaluate: zone_confluence },
    Rule { name: "supply_zone", evaluate: supply_zone },
    Rule { name: "panic_volume", evaluate: panic_volume },
];

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Run `rules` over `ctx` and fold their effects into one score.
pub fn score_rules(rules: &[Rule], ctx: &ScoreContext<'_>) -> ScoringResult {
    let mut result = ScoringResult::default();
    let mut score = 0i32;
    let mut forced: Option<i32> = None;

    for rule in rules {
        let firing = match (rule.evaluate)(ctx) {
            RuleOutcome::Pass => continue,
            RuleOutcome::Skipped(note) => {
                result.notes.push(note);
                continue;
            }
            RuleOutcome::Fired(f) => f,
        };

        match firing.effect {
            Effect::Add(d) => score += d,
            Effect::Veto(d) => score = score.min(0) + d,
            Effect::AddCap(d) => {
                score += d;
                result.capped = true;
            }
            Effect::Force(v) => {
                forced = Some(v);
                result.panic = true;
            }
        }

        let delta = firing.effect.delta();
        let bias = match delta.signum() {
            1 => Bias::Bullish,
            -1 => Bias::Bearish,
            _ => Bias::Neutral,
        };
        let reason = match firing.effect {
            Effect::Force(_) => firing.reason.clone(),
            _ => format!("{} ({delta:+})", firing.reason),
        };
        match bias {
            Bias::Bullish => result.bullish_reasons.push(reason),
            Bias::Bearish => result.bearish_reasons.push(reason),
            Bias::Neutral => result.notes.push(reason),
        }
        result.dip |= firing.dip;
        result.contributions.push(SignalContribution {
            rule: rule.name.to_string(),
            effect: firing.effect,
            bias,
            reason: firing.reason,
        });
    }

    if result.capped {
        score = score.min(0);
    }
    result.score = forced.unwrap_or(score);
    result
}

/// Score against the built-in rule table.
pub fn score(ctx: &ScoreContext<'_>) -> ScoringResult {
    score_rules(RULES, ctx)
}
