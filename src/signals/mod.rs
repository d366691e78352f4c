// =============================================================================
// Signals Module
// =============================================================================
//
// Signal scoring for the engine:
// - Rule table scorer (additive weights with veto / cap / force overrides)
// - Verdict bands mapping a score to verdict, strategy and advice
// - The report handed to the presentation layer

pub mod report;
pub mod rules;
pub mod verdict;

pub use report::{RiskEnvelope, SignalReport};
pub use rules::{ScoreContext, ScoringResult, SignalContribution, RULES};
pub use verdict::Verdict;
