// =============================================================================
// Error taxonomy
// =============================================================================
//
// Only conditions a caller can act on are represented here.  Undefined
// indicator values inside a series are not errors: they are NaN entries and
// the clauses that depend on them are skipped.

use thiserror::Error;

use crate::market_data::ProviderError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Fewer bars than a required window.
    #[error("insufficient data for {indicator}: need {required} bars, have {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    /// The bar sequence violates ordering or value invariants.
    #[error("invalid bar series: {0}")]
    InvalidSeries(String),

    /// A tunable is out of range. Raised when the engine is constructed.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// Collaborator failure, surfaced unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
