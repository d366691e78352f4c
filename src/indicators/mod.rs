// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the signal engine
// reads.  Every function returns a vector aligned index-for-index with its
// input; positions whose window is not yet full hold NaN so that callers can
// tell "undefined" apart from a real zero.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod series;
pub mod sma;
pub mod wilder;

pub use series::{IndicatorName, IndicatorSeries};
