pub mod candlestick;

pub use candlestick::{classify, Pattern, PatternKind};
