//! Avatar vocabulary
//!
//! Parameter sets, the coefficient table, speech phase and expression choice.

pub mod expression;
pub mod params;
pub mod state;

pub use expression::{ExpressionSelector, KeywordRule};
pub use params::{InputChannel, ParamRange, ParameterBinding, ParameterSet};
pub use state::{SpeechPhase, SpeechState};
