//! Pointer input
//!
//! Converts raw screen-coordinate pointer events into normalized gaze offsets.

pub mod layout;
pub mod pointer;

pub use layout::ModelLayout;
pub use pointer::{PointerState, PointerTracker};
