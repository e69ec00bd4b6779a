//! Rigdrive - animation-parameter drive loop for 2D rigged characters
//!
//! A per-frame loop that turns pointer motion and speech activity into named
//! model parameters:
//! - Head, eye and body angles follow the pointer, or a drag when active
//! - Mouth openness follows speech through a pluggable lip sync strategy
//! - Expressions react to what is being said and to head taps
//! - Every value is clamped to the model's declared range before it is applied
//!
//! The model runtime and render host sit behind traits in [`runtime`]; a
//! headless implementation drives the bundled CLI and the tests.

pub mod avatar;
pub mod config;
pub mod drive;
pub mod error;
pub mod input;
pub mod lipsync;
pub mod random;
pub mod runtime;
pub mod speech;

pub use config::Config;
pub use drive::{DriveLoop, TapTarget};
pub use error::{Result, RigdriveError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
