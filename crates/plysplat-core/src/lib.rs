//! plysplat Core Library
//!
//! This crate provides the point types and error handling shared by the
//! plysplat parsers, the splat exporter and the command-line tool.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}
