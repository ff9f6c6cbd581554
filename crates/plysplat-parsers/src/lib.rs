//! plysplat-parsers
//!
//! Readers for the point-set formats involved in Gaussian Splatting
//! conversion.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | PLY    | `.ply`    | Trained Gaussian point set (ASCII, binary LE/BE) |
//! | SPLAT  | `.splat`  | Headerless 32-byte viewer records |
//!
//! # Example
//!
//! ```rust,ignore
//! use plysplat_parsers::{Parser, PlyParser, PointSource};
//!
//! let parser = PlyParser::new();
//! let cloud = parser.parse_file("point_cloud.ply")?;
//!
//! println!("Found {} points", cloud.point_count());
//! ```

pub mod traits;
pub mod logging;
pub mod ply;
pub mod splat;

// Re-export main types
pub use traits::{
    HumanReadable, Parser, PointSource,
    ParseError, ParseResult, ParseOptions, ParseProgress, ParsePhase,
    ProgressCallback,
};

pub use ply::{PlyCloud, PlyFormat, PlyHeader, PlyParser, ScalarType};
pub use splat::{decode_record, SplatFile, SplatParser};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
