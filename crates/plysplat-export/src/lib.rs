//! plysplat Export Pipeline
//!
//! Turns parsed Gaussian point sets into renderer-ready output:
//! - per-point transform (log-scale, SH color, opacity logit, quaternion)
//! - `.splat` record encoding
//! - file export with atomic replacement

pub mod splat;

pub use splat::{
    convert_file, ExportSummary, RecordWriter, SplatExportError, SplatExportOptions, SplatExporter,
};
