//! `.splat` exporter
//!
//! Converts Gaussian point sets into the headerless 32-byte record stream
//! read by WebGL splat viewers.

mod exporter;
pub mod transform;
pub mod writer;

pub use exporter::{convert_file, SplatExportError, SplatExportOptions, SplatExportResult, SplatExporter};
pub use transform::{linear_scale, opacity_to_alpha, quantize_rotation, sh_to_rgb, transform, SH_C0};
pub use writer::{encode_record, RecordWriter};

use plysplat_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Result of one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Records written, one per source point
    pub point_count: usize,
    /// Always `point_count * 32`
    pub bytes_written: u64,
    /// Bounds of the exported positions; zero-sized for an empty scene
    pub bounds: BoundingBox,
    pub duration_ms: u64,
}
