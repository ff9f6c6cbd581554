//! PLY point-set parser
//!
//! Reads the per-vertex Gaussian fields written by 3D Gaussian Splatting
//! trainers (`x y z nx ny nz f_dc_* f_rest_* opacity scale_* rot_*`) from
//! ASCII or binary PLY files into typed `SourcePoint`s.
//!
//! Parsing is all-or-nothing: any missing field, wrong type or truncated
//! row fails the whole file.

mod header;
mod layout;
mod reader;

pub use header::{PlyElement, PlyFormat, PlyHeader, PlyProperty, PropertyKind, ScalarType, VERTEX_ELEMENT};
pub use layout::VertexLayout;
pub use reader::{read_binary_scalar, BodyReader};

use std::io::{BufReader, Read, Seek};
use std::time::Instant;

use plysplat_core::{BoundingBox, SourcePoint};

use crate::logging::{log_progress, progress_span};
use crate::traits::{
    HumanReadable, ParseError, ParseOptions, ParsePhase, ParseProgress, ParseResult, Parser,
    PointSource, ProgressCallback,
};

/// How often (in points) the progress callback fires
const PROGRESS_INTERVAL: usize = 65_536;

/// Upper bound on points reserved up front from the header's declared count.
/// A larger count still parses; the vector grows as rows actually arrive.
const MAX_PREALLOCATED_POINTS: usize = 1 << 20;

/// A parsed Gaussian point set
#[derive(Debug, Clone)]
pub struct PlyCloud {
    /// Header as declared in the file
    pub header: PlyHeader,
    /// Points in file order
    pub points: Vec<SourcePoint>,
}

impl PlyCloud {
    /// Bounds of all point positions
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.iter().map(|p| &p.position))
    }

    /// Number of `f_rest_*` properties declared on the vertex element
    pub fn declared_harmonic_rest(&self) -> usize {
        self.header
            .element(VERTEX_ELEMENT)
            .map(|e| e.properties.iter().filter(|p| p.name.starts_with("f_rest_")).count())
            .unwrap_or(0)
    }
}

impl PointSource for PlyCloud {
    fn point_count(&self) -> usize {
        self.points.len()
    }

    fn point(&self, index: usize) -> Option<&SourcePoint> {
        self.points.get(index)
    }

    fn points(&self) -> std::slice::Iter<'_, SourcePoint> {
        self.points.iter()
    }
}

impl HumanReadable for PlyCloud {
    fn to_readable_string(&self) -> String {
        let mut out = format!(
            "PLY ({} {})\n  Points:        {}\n  SH rest coeffs: {}\n",
            self.header.format.keyword(),
            self.header.version,
            self.points.len(),
            self.declared_harmonic_rest(),
        );
        if let Some(bounds) = self.bounds() {
            out.push_str(&format!(
                "  Bounds min:    ({:.3}, {:.3}, {:.3})\n  Bounds max:    ({:.3}, {:.3}, {:.3})\n",
                bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
            ));
        }
        out.push_str("  Elements:\n");
        for element in &self.header.elements {
            out.push_str(&format!(
                "    {} x{} ({} properties)\n",
                element.name,
                element.count,
                element.properties.len()
            ));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "PLY",
            "format": self.header.format,
            "version": self.header.version,
            "point_count": self.points.len(),
            "harmonic_rest_count": self.declared_harmonic_rest(),
            "bounds": self.bounds(),
            "elements": self.header.elements,
            "comments": self.header.comments,
        })
    }
}

/// Parser for Gaussian Splatting PLY files
#[derive(Debug, Default, Clone, Copy)]
pub struct PlyParser;

impl PlyParser {
    /// Create a new PLY parser
    pub fn new() -> Self {
        Self
    }
}

impl Parser for PlyParser {
    type Output = PlyCloud;

    fn extensions(&self) -> &[&str] {
        &["ply"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(b"ply")
    }

    fn name(&self) -> &str {
        "PLY Gaussian Parser"
    }

    fn parse_with_options<R: Read + Seek>(
        &self,
        reader: R,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let start = Instant::now();
        let report = |phase, items_processed, total_items| {
            if let Some(callback) = &progress {
                callback(ParseProgress { phase, items_processed, total_items });
            }
        };

        report(ParsePhase::ReadingHeader, 0, None);
        let mut reader = BufReader::new(reader);
        let header = PlyHeader::parse(&mut reader)?;

        let vertex_index = header.vertex_element_index().ok_or_else(|| {
            ParseError::InvalidStructure("PLY file has no 'vertex' element".to_string())
        })?;
        let vertex = &header.elements[vertex_index];
        let layout = VertexLayout::resolve(vertex, options)?;
        let count = vertex.count;

        tracing::debug!(
            format = header.format.keyword(),
            points = count,
            properties = vertex.properties.len(),
            harmonic_rest = layout.harmonic_rest_len(),
            "Parsed PLY header"
        );

        let mut body = BodyReader::new(reader, header.format);
        for element in &header.elements[..vertex_index] {
            tracing::debug!(element = %element.name, count = element.count, "Skipping element");
            body.skip_element(element)?;
        }

        report(ParsePhase::ParsingRecords, 0, Some(count as u64));
        let _progress = progress_span("vertices", count).entered();
        let mut points = Vec::with_capacity(count.min(MAX_PREALLOCATED_POINTS));
        let mut row = vec![0.0f32; vertex.properties.len()];
        for index in 0..count {
            body.read_row(vertex, index, &mut row)?;
            points.push(layout.build_point(&row));

            let done = index + 1;
            if done % PROGRESS_INTERVAL == 0 {
                report(ParsePhase::ParsingRecords, done as u64, Some(count as u64));
            }
            log_progress(done, count);
        }

        report(ParsePhase::Complete, count as u64, Some(count as u64));
        crate::log_parse_complete!(self.name(), start.elapsed(), points.len());

        Ok(PlyCloud { header, points })
    }
}
