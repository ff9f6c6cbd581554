//! `.splat` exporter implementation

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use plysplat_core::{BoundingBox, Error, ResultExt, SplatRecord};
use plysplat_parsers::logging::instrument_parse;
use plysplat_parsers::{ParseOptions, Parser, PlyParser, PointSource};
use rayon::prelude::*;
use tempfile::NamedTempFile;

use super::transform::transform;
use super::writer::RecordWriter;
use super::ExportSummary;

/// Points transformed per parallel batch before the batch is written
const PARALLEL_CHUNK: usize = 1 << 16;

/// `.splat` export options
#[derive(Debug, Clone)]
pub struct SplatExportOptions {
    /// Transform points on the rayon pool
    pub parallel: bool,
    /// Point count below which the export stays sequential
    pub parallel_threshold: usize,
    /// Replace an existing output file
    pub overwrite: bool,
    /// Write to a temporary file next to the target and rename on success
    pub atomic: bool,
}

impl Default for SplatExportOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 4096,
            overwrite: false,
            atomic: true,
        }
    }
}

/// `.splat` export errors
#[derive(Debug, thiserror::Error)]
pub enum SplatExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to move finished output into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),
}

impl From<SplatExportError> for Error {
    fn from(err: SplatExportError) -> Self {
        match err {
            SplatExportError::Io(e) => Error::Io(e),
            SplatExportError::Persist(e) => Error::Io(e.error),
            SplatExportError::OutputExists(path) => Error::OutputExists(path),
        }
    }
}

pub type SplatExportResult<T> = Result<T, SplatExportError>;

/// Gaussian point set to `.splat` exporter
#[derive(Debug, Clone, Default)]
pub struct SplatExporter {
    options: SplatExportOptions,
}

impl SplatExporter {
    /// Create a new exporter
    pub fn new(options: SplatExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SplatExportOptions {
        &self.options
    }

    fn use_parallel(&self, count: usize) -> bool {
        self.options.parallel && count >= self.options.parallel_threshold
    }

    /// Transform every point, in source order
    pub fn transform_all<S: PointSource + ?Sized>(&self, source: &S) -> Vec<SplatRecord> {
        let points = source.points().as_slice();
        if self.use_parallel(points.len()) {
            points.par_iter().map(transform).collect()
        } else {
            points.iter().map(transform).collect()
        }
    }

    /// Stream records for every point into `writer`.
    ///
    /// Parallel batches are collected in index order, so the output is
    /// byte-identical to a sequential export.
    pub fn export_to_writer<S, W>(&self, source: &S, writer: W) -> SplatExportResult<ExportSummary>
    where
        S: PointSource + ?Sized,
        W: Write,
    {
        let start = Instant::now();
        let points = source.points().as_slice();
        let parallel = self.use_parallel(points.len());
        let _span = tracing::info_span!("export_splat", points = points.len(), parallel).entered();

        let mut out = RecordWriter::new(writer);
        if parallel {
            let mut batch = Vec::with_capacity(PARALLEL_CHUNK.min(points.len()));
            for chunk in points.chunks(PARALLEL_CHUNK) {
                chunk.par_iter().map(transform).collect_into_vec(&mut batch);
                out.write_all_records(&batch)?;
            }
        } else {
            for point in points {
                out.write_record(&transform(point))?;
            }
        }

        let point_count = out.records_written() as usize;
        let bytes_written = out.bytes_written();
        out.finish()?;

        let summary = ExportSummary {
            point_count,
            bytes_written,
            bounds: BoundingBox::from_points(points.iter().map(|p| &p.position)).unwrap_or(BoundingBox::ZERO),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            points = summary.point_count,
            bytes = summary.bytes_written,
            duration_ms = summary.duration_ms,
            "Wrote splat records"
        );

        Ok(summary)
    }

    /// Export to a file path.
    ///
    /// With `atomic` set, the target only appears once every record has been
    /// written; a failed export leaves no file behind.
    pub fn export_file<S>(&self, source: &S, path: impl AsRef<Path>) -> SplatExportResult<ExportSummary>
    where
        S: PointSource + ?Sized,
    {
        let path = path.as_ref();
        if !self.options.overwrite && path.exists() {
            return Err(SplatExportError::OutputExists(path.to_path_buf()));
        }

        if self.options.atomic {
            self.export_atomic(source, path)
        } else {
            self.export_direct(source, path)
        }
    }

    fn export_atomic<S>(&self, source: &S, path: &Path) -> SplatExportResult<ExportSummary>
    where
        S: PointSource + ?Sized,
    {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staging = NamedTempFile::new_in(dir)?;
        tracing::debug!(staging = %staging.path().display(), "Staging splat output");

        let summary = self.export_to_writer(source, BufWriter::new(&mut staging))?;
        staging.as_file().sync_all()?;

        if self.options.overwrite {
            staging.persist(path)?;
        } else {
            // Fails rather than replacing a file created since the existence check
            staging.persist_noclobber(path)?;
        }

        Ok(summary)
    }

    fn export_direct<S>(&self, source: &S, path: &Path) -> SplatExportResult<ExportSummary>
    where
        S: PointSource + ?Sized,
    {
        let file = if self.options.overwrite {
            File::create(path)?
        } else {
            File::options().write(true).create_new(true).open(path)?
        };

        self.export_to_writer(source, BufWriter::new(file)).inspect_err(|_| {
            // Partial output would still decode as a valid, shorter scene
            let _ = std::fs::remove_file(path);
        })
    }
}

/// Read a PLY point set and write it out as `.splat`.
///
/// The source is fully parsed before the output path is touched, so a
/// malformed input never produces an output file.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    parse_options: &ParseOptions,
    export_options: &SplatExportOptions,
) -> plysplat_core::Result<ExportSummary> {
    let (input, output) = (input.as_ref(), output.as_ref());
    if !input.exists() {
        return Err(Error::FileNotFound(input.to_path_buf()));
    }

    let parser = PlyParser::new();
    plysplat_parsers::log_parse_start!(parser.name(), input);
    let parsed = instrument_parse(parser.name(), || {
        parser.parse_file_with_options(input, parse_options, None)
    });
    let cloud = parsed
        .inspect_err(|e| {
            plysplat_parsers::log_parse_error!(parser.name(), e);
        })
        .with_context(|| format!("reading {}", input.display()))?;

    SplatExporter::new(export_options.clone())
        .export_file(&cloud, output)
        .with_context(|| format!("writing {}", output.display()))
}
