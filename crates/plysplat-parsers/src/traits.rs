// plysplat-parsers/src/traits.rs
//! Core traits defining the parser interface for point-set formats.
//!
//! This module establishes a unified parsing interface that enables:
//! - Consistent error handling across all formats
//! - Memory-mapped file support for large scenes
//! - Progress reporting while decoding millions of points
//! - Ordered, restartable access to parsed points

use std::io::{Read, Seek};
use std::path::Path;

use plysplat_core::SourcePoint;
use thiserror::Error;

/// Errors that can occur during parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' has type {found}, expected {expected}")]
    WrongFieldType {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of data while reading {context}")]
    UnexpectedEof { context: String },

    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData { offset: u64, message: String },

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Map a short read onto `UnexpectedEof`, leave other I/O errors alone
    pub fn from_read(err: std::io::Error, context: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ParseError::UnexpectedEof { context: context.into() }
        } else {
            ParseError::Io(err)
        }
    }
}

impl From<ParseError> for plysplat_core::Error {
    fn from(err: ParseError) -> Self {
        use plysplat_core::Error;

        match err {
            ParseError::Io(e) => Error::Io(e),
            ParseError::MissingField(field) => Error::missing_field(field),
            ParseError::UnsupportedFormat(format) => Error::UnsupportedFormat { format },
            ParseError::Nested { context, source } => {
                Error::from(*source).with_context(context)
            }
            other => Error::malformed(other.to_string()),
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Progress callback for long-running parse operations
pub type ProgressCallback = Box<dyn Fn(ParseProgress) + Send + Sync>;

/// Progress information during parsing
#[derive(Debug, Clone)]
pub struct ParseProgress {
    /// Current phase of parsing
    pub phase: ParsePhase,
    /// Number of points decoded so far
    pub items_processed: u64,
    /// Total points to decode (if known)
    pub total_items: Option<u64>,
}

impl ParseProgress {
    /// Calculate fraction complete (0.0 - 1.0)
    pub fn percentage(&self) -> Option<f32> {
        self.total_items.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.items_processed as f32 / total as f32
            }
        })
    }
}

/// Phases of the parsing process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePhase {
    /// Reading file headers
    ReadingHeader,
    /// Decoding per-point records
    ParsingRecords,
    /// Parsing complete
    Complete,
}

/// Configuration options for parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Require every Gaussian field to be declared as a 32-bit float.
    /// When off, any numeric scalar property is converted to f32.
    pub strict_types: bool,
    /// Keep `f_rest_*` coefficients on each point instead of skipping them
    pub keep_harmonic_rest: bool,
    /// Whether to use memory mapping for large files
    pub use_memory_mapping: bool,
    /// Minimum file size to enable memory mapping
    pub memory_mapping_threshold: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_types: true,
            keep_harmonic_rest: false,
            use_memory_mapping: true,
            memory_mapping_threshold: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Core trait for all file format parsers
///
/// Implementors of this trait provide the ability to parse a specific
/// point-set file format.
pub trait Parser: Send + Sync {
    /// The parsed output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["ply"])
    fn extensions(&self) -> &[&str];

    /// Returns the magic bytes that identify this file type (if applicable)
    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Parse from a reader with default options
    fn parse<R: Read + Seek>(&self, reader: R) -> ParseResult<Self::Output> {
        self.parse_with_options(reader, &ParseOptions::default(), None)
    }

    /// Parse from a reader with custom options and optional progress callback
    fn parse_with_options<R: Read + Seek>(
        &self,
        reader: R,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output>;

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        self.parse_file_with_options(path, &ParseOptions::default(), None)
    }

    /// Parse from a file path with options
    fn parse_file_with_options(
        &self,
        path: &Path,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;

        // Use memory mapping for large files if enabled
        if options.use_memory_mapping {
            let metadata = file.metadata()?;
            if metadata.len() >= options.memory_mapping_threshold {
                return self.parse_memory_mapped(path, options, progress);
            }
        }

        let reader = std::io::BufReader::new(file);
        self.parse_with_options(reader, options, progress)
    }

    /// Parse using memory-mapped I/O (for large files)
    #[allow(unsafe_code)]
    fn parse_memory_mapped(
        &self,
        path: &Path,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before returning; a
        // concurrent writer truncating the file is outside what we support.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        tracing::debug!(path = %path.display(), bytes = mmap.len(), "Parsing memory-mapped file");
        self.parse_with_options(std::io::Cursor::new(&mmap[..]), options, progress)
    }

    /// Check if this parser can handle the given file
    fn can_parse(&self, path: &Path) -> bool {
        // Check extension
        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            if self.extensions().iter().any(|e| e.to_lowercase() == ext_str) {
                return true;
            }
        }

        // Try to check magic bytes if available
        if let Some(magic) = self.magic_bytes() {
            if let Ok(file) = std::fs::File::open(path) {
                let mut reader = std::io::BufReader::new(file);
                let mut buffer = vec![0u8; magic.len()];
                if reader.read_exact(&mut buffer).is_ok() {
                    return buffer == magic;
                }
            }
        }

        false
    }
}

/// A finite, ordered, re-readable set of Gaussians with a known count.
pub trait PointSource: Sync {
    /// Number of points, known before iteration
    fn point_count(&self) -> usize;

    /// Random access by index
    fn point(&self, index: usize) -> Option<&SourcePoint>;

    /// Points in source order; every call starts from the first point
    fn points(&self) -> std::slice::Iter<'_, SourcePoint>;

    /// Whether the source contains no points
    fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}

impl PointSource for [SourcePoint] {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point(&self, index: usize) -> Option<&SourcePoint> {
        self.get(index)
    }

    fn points(&self) -> std::slice::Iter<'_, SourcePoint> {
        self.iter()
    }
}

impl PointSource for Vec<SourcePoint> {
    fn point_count(&self) -> usize {
        self.len()
    }

    fn point(&self, index: usize) -> Option<&SourcePoint> {
        self.get(index)
    }

    fn points(&self) -> std::slice::Iter<'_, SourcePoint> {
        self.iter()
    }
}

/// Trait for converting parsed data to human-readable formats
pub trait HumanReadable {
    /// Convert to a human-readable string representation
    fn to_readable_string(&self) -> String;

    /// Convert to formatted JSON
    fn to_json(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use plysplat_core::Error;

    #[test]
    fn test_parse_progress_percentage() {
        let progress = ParseProgress {
            phase: ParsePhase::ParsingRecords,
            items_processed: 50,
            total_items: Some(100),
        };

        assert_eq!(progress.percentage(), Some(0.5));
    }

    #[test]
    fn test_parse_progress_empty_total() {
        let progress = ParseProgress {
            phase: ParsePhase::Complete,
            items_processed: 0,
            total_items: Some(0),
        };

        assert_eq!(progress.percentage(), Some(1.0));
    }

    #[test]
    fn test_parse_error_context() {
        let error = ParseError::InvalidMagic {
            expected: b"ply".to_vec(),
            found: vec![0x00, 0x00, 0x00],
        };

        let contextualized = error.with_context("parsing header");

        match contextualized {
            ParseError::Nested { context, .. } => {
                assert_eq!(context, "parsing header");
            }
            _ => panic!("Expected Nested error"),
        }
    }

    #[test]
    fn test_from_read_maps_eof() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(
            ParseError::from_read(eof, "vertex 3"),
            ParseError::UnexpectedEof { context } if context == "vertex 3"
        ));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(matches!(ParseError::from_read(denied, "vertex 3"), ParseError::Io(_)));
    }

    #[test]
    fn test_parse_errors_classify_as_malformed_input() {
        let cases = vec![
            ParseError::MissingField("rot_2".into()),
            ParseError::UnsupportedFormat("binary_pdp".into()),
            ParseError::InvalidStructure("no vertex element".into()),
            ParseError::UnexpectedEof { context: "vertex 7".into() },
            ParseError::WrongFieldType {
                field: "x".into(),
                expected: "float".into(),
                found: "double".into(),
            },
            ParseError::MissingField("opacity".into()).with_context("scene.ply"),
        ];

        for case in cases {
            let err = Error::from(case);
            assert!(err.is_malformed_input(), "{err} should be malformed input");
        }
    }

    #[test]
    fn test_parse_errors_keep_their_kind() {
        assert!(matches!(
            Error::from(ParseError::MissingField("rot_2".into())),
            Error::MissingField { field } if field == "rot_2"
        ));
        assert!(matches!(
            Error::from(ParseError::InvalidStructure("no vertex element".into())),
            Error::MalformedInput { message } if message.contains("no vertex element")
        ));
    }

    #[test]
    fn test_parse_io_error_classifies_as_io_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(Error::from(ParseError::Io(io)).is_io_failure());
    }

    #[test]
    fn test_vec_point_source_is_restartable() {
        let points = vec![SourcePoint::default(), SourcePoint::default()];

        assert_eq!(points.point_count(), 2);
        assert_eq!(points.points().count(), 2);
        assert_eq!(points.points().count(), 2);
        assert!(points.point(2).is_none());
    }
}
