//! `.splat` reader
//!
//! A `.splat` file is a bare concatenation of 32-byte records with no
//! header, magic or count: position and linear scale as little-endian f32,
//! then RGBA and a quantized quaternion as u8. The record count is the
//! file length divided by 32.

use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use plysplat_core::{BoundingBox, Color, SplatRecord, Vec3, SPLAT_RECORD_SIZE};

use crate::traits::{HumanReadable, ParseError, ParseOptions, ParseResult, Parser, ProgressCallback};

/// Decoded contents of a `.splat` file
#[derive(Debug, Clone, Default)]
pub struct SplatFile {
    pub records: Vec<SplatRecord>,
}

impl SplatFile {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bounds of all record positions
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.records.iter().map(|r| &r.position))
    }

    /// Mean alpha in 0.0-1.0, `None` for an empty file
    pub fn mean_opacity(&self) -> Option<f32> {
        if self.records.is_empty() {
            return None;
        }
        let sum: u64 = self.records.iter().map(|r| r.color.a as u64).sum();
        Some(sum as f32 / self.records.len() as f32 / 255.0)
    }
}

impl HumanReadable for SplatFile {
    fn to_readable_string(&self) -> String {
        let mut out = format!(
            "SPLAT\n  Records:       {}\n  Size:          {} bytes\n",
            self.records.len(),
            self.records.len() * SPLAT_RECORD_SIZE
        );
        if let Some(bounds) = self.bounds() {
            out.push_str(&format!(
                "  Bounds min:    ({:.3}, {:.3}, {:.3})\n  Bounds max:    ({:.3}, {:.3}, {:.3})\n",
                bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
            ));
        }
        if let Some(opacity) = self.mean_opacity() {
            out.push_str(&format!("  Mean opacity:  {:.3}\n", opacity));
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "SPLAT",
            "record_count": self.records.len(),
            "size": self.records.len() * SPLAT_RECORD_SIZE,
            "bounds": self.bounds(),
            "mean_opacity": self.mean_opacity(),
        })
    }
}

/// Decode one record from exactly `SPLAT_RECORD_SIZE` bytes
pub fn decode_record(bytes: &[u8; SPLAT_RECORD_SIZE]) -> SplatRecord {
    let f = |i: usize| LittleEndian::read_f32(&bytes[i * 4..i * 4 + 4]);
    let position = Vec3::new(f(0), f(1), f(2));
    let scale = Vec3::new(f(3), f(4), f(5));
    let tail = &bytes[24..];

    SplatRecord {
        position,
        scale,
        color: Color::new(tail[0], tail[1], tail[2], tail[3]),
        rotation: [tail[4], tail[5], tail[6], tail[7]],
    }
}

/// Parser for `.splat` record streams
#[derive(Debug, Default, Clone, Copy)]
pub struct SplatParser;

impl SplatParser {
    /// Create a new splat parser
    pub fn new() -> Self {
        Self
    }
}

impl Parser for SplatParser {
    type Output = SplatFile;

    fn extensions(&self) -> &[&str] {
        &["splat"]
    }

    fn name(&self) -> &str {
        "SPLAT Record Reader"
    }

    fn parse_with_options<R: Read + Seek>(
        &self,
        mut reader: R,
        _options: &ParseOptions,
        _progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if data.len() % SPLAT_RECORD_SIZE != 0 {
            let whole = data.len() - data.len() % SPLAT_RECORD_SIZE;
            return Err(ParseError::CorruptedData {
                offset: whole as u64,
                message: format!(
                    "length {} is not a multiple of the {}-byte record size",
                    data.len(),
                    SPLAT_RECORD_SIZE
                ),
            });
        }

        let records = data
            .chunks_exact(SPLAT_RECORD_SIZE)
            .filter_map(|chunk| <&[u8; SPLAT_RECORD_SIZE]>::try_from(chunk).ok())
            .map(decode_record)
            .collect::<Vec<_>>();

        tracing::debug!(records = records.len(), "Decoded splat records");
        Ok(SplatFile { records })
    }
}
