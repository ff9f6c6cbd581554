//! PLY body decoding
//!
//! Rows are decoded into one `f32` slot per property. List properties are
//! consumed but leave their slot at zero; the vertex layout never binds
//! a list.

use std::io::{BufRead, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use super::header::{PlyElement, PlyFormat, PropertyKind, ScalarType};
use crate::traits::{ParseError, ParseResult};

/// Largest list length accepted before assuming the body is corrupt
const MAX_LIST_LEN: usize = 1 << 20;

/// Stateful row reader over a PLY body
pub struct BodyReader<R> {
    reader: R,
    format: PlyFormat,
    line: String,
    rows_read: u64,
}

impl<R: BufRead> BodyReader<R> {
    pub fn new(reader: R, format: PlyFormat) -> Self {
        Self {
            reader,
            format,
            line: String::new(),
            rows_read: 0,
        }
    }

    /// Total rows consumed across all elements
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Decode one instance of `element` into `row`
    pub fn read_row(&mut self, element: &PlyElement, index: usize, row: &mut [f32]) -> ParseResult<()> {
        debug_assert_eq!(row.len(), element.properties.len());

        match self.format {
            PlyFormat::Ascii => self.read_ascii_row(element, index, row)?,
            PlyFormat::BinaryLittleEndian => {
                read_binary_row::<LittleEndian, _>(&mut self.reader, element, index, row)?
            }
            PlyFormat::BinaryBigEndian => {
                read_binary_row::<BigEndian, _>(&mut self.reader, element, index, row)?
            }
        }

        self.rows_read += 1;
        Ok(())
    }

    /// Consume every instance of `element` without keeping values
    pub fn skip_element(&mut self, element: &PlyElement) -> ParseResult<()> {
        let mut row = vec![0.0f32; element.properties.len()];
        for index in 0..element.count {
            self.read_row(element, index, &mut row)?;
        }
        Ok(())
    }

    fn read_ascii_row(&mut self, element: &PlyElement, index: usize, row: &mut [f32]) -> ParseResult<()> {
        // Skip blank lines between rows
        loop {
            self.line.clear();
            let n = self.reader.read_line(&mut self.line)?;
            if n == 0 {
                return Err(eof(element, index));
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }

        let mut tokens = self.line.split_whitespace();
        let mut next = |what: &str| -> ParseResult<f64> {
            let token = tokens.next().ok_or_else(|| {
                ParseError::InvalidStructure(format!(
                    "{} {} has too few values (missing {})",
                    element.name, index, what
                ))
            })?;
            token.parse::<f64>().map_err(|_| {
                ParseError::InvalidStructure(format!(
                    "{} {}: '{}' is not a number ({})",
                    element.name, index, token, what
                ))
            })
        };

        for (slot, property) in row.iter_mut().zip(&element.properties) {
            match property.kind {
                PropertyKind::Scalar { .. } => *slot = next(&property.name)? as f32,
                PropertyKind::List { .. } => {
                    let len = list_len(next(&property.name)?, element, index)?;
                    for _ in 0..len {
                        next(&property.name)?;
                    }
                    *slot = 0.0;
                }
            }
        }

        if tokens.next().is_some() {
            return Err(ParseError::InvalidStructure(format!(
                "{} {} has more values than declared properties",
                element.name, index
            )));
        }

        Ok(())
    }
}

fn read_binary_row<B: ByteOrder, R: Read>(
    reader: &mut R,
    element: &PlyElement,
    index: usize,
    row: &mut [f32],
) -> ParseResult<()> {
    for (slot, property) in row.iter_mut().zip(&element.properties) {
        match property.kind {
            PropertyKind::Scalar { ty } => {
                *slot = read_binary_scalar::<B, _>(reader, ty)
                    .map_err(|e| ParseError::from_read(e, format!("{} {}", element.name, index)))?
                    as f32;
            }
            PropertyKind::List { count, item } => {
                let raw = read_binary_scalar::<B, _>(reader, count)
                    .map_err(|e| ParseError::from_read(e, format!("{} {}", element.name, index)))?;
                let len = list_len(raw, element, index)?;
                for _ in 0..len {
                    read_binary_scalar::<B, _>(reader, item)
                        .map_err(|e| ParseError::from_read(e, format!("{} {}", element.name, index)))?;
                }
                *slot = 0.0;
            }
        }
    }
    Ok(())
}

/// Read one scalar of type `ty`, widened to f64 (exact for every PLY type)
pub fn read_binary_scalar<B: ByteOrder, R: Read>(reader: &mut R, ty: ScalarType) -> std::io::Result<f64> {
    Ok(match ty {
        ScalarType::Int8 => reader.read_i8()? as f64,
        ScalarType::UInt8 => reader.read_u8()? as f64,
        ScalarType::Int16 => reader.read_i16::<B>()? as f64,
        ScalarType::UInt16 => reader.read_u16::<B>()? as f64,
        ScalarType::Int32 => reader.read_i32::<B>()? as f64,
        ScalarType::UInt32 => reader.read_u32::<B>()? as f64,
        ScalarType::Float32 => reader.read_f32::<B>()? as f64,
        ScalarType::Float64 => reader.read_f64::<B>()?,
    })
}

fn list_len(raw: f64, element: &PlyElement, index: usize) -> ParseResult<usize> {
    if raw < 0.0 || raw.fract() != 0.0 || raw > MAX_LIST_LEN as f64 {
        return Err(ParseError::InvalidStructure(format!(
            "{} {} has invalid list length {}",
            element.name, index, raw
        )));
    }
    Ok(raw as usize)
}

fn eof(element: &PlyElement, index: usize) -> ParseError {
    ParseError::UnexpectedEof {
        context: format!("{} {} of {}", element.name, index, element.count),
    }
}
