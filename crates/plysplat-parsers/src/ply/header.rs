//! PLY header structures
//!
//! The header is a block of ASCII lines terminated by `end_header`:
//!
//! ```text
//! ply
//! format binary_little_endian 1.0
//! element vertex 1000
//! property float x
//! ...
//! property list uchar int vertex_indices
//! end_header
//! ```

use std::io::BufRead;

use serde::Serialize;

use crate::traits::{ParseError, ParseResult};

/// Upper bound on header size; anything larger is not a PLY header
const MAX_HEADER_BYTES: usize = 1024 * 1024;

/// Name of the element that holds the Gaussians
pub const VERTEX_ELEMENT: &str = "vertex";

/// Body encoding declared by the `format` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyFormat {
    /// Parse the keyword used on the `format` line
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ascii" => Some(PlyFormat::Ascii),
            "binary_little_endian" => Some(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Some(PlyFormat::BinaryBigEndian),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
            PlyFormat::BinaryBigEndian => "binary_big_endian",
        }
    }
}

/// Scalar property types, including the sized aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "char" | "int8" => Some(ScalarType::Int8),
            "uchar" | "uint8" => Some(ScalarType::UInt8),
            "short" | "int16" => Some(ScalarType::Int16),
            "ushort" | "uint16" => Some(ScalarType::UInt16),
            "int" | "int32" => Some(ScalarType::Int32),
            "uint" | "uint32" => Some(ScalarType::UInt32),
            "float" | "float32" => Some(ScalarType::Float32),
            "double" | "float64" => Some(ScalarType::Float64),
            _ => None,
        }
    }

    /// Canonical PLY spelling
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int8 => "char",
            ScalarType::UInt8 => "uchar",
            ScalarType::Int16 => "short",
            ScalarType::UInt16 => "ushort",
            ScalarType::Int32 => "int",
            ScalarType::UInt32 => "uint",
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
        }
    }

    /// Encoded size in bytes for binary bodies
    pub fn size(&self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Float64 => 8,
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }
}

/// Shape of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar { ty: ScalarType },
    List { count: ScalarType, item: ScalarType },
}

/// A `property` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlyProperty {
    pub name: String,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

impl PlyProperty {
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar { ty },
        }
    }

    /// Type name as written in the header
    pub fn type_name(&self) -> String {
        match self.kind {
            PropertyKind::Scalar { ty } => ty.name().to_string(),
            PropertyKind::List { count, item } => {
                format!("list {} {}", count.name(), item.name())
            }
        }
    }
}

/// An `element` line and the properties that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlyElement {
    pub name: String,
    pub count: usize,
    pub properties: Vec<PlyProperty>,
}

impl PlyElement {
    /// Index of a property by name
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Fixed record size in binary bodies, `None` if any property is a list
    pub fn fixed_stride(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| match p.kind {
                PropertyKind::Scalar { ty } => Some(ty.size()),
                PropertyKind::List { .. } => None,
            })
            .sum()
    }
}

/// Parsed PLY header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub version: String,
    pub elements: Vec<PlyElement>,
    pub comments: Vec<String>,
    pub obj_info: Vec<String>,
}

impl PlyHeader {
    /// Parse the header, leaving `reader` positioned at the first body byte
    pub fn parse<R: BufRead>(reader: &mut R) -> ParseResult<Self> {
        let mut consumed = 0usize;
        let mut line_no = 0usize;

        let magic = read_header_line(reader, &mut consumed)?
            .ok_or_else(|| ParseError::UnexpectedEof { context: "PLY magic".to_string() })?;
        if magic != "ply" {
            return Err(ParseError::InvalidMagic {
                expected: b"ply".to_vec(),
                found: magic.as_bytes().iter().take(3).copied().collect(),
            });
        }

        let mut format = None;
        let mut version = String::new();
        let mut elements: Vec<PlyElement> = Vec::new();
        let mut comments = Vec::new();
        let mut obj_info = Vec::new();

        loop {
            line_no += 1;
            let line = read_header_line(reader, &mut consumed)?.ok_or_else(|| {
                ParseError::UnexpectedEof { context: "PLY header (no end_header)".to_string() }
            })?;
            let mut tokens = line.split_whitespace();

            match tokens.next() {
                None => continue,
                Some("end_header") => break,
                Some("comment") => comments.push(rest_of_line(&line, "comment")),
                Some("obj_info") => obj_info.push(rest_of_line(&line, "obj_info")),
                Some("format") => {
                    let keyword = tokens.next().unwrap_or("");
                    format = Some(PlyFormat::from_keyword(keyword).ok_or_else(|| {
                        ParseError::UnsupportedFormat(format!("PLY format '{}'", keyword))
                    })?);
                    version = tokens.next().unwrap_or("1.0").to_string();
                    if version != "1.0" {
                        return Err(ParseError::UnsupportedFormat(format!(
                            "PLY version '{}'",
                            version
                        )));
                    }
                }
                Some("element") => {
                    let name = tokens.next().ok_or_else(|| header_error(line_no, &line))?;
                    let count = tokens
                        .next()
                        .and_then(|c| c.parse::<usize>().ok())
                        .ok_or_else(|| header_error(line_no, &line))?;
                    elements.push(PlyElement {
                        name: name.to_string(),
                        count,
                        properties: Vec::new(),
                    });
                }
                Some("property") => {
                    let element = elements.last_mut().ok_or_else(|| {
                        ParseError::InvalidStructure(format!(
                            "property before any element at header line {}",
                            line_no
                        ))
                    })?;
                    element.properties.push(parse_property(tokens, line_no, &line)?);
                }
                Some(_) => return Err(header_error(line_no, &line)),
            }
        }

        let format = format.ok_or_else(|| {
            ParseError::InvalidStructure("PLY header has no format line".to_string())
        })?;

        Ok(PlyHeader {
            format,
            version,
            elements,
            comments,
            obj_info,
        })
    }

    /// Look up an element by name
    pub fn element(&self, name: &str) -> Option<&PlyElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Position of the vertex element in body order
    pub fn vertex_element_index(&self) -> Option<usize> {
        self.elements.iter().position(|e| e.name == VERTEX_ELEMENT)
    }

    /// Declared number of vertices, zero if there is no vertex element
    pub fn vertex_count(&self) -> usize {
        self.element(VERTEX_ELEMENT).map(|e| e.count).unwrap_or(0)
    }
}

fn parse_property<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    line_no: usize,
    line: &str,
) -> ParseResult<PlyProperty> {
    let first = tokens.next().ok_or_else(|| header_error(line_no, line))?;

    let kind = if first == "list" {
        let count = scalar_type(tokens.next(), line_no, line)?;
        let item = scalar_type(tokens.next(), line_no, line)?;
        if !count.is_integer() {
            return Err(ParseError::InvalidStructure(format!(
                "list count type must be an integer at header line {}: {}",
                line_no, line
            )));
        }
        PropertyKind::List { count, item }
    } else {
        PropertyKind::Scalar { ty: scalar_type(Some(first), line_no, line)? }
    };

    let name = tokens.next().ok_or_else(|| header_error(line_no, line))?;

    Ok(PlyProperty {
        name: name.to_string(),
        kind,
    })
}

fn scalar_type(token: Option<&str>, line_no: usize, line: &str) -> ParseResult<ScalarType> {
    let token = token.ok_or_else(|| header_error(line_no, line))?;
    ScalarType::from_name(token).ok_or_else(|| {
        ParseError::UnsupportedFormat(format!("PLY property type '{}'", token))
    })
}

fn header_error(line_no: usize, line: &str) -> ParseError {
    ParseError::InvalidStructure(format!("bad PLY header line {}: '{}'", line_no, line))
}

fn rest_of_line(line: &str, keyword: &str) -> String {
    line.trim_start()
        .strip_prefix(keyword)
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Read one `\n`-terminated header line without the terminator.
/// Returns `None` at end of input.
fn read_header_line<R: BufRead>(reader: &mut R, consumed: &mut usize) -> ParseResult<Option<String>> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }

    *consumed += n;
    if *consumed > MAX_HEADER_BYTES {
        return Err(ParseError::InvalidStructure(format!(
            "PLY header exceeds {} bytes",
            MAX_HEADER_BYTES
        )));
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ParseError::InvalidStructure("PLY header is not ASCII text".to_string()))
}
