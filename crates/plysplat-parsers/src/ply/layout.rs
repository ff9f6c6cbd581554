//! Binding of vertex properties to Gaussian fields.
//!
//! Property names are resolved once per file; each row is then turned into
//! a `SourcePoint` by index, so decoding never looks fields up by name.

use plysplat_core::{SourcePoint, Vec3};

use super::header::{PlyElement, PropertyKind, ScalarType};
use crate::traits::{ParseError, ParseOptions, ParseResult};

const POSITION: [&str; 3] = ["x", "y", "z"];
const NORMAL: [&str; 3] = ["nx", "ny", "nz"];
const HARMONIC_DC: [&str; 3] = ["f_dc_0", "f_dc_1", "f_dc_2"];
const HARMONIC_REST_PREFIX: &str = "f_rest_";
const OPACITY: &str = "opacity";
const SCALE: [&str; 3] = ["scale_0", "scale_1", "scale_2"];
const ROTATION: [&str; 4] = ["rot_0", "rot_1", "rot_2", "rot_3"];

/// Property indices for every Gaussian field of the vertex element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    position: [usize; 3],
    normal: Option<[usize; 3]>,
    harmonic_dc: [usize; 3],
    harmonic_rest: Vec<usize>,
    opacity: usize,
    scale: [usize; 3],
    rotation: [usize; 4],
}

impl VertexLayout {
    /// Resolve all fields against the vertex element's property list.
    ///
    /// Fails if a required field is absent, is a list, or (with
    /// `strict_types`) is not a 32-bit float.
    pub fn resolve(element: &PlyElement, options: &ParseOptions) -> ParseResult<Self> {
        let binder = Binder { element, strict: options.strict_types };

        let normal = if NORMAL.iter().all(|n| element.property_index(n).is_some()) {
            Some(binder.require_all(NORMAL)?)
        } else {
            None
        };

        let mut rest: Vec<(usize, usize)> = element
            .properties
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                p.name
                    .strip_prefix(HARMONIC_REST_PREFIX)
                    .and_then(|suffix| suffix.parse::<usize>().ok())
                    .map(|order| (order, index))
            })
            .collect();
        rest.sort_unstable();

        let harmonic_rest = if options.keep_harmonic_rest {
            rest.iter()
                .map(|&(_, index)| binder.check(index))
                .collect::<ParseResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            position: binder.require_all(POSITION)?,
            normal,
            harmonic_dc: binder.require_all(HARMONIC_DC)?,
            harmonic_rest,
            opacity: binder.require(OPACITY)?,
            scale: binder.require_all(SCALE)?,
            rotation: binder.require_all(ROTATION)?,
        })
    }

    /// Number of higher-order coefficients kept per point
    pub fn harmonic_rest_len(&self) -> usize {
        self.harmonic_rest.len()
    }

    /// Build a point from one decoded row (one value per property)
    pub fn build_point(&self, row: &[f32]) -> SourcePoint {
        let pick3 = |idx: [usize; 3]| [row[idx[0]], row[idx[1]], row[idx[2]]];

        SourcePoint {
            position: Vec3::from_array(pick3(self.position)),
            normal: self.normal.map(|n| Vec3::from_array(pick3(n))).unwrap_or(Vec3::ZERO),
            harmonic_dc: pick3(self.harmonic_dc),
            harmonic_rest: self.harmonic_rest.iter().map(|&i| row[i]).collect(),
            opacity_raw: row[self.opacity],
            scale_log: pick3(self.scale),
            rotation_raw: [
                row[self.rotation[0]],
                row[self.rotation[1]],
                row[self.rotation[2]],
                row[self.rotation[3]],
            ],
        }
    }
}

struct Binder<'a> {
    element: &'a PlyElement,
    strict: bool,
}

impl Binder<'_> {
    fn require(&self, name: &str) -> ParseResult<usize> {
        let index = self
            .element
            .property_index(name)
            .ok_or_else(|| ParseError::MissingField(name.to_string()))?;
        self.check(index)
    }

    fn require_all<const N: usize>(&self, names: [&str; N]) -> ParseResult<[usize; N]> {
        let mut indices = [0usize; N];
        for (slot, name) in indices.iter_mut().zip(names) {
            *slot = self.require(name)?;
        }
        Ok(indices)
    }

    fn check(&self, index: usize) -> ParseResult<usize> {
        let property = &self.element.properties[index];
        match property.kind {
            PropertyKind::List { .. } => Err(ParseError::WrongFieldType {
                field: property.name.clone(),
                expected: "scalar".to_string(),
                found: property.type_name(),
            }),
            PropertyKind::Scalar { ty } if self.strict && ty != ScalarType::Float32 => {
                Err(ParseError::WrongFieldType {
                    field: property.name.clone(),
                    expected: ScalarType::Float32.name().to_string(),
                    found: ty.name().to_string(),
                })
            }
            PropertyKind::Scalar { .. } => Ok(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::header::PlyProperty;

    const GAUSSIAN_FIELDS: [&str; 17] = [
        "x", "y", "z", "nx", "ny", "nz", "f_dc_0", "f_dc_1", "f_dc_2", "opacity",
        "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
    ];

    fn element(names: &[&str]) -> PlyElement {
        PlyElement {
            name: "vertex".to_string(),
            count: 1,
            properties: names
                .iter()
                .map(|n| PlyProperty::scalar(*n, ScalarType::Float32))
                .collect(),
        }
    }

    #[test]
    fn test_resolve_and_build() {
        let layout = VertexLayout::resolve(&element(&GAUSSIAN_FIELDS), &ParseOptions::default()).unwrap();
        let row: Vec<f32> = (0..GAUSSIAN_FIELDS.len()).map(|i| i as f32).collect();
        let point = layout.build_point(&row);

        assert_eq!(point.position, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(point.normal, Vec3::new(3.0, 4.0, 5.0));
        assert_eq!(point.harmonic_dc, [6.0, 7.0, 8.0]);
        assert_eq!(point.opacity_raw, 9.0);
        assert_eq!(point.scale_log, [10.0, 11.0, 12.0]);
        assert_eq!(point.rotation_raw, [13.0, 14.0, 15.0, 16.0]);
        assert!(point.harmonic_rest.is_empty());
    }

    #[test]
    fn test_field_order_is_by_name_not_position() {
        let mut names = GAUSSIAN_FIELDS.to_vec();
        names.reverse();
        let layout = VertexLayout::resolve(&element(&names), &ParseOptions::default()).unwrap();

        // rot_3 is now column 0, x is column 16
        let row: Vec<f32> = (0..names.len()).map(|i| i as f32).collect();
        let point = layout.build_point(&row);

        assert_eq!(point.position, Vec3::new(16.0, 15.0, 14.0));
        assert_eq!(point.rotation_raw, [3.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_normals_are_optional() {
        let names: Vec<&str> = GAUSSIAN_FIELDS
            .iter()
            .copied()
            .filter(|n| !n.starts_with('n'))
            .collect();
        let layout = VertexLayout::resolve(&element(&names), &ParseOptions::default()).unwrap();
        let point = layout.build_point(&vec![1.0; names.len()]);

        assert_eq!(point.normal, Vec3::ZERO);
    }

    #[test]
    fn test_missing_required_field() {
        for missing in ["x", "f_dc_1", "opacity", "scale_2", "rot_3"] {
            let names: Vec<&str> = GAUSSIAN_FIELDS
                .iter()
                .copied()
                .filter(|n| *n != missing)
                .collect();
            let err = VertexLayout::resolve(&element(&names), &ParseOptions::default()).unwrap_err();
            assert!(
                matches!(&err, ParseError::MissingField(field) if field == missing),
                "expected missing {missing}, got {err}"
            );
        }
    }

    #[test]
    fn test_harmonic_rest_sorted_by_suffix() {
        let mut names = GAUSSIAN_FIELDS.to_vec();
        names.extend(["f_rest_10", "f_rest_2", "f_rest_0", "f_rest_1"]);
        let options = ParseOptions { keep_harmonic_rest: true, ..ParseOptions::default() };
        let layout = VertexLayout::resolve(&element(&names), &options).unwrap();

        let row: Vec<f32> = (0..names.len()).map(|i| i as f32).collect();
        let point = layout.build_point(&row);

        assert_eq!(layout.harmonic_rest_len(), 4);
        assert_eq!(point.harmonic_rest, vec![19.0, 20.0, 18.0, 17.0]);
    }

    #[test]
    fn test_strict_types_rejects_double() {
        let mut el = element(&GAUSSIAN_FIELDS);
        el.properties[0] = PlyProperty::scalar("x", ScalarType::Float64);

        let err = VertexLayout::resolve(&el, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::WrongFieldType { ref field, .. } if field == "x"));

        let lenient = ParseOptions { strict_types: false, ..ParseOptions::default() };
        assert!(VertexLayout::resolve(&el, &lenient).is_ok());
    }

    #[test]
    fn test_list_field_rejected_even_when_lenient() {
        let mut el = element(&GAUSSIAN_FIELDS);
        el.properties[9] = PlyProperty {
            name: "opacity".to_string(),
            kind: PropertyKind::List { count: ScalarType::UInt8, item: ScalarType::Float32 },
        };

        let lenient = ParseOptions { strict_types: false, ..ParseOptions::default() };
        let err = VertexLayout::resolve(&el, &lenient).unwrap_err();
        assert!(matches!(err, ParseError::WrongFieldType { ref field, .. } if field == "opacity"));
    }
}
