//! End-to-end tests for PLY to `.splat` conversion
//!
//! These tests cover:
//! - The exact 32-byte record for a reference point
//! - Output length for empty, single and large scenes
//! - Point order under parallel and sequential export
//! - File handling (atomic output, overwrite refusal, failed parses)

use std::io::Cursor;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use plysplat_core::{SourcePoint, Vec3, SPLAT_RECORD_SIZE};
use plysplat_export::{convert_file, SplatExportOptions, SplatExporter};
use plysplat_parsers::{ParseOptions, Parser, SplatParser};

const PLY_FIELDS: [&str; 14] = [
    "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "opacity",
    "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3",
];

/// Distinct, recognisable values for point `i`
fn point(i: usize) -> SourcePoint {
    let f = i as f32;
    SourcePoint {
        position: Vec3::new(f, -f, f * 0.5),
        harmonic_dc: [(i % 7) as f32 - 3.0, 0.0, 0.5],
        opacity_raw: (i % 11) as f32 - 5.0,
        scale_log: [-((i % 5) as f32), 0.0, 1.0],
        rotation_raw: [1.0, 0.0, -0.5, (i % 3) as f32 * 0.25],
        ..SourcePoint::default()
    }
}

fn ply_bytes(points: &[SourcePoint]) -> Vec<u8> {
    let mut text = format!("ply\nformat binary_little_endian 1.0\nelement vertex {}\n", points.len());
    for name in PLY_FIELDS {
        text.push_str(&format!("property float {}\n", name));
    }
    text.push_str("end_header\n");

    let mut bytes = text.into_bytes();
    for p in points {
        let values = p
            .position
            .to_array()
            .into_iter()
            .chain(p.harmonic_dc)
            .chain([p.opacity_raw])
            .chain(p.scale_log)
            .chain(p.rotation_raw);
        for v in values {
            bytes.write_f32::<LittleEndian>(v).unwrap();
        }
    }
    bytes
}

fn write_ply(dir: &Path, name: &str, points: &[SourcePoint]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, ply_bytes(points)).unwrap();
    path
}

fn export_bytes(points: &[SourcePoint], options: SplatExportOptions) -> Vec<u8> {
    let mut out = Vec::new();
    SplatExporter::new(options).export_to_writer(points, &mut out).unwrap();
    out
}

mod record_tests {
    use super::*;

    #[test]
    fn test_reference_point_record() {
        let reference = SourcePoint {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..SourcePoint::default()
        };
        let bytes = export_bytes(&[reference], SplatExportOptions::default());

        assert_eq!(bytes.len(), SPLAT_RECORD_SIZE);
        let floats: Vec<f32> = bytes[..24].chunks_exact(4).map(LittleEndian::read_f32).collect();
        assert_eq!(floats, vec![1.0, 2.0, 3.0, 1.0, 1.0, 1.0]);
        assert_eq!(&bytes[24..], &[127, 127, 127, 127, 128, 128, 128, 128]);
    }

    #[test]
    fn test_output_length_is_exact() {
        for count in [0usize, 1, 1000] {
            let points: Vec<SourcePoint> = (0..count).map(point).collect();
            let bytes = export_bytes(&points, SplatExportOptions::default());
            assert_eq!(bytes.len(), count * SPLAT_RECORD_SIZE, "{count} points");
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let points: Vec<SourcePoint> = (0..70_000).map(point).collect();

        let parallel = export_bytes(
            &points,
            SplatExportOptions { parallel_threshold: 1, ..SplatExportOptions::default() },
        );
        let sequential = export_bytes(
            &points,
            SplatExportOptions { parallel: false, ..SplatExportOptions::default() },
        );

        assert_eq!(parallel.len(), sequential.len());
        assert!(parallel == sequential);
    }

    #[test]
    fn test_point_order_is_preserved() {
        let points: Vec<SourcePoint> = (0..5000).map(point).collect();
        let bytes = export_bytes(
            &points,
            SplatExportOptions { parallel_threshold: 1, ..SplatExportOptions::default() },
        );

        let decoded = SplatParser::new().parse(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.len(), points.len());
        for (i, record) in decoded.records.iter().enumerate() {
            assert_eq!(record.position, points[i].position, "record {i}");
        }
    }

    #[test]
    fn test_summary_reports_bounds() {
        let points: Vec<SourcePoint> = (0..4).map(point).collect();
        let mut sink = Vec::new();
        let summary = SplatExporter::default().export_to_writer(&points, &mut sink).unwrap();

        assert_eq!(summary.point_count, 4);
        assert_eq!(summary.bytes_written, 128);
        assert_eq!(summary.bounds.min, Vec3::new(0.0, -3.0, 0.0));
        assert_eq!(summary.bounds.max, Vec3::new(3.0, 0.0, 1.5));
    }
}

mod file_tests {
    use super::*;

    #[test]
    fn test_convert_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let points: Vec<SourcePoint> = (0..100).map(point).collect();
        let input = write_ply(dir.path(), "scene.ply", &points);
        let output = dir.path().join("scene.splat");

        let summary = convert_file(&input, &output, &ParseOptions::default(), &SplatExportOptions::default())
            .unwrap();

        assert_eq!(summary.point_count, 100);
        let written = std::fs::read(&output).unwrap();
        assert_eq!(written, export_bytes(&points, SplatExportOptions::default()));

        // Only the output remains next to the input; no staging files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_parse_failure_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.ply");
        let mut bytes = ply_bytes(&[point(0), point(1)]);
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&input, bytes).unwrap();
        let output = dir.path().join("broken.splat");

        let err = convert_file(&input, &output, &ParseOptions::default(), &SplatExportOptions::default())
            .unwrap_err();

        assert!(err.is_malformed_input());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_field_is_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("no_opacity.ply");
        let text = String::from_utf8(ply_bytes(&[])).unwrap().replace("property float opacity\n", "");
        std::fs::write(&input, text).unwrap();

        let err = convert_file(&input, dir.path().join("out.splat"), &ParseOptions::default(), &SplatExportOptions::default())
            .unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_missing_input_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_file(
            dir.path().join("absent.ply"),
            dir.path().join("absent.splat"),
            &ParseOptions::default(),
            &SplatExportOptions::default(),
        )
        .unwrap_err();

        assert!(err.is_io_failure());
    }

    #[test]
    fn test_refuses_to_overwrite_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ply(dir.path(), "scene.ply", &[point(1)]);
        let output = dir.path().join("scene.splat");
        std::fs::write(&output, b"keep me").unwrap();

        let err = convert_file(&input, &output, &ParseOptions::default(), &SplatExportOptions::default())
            .unwrap_err();
        assert!(err.is_io_failure());
        assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

        let overwrite = SplatExportOptions { overwrite: true, ..SplatExportOptions::default() };
        convert_file(&input, &output, &ParseOptions::default(), &overwrite).unwrap();
        assert_eq!(std::fs::read(&output).unwrap().len(), SPLAT_RECORD_SIZE);
    }

    #[test]
    fn test_direct_write_matches_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let points: Vec<SourcePoint> = (0..10).map(point).collect();

        let atomic = dir.path().join("atomic.splat");
        let direct = dir.path().join("direct.splat");
        SplatExporter::default().export_file(&points, &atomic).unwrap();
        SplatExporter::new(SplatExportOptions { atomic: false, ..SplatExportOptions::default() })
            .export_file(&points, &direct)
            .unwrap();

        assert_eq!(std::fs::read(atomic).unwrap(), std::fs::read(direct).unwrap());
    }

    #[test]
    fn test_empty_scene_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_ply(dir.path(), "empty.ply", &[]);
        let output = dir.path().join("empty.splat");

        let summary = convert_file(&input, &output, &ParseOptions::default(), &SplatExportOptions::default())
            .unwrap();
        assert_eq!(summary.point_count, 0);
        assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
    }
}
