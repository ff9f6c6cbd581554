//! `.splat` record serialization

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use plysplat_core::{SplatRecord, SPLAT_RECORD_SIZE};

/// Pack one record into its 32-byte little-endian layout
pub fn encode_record(record: &SplatRecord) -> [u8; SPLAT_RECORD_SIZE] {
    let mut bytes = [0u8; SPLAT_RECORD_SIZE];
    let mut cursor = &mut bytes[..];

    // Writes into a fixed 32-byte slice cannot fail
    for value in record.position.to_array().into_iter().chain(record.scale.to_array()) {
        let _ = cursor.write_f32::<LittleEndian>(value);
    }
    let _ = cursor.write_all(&record.color.to_array());
    let _ = cursor.write_all(&record.rotation);

    bytes
}

/// Appends records to a byte sink with no header or footer
pub struct RecordWriter<W: Write> {
    inner: W,
    records_written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records_written: 0 }
    }

    pub fn write_record(&mut self, record: &SplatRecord) -> io::Result<()> {
        self.inner.write_all(&encode_record(record))?;
        self.records_written += 1;
        Ok(())
    }

    /// Write records in iteration order
    pub fn write_all_records<'a>(&mut self, records: impl IntoIterator<Item = &'a SplatRecord>) -> io::Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.records_written * SPLAT_RECORD_SIZE as u64
    }

    /// Flush and hand back the sink
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ByteOrder;
    use plysplat_core::{Color, Vec3};

    fn record() -> SplatRecord {
        SplatRecord {
            position: Vec3::new(1.0, -2.5, 3.0),
            scale: Vec3::new(0.5, 1.0, 2.0),
            color: Color::new(1, 2, 3, 4),
            rotation: [5, 6, 7, 8],
        }
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode_record(&record());

        assert_eq!(LittleEndian::read_f32(&bytes[0..4]), 1.0);
        assert_eq!(LittleEndian::read_f32(&bytes[4..8]), -2.5);
        assert_eq!(LittleEndian::read_f32(&bytes[8..12]), 3.0);
        assert_eq!(LittleEndian::read_f32(&bytes[12..16]), 0.5);
        assert_eq!(LittleEndian::read_f32(&bytes[20..24]), 2.0);
        assert_eq!(&bytes[24..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_encode_is_little_endian() {
        let bytes = encode_record(&record());
        // 1.0f32 is 0x3F800000
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn test_writer_counts_and_concatenates() {
        let records = vec![record(); 3];
        let mut writer = RecordWriter::new(Vec::new());
        writer.write_all_records(&records).unwrap();

        assert_eq!(writer.records_written(), 3);
        assert_eq!(writer.bytes_written(), 96);

        let out = writer.finish().unwrap();
        assert_eq!(out.len(), 96);
        assert_eq!(&out[32..64], &encode_record(&record()));
    }

    #[test]
    fn test_empty_writer_produces_nothing() {
        let writer = RecordWriter::new(Vec::new());
        assert!(writer.finish().unwrap().is_empty());
    }
}
