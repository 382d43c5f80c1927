//! End-to-end conversion tests over synthetic FIT streams.

use fit2tcx::{checksum_of, convert, Error, TIMESTAMP_OFFSET};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Minimal FIT encoder for building test streams: emits definition, data,
/// and compressed-timestamp records, then wraps them in a 14-byte header
/// with valid checksums.
struct FitEncoder {
    records: Vec<u8>,
}

impl FitEncoder {
    fn new() -> Self {
        FitEncoder { records: Vec::new() }
    }

    /// Little-endian definition record for `local` (0..=15).
    fn definition(&mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> &mut Self {
        self.records.push(0x40 | (local & 0x0f));
        self.records.push(0); // reserved
        self.records.push(0); // little-endian
        self.records.extend_from_slice(&global.to_le_bytes());
        self.records.push(fields.len() as u8);
        for &(number, length, data_type) in fields {
            self.records.extend_from_slice(&[number, length, data_type]);
        }
        self
    }

    fn data(&mut self, local: u8, payload: &[u8]) -> &mut Self {
        self.records.push(local & 0x0f);
        self.records.extend_from_slice(payload);
        self
    }

    /// Compressed-timestamp data record; `local` is limited to 0..=3.
    fn compressed(&mut self, local: u8, offset: u8, payload: &[u8]) -> &mut Self {
        self.records.push(0x80 | ((local & 0x03) << 5) | (offset & 0x1f));
        self.records.extend_from_slice(payload);
        self
    }

    fn finish(&self) -> Vec<u8> {
        let mut bytes = vec![14, 0x20, 0x6b, 0x08];
        bytes.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b".FIT");
        let header_crc = checksum_of(&bytes);
        bytes.extend_from_slice(&header_crc.to_le_bytes());
        bytes.extend_from_slice(&self.records);
        let crc = checksum_of(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }
}

fn file_id(encoder: &mut FitEncoder) {
    encoder
        .definition(
            0,
            0,
            &[(0, 1, 0x00), (1, 2, 0x84), (2, 2, 0x84), (3, 4, 0x8c)],
        )
        .data(0, &[4, 1, 0, 0x19, 0x06, 0x4e, 0x61, 0xbc, 0x00]);
}

/// Definition for record messages: timestamp u32 + heart rate u8, on the
/// same local type file_id used, exercising replace-on-redefinition.
fn record_definition(encoder: &mut FitEncoder) {
    encoder.definition(0, 20, &[(253, 4, 0x86), (3, 1, 0x02)]);
}

fn record(encoder: &mut FitEncoder, timestamp: u32, heart_rate: u8) {
    let mut payload = timestamp.to_le_bytes().to_vec();
    payload.push(heart_rate);
    encoder.data(0, &payload);
}

/// Collects (Time text, HeartRateBpm Value text) pairs from a TCX document,
/// in document order.
fn trackpoints_of(xml: &str) -> Vec<(String, Option<String>)> {
    let mut reader = Reader::from_str(xml);
    let mut points = Vec::new();
    let mut path: Vec<String> = Vec::new();
    loop {
        match reader.read_event().expect("well-formed XML") {
            Event::Start(start) => {
                path.push(String::from_utf8_lossy(start.name().as_ref()).into_owned());
            }
            Event::Text(text) => {
                let text = text.unescape().expect("valid text").into_owned();
                match path.last().map(String::as_str) {
                    Some("Time") if path.iter().any(|n| n == "Trackpoint") => {
                        points.push((text, None));
                    }
                    Some("Value")
                        if path.iter().any(|n| n == "HeartRateBpm")
                            && path.iter().any(|n| n == "Trackpoint") =>
                    {
                        if let Some(last) = points.last_mut() {
                            last.1 = Some(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    points
}

fn count_of(xml: &str, needle: &str) -> usize {
    xml.matches(needle).count()
}

#[test]
fn three_records_build_one_lap_with_derived_average() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 120);
    record(&mut encoder, 1001, 122);
    record(&mut encoder, 1002, 121);
    let xml = convert(&encoder.finish()).unwrap();

    assert_eq!(count_of(&xml, "<Lap "), 1);
    let points = trackpoints_of(&xml);
    assert_eq!(points.len(), 3);
    let heart_rates: Vec<_> = points.iter().map(|(_, hr)| hr.as_deref()).collect();
    assert_eq!(heart_rates, [Some("120"), Some("122"), Some("121")]);
    assert!(xml.contains("<AverageHeartRateBpm>"));
    assert!(xml.contains("<Value>121</Value>"));
}

#[test]
fn trackpoint_sequence_round_trips_through_the_document() {
    let samples: Vec<(u32, u8)> = (0..25).map(|i| (2000 + i, 100 + (i % 40) as u8)).collect();
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    for &(timestamp, heart_rate) in &samples {
        record(&mut encoder, timestamp, heart_rate);
    }
    let xml = convert(&encoder.finish()).unwrap();

    let points = trackpoints_of(&xml);
    assert_eq!(points.len(), samples.len());
    for ((time, heart_rate), &(timestamp, expected_hr)) in points.iter().zip(&samples) {
        let expected = chrono::DateTime::from_timestamp(
            i64::from(timestamp) + i64::from(TIMESTAMP_OFFSET),
            0,
        )
        .unwrap()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
        assert_eq!(*time, expected);
        assert_eq!(heart_rate.as_deref(), Some(expected_hr.to_string().as_str()));
    }
}

#[test]
fn data_record_before_definition_is_undefined_local_type() {
    let mut encoder = FitEncoder::new();
    encoder.data(3, &[0, 0, 0, 0]);
    let error = convert(&encoder.finish()).unwrap_err();
    assert!(matches!(error, Error::UndefinedLocalType { header: 3, .. }));
}

#[test]
fn altered_format_tag_is_not_a_fit_file() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    let mut bytes = encoder.finish();
    bytes[9] = b'X';
    let error = convert(&bytes).unwrap_err();
    assert!(matches!(error, Error::NotAFitFile { .. }));
}

#[test]
fn compressed_timestamp_reconstructs_after_an_absolute_one() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    // Heart rate only; the timestamp comes from the record header.
    encoder.definition(1, 20, &[(3, 1, 0x02)]);
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 120);
    // 1000 has low bits 8; offset 10 lands on 1002.
    encoder.compressed(1, 10, &[125]);
    let xml = convert(&encoder.finish()).unwrap();

    let points = trackpoints_of(&xml);
    assert_eq!(points.len(), 2);
    assert!(points[1].0 > points[0].0);
    assert!(points[1].0.ends_with("00:16:42Z"));
}

#[test]
fn compressed_timestamp_without_a_reference_is_rejected() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    // Heart rate only; no absolute timestamp has been seen when the
    // compressed record arrives.
    encoder.definition(1, 20, &[(3, 1, 0x02)]);
    encoder.compressed(1, 10, &[120]);
    let error = convert(&encoder.finish()).unwrap_err();
    assert!(matches!(error, Error::MissingTimestampReference));
}

#[test]
fn absent_optional_fields_emit_no_elements() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    // Timestamp only: no heart rate, position, altitude, or power fields.
    encoder.definition(0, 20, &[(253, 4, 0x86)]);
    encoder.data(0, &1000u32.to_le_bytes());
    let xml = convert(&encoder.finish()).unwrap();

    assert!(!xml.contains("HeartRateBpm"));
    assert!(!xml.contains("<Position>"));
    assert!(!xml.contains("<AltitudeMeters>"));
    assert!(!xml.contains("<Extensions>"));
}

#[test]
fn sentinel_heart_rate_is_treated_as_absent() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 0xff);
    let xml = convert(&encoder.finish()).unwrap();
    assert!(!xml.contains("HeartRateBpm"));
}

#[test]
fn two_lap_boundaries_partition_the_track() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    // Lap message: start_time u32.
    encoder.definition(1, 19, &[(2, 4, 0x86)]);
    record(&mut encoder, 1000, 120);
    record(&mut encoder, 1001, 121);
    encoder.data(1, &1000u32.to_le_bytes());
    record(&mut encoder, 1002, 130);
    record(&mut encoder, 1003, 131);
    record(&mut encoder, 1004, 132);
    encoder.data(1, &1002u32.to_le_bytes());
    let xml = convert(&encoder.finish()).unwrap();

    assert_eq!(count_of(&xml, "<Lap "), 2);
    assert_eq!(count_of(&xml, "<Trackpoint>"), 5);
    let first_track = &xml[..xml.find("</Lap>").unwrap()];
    assert_eq!(count_of(first_track, "<Trackpoint>"), 2);
}

#[test]
fn wrong_file_type_is_rejected() {
    let mut encoder = FitEncoder::new();
    encoder.definition(0, 0, &[(0, 1, 0x00)]).data(0, &[6]);
    let error = convert(&encoder.finish()).unwrap_err();
    assert!(matches!(error, Error::WrongFileType { found: 6 }));
}

#[test]
fn record_before_file_id_is_rejected() {
    let mut encoder = FitEncoder::new();
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 120);
    let error = convert(&encoder.finish()).unwrap_err();
    assert!(matches!(error, Error::MissingFileId));
}

#[test]
fn truncated_stream_is_unexpected_end_of_data() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 120);
    let bytes = encoder.finish();
    let error = convert(&bytes[..bytes.len() - 6]).unwrap_err();
    assert!(matches!(error, Error::UnexpectedEndOfData { .. }));
}

#[test]
fn corrupt_trailing_checksum_is_tolerated() {
    let mut encoder = FitEncoder::new();
    file_id(&mut encoder);
    record_definition(&mut encoder);
    record(&mut encoder, 1000, 120);
    let mut bytes = encoder.finish();
    let end = bytes.len();
    bytes[end - 1] ^= 0xff;
    bytes[end - 2] ^= 0xff;
    let xml = convert(&bytes).unwrap();
    assert_eq!(trackpoints_of(&xml).len(), 1);
}

#[test]
fn parallel_conversions_match_serial_ones() {
    use rayon::prelude::*;

    let files: Vec<Vec<u8>> = (0..8u32)
        .map(|n| {
            let mut encoder = FitEncoder::new();
            file_id(&mut encoder);
            record_definition(&mut encoder);
            for i in 0..20u32 {
                record(&mut encoder, 5000 + n * 100 + i, 90 + (i % 60) as u8);
            }
            encoder.finish()
        })
        .collect();

    let serial: Vec<String> = files.iter().map(|f| convert(f).unwrap()).collect();
    let parallel: Vec<String> = files.par_iter().map(|f| convert(f).unwrap()).collect();
    assert_eq!(serial, parallel);
}
