//! Converts Garmin .FIT activity files into TCX workout documents.
//!
//! The pipeline is a single synchronous pass per file: decode the FIT record
//! stream, dispatch each message into a [`WorkoutBuilder`], then serialize
//! the accumulated hierarchy. Nothing is shared between conversions, so
//! independent files can be converted in parallel.
//!
//! ```no_run
//! let bytes = std::fs::read("ride.fit")?;
//! let xml = fit2tcx::convert(&bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod crc;
mod errors;
mod model;
mod parser;
mod profile;
mod tcx;
mod timestamp;
mod types;

pub use crate::builder::WorkoutBuilder;
pub use crate::crc::{checksum_of, crc};
pub use crate::errors::Error;
pub use crate::model::{Activity, Creator, Lap, Sport, Trackpoint};
pub use crate::profile::MessageKind;
pub use crate::timestamp::TIMESTAMP_OFFSET;
pub use crate::types::{
    FieldDefinition, FieldValue, FileHeader, Message, MessageDefinition, Record, RecordHeader,
    RecordType,
};

use log::warn;
use std::rc::Rc;

use crate::types::MessageDefinition as Definition;

/// A validated FIT file: parsed header plus the raw bytes.
#[derive(Debug)]
pub struct Fit<'a> {
    pub header: FileHeader,
    data: &'a [u8],
}

impl<'a> Fit<'a> {
    /// Parses and validates the file header. The format tag must read
    /// `.FIT`; the declared data section must fit in `bytes`. A header
    /// checksum mismatch is reported through `log::warn!` but does not
    /// fail: third-party devices drift on checksums often enough that
    /// rejecting them loses real workouts.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Fit<'a>, Error> {
        let (_, header) = parser::take_file_header(bytes)
            .map_err(|_| Error::UnexpectedEndOfData { position: 0 })?;
        if &header.tag != b".FIT" {
            return Err(Error::NotAFitFile { found: header.tag });
        }
        if header.length != 12 && header.length != 14 {
            return Err(Error::InvalidHeaderSize {
                found: header.length,
            });
        }
        if header.length as usize + header.data_size as usize > bytes.len() {
            return Err(Error::UnexpectedEndOfData {
                position: bytes.len(),
            });
        }
        if let Some(expected) = header.checksum {
            // A zero header checksum means "not computed".
            let computed = crc::checksum_of(&bytes[..12]);
            if expected != 0 && expected != computed {
                warn!(
                    "header checksum mismatch: found {expected:#06x}, computed {computed:#06x}"
                );
            }
        }
        Ok(Fit {
            header,
            data: bytes,
        })
    }

    /// Iterates over the records in the data section, ending with the
    /// trailing [`Record::Checksum`] when one is present. Decoding stops at
    /// the first structural error.
    pub fn records(&'a self) -> RecordIterator<'a> {
        RecordIterator {
            parser: FitParser::from(self),
            done: false,
        }
    }

    /// Computes the checksum the trailing CRC should hold: a fold over the
    /// header and data section.
    pub fn checksum(&self) -> u16 {
        let end = self.header.length as usize + self.header.data_size as usize;
        crc::checksum_of(&self.data[..end])
    }
}

/// Decoding state for one pass over the data section: the cursor, and the
/// active definition for each of the sixteen local message types. A later
/// definition for the same local type replaces the prior one.
struct FitParser<'a> {
    rest: &'a [u8],
    definitions: [Option<Rc<Definition>>; 16],
    /// Byte offset of `rest` from the start of the file, for error context.
    position: usize,
    /// File offset at which the data section ends and the trailing checksum
    /// begins.
    data_end: usize,
}

impl<'a> From<&'a Fit<'a>> for FitParser<'a> {
    fn from(fit: &'a Fit<'a>) -> Self {
        let header_length = fit.header.length as usize;
        FitParser {
            rest: &fit.data[header_length..],
            definitions: Default::default(),
            position: header_length,
            data_end: header_length + fit.header.data_size as usize,
        }
    }
}

impl<'a> FitParser<'a> {
    /// Decodes the next record, or `None` once the declared data section and
    /// trailing checksum are consumed.
    fn step(&mut self) -> Result<Option<Record<'a>>, Error> {
        use crate::types::RecordType;
        if self.position >= self.data_end {
            if self.rest.len() < 2 {
                return Ok(None);
            }
            let (_, value) = parser::take_checksum(self.rest).map_err(|_| self.eof())?;
            self.rest = &self.rest[self.rest.len()..];
            return Ok(Some(Record::Checksum(value)));
        }
        let (input, header) = parser::take_record_header(self.rest).map_err(|_| self.eof())?;
        match header.record_type() {
            RecordType::Definition => {
                let (input, definition) =
                    parser::take_message_definition(header)(input).map_err(|_| self.eof())?;
                self.advance(input);
                // No record may extend past the declared data section; bytes
                // beyond it belong to the trailing checksum.
                if self.position > self.data_end {
                    return Err(Error::UnexpectedEndOfData {
                        position: self.data_end,
                    });
                }
                if definition.length > 255 {
                    return Err(Error::InvalidMessageLength {
                        position: self.position,
                        header,
                        length: definition.length,
                    });
                }
                let definition = Rc::new(definition);
                self.definitions[header.local_type() as usize] = Some(Rc::clone(&definition));
                Ok(Some(Record::Definition(header, definition)))
            }
            RecordType::Data => {
                let definition = match &self.definitions[header.local_type() as usize] {
                    Some(definition) => Rc::clone(definition),
                    None => {
                        return Err(Error::UndefinedLocalType {
                            position: self.position,
                            header,
                        })
                    }
                };
                let (input, data) =
                    parser::take_message_data(definition.length)(input).map_err(|_| self.eof())?;
                self.advance(input);
                if self.position > self.data_end {
                    return Err(Error::UnexpectedEndOfData {
                        position: self.data_end,
                    });
                }
                Ok(Some(Record::Message(header, Message { definition, data })))
            }
        }
    }

    fn advance(&mut self, input: &'a [u8]) {
        self.position += self.rest.len() - input.len();
        self.rest = input;
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEndOfData {
            position: self.position,
        }
    }
}

/// Iterates records until the stream ends or a structural error occurs; the
/// error is yielded once and iteration then stops.
pub struct RecordIterator<'a> {
    parser: FitParser<'a>,
    done: bool,
}

impl<'a> Iterator for RecordIterator<'a> {
    type Item = Result<Record<'a>, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// Converts one FIT activity file into TCX text.
///
/// Structural decode errors abort the conversion; no partial document is
/// produced. A trailing checksum mismatch is logged and tolerated.
pub fn convert(bytes: &[u8]) -> Result<String, Error> {
    let fit = Fit::from_bytes(bytes)?;
    let mut builder = WorkoutBuilder::new();
    for record in fit.records() {
        match record? {
            Record::Definition(_, _) => {}
            Record::Message(header, message) => builder.handle(header, &message)?,
            Record::Checksum(found) => {
                let computed = fit.checksum();
                if found != computed {
                    warn!(
                        "file checksum mismatch: found {found:#06x}, computed {computed:#06x}"
                    );
                }
            }
        }
    }
    tcx::render(&builder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(data: &[u8]) -> Vec<u8> {
        let mut bytes = vec![14, 0x20, 0x6b, 0x08];
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b".FIT");
        let header_crc = checksum_of(&bytes);
        bytes.extend_from_slice(&header_crc.to_le_bytes());
        bytes.extend_from_slice(data);
        let crc = checksum_of(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    #[test]
    fn rejects_wrong_tag() {
        let mut bytes = file_with(&[]);
        bytes[8] = b'G';
        let error = Fit::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error, Error::NotAFitFile { .. }));
    }

    #[test]
    fn rejects_declared_size_past_end() {
        let mut bytes = file_with(&[]);
        bytes[4] = 200;
        let error = Fit::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error, Error::UnexpectedEndOfData { .. }));
    }

    #[test]
    fn data_record_without_definition_is_an_error() {
        // A single data record for local type 0, never defined.
        let bytes = file_with(&[0x00]);
        let fit = Fit::from_bytes(&bytes).unwrap();
        let error = fit.records().next().unwrap().unwrap_err();
        assert!(matches!(
            error,
            Error::UndefinedLocalType {
                position: 14,
                header: 0
            }
        ));
    }

    #[test]
    fn record_straddling_the_declared_end_is_an_error() {
        // A definition for local 0 (one 1-byte field), then a data record.
        let mut bytes = file_with(&[0x40, 0, 0, 20, 0, 1, 3, 1, 0x02, 0x00, 120]);
        // Shrink the declared data size so the boundary lands inside the
        // data record; its payload would otherwise eat the trailing CRC.
        bytes[4] = 10;
        let fit = Fit::from_bytes(&bytes).unwrap();
        let error = fit.records().find_map(Result::err).unwrap();
        assert!(matches!(error, Error::UnexpectedEndOfData { position: 24 }));
    }

    #[test]
    fn iteration_ends_with_the_trailing_checksum() {
        let bytes = file_with(&[]);
        let fit = Fit::from_bytes(&bytes).unwrap();
        let records: Vec<_> = fit.records().collect();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            Ok(Record::Checksum(value)) if value == fit.checksum()
        ));
    }
}
