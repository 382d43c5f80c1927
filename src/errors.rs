use thiserror::Error;

/// Failures surfaced by the conversion pipeline.
///
/// Structural decode errors abort the conversion of the current file and
/// carry the byte offset at which decoding stopped. Checksum mismatches are
/// not errors; they are reported through `log::warn!` and conversion
/// continues.
#[derive(Debug, Error)]
pub enum Error {
    /// The four-byte tag in the file header is not `.FIT`.
    #[error("not a FIT file: header tag {found:02x?}, expected \".FIT\"")]
    NotAFitFile { found: [u8; 4] },

    /// The length of the file header is not supported. Should be either 12 or 14 bytes.
    #[error("unsupported file header length {found}, expected 12 or 14")]
    InvalidHeaderSize { found: u8 },

    /// A record was truncated, or the header declared a data section larger
    /// than the bytes supplied.
    #[error("unexpected end of data at byte offset {position}")]
    UnexpectedEndOfData { position: usize },

    /// A data record is bound to a local message type that has no active
    /// message definition. Indicates a corrupt or out-of-order stream.
    #[error("data record at byte offset {position} (header {header:#04x}) has no active message definition")]
    UndefinedLocalType { position: usize, header: u8 },

    /// A definition record declares a data message longer than 255 bytes.
    #[error("definition at byte offset {position} (header {header:#04x}) declares a {length}-byte message")]
    InvalidMessageLength {
        position: usize,
        header: u8,
        length: usize,
    },

    /// The file_id message declares a file type other than "activity".
    #[error("file type {found} is not an activity file")]
    WrongFileType { found: u8 },

    /// A record message arrived before any file_id message.
    #[error("record message encountered before any file_id message")]
    MissingFileId,

    /// A record carries a compressed timestamp but no absolute timestamp has
    /// been seen to reconstruct it against.
    #[error("compressed timestamp with no preceding absolute timestamp")]
    MissingTimestampReference,

    /// The TCX writer failed. Only reachable through the underlying sink.
    #[error("failed to write TCX document: {0}")]
    Xml(#[from] quick_xml::Error),
}
