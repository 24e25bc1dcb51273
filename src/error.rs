//! Error types for Ogg framing and Opus header codecs

use thiserror::Error;

/// Result type for opustags operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of outcome kinds.
///
/// Every [`Error`] maps to exactly one kind, and each kind has its own
/// process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    BadArguments = 1,
    IntOverflow = 2,
    StandardError = 3,
    EndOfFile = 4,
    OggError = 5,
    BadIdentificationHeader = 6,
    BadMagicNumber = 7,
    OverflowingMagicNumber = 8,
    OverflowingVendorData = 9,
    OverflowingCommentCount = 10,
    OverflowingCommentLength = 11,
    OverflowingCommentData = 12,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// opustags error types
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid command-line configuration
    #[error("{0}")]
    BadArguments(String),

    /// A length does not fit its 32-bit field
    #[error("{field} is {value} bytes long, which does not fit in 32 bits")]
    IntOverflow { field: &'static str, value: usize },

    /// IO error, with the message reported by the operating system
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The input ran out at a page boundary
    #[error("end of file")]
    EndOfFile,

    /// Malformed page or packet framing
    #[error("Ogg framing error: {0}")]
    Ogg(String),

    /// OpusHead failed its structural checks
    #[error("bad identification header: {0}")]
    BadIdentificationHeader(&'static str),

    #[error("comment header does not start with the OpusTags magic number")]
    BadMagicNumber,

    #[error("comment header is cut in its magic number or vendor length ({size} bytes)")]
    OverflowingMagicNumber { size: usize },

    #[error("vendor string declares {declared} bytes at offset {offset}, only {available} left")]
    OverflowingVendorData {
        offset: usize,
        declared: u32,
        available: usize,
    },

    #[error("comment count at offset {offset} is cut by the end of the packet")]
    OverflowingCommentCount { offset: usize },

    #[error("length of comment #{index} at offset {offset} is cut by the end of the packet")]
    OverflowingCommentLength { index: u32, offset: usize },

    #[error("comment #{index} declares {declared} bytes at offset {offset}, only {available} left")]
    OverflowingCommentData {
        index: u32,
        offset: usize,
        declared: u32,
        available: usize,
    },
}

impl Error {
    pub fn ogg(msg: impl Into<String>) -> Self {
        Error::Ogg(msg.into())
    }

    /// Status kind of this error
    pub fn status(&self) -> Status {
        match self {
            Error::BadArguments(_) => Status::BadArguments,
            Error::IntOverflow { .. } => Status::IntOverflow,
            Error::Io(_) => Status::StandardError,
            Error::EndOfFile => Status::EndOfFile,
            Error::Ogg(_) => Status::OggError,
            Error::BadIdentificationHeader(_) => Status::BadIdentificationHeader,
            Error::BadMagicNumber => Status::BadMagicNumber,
            Error::OverflowingMagicNumber { .. } => Status::OverflowingMagicNumber,
            Error::OverflowingVendorData { .. } => Status::OverflowingVendorData,
            Error::OverflowingCommentCount { .. } => Status::OverflowingCommentCount,
            Error::OverflowingCommentLength { .. } => Status::OverflowingCommentLength,
            Error::OverflowingCommentData { .. } => Status::OverflowingCommentData,
        }
    }
}
