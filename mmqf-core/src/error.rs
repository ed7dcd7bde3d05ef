use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("unsupported version {found} (supported range is {min}..={max})")]
    VersionUnsupported { found: u8, min: u8, max: u8 },

    #[error("header checksum mismatch")]
    ChecksumMismatch,

    #[error("file truncated: header reports length {expected}, file is {actual} bytes")]
    FileTruncated { expected: u64, actual: u64 },

    #[error("geometry mismatch: file has capacity={file_capacity} slot_size={file_slot_size}, requested capacity={requested_capacity} slot_size={requested_slot_size}")]
    GeometryMismatch {
        file_capacity: u32,
        file_slot_size: u32,
        requested_capacity: u32,
        requested_slot_size: u32,
    },

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("advisory lock unavailable")]
    LockUnavailable,

    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: u64, found: u64 },

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,

    #[error("bounds error: {0}")]
    BoundsError(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    ///
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::InvalidFormat(_) => "INVALID_FORMAT",
            Error::VersionUnsupported { .. } => "VERSION_UNSUPPORTED",
            Error::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Error::FileTruncated { .. } => "FILE_TRUNCATED",
            Error::GeometryMismatch { .. } => "GEOMETRY_MISMATCH",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::LockUnavailable => "LOCK_UNAVAILABLE",
            Error::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Error::Full => "QUEUE_FULL",
            Error::Empty => "QUEUE_EMPTY",
            Error::BoundsError(_) => "BOUNDS_ERROR",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }

    /// Returns true if the failure is transient and a caller might reasonably
    /// retry the surrounding operation (not the same thing as `Full`/`Empty`,
    /// which are ordinary outcomes rather than errors at the process-level API).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::LockUnavailable => true,
            Error::InvalidFormat(_) => false,
            Error::VersionUnsupported { .. } => false,
            Error::ChecksumMismatch => false,
            Error::FileTruncated { .. } => false,
            Error::GeometryMismatch { .. } => false,
            Error::AlreadyExists(_) => false,
            Error::SchemaMismatch { .. } => false,
            Error::Full => false,
            Error::Empty => false,
            Error::BoundsError(_) => false,
            Error::InvalidArgument(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
