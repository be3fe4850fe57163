use std::fmt;
use std::io;

use derive_more::From;

/// Result of every store and index operation
pub type Result<T> = std::result::Result<T, Error>;

/// Error
///
/// The owner of a store+index pair is expected to branch on the kind:
///
///  * `EndOfData` means "not written yet", a normal outcome of probing offsets.
///  * `CapacityExhausted` means the index is full, time to roll a new pair.
///  * everything else is a fatal storage error.
///
#[derive(Debug, From)]
pub enum Error {
    Io(io::Error),

    /// Read past the bytes or entries written so far
    #[from(ignore)]
    EndOfData { offset: u64, size: u64 },

    /// The mapped region has no room for another entry
    #[from(ignore)]
    CapacityExhausted { size: u64, capacity: u64 },

    /// Index entries must be dense and increasing, starting at 0
    #[from(ignore)]
    OffsetOutOfOrder { expected: u32, actual: u32 },

    #[from(ignore)]
    Corrupted(String),
}

impl Error {
    pub fn is_end_of_data(&self) -> bool {
        match self {
            Error::EndOfData { .. } => true,
            _ => false,
        }
    }

    pub fn is_capacity_exhausted(&self) -> bool {
        match self {
            Error::CapacityExhausted { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::EndOfData { offset, size } => {
                write!(f, "end of data: offset {} with {} bytes written", offset, size)
            }
            Error::CapacityExhausted { size, capacity } => write!(
                f,
                "index capacity exhausted: {} of {} bytes used",
                size, capacity
            ),
            Error::OffsetOutOfOrder { expected, actual } => write!(
                f,
                "index offset out of order: expected {}, got {}",
                expected, actual
            ),
            Error::Corrupted(reason) => write!(f, "corrupted file: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}
