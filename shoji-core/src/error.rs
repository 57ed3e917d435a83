//! Error type shared by all public screen operations

use thiserror::Error;

/// Screen operation error
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A line id does not name any line currently held by the screen
    #[error("line id does not resolve to a known line")]
    InvalidId,

    /// A line iterator no longer refers to a live line
    #[error("iterator does not refer to a known row")]
    InvalidIterator,

    /// Invalid input (out-of-range index, empty query, zero dimension)
    #[error("invalid parameter")]
    ParameterError,

    /// An allocation failed; the operation degraded rather than crashed
    #[error("not enough memory to allocate required data structures")]
    NotEnoughMemory,

    /// An iterator was asked to move past either end of the buffer
    #[error("iterator cannot advance past the end of its list")]
    IteratorCannotAdvance,

    /// A reply had to be dropped because no session sink is attached
    #[error("no session is listening for terminal replies")]
    NoListeningSession,
}

/// Result type for screen operations
pub type Result<T> = std::result::Result<T, Error>;
