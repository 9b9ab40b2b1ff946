//! Standard errors that may occur when decoding M17.

use thiserror::Error;

/// M17 decoding errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum M17Error {
    /// Too many errors were detected when attempting a Golay decode of a LICH
    /// block.
    #[error("uncorrectable errors in Golay-coded LICH block")]
    GolayUnrecoverable,
    /// A reassembled link setup frame failed its CRC check.
    #[error("link setup frame failed CRC check")]
    LsfCrc,
}

/// Standard result using `M17Error`.
pub type Result<T> = std::result::Result<T, M17Error>;
