//! Encoding and decoding for the error correction codes used by M17.

pub mod conv;
pub mod golay;
