//! Receiver for the M17 digital voice protocol, from sliced 4FSK symbols
//! through frame synchronization, forward error correction, and link setup
//! decoding to codec2 audio.
//!
//! The pieces can be used standalone, or assembled into a threaded
//! [`pipeline::Pipeline`] that moves batches between stages over the
//! double-buffered channels in [`stream`].

/// Slicing soft 4FSK symbols to bits.
pub mod baseband;
/// Packing bits into bytes and back.
pub mod bits;
/// Error correction codes.
pub mod coding;
/// Protocol constants.
pub mod consts;
/// Frame checksums.
pub mod crc;
/// Error types.
pub mod error;
/// Depuncturing and channel decoding.
pub mod fec;
/// Link information channel reassembly.
pub mod lich;
/// Link setup frame semantics.
pub mod lsf;
/// Threaded receive pipeline.
pub mod pipeline;
/// Frame synchronization and demultiplexing.
pub mod receiver;
/// Double-buffered inter-stage channels.
pub mod stream;
/// Voice stream tracking and audio synthesis.
pub mod voice;
