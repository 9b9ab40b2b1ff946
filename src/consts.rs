use std::time::Duration;

/// Number of bits in a sync word.
pub const SYNC_BITS: usize = 16;
/// Number of bits in a complete frame, sync word included.
pub const RAW_FRAME_BITS: usize = 384;
/// Number of payload bits following the sync word.
pub const CUT_FRAME_BITS: usize = 368;
/// Number of bits in the LICH sub-field of a stream or packet frame.
pub const LICH_BITS: usize = 96;
/// Number of coded bits in the stream/packet sub-field that follows the LICH.
pub const STREAM_PAYLOAD_BITS: usize = CUT_FRAME_BITS - LICH_BITS;
/// Number of bits in an uncoded voice payload.
pub const PAYLOAD_BITS: usize = 144;
/// Number of coded bits in a voice payload, before puncturing.
pub const CODED_PAYLOAD_BITS: usize = 296;
/// Number of bits in an uncoded link setup frame.
pub const LSF_BITS: usize = 240;
/// Number of coded bits in a link setup frame, before puncturing.
pub const CODED_LSF_BITS: usize = 488;

/// Number of bytes in an uncoded link setup frame.
pub const LSF_BYTES: usize = LSF_BITS / 8;
/// Number of bytes in an uncoded voice payload (frame number + codec data).
pub const PAYLOAD_BYTES: usize = PAYLOAD_BITS / 8;
/// Number of bytes in a decoded LICH chunk, part index included.
pub const LICH_CHUNK_BYTES: usize = 6;
/// Number of LSF bytes carried by each LICH chunk.
pub const LICH_CHUNK_DATA_BYTES: usize = 5;
/// Number of chunks that reassemble into a full link setup frame.
pub const LICH_CHUNKS: usize = 6;

/// Sync word opening a link setup frame.
pub const LSF_SYNC: u16 = 0x55F7;
/// Sync word opening a voice stream frame.
pub const STREAM_SYNC: u16 = 0xFF5D;
/// Sync word opening a packet frame.
pub const PACKET_SYNC: u16 = 0x75FF;

/// Maximum frame number before the 15-bit rollover.
pub const FN_MAX: u16 = 0x7FFF;
/// End-of-stream flag carried in the frame number's top bit.
pub const FN_END: u16 = 0x8000;
/// Modulus for frame number distance arithmetic.
pub const FN_MODULUS: u32 = 0x8000;

/// Silence period after which a voice stream is considered over.
pub const STREAM_TIMEOUT: Duration = Duration::from_millis(500);

/// Magnitude threshold separating the inner and outer 4FSK deviation levels,
/// normalized to full deviation.
pub const HIGH_CUT: f32 = (1.0 + 1.0 / 3.0) / 2.0;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validate_params() {
        assert_eq!(SYNC_BITS + CUT_FRAME_BITS, RAW_FRAME_BITS);
        assert_eq!(LICH_BITS + STREAM_PAYLOAD_BITS, CUT_FRAME_BITS);
        assert_eq!(LICH_CHUNKS * LICH_CHUNK_DATA_BYTES, LSF_BYTES);
        // Coded sizes cover the uncoded payloads plus the convolutional tail.
        assert_eq!(CODED_LSF_BITS, (LSF_BITS + 4) * 2);
        assert_eq!(CODED_PAYLOAD_BITS, (PAYLOAD_BITS + 4) * 2);
    }
}
