//! Depuncturing and convolutional decoding for the two coded M17 channels.
//!
//! Both channels share the trellis code in `coding::conv` and differ only in
//! their puncture pattern and sizes: the link setup channel carries 488 coded
//! bits punctured to 368, the stream payload channel 296 coded bits punctured
//! to 272.

use crate::bits;
use crate::coding::conv::{self, ERASED};
use crate::consts::{
    CODED_LSF_BITS, CODED_PAYLOAD_BITS, CUT_FRAME_BITS, LSF_BITS, LSF_BYTES, PAYLOAD_BITS,
    PAYLOAD_BYTES, STREAM_PAYLOAD_BITS,
};

/// Puncture pattern for the link setup channel.
pub const PUNCTURE_LSF: [u8; 61] = [
    1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1,
    1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1,
    1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1,
    1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1,
];

/// Puncture pattern for the stream payload channel.
pub const PUNCTURE_STREAM: [u8; 12] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0];

/// Restore punctured positions as erasures, expanding `input` to the coded
/// length of `out`.
pub fn depuncture(input: &[u8], pattern: &[u8], out: &mut [u8]) {
    let mut pos = 0;

    for (i, slot) in out.iter_mut().enumerate() {
        if pattern[i % pattern.len()] == 0 {
            *slot = ERASED;
        } else {
            *slot = input[pos];
            pos += 1;
        }
    }

    assert_eq!(pos, input.len());
}

/// Drop coded bits at punctured positions, the inverse of `depuncture`.
/// Returns the number of bits written.
pub fn puncture(input: &[u8], pattern: &[u8], out: &mut [u8]) -> usize {
    let mut pos = 0;

    for (i, &bit) in input.iter().enumerate() {
        if pattern[i % pattern.len()] != 0 {
            out[pos] = bit;
            pos += 1;
        }
    }

    pos
}

/// Decode a demultiplexed link setup channel into its 30 frame bytes.
pub fn decode_link_setup(coded: &[u8; CUT_FRAME_BITS]) -> [u8; LSF_BYTES] {
    let mut depunctured = [0; CODED_LSF_BITS];
    depuncture(coded, &PUNCTURE_LSF, &mut depunctured);

    let mut decoded = [0; LSF_BITS];
    conv::decode(&depunctured, &mut decoded);

    let mut bytes = [0; LSF_BYTES];
    bits::pack(&decoded, &mut bytes);
    bytes
}

/// Decode a demultiplexed stream payload into its 18 bytes (frame number plus
/// codec data).
pub fn decode_stream_payload(coded: &[u8; STREAM_PAYLOAD_BITS]) -> [u8; PAYLOAD_BYTES] {
    let mut depunctured = [0; CODED_PAYLOAD_BITS];
    depuncture(coded, &PUNCTURE_STREAM, &mut depunctured);

    let mut decoded = [0; PAYLOAD_BITS];
    conv::decode(&depunctured, &mut decoded);

    let mut bytes = [0; PAYLOAD_BYTES];
    bits::pack(&decoded, &mut bytes);
    bytes
}

/// Encode 30 link setup bytes into the punctured 368-bit channel, for
/// loopback use.
pub fn encode_link_setup(frame: &[u8; LSF_BYTES]) -> [u8; CUT_FRAME_BITS] {
    let mut data = [0; LSF_BITS];
    bits::unpack(frame, &mut data);

    let mut coded = [0; CODED_LSF_BITS];
    conv::encode(&data, &mut coded);

    let mut punctured = [0; CUT_FRAME_BITS];
    let count = puncture(&coded, &PUNCTURE_LSF, &mut punctured);
    assert_eq!(count, CUT_FRAME_BITS);

    punctured
}

/// Encode 18 payload bytes into the punctured 272-bit channel, for loopback
/// use.
pub fn encode_stream_payload(payload: &[u8; PAYLOAD_BYTES]) -> [u8; STREAM_PAYLOAD_BITS] {
    let mut data = [0; PAYLOAD_BITS];
    bits::unpack(payload, &mut data);

    let mut coded = [0; CODED_PAYLOAD_BITS];
    conv::encode(&data, &mut coded);

    let mut punctured = [0; STREAM_PAYLOAD_BITS];
    let count = puncture(&coded, &PUNCTURE_STREAM, &mut punctured);
    assert_eq!(count, STREAM_PAYLOAD_BITS);

    punctured
}
