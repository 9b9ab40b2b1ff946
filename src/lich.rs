//! Decoding and reassembly of the Link Information Channel, which spreads a
//! copy of the link setup frame over the 6 frames of a stream superframe.

use log::debug;

use crate::coding::golay;
use crate::consts::{
    LICH_BITS, LICH_CHUNKS, LICH_CHUNK_BYTES, LICH_CHUNK_DATA_BYTES, LSF_BYTES,
};
use crate::error::{M17Error, Result};

/// Decode the four Golay blocks of a 96-bit LICH sub-field into its 6 chunk
/// bytes.
///
/// Any uncorrectable block abandons the whole chunk; a partially decoded
/// chunk is never returned.
pub fn decode_chunk(coded: &[u8; LICH_BITS]) -> Result<[u8; LICH_CHUNK_BYTES]> {
    let mut chunk = [0; LICH_CHUNK_BYTES];

    for block in 0..4 {
        let mut word = 0;

        for (i, &bit) in coded[block * 24..][..24].iter().enumerate() {
            word |= (bit as u32) << (23 - i);
        }

        let (data, _) = golay::decode(word).ok_or(M17Error::GolayUnrecoverable)?;

        for i in 0..12 {
            let idx = block * 12 + i;
            chunk[idx / 8] |= ((data >> (11 - i) & 1) as u8) << (7 - idx % 8);
        }
    }

    Ok(chunk)
}

/// Encode 6 chunk bytes into the 96-bit Golay-coded sub-field, for loopback
/// use.
pub fn encode_chunk(chunk: &[u8; LICH_CHUNK_BYTES]) -> [u8; LICH_BITS] {
    let mut coded = [0; LICH_BITS];

    for block in 0..4 {
        let mut data = 0;

        for i in 0..12 {
            let idx = block * 12 + i;
            data = (data << 1) | (chunk[idx / 8] >> (7 - idx % 8) & 1) as u16;
        }

        let word = golay::encode(data);

        for (i, bit) in coded[block * 24..][..24].iter_mut().enumerate() {
            *bit = (word >> (23 - i) & 1) as u8;
        }
    }

    coded
}

/// Reassembles a link setup frame from the chunks spread across a superframe.
///
/// Chunks must arrive in part order: a part-0 chunk starts a new frame, any
/// gap in the sequence silently abandons it, and the part-5 chunk completes
/// it.
pub struct LichAssembler {
    lsf: [u8; LSF_BYTES],
    last: usize,
    active: bool,
}

impl LichAssembler {
    /// Construct a new `LichAssembler` with no frame in progress.
    pub fn new() -> LichAssembler {
        LichAssembler {
            lsf: [0; LSF_BYTES],
            last: 0,
            active: false,
        }
    }

    /// Fold in a decoded chunk, yielding the full 240-bit frame when its last
    /// part arrives in sequence.
    pub fn feed(&mut self, chunk: [u8; LICH_CHUNK_BYTES]) -> Option<[u8; LSF_BYTES]> {
        let part = (chunk[5] >> 5) as usize;

        if part == 0 {
            self.active = true;
            self.last = 0;
            self.store(0, &chunk);

            return None;
        }

        if !self.active {
            return None;
        }

        if part != self.last + 1 {
            debug!("lich discontinuity: part {} after {}", part, self.last);
            self.active = false;

            return None;
        }

        self.last = part;
        self.store(part, &chunk);

        if part == LICH_CHUNKS - 1 {
            self.active = false;
            Some(self.lsf)
        } else {
            None
        }
    }

    fn store(&mut self, part: usize, chunk: &[u8; LICH_CHUNK_BYTES]) {
        self.lsf[part * LICH_CHUNK_DATA_BYTES..][..LICH_CHUNK_DATA_BYTES]
            .copy_from_slice(&chunk[..LICH_CHUNK_DATA_BYTES]);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chunk(part: u8, fill: u8) -> [u8; LICH_CHUNK_BYTES] {
        [fill, fill, fill, fill, fill, part << 5]
    }

    #[test]
    fn test_chunk_round_trip() {
        let chunk = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xB0];
        let coded = encode_chunk(&chunk);
        assert_eq!(decode_chunk(&coded), Ok(chunk));
    }

    #[test]
    fn test_chunk_correction() {
        let chunk = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x40];
        let mut coded = encode_chunk(&chunk);

        // Up to 3 errors per block are corrected independently.
        coded[0] ^= 1;
        coded[10] ^= 1;
        coded[23] ^= 1;
        coded[30] ^= 1;
        coded[80] ^= 1;

        assert_eq!(decode_chunk(&coded), Ok(chunk));
    }

    #[test]
    fn test_chunk_unrecoverable() {
        let chunk = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x40];
        let mut coded = encode_chunk(&chunk);

        // Four errors in one block abandon the whole chunk.
        coded[24] ^= 1;
        coded[25] ^= 1;
        coded[26] ^= 1;
        coded[27] ^= 1;

        assert_eq!(decode_chunk(&coded), Err(M17Error::GolayUnrecoverable));
    }

    #[test]
    fn test_reassembly() {
        let mut asm = LichAssembler::new();

        for part in 0..5 {
            assert_eq!(asm.feed(chunk(part, part + 1)), None);
        }

        let lsf = asm.feed(chunk(5, 6)).unwrap();

        for part in 0..6 {
            assert_eq!(lsf[part * 5..][..5], [part as u8 + 1; 5]);
        }
    }

    #[test]
    fn test_reassembly_discontinuity() {
        let mut asm = LichAssembler::new();

        assert_eq!(asm.feed(chunk(0, 1)), None);
        assert_eq!(asm.feed(chunk(1, 2)), None);
        // Skipping part 2 abandons the frame.
        assert_eq!(asm.feed(chunk(3, 4)), None);

        // No partial emission, even if the remaining parts arrive.
        assert_eq!(asm.feed(chunk(4, 5)), None);
        assert_eq!(asm.feed(chunk(5, 6)), None);

        // A fresh part 0 restarts cleanly.
        for part in 0..5 {
            assert_eq!(asm.feed(chunk(part, 9)), None);
        }
        assert!(asm.feed(chunk(5, 9)).is_some());
    }

    #[test]
    fn test_requires_start() {
        let mut asm = LichAssembler::new();

        // Chunks before the first part-0 are ignored.
        assert_eq!(asm.feed(chunk(3, 1)), None);
        assert_eq!(asm.feed(chunk(4, 1)), None);
        assert_eq!(asm.feed(chunk(5, 1)), None);
    }
}
