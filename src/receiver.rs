//! Frame synchronization and demultiplexing of a sliced 4FSK bit stream.
//!
//! The receiver hunts for one of the three 16-bit sync words, then
//! descrambles and de-interleaves the 368 bits that follow into the
//! sub-fields of the detected frame type.

use log::debug;

use crate::consts::{
    CUT_FRAME_BITS, LICH_BITS, LSF_SYNC, PACKET_SYNC, STREAM_PAYLOAD_BITS, STREAM_SYNC, SYNC_BITS,
};

/// Whitening sequence applied to every frame after the sync word.
const SCRAMBLER: [u8; CUT_FRAME_BITS] = [
    1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1,
    1, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0,
    1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0,
    1, 0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 0,
    1, 0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 0,
    1, 1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0,
    1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 0, 1, 1, 1, 0, 1,
    0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 0, 0, 0,
    0, 1, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1,
    1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 1,
    1, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 0, 1, 1, 1, 0,
    0, 1, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1,
    0, 0, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 0, 1, 0,
    0, 0, 0, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 1, 0,
    1, 1, 0, 0, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1, 1, 0,
    0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1,
    1, 1, 0, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0,
    1, 1, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 1,
    1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1, 1,
    0, 1, 0, 1, 0, 1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0,
    0, 0, 1, 0, 1, 1, 0, 1, 0, 0, 1, 0, 1, 0, 0, 1,
    0, 1, 1, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1,
];

/// Bit permutation applied to every frame after the sync word. The bit
/// received at position `pos` belongs at index `INTERLEAVER[pos]` of the
/// de-interleaved frame.
const INTERLEAVER: [u16; CUT_FRAME_BITS] = [
    0, 137, 90, 227, 180, 317, 270, 39, 360, 129, 82, 219, 172, 309, 262, 31,
    352, 121, 74, 211, 164, 301, 254, 23, 344, 113, 66, 203, 156, 293, 246, 15,
    336, 105, 58, 195, 148, 285, 238, 7, 328, 97, 50, 187, 140, 277, 230, 367,
    320, 89, 42, 179, 132, 269, 222, 359, 312, 81, 34, 171, 124, 261, 214, 351,
    304, 73, 26, 163, 116, 253, 206, 343, 296, 65, 18, 155, 108, 245, 198, 335,
    288, 57, 10, 147, 100, 237, 190, 327, 280, 49, 2, 139, 92, 229, 182, 319,
    272, 41, 362, 131, 84, 221, 174, 311, 264, 33, 354, 123, 76, 213, 166, 303,
    256, 25, 346, 115, 68, 205, 158, 295, 248, 17, 338, 107, 60, 197, 150, 287,
    240, 9, 330, 99, 52, 189, 142, 279, 232, 1, 322, 91, 44, 181, 134, 271,
    224, 361, 314, 83, 36, 173, 126, 263, 216, 353, 306, 75, 28, 165, 118, 255,
    208, 345, 298, 67, 20, 157, 110, 247, 200, 337, 290, 59, 12, 149, 102, 239,
    192, 329, 282, 51, 4, 141, 94, 231, 184, 321, 274, 43, 364, 133, 86, 223,
    176, 313, 266, 35, 356, 125, 78, 215, 168, 305, 258, 27, 348, 117, 70, 207,
    160, 297, 250, 19, 340, 109, 62, 199, 152, 289, 242, 11, 332, 101, 54, 191,
    144, 281, 234, 3, 324, 93, 46, 183, 136, 273, 226, 363, 316, 85, 38, 175,
    128, 265, 218, 355, 308, 77, 30, 167, 120, 257, 210, 347, 300, 69, 22, 159,
    112, 249, 202, 339, 292, 61, 14, 151, 104, 241, 194, 331, 284, 53, 6, 143,
    96, 233, 186, 323, 276, 45, 366, 135, 88, 225, 178, 315, 268, 37, 358, 127,
    80, 217, 170, 307, 260, 29, 350, 119, 72, 209, 162, 299, 252, 21, 342, 111,
    64, 201, 154, 291, 244, 13, 334, 103, 56, 193, 146, 283, 236, 5, 326, 95,
    48, 185, 138, 275, 228, 365, 318, 87, 40, 177, 130, 267, 220, 357, 310, 79,
    32, 169, 122, 259, 212, 349, 302, 71, 24, 161, 114, 251, 204, 341, 294, 63,
    16, 153, 106, 243, 196, 333, 286, 55, 8, 145, 98, 235, 188, 325, 278, 47,
];

/// The three defined frame types, identified by sync word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameType {
    LinkSetup,
    Stream,
    Packet,
}

/// A fully accumulated frame, split into its de-interleaved sub-fields.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent<'a> {
    /// The coded link setup channel of a standalone link setup frame.
    LinkSetup(&'a [u8; CUT_FRAME_BITS]),
    /// The LICH sub-field and coded payload channel of a stream frame.
    Stream {
        lich: &'a [u8; LICH_BITS],
        payload: &'a [u8; STREAM_PAYLOAD_BITS],
    },
    /// The LICH sub-field and coded payload channel of a packet frame.
    Packet {
        lich: &'a [u8; LICH_BITS],
        payload: &'a [u8; STREAM_PAYLOAD_BITS],
    },
}

enum State {
    /// Hunting for a sync word.
    Searching,
    /// Accumulating the 368 bits following a sync word.
    Accumulating { kind: FrameType, pos: usize },
}

/// Searches a bit stream for frames and splits them into sub-fields.
pub struct FrameReceiver {
    state: State,
    window: u16,
    lsf: [u8; CUT_FRAME_BITS],
    lich: [u8; LICH_BITS],
    payload: [u8; STREAM_PAYLOAD_BITS],
}

impl FrameReceiver {
    /// Construct a new `FrameReceiver` in the searching state.
    pub fn new() -> FrameReceiver {
        FrameReceiver {
            state: State::Searching,
            window: 0,
            lsf: [0; CUT_FRAME_BITS],
            lich: [0; LICH_BITS],
            payload: [0; STREAM_PAYLOAD_BITS],
        }
    }

    /// Feed in a single bit, producing an event when it completes a frame.
    pub fn feed(&mut self, bit: u8) -> Option<FrameEvent> {
        match self.state {
            State::Searching => {
                self.window = self.window << 1 | bit as u16;

                if let Some(kind) = sync_type(self.window) {
                    debug!("sync detected: {:?}", kind);
                    self.state = State::Accumulating { kind, pos: 0 };
                }

                None
            }
            State::Accumulating { kind, pos } => {
                let bit = bit ^ SCRAMBLER[pos];
                let idx = INTERLEAVER[pos] as usize;

                match kind {
                    FrameType::LinkSetup => self.lsf[idx] = bit,
                    FrameType::Stream | FrameType::Packet => {
                        if idx < LICH_BITS {
                            self.lich[idx] = bit;
                        } else {
                            self.payload[idx - LICH_BITS] = bit;
                        }
                    }
                }

                if pos + 1 == CUT_FRAME_BITS {
                    self.state = State::Searching;
                    self.window = 0;

                    Some(match kind {
                        FrameType::LinkSetup => FrameEvent::LinkSetup(&self.lsf),
                        FrameType::Stream => FrameEvent::Stream {
                            lich: &self.lich,
                            payload: &self.payload,
                        },
                        FrameType::Packet => FrameEvent::Packet {
                            lich: &self.lich,
                            payload: &self.payload,
                        },
                    })
                } else {
                    self.state = State::Accumulating { kind, pos: pos + 1 };
                    None
                }
            }
        }
    }
}

fn sync_type(window: u16) -> Option<FrameType> {
    match window {
        LSF_SYNC => Some(FrameType::LinkSetup),
        STREAM_SYNC => Some(FrameType::Stream),
        PACKET_SYNC => Some(FrameType::Packet),
        _ => None,
    }
}

/// Expand a sync word to its 16 transmitted bits.
pub fn sync_bits(word: u16) -> [u8; SYNC_BITS] {
    let mut bits = [0; SYNC_BITS];

    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (word >> (15 - i) & 1) as u8;
    }

    bits
}

/// Scramble and interleave a de-interleaved frame into its 368 transmitted
/// bits, for loopback use.
pub fn interleave(frame: &[u8; CUT_FRAME_BITS]) -> [u8; CUT_FRAME_BITS] {
    let mut out = [0; CUT_FRAME_BITS];

    for (pos, bit) in out.iter_mut().enumerate() {
        *bit = frame[INTERLEAVER[pos] as usize] ^ SCRAMBLER[pos];
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_tables() {
        // The interleaver must be a permutation of the frame positions.
        let mut seen = [false; CUT_FRAME_BITS];
        for &idx in INTERLEAVER.iter() {
            assert!(!seen[idx as usize]);
            seen[idx as usize] = true;
        }

        // Sync words read off MSB-first.
        assert_eq!(
            sync_bits(LSF_SYNC),
            [0, 1, 0, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 1, 1, 1]
        );
        assert_eq!(
            sync_bits(STREAM_SYNC),
            [1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 0, 1]
        );
        assert_eq!(
            sync_bits(PACKET_SYNC),
            [0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1]
        );
    }

    #[test]
    fn test_stream_framing() {
        let mut frame = [0; CUT_FRAME_BITS];
        for (i, bit) in frame.iter_mut().enumerate() {
            *bit = (i * 7 % 3 == 0) as u8;
        }

        let mut recv = FrameReceiver::new();

        // Some leading noise before the sync word.
        for bit in [0, 0, 1, 0, 1, 1] {
            assert_eq!(recv.feed(bit), None);
        }

        for bit in sync_bits(STREAM_SYNC) {
            assert_eq!(recv.feed(bit), None);
        }

        let sent = interleave(&frame);
        let mut event = None;

        for (i, &bit) in sent.iter().enumerate() {
            match recv.feed(bit) {
                Some(e) => {
                    assert_eq!(i, CUT_FRAME_BITS - 1);
                    event = Some(match e {
                        FrameEvent::Stream { lich, payload } => (*lich, *payload),
                        e => panic!("unexpected event {:?}", e),
                    });
                }
                None => assert!(i < CUT_FRAME_BITS - 1),
            }
        }

        let (lich, payload) = event.unwrap();
        assert_eq!(lich[..], frame[..LICH_BITS]);
        assert_eq!(payload[..], frame[LICH_BITS..]);
    }

    #[test]
    fn test_link_setup_framing() {
        let mut frame = [0; CUT_FRAME_BITS];
        frame[3] = 1;
        frame[100] = 1;
        frame[367] = 1;

        let mut recv = FrameReceiver::new();

        for bit in sync_bits(LSF_SYNC) {
            assert_eq!(recv.feed(bit), None);
        }

        let sent = interleave(&frame);
        for &bit in &sent[..CUT_FRAME_BITS - 1] {
            assert_eq!(recv.feed(bit), None);
        }

        assert_eq!(
            recv.feed(sent[CUT_FRAME_BITS - 1]),
            Some(FrameEvent::LinkSetup(&frame))
        );
    }

    #[test]
    fn test_sync_uniqueness() {
        let mut rng = rand::thread_rng();

        for _ in 0..10_000 {
            let word: u16 = rng.gen();

            if word != LSF_SYNC && word != STREAM_SYNC && word != PACKET_SYNC {
                assert_eq!(sync_type(word), None);
            }
        }

        // No single bit flip turns one sync word into another.
        for sync in [LSF_SYNC, STREAM_SYNC, PACKET_SYNC] {
            for i in 0..16 {
                let flipped = sync ^ (1 << i);
                assert!(sync_type(flipped) != sync_type(sync));
            }
        }
    }

    #[test]
    fn test_sync_ignored_mid_frame() {
        let mut recv = FrameReceiver::new();

        for bit in sync_bits(STREAM_SYNC) {
            assert_eq!(recv.feed(bit), None);
        }

        // Raw bits that spell out sync words repeatedly must not restart
        // accumulation.
        let pattern = sync_bits(LSF_SYNC);
        let mut events = 0;

        for i in 0..CUT_FRAME_BITS {
            if recv.feed(pattern[i % SYNC_BITS]).is_some() {
                events += 1;
                assert_eq!(i, CUT_FRAME_BITS - 1);
            }
        }

        assert_eq!(events, 1);
    }

    #[test]
    fn test_back_to_back_frames() {
        let frame = [1; CUT_FRAME_BITS];
        let sent = interleave(&frame);

        let mut recv = FrameReceiver::new();
        let mut events = 0;

        for _ in 0..3 {
            for bit in sync_bits(STREAM_SYNC) {
                assert_eq!(recv.feed(bit), None);
            }

            for &bit in sent.iter() {
                if recv.feed(bit).is_some() {
                    events += 1;
                }
            }
        }

        assert_eq!(events, 3);
    }
}
