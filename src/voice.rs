//! Voice stream liveness tracking and codec playout.
//!
//! Stream frames carry a rolling 15-bit frame number; reception starts on the
//! first consecutive pair, survives a single dropped or reordered frame, and
//! ends after half a second without continuity. The 16-byte codec payload of
//! each live frame holds two independent codec frames, decoded and duplicated
//! into interleaved stereo.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use codec2::{Codec2, Codec2Mode};
use collect_slice::CollectSlice;
use log::debug;

use crate::consts::{FN_END, FN_MODULUS, PAYLOAD_BYTES, STREAM_TIMEOUT};

/// One interleaved stereo sample.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Stereo {
    pub left: f32,
    pub right: f32,
}

/// Frame-number continuity state for one voice stream.
pub struct Liveness {
    receiving: bool,
    last_fn: u16,
    last_conseq: Instant,
}

impl Liveness {
    /// Construct a new `Liveness` in the idle state.
    pub fn new(now: Instant) -> Liveness {
        Liveness {
            receiving: false,
            last_fn: 0,
            last_conseq: now,
        }
    }

    /// Distance of the given frame number from the last one under the 15-bit
    /// rollover. The end-of-stream flag vanishes in the modulus.
    fn distance(&self, fn_: u16) -> u16 {
        ((fn_ as u32 + 0x10000 - self.last_fn as u32) % FN_MODULUS) as u16
    }

    fn timed_out(&self, now: Instant) -> bool {
        now.duration_since(self.last_conseq) > STREAM_TIMEOUT
    }

    /// Fold in a received frame number and report whether the stream is live.
    ///
    /// A non-consecutive frame inside the timeout window neither stops
    /// reception nor refreshes the timestamp, absorbing a single dropped or
    /// out-of-order frame.
    pub fn update(&mut self, fn_: u16, now: Instant) -> bool {
        let conseq = self.distance(fn_) == 1;

        if !self.receiving && conseq {
            debug!("voice stream opened at fn {:#06x}", fn_);
            self.receiving = true;
            self.last_conseq = now;
        } else if self.receiving && conseq {
            self.last_conseq = now;
        } else if self.receiving && !conseq && self.timed_out(now) {
            debug!("voice stream closed at fn {:#06x}", fn_);
            self.receiving = false;
        }

        if fn_ & FN_END != 0 {
            debug!("end-of-stream flag at fn {:#06x}", fn_);
        }

        self.last_fn = fn_;
        self.receiving
    }

    /// Pull-style check: receiving and not yet timed out. Causes no
    /// transition.
    pub fn is_receiving(&self, now: Instant) -> bool {
        self.receiving && !self.timed_out(now)
    }
}

/// Cloneable handle for polling stream state across threads, e.g. from a UI
/// thread concurrent with the decode thread.
#[derive(Clone)]
pub struct SharedLiveness(Arc<Mutex<Liveness>>);

impl SharedLiveness {
    pub fn new() -> SharedLiveness {
        SharedLiveness(Arc::new(Mutex::new(Liveness::new(Instant::now()))))
    }

    /// Whether a voice stream is currently live.
    pub fn is_receiving(&self) -> bool {
        self.0.lock().unwrap().is_receiving(Instant::now())
    }

    fn update(&self, fn_: u16) -> bool {
        self.0.lock().unwrap().update(fn_, Instant::now())
    }
}

/// Decodes live voice payload frames into stereo audio.
pub struct VoiceDecoder {
    codec: Codec2,
    liveness: SharedLiveness,
    samples: Vec<i16>,
    samples_per_frame: usize,
}

impl VoiceDecoder {
    /// Construct a new `VoiceDecoder` updating the given stream state.
    pub fn new(liveness: SharedLiveness) -> VoiceDecoder {
        let codec = Codec2::new(Codec2Mode::MODE_3200);
        let samples_per_frame = codec.samples_per_frame();

        VoiceDecoder {
            codec,
            liveness,
            samples: vec![0; samples_per_frame * 2],
            samples_per_frame,
        }
    }

    /// Stereo samples produced per payload frame.
    pub fn samples_per_payload(&self) -> usize {
        self.samples_per_frame * 2
    }

    /// Consume one 18-byte payload frame, writing its audio into `audio` when
    /// the stream is live.
    ///
    /// Returns the number of stereo samples written; zero means the frame was
    /// consumed without playout.
    pub fn feed(&mut self, frame: &[u8; PAYLOAD_BYTES], audio: &mut [Stereo]) -> usize {
        let fn_ = u16::from_be_bytes([frame[0], frame[1]]);

        if !self.liveness.update(fn_) {
            return 0;
        }

        let (first, second) = self.samples.split_at_mut(self.samples_per_frame);
        self.codec.decode(first, &frame[2..10]);
        self.codec.decode(second, &frame[10..18]);

        let count = self.samples.len();
        self.samples
            .iter()
            .map(|&s| {
                let v = s as f32 / 32768.0;
                Stereo { left: v, right: v }
            })
            .collect_slice_checked(&mut audio[..count]);

        count
    }

    /// Whether a voice stream is currently live.
    pub fn is_receiving(&self) -> bool {
        self.liveness.is_receiving()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wraparound_distance() {
        let now = Instant::now();
        let mut live = Liveness::new(now);

        live.last_fn = 0x7FFE;
        assert_eq!(live.distance(0x7FFF), 1);
        // The 15-bit rollover is two steps away, not a 32k jump.
        assert_eq!(live.distance(0x0000), 2);

        live.last_fn = 0x7FFF;
        assert_eq!(live.distance(0x0000), 1);

        // End-of-stream flags don't disturb the distance.
        live.last_fn = 0x0005;
        assert_eq!(live.distance(FN_END | 0x0006), 1);
    }

    #[test]
    fn test_transitions() {
        let now = Instant::now();
        let mut live = Liveness::new(now);

        // A lone frame far from the baseline doesn't open the stream.
        assert!(!live.update(5, now));
        // Its consecutive successor does.
        assert!(live.update(6, now));
        assert!(live.is_receiving(now));

        // One non-consecutive frame inside the window is absorbed.
        let later = now + Duration::from_millis(100);
        assert!(live.update(9, later));
        assert!(live.is_receiving(later));

        // But it doesn't refresh the timestamp, so the stream still times out
        // 500ms after the last consecutive frame.
        let expired = now + Duration::from_millis(601);
        assert!(!live.is_receiving(expired));
        assert!(!live.update(20, expired));
    }

    #[test]
    fn test_timeout_is_pull_based() {
        let now = Instant::now();
        let mut live = Liveness::new(now);

        live.update(1, now);
        assert!(live.is_receiving(now));

        // No further frames at all: the query alone reports the stream over.
        assert!(live.is_receiving(now + Duration::from_millis(500)));
        assert!(!live.is_receiving(now + Duration::from_millis(501)));
    }

    #[test]
    fn test_reopen_after_timeout() {
        let now = Instant::now();
        let mut live = Liveness::new(now);

        assert!(live.update(1, now));

        // Far-future discontinuity closes the stream...
        let later = now + Duration::from_secs(2);
        assert!(!live.update(100, later));

        // ...and a fresh consecutive pair reopens it.
        assert!(live.update(101, later));
        assert!(live.is_receiving(later));
    }
}
