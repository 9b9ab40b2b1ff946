//! Encoding and decoding of the rate-1/2, constraint-length-5 convolutional
//! code protecting M17 link setup frames and stream payloads.
//!
//! Encoding shifts each input bit into a 5-bit register and outputs one parity
//! bit per generator polynomial. Decoding runs a hard-decision Viterbi search
//! over the 16-state trellis, assuming the encoder starts and ends in the zero
//! state (the encoder appends a zero tail to guarantee the latter).
//! Depunctured positions carry no channel information and are marked `ERASED`,
//! contributing nothing to any branch metric.

/// First generator polynomial, MSB = coefficient of the oldest register bit.
pub const G1: u8 = 0b11001;
/// Second generator polynomial.
pub const G2: u8 = 0b10111;

/// Memory of the code (constraint length minus one), which is also the length
/// of the zero tail.
pub const MEMORY: usize = 4;

/// Marks a coded position erased by puncturing.
pub const ERASED: u8 = 2;

const STATES: usize = 1 << MEMORY;

fn parity(word: u8) -> u8 {
    (word.count_ones() & 1) as u8
}

/// Hamming distance of a received bit from an expected one, with erasures
/// costing nothing.
fn dist(received: u8, expected: u8) -> u32 {
    if received == ERASED {
        0
    } else {
        (received ^ expected) as u32
    }
}

/// Convolutional code register. Each state is the most recent `MEMORY` input
/// bits, newest in the LSB.
pub struct Encoder {
    state: usize,
}

impl Encoder {
    /// Construct a new `Encoder` in the zero state.
    pub fn new() -> Encoder {
        Encoder { state: 0 }
    }

    /// Encode one input bit into its coded bit pair.
    pub fn feed(&mut self, bit: u8) -> (u8, u8) {
        debug_assert!(bit <= 1);

        let reg = ((self.state << 1) | bit as usize) as u8;
        self.state = reg as usize & (STATES - 1);

        (parity(reg & G1), parity(reg & G2))
    }

    /// Flush the register back to the zero state, returning the tail bit
    /// pairs.
    pub fn finish(&mut self) -> [(u8, u8); MEMORY] {
        let mut tail = [(0, 0); MEMORY];

        for pair in tail.iter_mut() {
            *pair = self.feed(0);
        }

        tail
    }
}

/// Encode the given bits and the zero tail into `coded`, which must hold
/// `(data.len() + MEMORY) * 2` bits.
pub fn encode(data: &[u8], coded: &mut [u8]) {
    assert_eq!(coded.len(), (data.len() + MEMORY) * 2);

    let mut enc = Encoder::new();

    for (i, &bit) in data.iter().enumerate() {
        let (hi, lo) = enc.feed(bit);
        coded[i * 2] = hi;
        coded[i * 2 + 1] = lo;
    }

    for (i, &(hi, lo)) in enc.finish().iter().enumerate() {
        let base = (data.len() + i) * 2;
        coded[base] = hi;
        coded[base + 1] = lo;
    }
}

/// Decode the given coded bit pairs (erasures allowed) into
/// `coded.len() / 2 - MEMORY` data bits, dropping the tail.
///
/// Decoding always fills the full output: corrupt input yields a nearby
/// codeword's data, and validity must be established downstream.
pub fn decode(coded: &[u8], data: &mut [u8]) {
    assert_eq!(coded.len() % 2, 0);

    let steps = coded.len() / 2;
    assert_eq!(data.len(), steps - MEMORY);

    const UNREACHED: u32 = u32::MAX / 2;

    let mut metric = [UNREACHED; STATES];
    metric[0] = 0;

    // Surviving oldest-register-bit choice per (step, next state).
    let mut survivor = vec![[0u8; STATES]; steps];

    for step in 0..steps {
        let pair = (coded[step * 2], coded[step * 2 + 1]);
        let mut next = [UNREACHED; STATES];

        for ns in 0..STATES {
            for oldest in 0..2usize {
                let ps = (ns >> 1) | (oldest << (MEMORY - 1));

                if metric[ps] >= UNREACHED {
                    continue;
                }

                // Full 5-bit register on this transition.
                let reg = ((oldest << MEMORY) | ns) as u8;
                let cost = metric[ps]
                    + dist(pair.0, parity(reg & G1))
                    + dist(pair.1, parity(reg & G2));

                if cost < next[ns] {
                    next[ns] = cost;
                    survivor[step][ns] = oldest as u8;
                }
            }
        }

        metric = next;
    }

    // Trace back from the flushed zero state. Each state's LSB is the input
    // bit that produced it.
    let mut state = 0;

    for step in (0..steps).rev() {
        if step < data.len() {
            data[step] = (state & 1) as u8;
        }

        state = (state >> 1) | ((survivor[step][state] as usize) << (MEMORY - 1));
    }
}
