//! Encoding and decoding of the (24, 12, 8) extended Golay code protecting
//! LICH blocks, with the 12 data bits in the MSBs of each codeword.

pub use cai_golay::extended::{decode, encode};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        for &w in &[0, 0b1010_1100_0011, 0b1111_1111_1111, 0b0000_0000_0001] {
            let e = encode(w);
            assert_eq!(decode(e), Some((w, 0)));
        }
    }

    #[test]
    fn test_correction_radius() {
        let w = 0b1001_0110_1010;
        let e = encode(w);

        // Up to 3 errors are corrected, wherever they land.
        for i in 0..24 {
            assert_eq!(decode(e ^ (1 << i)), Some((w, 1)));
        }

        for i in 0..23 {
            assert_eq!(decode(e ^ (0b11 << i)), Some((w, 2)));
        }

        for i in 0..22 {
            assert_eq!(decode(e ^ (0b111 << i)), Some((w, 3)));
        }

        assert_eq!(decode(e ^ 0b1000_0000_0001_0000_0010), Some((w, 3)));
    }

    #[test]
    fn test_failure_boundary() {
        let w = 0b1001_0110_1010;
        let e = encode(w);

        // Four errors exceed the correction radius and must be reported, not
        // silently miscorrected.
        assert_eq!(decode(e ^ 0b1111), None);
        assert_eq!(decode(e ^ 0b1010_0000_0001_0000_0010), None);
    }
}
