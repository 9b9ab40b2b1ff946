//! Slicing of demodulated 4FSK soft symbols into the hard bitstream.

use crate::consts::HIGH_CUT;

/// Slice each soft symbol into its 2 bits: the sign bit (negative deviation
/// yields 1) followed by the magnitude bit (outer deviation level yields 1).
/// Writes `2 * symbols.len()` bits and returns that count.
pub fn slice_symbols(symbols: &[f32], bits: &mut [u8]) -> usize {
    assert!(bits.len() >= symbols.len() * 2);

    for (i, &s) in symbols.iter().enumerate() {
        bits[i * 2] = (s < 0.0) as u8;
        bits[i * 2 + 1] = (s.abs() > HIGH_CUT) as u8;
    }

    symbols.len() * 2
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slice() {
        let symbols = [1.0, 1.0 / 3.0, -1.0 / 3.0, -1.0];
        let mut bits = [0; 8];

        assert_eq!(slice_symbols(&symbols, &mut bits), 8);
        assert_eq!(bits, [0, 1, 0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_threshold() {
        // The magnitude cut sits two-thirds of the way to full deviation.
        let symbols = [0.67, -0.67];
        let mut bits = [0; 4];

        slice_symbols(&symbols, &mut bits);
        assert_eq!(bits, [0, 1, 1, 1]);

        let symbols = [0.66, -0.66];
        slice_symbols(&symbols, &mut bits);
        assert_eq!(bits, [0, 0, 1, 0]);
    }
}
