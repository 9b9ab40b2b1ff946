//! Utilities for moving between unpacked bit buffers (one bit per byte, the
//! representation used on the demultiplexed bitstream) and packed bytes.

/// Pack the given bits into `bytes` MSB-first. Any trailing bits of the last
/// byte are cleared.
pub fn pack(bits: &[u8], bytes: &mut [u8]) {
    assert!(bits.len() <= bytes.len() * 8);

    for b in bytes.iter_mut() {
        *b = 0;
    }

    for (i, &bit) in bits.iter().enumerate() {
        debug_assert!(bit <= 1);
        bytes[i / 8] |= bit << (7 - i % 8);
    }
}

/// Unpack each byte into 8 bits, MSB-first.
pub fn unpack(bytes: &[u8], bits: &mut [u8]) {
    assert_eq!(bits.len(), bytes.len() * 8);

    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = bytes[i / 8] >> (7 - i % 8) & 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pack() {
        let bits = [1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0];
        let mut bytes = [0xFF; 2];
        pack(&bits, &mut bytes);
        assert_eq!(bytes, [0xA5, 0xF0]);

        // Partial final byte.
        let mut bytes = [0xFF; 2];
        pack(&bits[..12], &mut bytes);
        assert_eq!(bytes, [0xA5, 0xF0]);
    }

    #[test]
    fn test_unpack() {
        let bytes = [0xA5, 0xF0];
        let mut bits = [0; 16];
        unpack(&bytes, &mut bits);
        assert_eq!(bits, [1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0]);

        let mut packed = [0; 2];
        pack(&bits, &mut packed);
        assert_eq!(packed, bytes);
    }
}
