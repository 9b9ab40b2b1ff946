//! The 16-bit CRC protecting link setup frames.
//!
//! Long division with the M17 generator polynomial, initialized to all-ones
//! and with no final inversion or reflection.

/// Generator polynomial.
const POLY: u32 = 0x5935;

/// Compute the checksum over the given bytes.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc: u32 = 0xFFFF;

    for &byte in data {
        crc ^= (byte as u32) << 8;

        for _ in 0..8 {
            crc <<= 1;

            if crc & 0x10000 != 0 {
                crc = (crc ^ POLY) & 0xFFFF;
            }
        }
    }

    (crc & 0xFFFF) as u16
}
