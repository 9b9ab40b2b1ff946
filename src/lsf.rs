//! Semantic decoding of the 240-bit link setup frame: addressing, stream
//! type, encryption metadata, and the trailing CRC.

use std::fmt;

use crate::consts::LSF_BYTES;
use crate::crc;
use crate::error::{M17Error, Result};

/// Base-40 alphabet used by callsign encoding.
const CHAR_MAP: [u8; 40] = *b" ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-/.";

/// Largest encoded value that maps to a plain callsign.
const UNIT_MAX: u64 = 0xEE6B27FFFFFF;

/// A base-40 encoded station address.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize, serde::Deserialize))]
pub enum CallSign {
    /// The all-stations broadcast address.
    Broadcast,
    /// An individual station.
    UnitId([u8; 6]),
    /// An address in the reserved range.
    Reserved([u8; 6]),
    /// The all-zero invalid address.
    Invalid,
}

impl CallSign {
    /// Classify the given 48-bit address field.
    pub fn from_bytes(bytes: &[u8; 6]) -> CallSign {
        match encoded_value(bytes) {
            0 => CallSign::Invalid,
            0xFFFFFFFFFFFF => CallSign::Broadcast,
            1..=UNIT_MAX => CallSign::UnitId(*bytes),
            _ => CallSign::Reserved(*bytes),
        }
    }

    /// Encode the given callsign text, which must use only the base-40
    /// alphabet and be at most 9 characters.
    pub fn from_text(call: &str) -> CallSign {
        let call = call.to_uppercase();
        assert!(call.len() <= 9);

        let mut sum = 0;

        for c in call.bytes().rev() {
            let idx = CHAR_MAP
                .iter()
                .position(|&m| m == c)
                .expect("invalid callsign character");

            sum = sum * 40 + idx as u64;
        }

        let bytes = sum.to_be_bytes();
        CallSign::UnitId(bytes[2..8].try_into().unwrap())
    }

    /// Get the 48-bit address field for this callsign.
    pub fn to_bytes(&self) -> [u8; 6] {
        match self {
            CallSign::Invalid => [0; 6],
            CallSign::Broadcast => [0xFF; 6],
            CallSign::UnitId(b) | CallSign::Reserved(b) => *b,
        }
    }
}

fn encoded_value(bytes: &[u8; 6]) -> u64 {
    let mut word = [0; 8];
    word[2..8].copy_from_slice(bytes);
    u64::from_be_bytes(word)
}

impl fmt::Display for CallSign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CallSign::Invalid => write!(f, "#INVALID"),
            CallSign::Broadcast => write!(f, "#BCAST"),
            CallSign::Reserved(_) => write!(f, "#RESERVED"),
            CallSign::UnitId(bytes) => {
                let mut encoded = encoded_value(bytes);

                while encoded > 0 {
                    write!(f, "{}", CHAR_MAP[(encoded % 40) as usize] as char)?;
                    encoded /= 40;
                }

                Ok(())
            }
        }
    }
}

/// Payload content carried by a stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Reserved,
    Data,
    Voice,
    VoiceData,
}

impl DataType {
    fn from_bits(bits: u16) -> DataType {
        match bits {
            0b01 => DataType::Data,
            0b10 => DataType::Voice,
            0b11 => DataType::VoiceData,
            _ => DataType::Reserved,
        }
    }
}

/// Encryption scheme in use, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize, serde::Deserialize))]
pub enum EncryptionType {
    None,
    Scrambler,
    Aes,
    Other,
}

impl EncryptionType {
    fn from_bits(bits: u16) -> EncryptionType {
        match bits {
            0b01 => EncryptionType::Scrambler,
            0b10 => EncryptionType::Aes,
            0b11 => EncryptionType::Other,
            _ => EncryptionType::None,
        }
    }
}

/// Decoded link setup frame fields.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "ser", derive(serde::Serialize, serde::Deserialize))]
pub struct Lsf {
    /// Destination address.
    pub dst: CallSign,
    /// Source address.
    pub src: CallSign,
    /// Whether the frame opens a stream (otherwise a packet transfer).
    pub stream: bool,
    /// Payload content type.
    pub data_type: DataType,
    /// Encryption scheme.
    pub encryption: EncryptionType,
    /// Scheme-specific encryption subtype.
    pub encryption_subtype: u8,
    /// Channel access number.
    pub channel_access: u8,
    /// Encryption metadata / nonce region.
    pub meta: [u8; 14],
}

impl Lsf {
    /// Decode a reassembled 240-bit frame, verifying the trailing CRC.
    ///
    /// The fields must not be used unless decoding succeeds.
    pub fn decode(frame: &[u8; LSF_BYTES]) -> Result<Lsf> {
        let expected = u16::from_be_bytes([frame[28], frame[29]]);

        if crc::checksum(&frame[..28]) != expected {
            return Err(M17Error::LsfCrc);
        }

        let ty = u16::from_be_bytes([frame[12], frame[13]]);

        Ok(Lsf {
            dst: CallSign::from_bytes(frame[..6].try_into().unwrap()),
            src: CallSign::from_bytes(frame[6..12].try_into().unwrap()),
            stream: ty & 1 != 0,
            data_type: DataType::from_bits(ty >> 1 & 0b11),
            encryption: EncryptionType::from_bits(ty >> 3 & 0b11),
            encryption_subtype: (ty >> 5 & 0b11) as u8,
            channel_access: (ty >> 7 & 0b1111) as u8,
            meta: frame[14..28].try_into().unwrap(),
        })
    }

    /// Build the 30 frame bytes for the given fields, with a valid CRC, for
    /// loopback use.
    pub fn encode(dst: &CallSign, src: &CallSign, ty: u16, meta: &[u8; 14]) -> [u8; LSF_BYTES] {
        let mut frame = [0; LSF_BYTES];

        frame[..6].copy_from_slice(&dst.to_bytes());
        frame[6..12].copy_from_slice(&src.to_bytes());
        frame[12..14].copy_from_slice(&ty.to_be_bytes());
        frame[14..28].copy_from_slice(meta);

        let crc = crc::checksum(&frame[..28]);
        frame[28..30].copy_from_slice(&crc.to_be_bytes());

        frame
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_callsign_round_trip() {
        let call = CallSign::from_text("AB1CDE");
        assert_eq!(call.to_string(), "AB1CDE");

        let bytes = call.to_bytes();
        assert_eq!(CallSign::from_bytes(&bytes), call);
    }

    #[test]
    fn test_callsign_classes() {
        assert_eq!(CallSign::from_bytes(&[0; 6]), CallSign::Invalid);
        assert_eq!(CallSign::from_bytes(&[0xFF; 6]), CallSign::Broadcast);
        assert_eq!(
            CallSign::from_bytes(&[0xEF, 0, 0, 0, 0, 0]),
            CallSign::Reserved([0xEF, 0, 0, 0, 0, 0])
        );
    }

    #[test]
    fn test_decode() {
        // Stream, voice, scrambler encryption subtype 2, channel access 7.
        let ty = 1 | 0b10 << 1 | 0b01 << 3 | 0b10 << 5 | 0b0111 << 7;
        let meta = [0xA5; 14];
        let frame = Lsf::encode(
            &CallSign::Broadcast,
            &CallSign::from_text("N0CALL"),
            ty,
            &meta,
        );

        let lsf = Lsf::decode(&frame).unwrap();
        assert_eq!(lsf.dst, CallSign::Broadcast);
        assert_eq!(lsf.src.to_string(), "N0CALL");
        assert!(lsf.stream);
        assert_eq!(lsf.data_type, DataType::Voice);
        assert_eq!(lsf.encryption, EncryptionType::Scrambler);
        assert_eq!(lsf.encryption_subtype, 2);
        assert_eq!(lsf.channel_access, 7);
        assert_eq!(lsf.meta, meta);
    }

    #[test]
    fn test_bad_crc() {
        let mut frame = Lsf::encode(
            &CallSign::Broadcast,
            &CallSign::from_text("N0CALL"),
            0b101,
            &[0; 14],
        );

        frame[3] ^= 0x10;
        assert_eq!(Lsf::decode(&frame), Err(M17Error::LsfCrc));
    }
}
