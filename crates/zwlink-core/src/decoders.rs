//! Payload decoders
//!
//! Stateless helpers used to interpret reply payloads: node bitmaps,
//! signed one-byte readings and big-endian counters.

use std::fmt;

/// Unpack a node bitmap into the ids of its set bits.
///
/// Bit `i` of byte `k` stands for id `k * 8 + i + 1`, so byte 0 bit 0 is id 1,
/// byte 0 bit 7 is id 8 and byte 1 bit 3 is id 12. Ids come out ascending.
pub fn decode_bitmap(mask: &[u8]) -> Vec<u16> {
    let mut ids = Vec::new();
    for (k, byte) in mask.iter().enumerate() {
        for i in 0..8 {
            if byte & (1 << i) != 0 {
                ids.push((k * 8 + i + 1) as u16);
            }
        }
    }
    ids
}

/// Decode a bitmap of `len` bytes starting at `offset` within a payload.
///
/// Returns `None` if the payload is too short to hold it.
pub fn decode_bitmap_at(payload: &[u8], offset: usize, len: usize) -> Option<Vec<u16>> {
    let end = offset.checked_add(len)?;
    payload.get(offset..end).map(decode_bitmap)
}

/// Read a big-endian `u16` at `offset`
pub fn read_u16_be(payload: &[u8], offset: usize) -> Option<u16> {
    let bytes = payload.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// A one-byte signed reading such as a background RSSI sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedReading {
    /// No measurement available (0x7F)
    NotAvailable,
    /// Above the measurable range (0x7E)
    Maximum,
    /// Below the measurable range (0x7D)
    Minimum,
    /// A measured value
    Value(i16),
}

impl fmt::Display for SignedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable => write!(f, "NA"),
            Self::Maximum => write!(f, "MAX"),
            Self::Minimum => write!(f, "MIN"),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Map a raw reading byte to its value.
pub fn map_signed_reading(raw: u8) -> SignedReading {
    match raw {
        0x7F => SignedReading::NotAvailable,
        0x7E => SignedReading::Maximum,
        0x7D => SignedReading::Minimum,
        b if b >= 128 => SignedReading::Value(i16::from(b) - 256),
        b => SignedReading::Value(i16::from(b)),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bitmap_yields_one_id_per_set_bit(mask in proptest::collection::vec(any::<u8>(), 0..32)) {
            let ids = decode_bitmap(&mask);
            let set_bits: u32 = mask.iter().map(|b| b.count_ones()).sum();
            prop_assert_eq!(ids.len() as u32, set_bits);
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(ids.iter().all(|&id| id >= 1 && (id as usize) <= mask.len() * 8));
        }
    }
}
