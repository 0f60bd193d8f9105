//! Thin consumers of the link
//!
//! Each helper issues one SerialAPI command through a [`LinkSession`] and
//! interprets its reply. The engine itself stays payload-agnostic; all
//! knowledge of function ids and reply layouts lives here.

use std::fmt;
use zwlink_communication::{ByteSource, LinkSession};
use zwlink_core::constants::NODE_BITMAP_LEN;
use zwlink_core::{decode_bitmap_at, map_signed_reading, read_u16_be, Error, Result, SignedReading};

/// Controller init data, including the node list
pub const FUNC_ID_SERIAL_API_GET_INIT_DATA: u8 = 0x02;
/// Reset the radio statistics
pub const FUNC_ID_ZW_CLEAR_NETWORK_STATS: u8 = 0x39;
/// Read the radio statistics
pub const FUNC_ID_ZW_GET_NETWORK_STATS: u8 = 0x3A;
/// Background RSSI, one byte per channel
pub const FUNC_ID_ZW_GET_BACKGROUND_RSSI: u8 = 0x3B;

/// Node ids present in the controller's network.
///
/// The init-data reply is `func, version, capabilities, mask_len, mask..`.
pub fn node_ids<S: ByteSource>(session: &mut LinkSession<S>) -> Result<Vec<u16>> {
    let reply = session.request(&[FUNC_ID_SERIAL_API_GET_INIT_DATA])?;
    let mask_len = *reply
        .get(3)
        .ok_or_else(|| short_reply("init data", reply.len()))?;
    if mask_len as usize > NODE_BITMAP_LEN {
        return Err(Error::other(format!(
            "init data reports a {} byte node mask, expected at most {}",
            mask_len, NODE_BITMAP_LEN
        )));
    }
    decode_bitmap_at(&reply, 4, mask_len as usize)
        .ok_or_else(|| short_reply("init data", reply.len()))
}

/// One background RSSI sample per channel.
///
/// 500 series controllers report two or three channels, 700 series four.
pub fn background_rssi<S: ByteSource>(session: &mut LinkSession<S>) -> Result<Vec<SignedReading>> {
    let reply = session.request(&[FUNC_ID_ZW_GET_BACKGROUND_RSSI])?;
    match reply.split_first() {
        Some((_, samples)) => Ok(samples.iter().copied().map(map_signed_reading).collect()),
        None => Err(short_reply("background RSSI", 0)),
    }
}

/// Radio statistics kept by the controller since the last clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    pub transmitted: u16,
    pub backoffs: u16,
    pub received: u16,
    pub checksum_errors: u16,
    pub crc_errors: u16,
    pub foreign_home_id: u16,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tx={}, Backoffs={}, Rx={}, Chkerr={}, CRCerr={}, Foreign={}",
            self.transmitted,
            self.backoffs,
            self.received,
            self.checksum_errors,
            self.crc_errors,
            self.foreign_home_id
        )
    }
}

/// Read the controller's radio statistics
pub fn network_stats<S: ByteSource>(session: &mut LinkSession<S>) -> Result<NetworkStats> {
    let reply = session.request(&[FUNC_ID_ZW_GET_NETWORK_STATS])?;
    let field = |i: usize| {
        read_u16_be(&reply, 1 + 2 * i).ok_or_else(|| short_reply("network stats", reply.len()))
    };
    Ok(NetworkStats {
        transmitted: field(0)?,
        backoffs: field(1)?,
        received: field(2)?,
        checksum_errors: field(3)?,
        crc_errors: field(4)?,
        foreign_home_id: field(5)?,
    })
}

/// Reset the controller's radio statistics (no reply)
pub fn clear_network_stats<S: ByteSource>(session: &mut LinkSession<S>) -> Result<()> {
    session.send(&[FUNC_ID_ZW_CLEAR_NETWORK_STATS])
}

/// Parse hex bytes such as `"13 05 01"`, `"130501"` or `"0x13,0x05"`
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|tok| tok.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if !digits.is_ascii() {
        return Err(Error::other(format!("Invalid hex in '{}'", input)));
    }
    if digits.len() % 2 != 0 {
        return Err(Error::other(format!("Odd number of hex digits in '{}'", input)));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| Error::other(format!("Invalid hex byte '{}'", &digits[i..i + 2])))
        })
        .collect()
}

/// Format bytes as space separated hex
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn short_reply(what: &str, len: usize) -> Error {
    Error::other(format!("{} reply too short ({} bytes)", what, len))
}
