//! Byte and hex primitives
//!
//! Multi-byte numbers travel little-endian, identifiers travel as packed BCD,
//! and timestamps use the 7-byte binary time layout (milliseconds, minute,
//! hour, day, month, year offset from 2000).

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::error::{ProtoError, Result};

/// Width of a packed timestamp field
pub const BCD_TIME_LEN: usize = 7;

/// Render each byte as a 2-char lowercase hex token
pub fn bytes_to_hex(data: &[u8]) -> Vec<String> {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Contiguous lowercase hex, used for audit lines
pub fn hex_string(data: &[u8]) -> String {
    hex::encode(data)
}

/// Parse a hex string. Malformed input yields an empty vector, callers that
/// need validation must check the length themselves.
pub fn hex_to_bytes(data: &str) -> Vec<u8> {
    hex::decode(data).unwrap_or_default()
}

/// In-place order swap for bytes or hex tokens
pub fn reverse<T>(items: &mut [T]) {
    items.reverse();
}

/// Split an integer hex string into byte tokens, least significant first.
///
/// Odd-length input is left-padded with `0`; the result always holds at least
/// two tokens.
pub fn reversed_hex_tokens(value: &str) -> Vec<String> {
    let padded = if value.len() % 2 != 0 {
        format!("0{}", value)
    } else {
        value.to_string()
    };

    let mut tokens: Vec<String> = padded
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect();
    while tokens.len() < 2 {
        tokens.insert(0, "00".to_string());
    }
    reverse(&mut tokens);
    tokens
}

/// Little-endian integer truncated or zero-padded to `width` bytes
pub fn encode_int(value: u32, width: usize) -> Vec<u8> {
    let mut buf = vec![0u8; width.max(4)];
    buf[..4].copy_from_slice(&value.to_le_bytes());
    buf.truncate(width);
    buf
}

/// Little-endian decode of up to 4 bytes, zero-padded on the right
pub fn decode_int(data: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    let n = data.len().min(4);
    buf[..n].copy_from_slice(&data[..n]);
    u32::from_le_bytes(buf)
}

/// Cheap correlation id: current millisecond modulo 1000.
///
/// Not unique under load; collisions are expected and harmless.
pub fn generate_sequence() -> u16 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    (millis % 1000) as u16
}

/// Decode a 7-byte packed time into UTC epoch milliseconds
pub fn decode_bcd_timestamp(data: &[u8]) -> Result<i64> {
    if data.len() < BCD_TIME_LEN {
        return Err(ProtoError::malformed(format!(
            "time field needs {} bytes, got {}",
            BCD_TIME_LEN,
            data.len()
        )));
    }

    let millis = u16::from_le_bytes([data[0], data[1]]) as i64;
    let minute = (data[2] & 0x3F) as u32;
    let hour = (data[3] & 0x1F) as u32;
    let day = (data[4] & 0x1F) as u32;
    let month = (data[5] & 0x0F) as u32;
    let year = (data[6] & 0x7F) as i32 + 2000;

    let at = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| {
            ProtoError::malformed(format!(
                "invalid time {}-{:02}-{:02} {:02}:{:02}",
                year, month, day, hour, minute
            ))
        })?;

    Ok(at.and_utc().timestamp_millis() + millis)
}

/// Encode UTC epoch milliseconds into the 7-byte packed time layout
pub fn encode_bcd_timestamp(epoch_millis: i64) -> Result<[u8; BCD_TIME_LEN]> {
    let at: DateTime<Utc> = DateTime::from_timestamp_millis(epoch_millis)
        .ok_or_else(|| ProtoError::encoding(format!("timestamp {} out of range", epoch_millis)))?;

    let year = at.year() - 2000;
    if !(0..=0x7F).contains(&year) {
        return Err(ProtoError::encoding(format!(
            "year {} outside 2000-2127",
            at.year()
        )));
    }

    let millis = (at.second() * 1000 + at.timestamp_subsec_millis()) as u16;
    let [lo, hi] = millis.to_le_bytes();
    Ok([
        lo,
        hi,
        at.minute() as u8,
        at.hour() as u8,
        at.day() as u8,
        at.month() as u8,
        year as u8,
    ])
}

/// Packed BCD bytes rendered as their hex digits
pub fn bcd_to_string(data: &[u8]) -> String {
    hex_string(data)
}

/// Hex digits packed into exactly `width` bytes, left-padded with zeros
pub fn string_to_bcd(value: &str, width: usize) -> Result<Vec<u8>> {
    let padded = if value.len() % 2 != 0 {
        format!("0{}", value)
    } else {
        value.to_string()
    };
    let bytes = hex::decode(&padded)
        .map_err(|e| ProtoError::encoding(format!("{:?} is not BCD: {}", value, e)))?;
    if bytes.len() > width {
        return Err(ProtoError::encoding(format!(
            "{:?} needs {} bytes, field holds {}",
            value,
            bytes.len(),
            width
        )));
    }

    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Text field with trailing NUL and space padding removed
pub fn ascii_field(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

/// Text right-padded with NUL to exactly `width` bytes
pub fn ascii_to_field(value: &str, width: usize) -> Result<Vec<u8>> {
    if !value.is_ascii() {
        return Err(ProtoError::encoding(format!("{:?} is not ASCII", value)));
    }
    if value.len() > width {
        return Err(ProtoError::encoding(format!(
            "{:?} longer than {} bytes",
            value, width
        )));
    }

    let mut out = value.as_bytes().to_vec();
    out.resize(width, 0);
    Ok(out)
}
