//! Position exchange wire format
//!
//! A position is three little-endian f32 (12 bytes). Requests carry the
//! local position percent-encoded byte by byte in the query string; responses
//! are the raw concatenated positions of every other peer in the room, with no
//! header or delimiter.

use std::fmt::Write;

use glam::Vec3;

use crate::consts::*;

/// Encode a position as 12 little-endian bytes
pub fn encode_position(v: Vec3) -> [u8; POSITION_BYTES] {
    let mut out = [0u8; POSITION_BYTES];
    for (chunk, f) in out.chunks_exact_mut(4).zip(v.to_array()) {
        chunk.copy_from_slice(&f.to_le_bytes());
    }
    out
}

/// Decode one 12-byte position
pub fn decode_position(bytes: &[u8; POSITION_BYTES]) -> Vec3 {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    Vec3::new(f(0), f(4), f(8))
}

/// Percent-encode every byte, including unreserved ones
pub fn percent_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        // Writing to a String cannot fail
        let _ = write!(out, "%{b:02X}");
    }
    out
}

/// Query string announcing a client before the epoch
pub fn register_query(room: u64, uid: u16) -> String {
    format!("room={room}&uid={uid}")
}

/// Query string for a position exchange
pub fn exchange_query(room: u64, uid: u16, position: Vec3) -> String {
    format!(
        "room={room}&uid={uid}&p={}",
        percent_encode(&encode_position(position))
    )
}

/// Split a roster response into positions
///
/// Returns `None` for anything that is not between one and `MAX_PEERS`
/// whole positions; such responses are dropped, never partially applied.
pub fn parse_roster(body: &[u8]) -> Option<Vec<Vec3>> {
    let len = body.len();
    if len < POSITION_BYTES || len > MAX_ROSTER_BYTES || len % POSITION_BYTES != 0 {
        return None;
    }
    Some(
        body.chunks_exact(POSITION_BYTES)
            .map(|chunk| {
                let mut bytes = [0u8; POSITION_BYTES];
                bytes.copy_from_slice(chunk);
                decode_position(&bytes)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_is_little_endian() {
        let bytes = encode_position(Vec3::new(1.0, -2.0, 0.0));
        assert_eq!(&bytes[0..4], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0xC0]);
        assert_eq!(&bytes[8..12], &[0; 4]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let v = Vec3::new(0.25, -2.3, 1e-3);
        assert_eq!(decode_position(&encode_position(v)), v);
    }

    #[test]
    fn test_percent_encode_every_byte() {
        assert_eq!(percent_encode(&[0x00, 0x41, 0xFF]), "%00%41%FF");
    }

    #[test]
    fn test_queries() {
        assert_eq!(register_query(1_700_000_040, 513), "room=1700000040&uid=513");
        let q = exchange_query(1_700_000_040, 7, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(
            q,
            "room=1700000040&uid=7&p=%00%00%80%3F%00%00%00%00%00%00%00%00"
        );
    }

    #[test]
    fn test_parse_three_peers() {
        let mut body = Vec::new();
        for v in [Vec3::X, Vec3::Y, Vec3::new(0.0, 0.0, -2.3)] {
            body.extend_from_slice(&encode_position(v));
        }
        assert_eq!(body.len(), 36);
        let peers = parse_roster(&body).unwrap();
        assert_eq!(peers, vec![Vec3::X, Vec3::Y, Vec3::new(0.0, 0.0, -2.3)]);
    }

    #[test]
    fn test_parse_rejects_bad_framing() {
        assert!(parse_roster(&[]).is_none());
        assert!(parse_roster(&[0u8; 5]).is_none());
        assert!(parse_roster(&[0u8; 11]).is_none());
        assert!(parse_roster(&[0u8; 13]).is_none());
        assert!(parse_roster(&vec![0u8; MAX_ROSTER_BYTES + POSITION_BYTES]).is_none());
        assert_eq!(parse_roster(&vec![0u8; MAX_ROSTER_BYTES]).map(|p| p.len()), Some(MAX_PEERS));
    }

    proptest! {
        #[test]
        fn prop_parse_accepts_only_whole_positions(len in 0usize..400) {
            let body = vec![1u8; len];
            let parsed = parse_roster(&body);
            let valid = (POSITION_BYTES..=MAX_ROSTER_BYTES).contains(&len)
                && len % POSITION_BYTES == 0;
            prop_assert_eq!(parsed.is_some(), valid);
            if let Some(peers) = parsed {
                prop_assert_eq!(peers.len(), len / POSITION_BYTES);
            }
        }
    }
}
