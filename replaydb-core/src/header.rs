//! Replay header decoder (C2).
//!
//! Fixed little-endian layout read from either a raw `.rep` file or the single entry
//! inside a `.rep.zip`.
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::domain::{Player, ReplayMetadata};
use crate::error::{ReplayDbError, Result};

const GAME_MODE_LEN: usize = 64;
const MAP_TITLE_LEN: usize = 256;
const HOST_NAME_LEN: usize = 256;
const PLAYER_LEN: usize = 40;
const PLAYER_NAME_LEN: usize = 32;

const FIXED_HEADER_LEN: usize = 4 + 4 + 4 + 4 + 8 + 8 + 8 + GAME_MODE_LEN + MAP_TITLE_LEN + HOST_NAME_LEN;

/// Decodes a replay header from `path`, dispatching on suffix: `.rep` is read
/// directly, `.rep.zip` is opened as a zip archive containing exactly one entry.
pub fn decode_header(path: &Path) -> Result<ReplayMetadata> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".rep.zip") {
        decode_from_zip(path)
    } else if name.ends_with(".rep") {
        let bytes = std::fs::read(path)?;
        decode_bytes(&bytes, name)
    } else {
        Err(ReplayDbError::UnsupportedSuffix(name.to_string()))
    }
}

fn decode_from_zip(path: &Path) -> Result<ReplayMetadata> {
    let f = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(f)?;
    if archive.len() != 1 {
        return Err(ReplayDbError::BinaryFormat {
            path: path.display().to_string(),
            reason: format!("expected exactly one entry in zip, found {}", archive.len()),
        });
    }
    let mut entry = archive.by_index(0)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    decode_bytes(&bytes, &path.display().to_string())
}

fn decode_bytes(buf: &[u8], path_label: &str) -> Result<ReplayMetadata> {
    let err = |reason: String| ReplayDbError::BinaryFormat {
        path: path_label.to_string(),
        reason,
    };

    if buf.len() < FIXED_HEADER_LEN {
        return Err(err("truncated header".to_string()));
    }

    let mut off = 0usize;
    let _tag = read_bytes(buf, &mut off, 4);
    let protocol_version = read_u32(buf, &mut off);
    let player_count = read_u32(buf, &mut off);
    let marker_count = read_u32(buf, &mut off);
    let _unknown = read_u64(buf, &mut off);
    let map_steam_id = read_u64(buf, &mut off);
    let started_at_secs = read_u64(buf, &mut off);

    let game_mode = read_padded_string(buf, &mut off, GAME_MODE_LEN).map_err(|e| err(e))?;
    let map_title = read_padded_string(buf, &mut off, MAP_TITLE_LEN).map_err(|e| err(e))?;
    let host_name = read_padded_string(buf, &mut off, HOST_NAME_LEN).map_err(|e| err(e))?;

    let players_bytes_needed = (player_count as usize)
        .checked_mul(PLAYER_LEN)
        .ok_or_else(|| err("player_count overflow".to_string()))?;
    if off + players_bytes_needed > buf.len() {
        return Err(err(format!(
            "player_count {player_count} implies {players_bytes_needed} bytes, only {} remain",
            buf.len() - off
        )));
    }

    let mut players = Vec::with_capacity(player_count as usize);
    for _ in 0..player_count {
        let name = read_padded_string(buf, &mut off, PLAYER_NAME_LEN).map_err(|e| err(e))?;
        let score = read_i32(buf, &mut off);
        let team = read_i32(buf, &mut off);
        let steam_id = read_u64(buf, &mut off);
        players.push(Player {
            name,
            score,
            team,
            steam_id,
        });
    }

    let started_at = DateTime::<Utc>::from_timestamp(started_at_secs as i64, 0)
        .ok_or_else(|| err("started_at out of range".to_string()))?;

    Ok(ReplayMetadata {
        protocol_version,
        host_name,
        game_mode,
        map_steam_id,
        map_title,
        players,
        marker_count,
        started_at,
    })
}

fn read_bytes<'a>(buf: &'a [u8], off: &mut usize, len: usize) -> &'a [u8] {
    let slice = &buf[*off..*off + len];
    *off += len;
    slice
}

fn read_u32(buf: &[u8], off: &mut usize) -> u32 {
    let v = u32::from_le_bytes(buf[*off..*off + 4].try_into().unwrap());
    *off += 4;
    v
}

fn read_i32(buf: &[u8], off: &mut usize) -> i32 {
    let v = i32::from_le_bytes(buf[*off..*off + 4].try_into().unwrap());
    *off += 4;
    v
}

fn read_u64(buf: &[u8], off: &mut usize) -> u64 {
    let v = u64::from_le_bytes(buf[*off..*off + 8].try_into().unwrap());
    *off += 8;
    v
}

/// Reads a fixed-width NUL-padded UTF-8 string: trailing NULs are stripped, interior
/// NULs are preserved, invalid UTF-8 is a decode error.
fn read_padded_string(buf: &[u8], off: &mut usize, len: usize) -> std::result::Result<String, String> {
    let raw = read_bytes(buf, off, len);
    let trimmed = trim_trailing_nuls(raw);
    std::str::from_utf8(trimmed)
        .map(|s| s.to_string())
        .map_err(|e| format!("invalid UTF-8 in padded field: {e}"))
}

fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(s: &str, len: usize) -> Vec<u8> {
        let mut v = s.as_bytes().to_vec();
        v.resize(len, 0);
        v
    }

    fn build_header(player_count: u32, players: &[(&str, i32, i32, u64)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"TAG1");
        buf.extend_from_slice(&89u32.to_le_bytes()); // protocol_version
        buf.extend_from_slice(&player_count.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // marker_count
        buf.extend_from_slice(&0u64.to_le_bytes()); // unknown
        buf.extend_from_slice(&609506884u64.to_le_bytes()); // map_steam_id
        buf.extend_from_slice(&1767629581u64.to_le_bytes()); // started_at
        buf.extend_from_slice(&padded("1v1", GAME_MODE_LEN));
        buf.extend_from_slice(&padded("Pocket Infinity", MAP_TITLE_LEN));
        buf.extend_from_slice(&padded("Bobr #1", HOST_NAME_LEN));
        for (name, score, team, steam_id) in players {
            buf.extend_from_slice(&padded(name, PLAYER_NAME_LEN));
            buf.extend_from_slice(&score.to_le_bytes());
            buf.extend_from_slice(&team.to_le_bytes());
            buf.extend_from_slice(&steam_id.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decodes_well_formed_header() {
        let buf = build_header(2, &[("Ivan O.", 12, 0, 76561198044136441), ("Vigur", 20, 0, 76561198330103432)]);
        let meta = decode_bytes(&buf, "test").unwrap();
        assert_eq!(meta.protocol_version, 89);
        assert_eq!(meta.game_mode, "1v1");
        assert_eq!(meta.map_title, "Pocket Infinity");
        assert_eq!(meta.host_name, "Bobr #1");
        assert_eq!(meta.players.len(), 2);
        assert_eq!(meta.players[0].name, "Ivan O.");
        assert_eq!(meta.players[0].score, 12);
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = build_header(0, &[]);
        let truncated = &buf[..buf.len() - 10];
        assert!(decode_bytes(truncated, "test").is_err());
    }

    #[test]
    fn rejects_oversized_player_count() {
        let buf = build_header(0, &[]);
        let meta = decode_bytes(&buf, "test");
        assert!(meta.is_ok());

        let mut buf_bad = build_header(0, &[]);
        buf_bad[8..12].copy_from_slice(&1_000_000u32.to_le_bytes());
        assert!(decode_bytes(&buf_bad, "test").is_err());
    }

    #[test]
    fn rejects_invalid_utf8_in_padded_field() {
        let mut buf = build_header(0, &[]);
        // game_mode starts right after the 28-byte fixed prefix (tag+proto+count+markers+unknown+map_id+started_at)
        let game_mode_off = 4 + 4 + 4 + 4 + 8 + 8 + 8;
        buf[game_mode_off] = 0xFF;
        buf[game_mode_off + 1] = 0xFE;
        assert!(decode_bytes(&buf, "test").is_err());
    }

    #[test]
    fn does_not_validate_tag_or_protocol_version() {
        let mut buf = build_header(0, &[]);
        buf[0..4].copy_from_slice(&[0, 0, 0, 0]);
        buf[4..8].copy_from_slice(&9999u32.to_le_bytes());
        assert!(decode_bytes(&buf, "test").is_ok());
    }
}
