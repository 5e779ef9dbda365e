//! Chunk files: a bounded-size JSON object, keyed by replay filename, holding a
//! contiguous time-ordered slice of the index.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Player, Replay, ReplayMetadata};
use crate::error::Result;

#[derive(Serialize, Deserialize)]
struct PlayerJson {
    name: String,
    score: i32,
    team: i32,
    steam_id: u64,
}

#[derive(Serialize, Deserialize)]
struct MetadataJson {
    protocol_version: u32,
    host_name: String,
    game_mode: String,
    map_steam_id: u64,
    map_title: String,
    players: Vec<PlayerJson>,
    marker_count: u32,
    started_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct ReplayJson {
    finished_at: DateTime<Utc>,
    downloadable: bool,
    metadata: Option<MetadataJson>,
}

/// Serializes a chunk's replays (in `by_time` order) to the chunk JSON format, keyed
/// by filename.
pub fn encode_chunk(replays: &[&Replay]) -> Result<Vec<u8>> {
    let mut map: BTreeMap<&str, ReplayJson> = BTreeMap::new();
    for replay in replays {
        let metadata = replay.metadata().map(|m| MetadataJson {
            protocol_version: m.protocol_version,
            host_name: m.host_name.clone(),
            game_mode: m.game_mode.clone(),
            map_steam_id: m.map_steam_id,
            map_title: m.map_title.clone(),
            players: m
                .players
                .iter()
                .map(|p| PlayerJson {
                    name: p.name.clone(),
                    score: p.score,
                    team: p.team,
                    steam_id: p.steam_id,
                })
                .collect(),
            marker_count: m.marker_count,
            started_at: m.started_at,
        });
        map.insert(
            replay.filename(),
            ReplayJson {
                finished_at: replay.finished_at(),
                downloadable: replay.downloadable(),
                metadata,
            },
        );
    }
    // Preserve insertion (time) order rather than the map's key order: re-serialize
    // via an ordered Vec of (filename, value) pairs so on-disk byte layout matches
    // `by_time` order exactly.
    let ordered: Vec<(&str, &ReplayJson)> = replays
        .iter()
        .map(|r| (r.filename(), map.get(r.filename()).unwrap()))
        .collect();
    let mut buf = Vec::new();
    write_ordered_object(&mut buf, &ordered)?;
    Ok(buf)
}

fn write_ordered_object(buf: &mut Vec<u8>, entries: &[(&str, &ReplayJson)]) -> Result<()> {
    buf.push(b'{');
    for (i, (filename, value)) in entries.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        let key = serde_json::to_string(filename)?;
        buf.extend_from_slice(key.as_bytes());
        buf.push(b':');
        let val = serde_json::to_string(value)?;
        buf.extend_from_slice(val.as_bytes());
    }
    buf.push(b'}');
    Ok(())
}

/// Parses a chunk JSON file back into `Replay` records.
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<Replay>> {
    let map: BTreeMap<String, ReplayJson> = serde_json::from_slice(bytes)?;
    let mut out = Vec::with_capacity(map.len());
    for (filename, value) in map {
        let metadata = value.metadata.map(|m| ReplayMetadata {
            protocol_version: m.protocol_version,
            host_name: m.host_name,
            game_mode: m.game_mode,
            map_steam_id: m.map_steam_id,
            map_title: m.map_title,
            players: m
                .players
                .into_iter()
                .map(|p| Player {
                    name: p.name,
                    score: p.score,
                    team: p.team,
                    steam_id: p.steam_id,
                })
                .collect(),
            marker_count: m.marker_count,
            started_at: m.started_at,
        });
        out.push(Replay::new(filename, value.finished_at, value.downloadable, metadata));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(filename: &str, ts: DateTime<Utc>) -> Replay {
        Replay::new(filename.to_string(), ts, true, None)
    }

    #[test]
    fn round_trips_without_metadata() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 24, 18, 39, 34).unwrap();
        let replay = sample("a.rep.zip", ts);
        let bytes = encode_chunk(&[&replay]).unwrap();
        let decoded = decode_chunk(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].filename(), "a.rep.zip");
        assert_eq!(decoded[0].finished_at(), ts);
        assert!(decoded[0].downloadable());
        assert!(decoded[0].metadata().is_none());
    }

    #[test]
    fn round_trips_with_metadata() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 16, 13, 1).unwrap();
        let meta = ReplayMetadata {
            protocol_version: 89,
            host_name: "Bobr".to_string(),
            game_mode: "1v1".to_string(),
            map_steam_id: 609506884,
            map_title: "Pocket Infinity".to_string(),
            players: vec![Player {
                name: "Ivan O.".to_string(),
                score: 12,
                team: 0,
                steam_id: 76561198044136441,
            }],
            marker_count: 0,
            started_at: ts,
        };
        let replay = Replay::new("p.rep.zip".to_string(), ts, true, Some(meta));
        let bytes = encode_chunk(&[&replay]).unwrap();
        let decoded = decode_chunk(&bytes).unwrap();
        let meta = decoded[0].metadata().unwrap();
        assert_eq!(meta.host_name, "Bobr");
        assert_eq!(meta.players[0].steam_id, 76561198044136441);
    }
}
