//! Filename time parser (C1).
//!
//! Replay filenames follow `<map>_<player_a>_<player_b>_<DDMonYYYY>_<HHMMSS>_<n>markers.rep[.zip]`.
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ReplayDbError, Result};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Extracts the two `_`-delimited tokens before `...markers.rep[.zip]` and parses them
/// as `DD<Mon>YYYY_HHMMSS` in UTC, with English month abbreviations regardless of the
/// process locale.
pub fn parse_finished_at(filename: &str) -> Result<DateTime<Utc>> {
    let parts: Vec<&str> = filename.rsplitn(4, '_').collect();
    if parts.len() != 4 {
        return Err(ReplayDbError::NameFormat(filename.to_string()));
    }
    // rsplitn yields pieces in reverse order: [markers_part, hhmmss, ddmonyyyy, rest]
    let hhmmss = parts[1];
    let ddmonyyyy = parts[2];
    let marker_part = parts[0];
    let digits = marker_part
        .strip_suffix(".zip")
        .unwrap_or(marker_part)
        .strip_suffix(".rep")
        .ok_or_else(|| ReplayDbError::NameFormat(filename.to_string()))?
        .strip_suffix("markers")
        .ok_or_else(|| ReplayDbError::NameFormat(filename.to_string()))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReplayDbError::NameFormat(filename.to_string()));
    }

    let combined = format!("{ddmonyyyy}_{hhmmss}");
    let naive = parse_naive(&combined).ok_or_else(|| ReplayDbError::NameFormat(filename.to_string()))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Like [`parse_finished_at`] but returns `fallback` instead of erroring; used by the
/// space reclaimer to push unparseable filenames to the end of the eviction order.
pub fn parse_finished_at_with_fallback(filename: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    parse_finished_at(filename).unwrap_or(fallback)
}

/// Locale-independent `%d%b%Y_%H%M%S` parse (English three-letter month abbreviations).
fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    // Expect exactly "DDMonYYYY_HHMMSS", e.g. "24Nov2025_183934".
    let (date_part, time_part) = s.split_once('_')?;
    if date_part.len() != 9 || time_part.len() != 6 {
        return None;
    }
    let day: u32 = date_part[0..2].parse().ok()?;
    let mon_str = &date_part[2..5];
    let year: i32 = date_part[5..9].parse().ok()?;
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(mon_str))
        .map(|i| i as u32 + 1)?;

    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    let time = chrono::NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rep_filename() {
        let ts = parse_finished_at("Aerowalk_Ivan_O__Vigur_24Nov2025_183934_0markers.rep").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-11-24T18:39:34+00:00");
    }

    #[test]
    fn parses_rep_zip_filename() {
        let ts =
            parse_finished_at("Pocket_Infinity_Vigur_Ivan_O__05Jan2026_161301_0markers.rep.zip")
                .unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-05T16:13:01+00:00");
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(parse_finished_at("not_a_replay.rep").is_err());
        assert!(parse_finished_at("Map_a_b_24Nov2025_183934_markers.rep").is_err());
        assert!(parse_finished_at("Map_a_b_24Nov2025_18393_0markers.rep").is_err());
    }

    #[test]
    fn fallback_is_used_on_parse_failure() {
        let fallback = DateTime::<Utc>::from_naive_utc_and_offset(
            chrono::NaiveDate::from_ymd_opt(9999, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            Utc,
        );
        assert_eq!(
            parse_finished_at_with_fallback("garbage.rep", fallback),
            fallback
        );
    }
}
