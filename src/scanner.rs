use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

// The two line grammars the game client emits. Matching is substring/regex
// search, never full-line equality: the client prefixes every line with a
// bracketed timestamp and frame counter.
pub const RANK_UPDATE_MARKER: &str =
    "URivalsRankUpdateMessage::OnReceivedFromServer LocalPlayerIndex";

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"RivalsCharacterXpEndMatchReportMessage::OnReceivedFromServer LocalPlayerIndex 0, matchDuration (\d+)",
    )
    .expect("duration grammar")
});

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("number grammar"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{4}\.\d{2}\.\d{2})-(\d{2}\.\d{2}\.\d{2})").expect("date grammar")
});

#[derive(Debug, Clone)]
pub enum MatchEvent {
    RankUpdate(RankUpdateEvent),
    Duration(DurationEvent),
}

#[derive(Debug, Clone)]
pub struct RankUpdateEvent {
    pub line_index: usize,
    pub raw: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DurationEvent {
    pub line_index: usize,
    pub value: u32,
}

/// The six trailing integers of a rank-update line, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankPayload {
    pub elo_rank_new: i32,
    pub elo_rank_old: i32,
    pub elo_change: i32,
    pub ranked_game_number: i64,
    pub total_wins: i32,
    pub win_streak_value: i32,
}

/// Scans one log file, yielding events in line order. A missing or unreadable
/// file is a hard error for the scan.
pub fn scan_file(path: &Path) -> Result<Vec<MatchEvent>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read game log {}", path.display()))?;
    Ok(scan_lines(raw.lines()))
}

/// Scans several files, concatenating events in the caller-given file order.
/// Line indices restart per file; cross-file ordering is positional.
pub fn scan(paths: &[PathBuf]) -> Result<Vec<MatchEvent>> {
    let mut out = Vec::new();
    for path in paths {
        out.extend(scan_file(path)?);
    }
    Ok(out)
}

pub fn scan_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<MatchEvent> {
    let mut events = Vec::new();
    for (line_index, line) in lines.enumerate() {
        if let Some(value) = duration_value(line) {
            events.push(MatchEvent::Duration(DurationEvent { line_index, value }));
        } else if line.contains(RANK_UPDATE_MARKER) {
            events.push(MatchEvent::RankUpdate(RankUpdateEvent {
                line_index,
                raw: line.trim_end().to_string(),
            }));
        }
    }
    events
}

pub fn duration_value(line: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(line)?;
    caps.get(1)?.as_str().parse::<u32>().ok()
}

/// Pulls the six trailing integers out of a rank-update line. The timestamp
/// prefix also contains digits, so only the last six matches are payload.
pub fn rank_payload(line: &str) -> Result<RankPayload> {
    let numbers: Vec<&str> = NUMBER_RE.find_iter(line).map(|m| m.as_str()).collect();
    if numbers.len() < 6 {
        return Err(anyhow!(
            "rank-update line carries {} integer tokens, need 6",
            numbers.len()
        ));
    }
    let tail = &numbers[numbers.len() - 6..];
    let parse_i32 = |raw: &str| {
        raw.parse::<i32>()
            .with_context(|| format!("rank token {raw:?}"))
    };
    Ok(RankPayload {
        elo_rank_new: parse_i32(tail[0])?,
        elo_rank_old: parse_i32(tail[1])?,
        elo_change: parse_i32(tail[2])?,
        ranked_game_number: tail[3]
            .parse::<i64>()
            .with_context(|| format!("game number token {:?}", tail[3]))?,
        total_wins: parse_i32(tail[4])?,
        win_streak_value: parse_i32(tail[5])?,
    })
}

/// Parses the bracketed `YYYY.MM.DD-HH.MM.SS` token. A line with no token
/// yields `None` quietly; a token that refuses to parse is warned about and
/// still yields `None` so one bad stamp never aborts a scan.
pub fn extract_date(line: &str) -> Option<NaiveDateTime> {
    let caps = DATE_RE.captures(line)?;
    let stamp = format!("{} {}", &caps[1], &caps[2]);
    match NaiveDateTime::parse_from_str(&stamp, "%Y.%m.%d %H.%M.%S") {
        Ok(dt) => Some(dt),
        Err(err) => {
            log::warn!("unparseable log timestamp {stamp:?}: {err}");
            None
        }
    }
}
