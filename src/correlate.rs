use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;

use crate::scanner::{self, MatchEvent};

/// Best-of-3 cap on per-game durations attached to one match.
pub const MAX_GAME_DURATIONS: usize = 3;

/// The client reports the final game's duration shortly after the rank
/// summary, so a rank-update event may claim one duration up to this many
/// lines below it.
const TRAILING_LOOKAHEAD: usize = 5;

/// Ratings payload plus correlated durations for one match, keyed by the
/// per-account game counter in the map returned by [`correlate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTiming {
    pub elo_rank_new: i32,
    pub elo_rank_old: i32,
    pub elo_change: i32,
    pub total_wins: i32,
    pub win_streak_value: i32,
    pub durations: Vec<u32>,
}

/// Walks one file's event stream and attaches 0–3 durations to each
/// rank-update event. Single forward pass; the only state is the buffer of
/// durations seen since the previous match and the set of trailing duration
/// lines already claimed via look-ahead.
pub fn correlate(events: &[MatchEvent]) -> HashMap<i64, MatchTiming> {
    let mut results = HashMap::new();
    let mut pending: Vec<u32> = Vec::new();
    let mut consumed: HashSet<usize> = HashSet::new();

    for (idx, event) in events.iter().enumerate() {
        match event {
            MatchEvent::Duration(d) => {
                if consumed.contains(&d.line_index) {
                    continue;
                }
                pending.push(d.value);
            }
            MatchEvent::RankUpdate(rank) => {
                let payload = match scanner::rank_payload(&rank.raw) {
                    Ok(payload) => payload,
                    Err(err) => {
                        log::warn!(
                            "skipping rank-update line {} during correlation: {err}",
                            rank.line_index
                        );
                        continue;
                    }
                };

                let mut combined = std::mem::take(&mut pending);
                if let Some(trailing) = trailing_duration(events, idx, rank.line_index) {
                    combined.push(trailing.value);
                    consumed.insert(trailing.line_index);
                }

                let mut durations = dedup_consecutive(combined);
                durations.truncate(MAX_GAME_DURATIONS);

                results.insert(
                    payload.ranked_game_number,
                    MatchTiming {
                        elo_rank_new: payload.elo_rank_new,
                        elo_rank_old: payload.elo_rank_old,
                        elo_change: payload.elo_change,
                        total_wins: payload.total_wins,
                        win_streak_value: payload.win_streak_value,
                        durations,
                    },
                );
            }
        }
    }
    // Durations still pending at EOF have no match identity and are dropped.
    results
}

/// Correlates each file independently and merges the per-file maps. Buffer
/// and claimed-line state never leak across a file boundary.
pub fn correlate_files(paths: &[PathBuf]) -> Result<HashMap<i64, MatchTiming>> {
    let mut merged = HashMap::new();
    for path in paths {
        let events = scanner::scan_file(path)?;
        merged.extend(correlate(&events));
    }
    Ok(merged)
}

fn trailing_duration(
    events: &[MatchEvent],
    rank_idx: usize,
    rank_line: usize,
) -> Option<scanner::DurationEvent> {
    for event in &events[rank_idx + 1..] {
        match event {
            MatchEvent::Duration(d) => {
                if d.line_index > rank_line + TRAILING_LOOKAHEAD {
                    return None;
                }
                return Some(*d);
            }
            MatchEvent::RankUpdate(next) => {
                if next.line_index > rank_line + TRAILING_LOOKAHEAD {
                    return None;
                }
            }
        }
    }
    None
}

/// Back-to-back identical values are one duplicated client report, not two
/// games of identical length; collapse them.
fn dedup_consecutive(values: Vec<u32>) -> Vec<u32> {
    let mut cleaned: Vec<u32> = Vec::with_capacity(values.len());
    for value in values {
        if cleaned.last() != Some(&value) {
            cleaned.push(value);
        }
    }
    cleaned
}
