use anyhow::Result;
use chrono::NaiveDateTime;

use crate::rating;
use crate::scanner::{self, RankUpdateEvent};

/// `elo_change` value reserved for records whose line failed extraction.
/// It sits outside any delta the server can produce, and callers must skip
/// such records before deciding what to submit.
pub const ELO_CHANGE_SENTINEL: i32 = -1900;

pub const UNSET: i32 = -1;

/// One completed ranked set (best of 3). Rebuilt from log text on every scan;
/// `ranked_game_number` is the identity key, never a database id.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_date: Option<NaiveDateTime>,
    pub elo_rank_new: i32,
    pub elo_rank_old: i32,
    pub elo_change: i32,
    pub ranked_game_number: i64,
    pub total_wins: i32,
    pub win_streak_value: i32,
    /// Opponent rating as observed by the player, `UNSET` until supplied.
    pub opponent_elo: i32,
    /// Opponent rating inferred from the delta. Independently sourced from
    /// `opponent_elo`; the two are never merged.
    pub opponent_estimated_elo: i32,
    pub opponent_name: String,
    /// Per-game lengths attached by the duration correlator, at most 3.
    pub durations: Vec<u32>,
    pub games: [GameSlot; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSlot {
    pub char_pick: i32,
    pub opponent_pick: i32,
    pub stage: i32,
    pub winner: i32,
    pub final_move_id: i32,
    pub duration: i32,
}

impl Default for GameSlot {
    fn default() -> Self {
        Self {
            char_pick: UNSET,
            opponent_pick: UNSET,
            stage: UNSET,
            winner: UNSET,
            final_move_id: UNSET,
            duration: UNSET,
        }
    }
}

impl MatchRecord {
    pub fn is_win(&self) -> bool {
        self.elo_change >= 0
    }

    pub fn is_parse_failure(&self) -> bool {
        self.elo_change == ELO_CHANGE_SENTINEL
    }
}

/// Converts a scanned rank-update event into a record. Lines that fail
/// numeric extraction come back as a sentinel record rather than an error so
/// one corrupt line cannot sink the surrounding scan; `ELO_CHANGE_SENTINEL`
/// is deliberately unreachable by real play and is the only way callers can
/// tell the two apart.
pub fn parse(event: &RankUpdateEvent) -> MatchRecord {
    let match_date = scanner::extract_date(&event.raw);
    match build(event, match_date) {
        Ok(record) => record,
        Err(err) => {
            log::error!(
                "rank-update line {} failed extraction: {err}",
                event.line_index
            );
            sentinel(match_date)
        }
    }
}

fn build(event: &RankUpdateEvent, match_date: Option<NaiveDateTime>) -> Result<MatchRecord> {
    let payload = scanner::rank_payload(&event.raw)?;
    let won = payload.elo_change >= 0;
    // The opponent's observed rating is never in the log, so estimation runs
    // in the established-K regime with no streak bonus.
    let estimated = rating::estimate_opponent_elo(
        payload.elo_rank_new,
        payload.elo_change,
        won,
        rating::OPPONENT_UNKNOWN,
        0,
        rating::ESTABLISHED_K,
    )?;

    Ok(MatchRecord {
        match_date,
        elo_rank_new: payload.elo_rank_new,
        elo_rank_old: payload.elo_rank_old,
        elo_change: payload.elo_change,
        ranked_game_number: payload.ranked_game_number,
        total_wins: payload.total_wins,
        win_streak_value: payload.win_streak_value,
        opponent_elo: UNSET,
        opponent_estimated_elo: estimated,
        opponent_name: String::new(),
        durations: Vec::new(),
        games: [GameSlot::default(); 3],
    })
}

fn sentinel(match_date: Option<NaiveDateTime>) -> MatchRecord {
    MatchRecord {
        match_date,
        elo_rank_new: UNSET,
        elo_rank_old: UNSET,
        elo_change: ELO_CHANGE_SENTINEL,
        ranked_game_number: UNSET as i64,
        total_wins: UNSET,
        win_streak_value: 0,
        opponent_elo: UNSET,
        opponent_estimated_elo: UNSET,
        opponent_name: String::new(),
        durations: Vec::new(),
        games: [GameSlot::default(); 3],
    }
}
