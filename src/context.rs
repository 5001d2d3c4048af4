use crate::record::{MatchRecord, UNSET};

/// Player-supplied detail for one game of the set. Ids come from the backend
/// catalogs; `UNSET` marks anything the player left blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameContext {
    pub char_pick: i32,
    pub opponent_pick: i32,
    pub stage: i32,
    pub winner: i32,
    pub final_move_id: i32,
    pub duration: i32,
}

impl Default for GameContext {
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

/// Everything the player can annotate a single freshly-scanned match with.
/// Attribution is only unambiguous when a scan surfaces exactly one new
/// match, so the pipeline refuses to apply this to more than one record.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    pub opponent_elo: i32,
    pub opponent_name: String,
    pub games: [GameContext; 3],
}

impl MatchContext {
    pub fn apply_to(&self, record: &mut MatchRecord) {
        record.opponent_elo = self.opponent_elo;
        record.opponent_name = self.opponent_name.clone();
        for (slot, game) in record.games.iter_mut().zip(self.games.iter()) {
            slot.char_pick = game.char_pick;
            slot.opponent_pick = game.opponent_pick;
            slot.stage = game.stage;
            slot.winner = game.winner;
            slot.final_move_id = game.final_move_id;
            slot.duration = game.duration;
        }
    }
}
