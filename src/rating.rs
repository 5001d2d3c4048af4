use anyhow::{Result, bail};

pub const ESTABLISHED_K: f64 = 24.0;
pub const POST_PLACEMENT_K: f64 = 40.0;

// Sentinel opponent ratings: -1 means "not reported", -2 means the opponent
// is still unranked and the server applies its post-placement K to the match.
pub const OPPONENT_UNKNOWN: i32 = -1;
pub const OPPONENT_UNRANKED: i32 = -2;

const MAX_TRACKED_STREAK: u32 = 10;

// K inflation per consecutive-win count, as tuned by the game server. These
// are observed breakpoints, not a formula.
const WIN_STREAK_BONUS: [f64; (MAX_TRACKED_STREAK + 1) as usize] = [
    0.00, 0.35, 0.35, 0.35, 0.45, 0.45, 0.50, 0.50, 0.50, 0.75, 1.00,
];

const EPSILON: f64 = 1e-6;

/// Inverts the logistic rating update to estimate the opponent's rating from
/// the delta the server applied to ours.
///
/// `my_elo` is the post-match rating, `won` must agree with the sign of
/// `elo_change` (zero counts as a win), and `opponent_elo` is only consulted
/// to pick the K regime: `OPPONENT_UNRANKED` switches to the post-placement K.
pub fn estimate_opponent_elo(
    my_elo: i32,
    elo_change: i32,
    won: bool,
    opponent_elo: i32,
    win_streak: u32,
    k: f64,
) -> Result<i32> {
    if (won && elo_change < 0) || (!won && elo_change > 0) {
        bail!("match result and elo change sign disagree ({won}, {elo_change})");
    }

    let base_k = if opponent_elo == OPPONENT_UNRANKED {
        POST_PLACEMENT_K
    } else {
        k
    };
    let streak = win_streak.min(MAX_TRACKED_STREAK);
    let effective_k = base_k * (1.0 + WIN_STREAK_BONUS[streak as usize]);

    let outcome = if won { 1.0 } else { 0.0 };
    let expected = (outcome - f64::from(elo_change) / effective_k).clamp(EPSILON, 1.0 - EPSILON);
    let odds_ratio = (1.0 - expected) / expected;
    let estimate = f64::from(my_elo) + 400.0 * odds_ratio.log10();

    log::debug!(
        "elo estimate: me={my_elo} change={elo_change} won={won} k={effective_k} -> {estimate:.1}"
    );
    Ok(estimate.floor() as i32)
}
