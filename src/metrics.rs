use serde::{Deserialize, Serialize};

use crate::records::PlayerMatchRecord;

/// Summable per-row metrics. Face-off percentage is a ratio and is ranked
/// separately (see `rankings::faceoff_ranking`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Goals,
    Assists,
    Points,
    PlusMinus,
    Penalties,
    FaceoffsWon,
    LineNet,
    PowerplayNet,
    BoxplayNet,
}

impl Metric {
    pub fn value(self, row: &PlayerMatchRecord) -> i64 {
        match self {
            Metric::Goals => row.goals as i64,
            Metric::Assists => row.assists as i64,
            Metric::Points => points(row) as i64,
            Metric::PlusMinus => plus_minus(row),
            Metric::Penalties => row.penalties as i64,
            Metric::FaceoffsWon => row.faceoffs_won as i64,
            Metric::LineNet => line_net(row),
            Metric::PowerplayNet => row.powerplay_plus as i64 - row.powerplay_minus as i64,
            Metric::BoxplayNet => row.boxplay_plus as i64 - row.boxplay_minus as i64,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Goals => "Goals",
            Metric::Assists => "Assists",
            Metric::Points => "Points (G+A)",
            Metric::PlusMinus => "Plus-Minus",
            Metric::Penalties => "Penalties",
            Metric::FaceoffsWon => "Face-offs won",
            Metric::LineNet => "Line Plus-Minus",
            Metric::PowerplayNet => "Powerplay +/-",
            Metric::BoxplayNet => "Boxplay +/-",
        }
    }
}

/// Widened so a season of maxed-out cells still sums.
pub fn points(row: &PlayerMatchRecord) -> u64 {
    u64::from(row.goals) + u64::from(row.assists)
}

pub fn plus_minus(row: &PlayerMatchRecord) -> i64 {
    row.plus as i64 - row.minus as i64
}

pub fn line_net(row: &PlayerMatchRecord) -> i64 {
    row.line_plus as i64 - row.line_minus as i64
}

/// `100 * won / (won + lost)`, and 0 for a player who never took a face-off.
pub fn faceoff_win_pct(won: u64, lost: u64) -> f64 {
    if won == 0 && lost == 0 {
        return 0.0;
    }
    100.0 * won as f64 / (won as f64 + lost as f64)
}

/// Average over games played; 0 games yields 0.
pub fn per_game(total: f64, games_played: u32) -> f64 {
    if games_played == 0 {
        0.0
    } else {
        total / games_played as f64
    }
}
