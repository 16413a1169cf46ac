use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Label used for players without a line. Rankings filter this bucket out.
pub const UNASSIGNED_LINE: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Line {
    #[default]
    Unassigned,
    Numbered(u8),
    Goalie,
}

impl Line {
    /// Lines offered by the live screen, in cycle order.
    pub const CHOICES: [Line; 5] = [
        Line::Unassigned,
        Line::Numbered(1),
        Line::Numbered(2),
        Line::Numbered(3),
        Line::Goalie,
    ];

    pub fn label(self) -> String {
        match self {
            Line::Unassigned => UNASSIGNED_LINE.to_string(),
            Line::Numbered(n) => n.to_string(),
            Line::Goalie => "Goalie".to_string(),
        }
    }

    /// Cell text written to the live store (`""` for no line).
    pub fn cell(self) -> String {
        match self {
            Line::Unassigned => String::new(),
            other => other.label(),
        }
    }

    pub fn is_assigned(self) -> bool {
        !matches!(self, Line::Unassigned)
    }

    /// Display order: numbered lines first, then goalies, unassigned last.
    pub fn sort_key(self) -> u16 {
        match self {
            Line::Numbered(n) => n as u16,
            Line::Goalie => 900,
            Line::Unassigned => 999,
        }
    }

    pub fn next(self) -> Line {
        let idx = Line::CHOICES.iter().position(|l| *l == self).unwrap_or(0);
        Line::CHOICES[(idx + 1) % Line::CHOICES.len()]
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Unassigned => f.write_str("-"),
            other => f.write_str(&other.label()),
        }
    }
}

/// One row per (player, match).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlayerMatchRecord {
    pub name: String,
    pub match_id: String,
    pub opponent: String,
    pub line: Line,
    pub played: bool,
    pub goals: u32,
    pub assists: u32,
    pub plus: u32,
    pub minus: u32,
    pub penalties: u32,
    pub faceoffs_won: u32,
    pub faceoffs_lost: u32,
    pub boxplay_plus: u32,
    pub boxplay_minus: u32,
    pub powerplay_plus: u32,
    pub powerplay_minus: u32,
    pub line_plus: u32,
    pub line_minus: u32,
}

impl PlayerMatchRecord {
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn counter(&self, field: CounterField) -> u32 {
        match field {
            CounterField::Goals => self.goals,
            CounterField::Assists => self.assists,
            CounterField::Plus => self.plus,
            CounterField::Minus => self.minus,
            CounterField::Penalties => self.penalties,
            CounterField::FaceoffsWon => self.faceoffs_won,
            CounterField::FaceoffsLost => self.faceoffs_lost,
            CounterField::BoxplayPlus => self.boxplay_plus,
            CounterField::BoxplayMinus => self.boxplay_minus,
            CounterField::PowerplayPlus => self.powerplay_plus,
            CounterField::PowerplayMinus => self.powerplay_minus,
            CounterField::LinePlus => self.line_plus,
            CounterField::LineMinus => self.line_minus,
        }
    }

    pub fn counter_mut(&mut self, field: CounterField) -> &mut u32 {
        match field {
            CounterField::Goals => &mut self.goals,
            CounterField::Assists => &mut self.assists,
            CounterField::Plus => &mut self.plus,
            CounterField::Minus => &mut self.minus,
            CounterField::Penalties => &mut self.penalties,
            CounterField::FaceoffsWon => &mut self.faceoffs_won,
            CounterField::FaceoffsLost => &mut self.faceoffs_lost,
            CounterField::BoxplayPlus => &mut self.boxplay_plus,
            CounterField::BoxplayMinus => &mut self.boxplay_minus,
            CounterField::PowerplayPlus => &mut self.powerplay_plus,
            CounterField::PowerplayMinus => &mut self.powerplay_minus,
            CounterField::LinePlus => &mut self.line_plus,
            CounterField::LineMinus => &mut self.line_minus,
        }
    }

    /// Reset everything the live screen edits; identity stays.
    pub fn clear_match_values(&mut self) {
        let name = std::mem::take(&mut self.name);
        *self = Self::blank(name);
    }
}

/// Counters editable from the live screen, in on-screen column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterField {
    Goals,
    Assists,
    Plus,
    Minus,
    Penalties,
    FaceoffsWon,
    FaceoffsLost,
    BoxplayPlus,
    BoxplayMinus,
    PowerplayPlus,
    PowerplayMinus,
    LinePlus,
    LineMinus,
}

impl CounterField {
    pub const ALL: [CounterField; 13] = [
        CounterField::Goals,
        CounterField::Assists,
        CounterField::Plus,
        CounterField::Minus,
        CounterField::Penalties,
        CounterField::FaceoffsWon,
        CounterField::FaceoffsLost,
        CounterField::BoxplayPlus,
        CounterField::BoxplayMinus,
        CounterField::PowerplayPlus,
        CounterField::PowerplayMinus,
        CounterField::LinePlus,
        CounterField::LineMinus,
    ];

    /// Column header written to the live store.
    pub fn column(self) -> &'static str {
        match self {
            CounterField::Goals => "T",
            CounterField::Assists => "A",
            CounterField::Plus => "+",
            CounterField::Minus => "-",
            CounterField::Penalties => "Strafen",
            CounterField::FaceoffsWon => "Bully +",
            CounterField::FaceoffsLost => "Bully -",
            CounterField::BoxplayPlus => "Boxplay +",
            CounterField::BoxplayMinus => "Boxplay -",
            CounterField::PowerplayPlus => "Powerplay +",
            CounterField::PowerplayMinus => "Powerplay -",
            CounterField::LinePlus => "Linie-Plus",
            CounterField::LineMinus => "Linie-Minus",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            CounterField::Goals => "G",
            CounterField::Assists => "A",
            CounterField::Plus => "+",
            CounterField::Minus => "-",
            CounterField::Penalties => "PIM",
            CounterField::FaceoffsWon => "FO+",
            CounterField::FaceoffsLost => "FO-",
            CounterField::BoxplayPlus => "BP+",
            CounterField::BoxplayMinus => "BP-",
            CounterField::PowerplayPlus => "PP+",
            CounterField::PowerplayMinus => "PP-",
            CounterField::LinePlus => "LN+",
            CounterField::LineMinus => "LN-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn from_score(goals_for: u32, goals_against: u32) -> Outcome {
        match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}

/// Raw yes/no outcome columns as they appear in the match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutcomeFlags {
    pub win: bool,
    pub loss: bool,
    pub draw: bool,
}

impl OutcomeFlags {
    /// The flagged outcome when exactly one flag is set.
    pub fn single(self) -> Option<Outcome> {
        match (self.win, self.loss, self.draw) {
            (true, false, false) => Some(Outcome::Win),
            (false, true, false) => Some(Outcome::Loss),
            (false, false, true) => Some(Outcome::Draw),
            _ => None,
        }
    }
}

/// One row per match for the team as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMatchRecord {
    pub match_id: String,
    pub date: Option<NaiveDate>,
    pub opponent: String,
    pub goals_for: u32,
    pub goals_against: u32,
    pub season: String,
    pub league: String,
    pub flags: OutcomeFlags,
    pub outcome: Outcome,
}

impl TeamMatchRecord {
    /// Trust a single set flag; otherwise fall back to the score.
    pub fn resolve_outcome(flags: OutcomeFlags, goals_for: u32, goals_against: u32) -> Outcome {
        flags
            .single()
            .unwrap_or_else(|| Outcome::from_score(goals_for, goals_against))
    }

    pub fn outcome_matches_score(&self) -> bool {
        self.outcome == Outcome::from_score(self.goals_for, self.goals_against)
    }
}
