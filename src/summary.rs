use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::metrics;
use crate::normalize::normalize_match_id;
use crate::records::{Line, Outcome, PlayerMatchRecord, TeamMatchRecord};

/// Scalar cards for one (season, league) group of the match table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: String,
    pub league: String,
    pub games: u32,
    pub goals_for: u64,
    pub goals_against: u64,
    pub goals_for_avg: f64,
    pub goals_against_avg: f64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRoster {
    pub line: Line,
    pub players: Vec<String>,
}

pub fn season_summaries(matches: &[TeamMatchRecord]) -> Vec<SeasonSummary> {
    let mut order: Vec<SeasonSummary> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for m in matches {
        let key = (m.season.trim().to_string(), m.league.trim().to_string());
        let idx = *index.entry(key.clone()).or_insert_with(|| {
            order.push(SeasonSummary {
                season: key.0,
                league: key.1,
                games: 0,
                goals_for: 0,
                goals_against: 0,
                goals_for_avg: 0.0,
                goals_against_avg: 0.0,
                wins: 0,
                losses: 0,
                draws: 0,
            });
            order.len() - 1
        });
        let s = &mut order[idx];
        s.games += 1;
        s.goals_for = s.goals_for.saturating_add(m.goals_for.into());
        s.goals_against = s.goals_against.saturating_add(m.goals_against.into());
        match m.outcome {
            Outcome::Win => s.wins += 1,
            Outcome::Loss => s.losses += 1,
            Outcome::Draw => s.draws += 1,
        }
    }

    for s in &mut order {
        s.goals_for_avg = metrics::per_game(s.goals_for as f64, s.games);
        s.goals_against_avg = metrics::per_game(s.goals_against as f64, s.games);
    }
    order
}

pub fn rows_for_match(rows: &[PlayerMatchRecord], match_id: &str) -> Vec<PlayerMatchRecord> {
    let wanted = match_id.trim();
    rows.iter()
        .filter(|r| r.match_id.trim() == wanted)
        .cloned()
        .collect()
}

pub fn find_match<'a>(
    matches: &'a [TeamMatchRecord],
    match_id: &str,
) -> Option<&'a TeamMatchRecord> {
    let wanted = match_id.trim();
    matches.iter().find(|m| m.match_id.trim() == wanted)
}

/// Players of one match grouped by line: numbered lines, goalies, then
/// players without a line who still played.
pub fn roster_by_line(rows: &[PlayerMatchRecord], match_id: &str) -> Vec<LineRoster> {
    let mut grouped: HashMap<Line, Vec<String>> = HashMap::new();
    for row in rows_for_match(rows, match_id) {
        if !row.line.is_assigned() && !row.played {
            continue;
        }
        grouped.entry(row.line).or_default().push(row.name.trim().to_string());
    }

    let mut out: Vec<LineRoster> = grouped
        .into_iter()
        .map(|(line, mut players)| {
            players.sort();
            players.dedup();
            LineRoster { line, players }
        })
        .collect();
    out.sort_by_key(|r| r.line.sort_key());
    out
}

/// Every known match id: the match table order first, then ids that only
/// appear in player rows.
pub fn match_ids(rows: &[PlayerMatchRecord], matches: &[TeamMatchRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let ids = matches
        .iter()
        .map(|m| m.match_id.trim())
        .chain(rows.iter().map(|r| r.match_id.trim()));
    for id in ids.filter_map(normalize_match_id) {
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// Season rows plus live-captured rows of matches the season table does not
/// know yet. Live rows without a usable match id are ignored.
pub fn combine_sources(
    season: &[PlayerMatchRecord],
    live: &[PlayerMatchRecord],
) -> Vec<PlayerMatchRecord> {
    let known: HashSet<&str> = season.iter().map(|r| r.match_id.trim()).collect();
    let mut out = season.to_vec();
    out.extend(
        live.iter()
            .filter(|r| {
                normalize_match_id(&r.match_id).is_some_and(|id| !known.contains(id.as_str()))
            })
            .cloned(),
    );
    out
}
