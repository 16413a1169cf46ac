use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::metrics::{self, Metric};
use crate::records::PlayerMatchRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Player,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub name: String,
    pub games_played: u32,
    pub goals: u64,
    pub assists: u64,
    pub points: u64,
    pub plus_minus: i64,
    pub penalties: u64,
    pub faceoffs_won: u64,
    pub faceoffs_lost: u64,
    pub faceoff_pct: f64,
    pub powerplay_net: i64,
    pub boxplay_net: i64,
}

impl PlayerTotals {
    pub fn plus_minus_per_game(&self) -> f64 {
        metrics::per_game(self.plus_minus as f64, self.games_played)
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    key: String,
    sum: i64,
    games: u32,
}

/// Rows grouped by key, buckets in first-appearance order.
#[derive(Debug, Default)]
struct Buckets {
    order: Vec<Bucket>,
    index: HashMap<String, usize>,
}

impl Buckets {
    fn entry(&mut self, key: &str) -> &mut Bucket {
        let idx = match self.index.get(key) {
            Some(idx) => *idx,
            None => {
                self.order.push(Bucket {
                    key: key.to_string(),
                    sum: 0,
                    games: 0,
                });
                self.index.insert(key.to_string(), self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[idx]
    }
}

fn group_label(row: &PlayerMatchRecord, group: GroupKey) -> Option<String> {
    match group {
        GroupKey::Player => {
            let name = row.name.trim();
            (!name.is_empty()).then(|| name.to_string())
        }
        // The unassigned "0" bucket never shows up in a line ranking.
        GroupKey::Line => row.line.is_assigned().then(|| row.line.label()),
    }
}

/// Group, sum `metric`, optionally average over games played, sort
/// descending and keep the first `limit` entries.
///
/// Equal values keep the order in which their groups first appear in `rows`,
/// so the same input always yields the same list.
pub fn rank(
    rows: &[PlayerMatchRecord],
    group: GroupKey,
    metric: Metric,
    limit: usize,
    normalize_by_games_played: bool,
) -> Vec<RankEntry> {
    let mut buckets = Buckets::default();
    for row in rows {
        let Some(key) = group_label(row, group) else {
            continue;
        };
        let bucket = buckets.entry(&key);
        bucket.sum = bucket.sum.saturating_add(metric.value(row));
        if row.played {
            bucket.games += 1;
        }
    }

    let entries = buckets
        .order
        .into_iter()
        .map(|b| {
            let value = if normalize_by_games_played {
                metrics::per_game(b.sum as f64, b.games)
            } else {
                b.sum as f64
            };
            RankEntry { key: b.key, value }
        })
        .collect();
    sort_and_truncate(entries, limit)
}

/// Players by face-off win percentage over their summed face-offs. Players
/// without a single face-off stay in the table at 0%.
pub fn faceoff_ranking(rows: &[PlayerMatchRecord], limit: usize) -> Vec<RankEntry> {
    let mut order: Vec<(String, u64, u64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let Some(key) = group_label(row, GroupKey::Player) else {
            continue;
        };
        let idx = *index.entry(key.clone()).or_insert_with(|| {
            order.push((key, 0, 0));
            order.len() - 1
        });
        let slot = &mut order[idx];
        slot.1 = slot.1.saturating_add(row.faceoffs_won.into());
        slot.2 = slot.2.saturating_add(row.faceoffs_lost.into());
    }

    let entries = order
        .into_iter()
        .map(|(key, won, lost)| RankEntry {
            key,
            value: metrics::faceoff_win_pct(won, lost),
        })
        .collect();
    sort_and_truncate(entries, limit)
}

fn sort_and_truncate(mut entries: Vec<RankEntry>, limit: usize) -> Vec<RankEntry> {
    // `sort_by` is stable: ties keep first-appearance order.
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries.truncate(limit);
    entries
}

/// One totals row per player, in first-appearance order.
pub fn player_totals(rows: &[PlayerMatchRecord]) -> Vec<PlayerTotals> {
    let mut order: Vec<PlayerTotals> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(name) = group_label(row, GroupKey::Player) else {
            continue;
        };
        let idx = *index.entry(name.clone()).or_insert_with(|| {
            order.push(empty_totals(name));
            order.len() - 1
        });
        let t = &mut order[idx];
        if row.played {
            t.games_played += 1;
        }
        t.goals = t.goals.saturating_add(row.goals.into());
        t.assists = t.assists.saturating_add(row.assists.into());
        t.points = t.points.saturating_add(metrics::points(row));
        t.plus_minus = t.plus_minus.saturating_add(metrics::plus_minus(row));
        t.penalties = t.penalties.saturating_add(row.penalties.into());
        t.faceoffs_won = t.faceoffs_won.saturating_add(row.faceoffs_won.into());
        t.faceoffs_lost = t.faceoffs_lost.saturating_add(row.faceoffs_lost.into());
        t.powerplay_net = t.powerplay_net.saturating_add(Metric::PowerplayNet.value(row));
        t.boxplay_net = t.boxplay_net.saturating_add(Metric::BoxplayNet.value(row));
    }

    for t in &mut order {
        t.faceoff_pct = metrics::faceoff_win_pct(t.faceoffs_won, t.faceoffs_lost);
    }
    order
}

fn empty_totals(name: String) -> PlayerTotals {
    PlayerTotals {
        name,
        games_played: 0,
        goals: 0,
        assists: 0,
        points: 0,
        plus_minus: 0,
        penalties: 0,
        faceoffs_won: 0,
        faceoffs_lost: 0,
        faceoff_pct: 0.0,
        powerplay_net: 0,
        boxplay_net: 0,
    }
}
