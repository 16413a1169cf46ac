//! Hand-off tables for the render layer. Everything here is recomputed from
//! the current rows on every call; nothing is cached between renders.

use serde::{Deserialize, Serialize};

use crate::metrics::Metric;
use crate::rankings::{self, GroupKey, RankEntry};
use crate::records::{PlayerMatchRecord, TeamMatchRecord};
use crate::summary::{self, LineRoster, SeasonSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartMetric {
    Sum(Metric),
    PerGame(Metric),
    FaceoffPct,
}

impl ChartMetric {
    pub fn is_percent(self) -> bool {
        matches!(self, ChartMetric::FaceoffPct)
    }

    pub fn format_value(self, value: f64) -> String {
        match self {
            ChartMetric::Sum(_) => format!("{value:.0}"),
            ChartMetric::PerGame(_) => format!("{value:.2}"),
            ChartMetric::FaceoffPct => format!("{value:.1}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChart {
    pub title: String,
    pub metric: ChartMetric,
    pub limit: usize,
    pub entries: Vec<RankEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub limit: usize,
    pub per_game: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            limit: 3,
            per_game: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub charts: Vec<RankedChart>,
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub match_id: String,
    /// `None` when the match table has no row for this id.
    pub meta: Option<TeamMatchRecord>,
    pub lines: Vec<LineRoster>,
    pub charts: Vec<RankedChart>,
}

pub fn player_charts(rows: &[PlayerMatchRecord], opts: DashboardOptions) -> Vec<RankedChart> {
    let n = opts.limit;
    let mut charts = vec![
        sum_chart(rows, Metric::Goals, n),
        sum_chart(rows, Metric::Assists, n),
        sum_chart(rows, Metric::Points, n),
    ];

    charts.push(if opts.per_game {
        RankedChart {
            title: format!("Top {n} {} per game", Metric::PlusMinus.label()),
            metric: ChartMetric::PerGame(Metric::PlusMinus),
            limit: n,
            entries: rankings::rank(rows, GroupKey::Player, Metric::PlusMinus, n, true),
        }
    } else {
        sum_chart(rows, Metric::PlusMinus, n)
    });

    charts.push(RankedChart {
        title: format!("Top {n} Face-off win %"),
        metric: ChartMetric::FaceoffPct,
        limit: n,
        entries: rankings::faceoff_ranking(rows, n),
    });

    charts.push(RankedChart {
        title: Metric::LineNet.label().to_string(),
        metric: ChartMetric::Sum(Metric::LineNet),
        limit: n,
        entries: rankings::rank(rows, GroupKey::Line, Metric::LineNet, n, false),
    });
    charts
}

fn sum_chart(rows: &[PlayerMatchRecord], metric: Metric, limit: usize) -> RankedChart {
    RankedChart {
        title: format!("Top {limit} {}", metric.label()),
        metric: ChartMetric::Sum(metric),
        limit,
        entries: rankings::rank(rows, GroupKey::Player, metric, limit, false),
    }
}

pub fn build_dashboard(
    rows: &[PlayerMatchRecord],
    matches: &[TeamMatchRecord],
    opts: DashboardOptions,
) -> DashboardView {
    DashboardView {
        charts: player_charts(rows, opts),
        seasons: summary::season_summaries(matches),
    }
}

/// Charts and roster for one match, computed over that match's rows only.
pub fn build_match_report(
    rows: &[PlayerMatchRecord],
    matches: &[TeamMatchRecord],
    match_id: &str,
    opts: DashboardOptions,
) -> MatchReport {
    let subset = summary::rows_for_match(rows, match_id);
    MatchReport {
        match_id: match_id.trim().to_string(),
        meta: summary::find_match(matches, match_id).cloned(),
        lines: summary::roster_by_line(&subset, match_id),
        charts: player_charts(&subset, opts),
    }
}
