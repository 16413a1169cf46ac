use std::fs;
use std::path::PathBuf;

use wygo_stats::dashboard::{ChartMetric, DashboardOptions, build_dashboard, build_match_report};
use wygo_stats::export::export_workbook;
use wygo_stats::metrics::Metric;
use wygo_stats::records::{Line, PlayerMatchRecord, TeamMatchRecord};
use wygo_stats::summary::{combine_sources, match_ids, season_summaries};
use wygo_stats::tables::{parse_player_table, parse_team_table};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixtures() -> (Vec<PlayerMatchRecord>, Vec<TeamMatchRecord>) {
    let players = parse_player_table(&read_fixture("season_players.csv")).unwrap().rows;
    let matches = parse_team_table(&read_fixture("matches.csv")).unwrap().rows;
    (players, matches)
}

#[test]
fn dashboard_charts_in_display_order() {
    let (players, matches) = fixtures();
    let view = build_dashboard(&players, &matches, DashboardOptions::default());

    let titles: Vec<&str> = view.charts.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Top 3 Goals",
            "Top 3 Assists",
            "Top 3 Points (G+A)",
            "Top 3 Plus-Minus",
            "Top 3 Face-off win %",
            "Line Plus-Minus",
        ]
    );
    assert!(view.charts.iter().all(|c| c.entries.len() <= 3));
    assert_eq!(view.charts[4].metric, ChartMetric::FaceoffPct);
    assert_eq!(view.charts[4].metric.format_value(60.0), "60.0%");
}

#[test]
fn per_game_switches_plus_minus_chart() {
    let (players, matches) = fixtures();
    let opts = DashboardOptions {
        limit: 13,
        per_game: true,
    };
    let view = build_dashboard(&players, &matches, opts);
    let pm = &view.charts[3];
    assert_eq!(pm.metric, ChartMetric::PerGame(Metric::PlusMinus));
    assert_eq!(pm.title, "Top 13 Plus-Minus per game");
    assert_eq!(pm.entries.len(), 4);
    assert_eq!(pm.metric.format_value(pm.entries[2].value), "-0.50");
}

#[test]
fn season_cards() {
    let (players, matches) = fixtures();
    let view = build_dashboard(&players, &matches, DashboardOptions::default());
    assert_eq!(view.seasons.len(), 2);

    let current = &view.seasons[0];
    assert_eq!((current.season.as_str(), current.league.as_str()), ("25/26", "Liga A"));
    assert_eq!(current.games, 3);
    assert_eq!((current.goals_for, current.goals_against), (11, 13));
    assert!((current.goals_for_avg - 11.0 / 3.0).abs() < 1e-9);
    assert_eq!((current.wins, current.draws, current.losses), (1, 1, 1));

    let previous = &view.seasons[1];
    assert_eq!(previous.games, 1);
    assert_eq!(previous.losses, 1);
}

#[test]
fn season_goals_sum_past_u32() {
    let raw = "Match_id,Tore Wygorazzi,Tore Gegner,Saison\n\
               1,4294967295,0,25/26\n\
               2,4294967295,1,25/26\n";
    let matches = parse_team_table(raw).unwrap().rows;
    let cards = season_summaries(&matches);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].goals_for, 2 * u64::from(u32::MAX));
    assert_eq!(cards[0].wins, 2);
}

#[test]
fn match_report_groups_lines() {
    let (players, matches) = fixtures();
    let report = build_match_report(&players, &matches, "2", DashboardOptions::default());
    let meta = report.meta.as_ref().expect("match 2 is in the match table");
    assert_eq!(meta.opponent, "Wolves");

    let lines: Vec<(Line, Vec<&str>)> = report
        .lines
        .iter()
        .map(|g| (g.line, g.players.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        lines,
        vec![
            (Line::Numbered(1), vec!["Anna"]),
            (Line::Numbered(2), vec!["Ben", "Dana"]),
            (Line::Goalie, vec!["Cleo"]),
        ]
    );

    // Charts only see this match's rows.
    let goals = &report.charts[0];
    assert_eq!(goals.entries[0].key, "Dana");
    assert_eq!(goals.entries[0].value, 3.0);
}

#[test]
fn match_without_rows_or_metadata() {
    let (players, matches) = fixtures();
    let bears = build_match_report(&players, &matches, "3", DashboardOptions::default());
    assert!(bears.meta.is_some());
    assert!(bears.lines.is_empty());
    assert!(bears.charts.iter().all(|c| c.entries.is_empty()));

    let unknown = build_match_report(&players, &matches, "99", DashboardOptions::default());
    assert!(unknown.meta.is_none());
}

#[test]
fn live_rows_join_the_analysis() {
    let (players, matches) = fixtures();
    let live = parse_player_table(&read_fixture("live_store.csv")).unwrap().rows;
    let rows = combine_sources(&players, &live);
    assert_eq!(rows.len(), players.len() + 3);
    assert_eq!(match_ids(&rows, &matches), vec!["1", "2", "3", "4", "5", "6"]);

    // A live row for a match the season table already has is not doubled.
    let mut overlap = live.clone();
    overlap[0].match_id = "1".to_string();
    assert_eq!(combine_sources(&players, &overlap).len(), players.len() + 2);
}

#[test]
fn workbook_export_writes_all_sheets() {
    let (players, matches) = fixtures();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xlsx");
    let report = export_workbook(&path, &players, &matches, DashboardOptions::default())
        .expect("workbook should be written");
    assert_eq!(report.charts, 6);
    assert_eq!(report.players, 4);
    assert_eq!(report.seasons, 2);
    assert!(report.chart_rows > 0);
    assert!(fs::metadata(&path).unwrap().len() > 0);
}
