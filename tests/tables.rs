use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use wygo_stats::records::{Line, Outcome};
use wygo_stats::tables::{DataIssue, load_player_table, parse_player_table, parse_team_table};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn season_table_resolves_legacy_headers() {
    let loaded =
        parse_player_table(&read_fixture("season_players.csv")).expect("fixture should parse");
    assert_eq!(loaded.rows.len(), 8);

    let anna = &loaded.rows[0];
    assert_eq!(anna.name, "Anna");
    assert_eq!(anna.match_id, "1");
    assert_eq!(anna.opponent, "Tigers");
    assert_eq!(anna.line, Line::Numbered(1));
    assert!(anna.played);
    assert_eq!((anna.plus, anna.minus), (3, 1));
    assert_eq!((anna.faceoffs_won, anna.faceoffs_lost), (4, 2));
    assert_eq!((anna.line_plus, anna.line_minus), (3, 1));

    let cleo = &loaded.rows[2];
    assert_eq!(cleo.line, Line::Goalie);
}

#[test]
fn placeholders_and_duplicates_fall_back_quietly() {
    let loaded = parse_player_table(&read_fixture("season_players.csv")).unwrap();
    let ben = &loaded.rows[1];
    // "-" in the plus column is a blank, not an error.
    assert_eq!(ben.plus, 0);
    // The repeated Strafen column: the first one counts.
    assert_eq!(ben.penalties, 2);
    assert!(!loaded.issues.iter().any(|i| matches!(
        i,
        DataIssue::UnparsableValue { raw, .. } if raw == "-"
    )));
}

#[test]
fn season_table_reports_issues() {
    let loaded = parse_player_table(&read_fixture("season_players.csv")).unwrap();

    let mut missing = loaded.missing_columns();
    missing.sort();
    assert_eq!(missing, vec!["Boxplay +", "Boxplay -", "Powerplay +", "Powerplay -"]);

    assert!(loaded.issues.contains(&DataIssue::UnparsableValue {
        line: 8,
        column: "Bully +",
        raw: "abc".to_string(),
    }));
    assert!(loaded.issues.contains(&DataIssue::BlankName { line: 10 }));

    let dana = loaded
        .rows
        .iter()
        .find(|r| r.name == "Dana" && r.match_id == "2")
        .unwrap();
    assert_eq!(dana.faceoffs_won, 0);
    assert_eq!(dana.faceoffs_lost, 1);
}

#[test]
fn match_table_outcomes_and_dates() {
    let loaded = parse_team_table(&read_fixture("matches.csv")).expect("fixture should parse");
    assert_eq!(loaded.rows.len(), 4);

    let first = &loaded.rows[0];
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 10, 12));
    assert_eq!(first.outcome, Outcome::Win);
    assert_eq!(loaded.rows[1].date, NaiveDate::from_ymd_opt(2025, 10, 19));

    // No flag set: derived from the score.
    assert_eq!(loaded.rows[1].outcome, Outcome::Draw);
    assert_eq!(loaded.rows[2].outcome, Outcome::Loss);

    // A single flag is trusted even against the score, and reported.
    let owls = &loaded.rows[3];
    assert_eq!(owls.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(owls.outcome, Outcome::Loss);
    assert_eq!(
        loaded.issues,
        vec![DataIssue::OutcomeMismatch {
            match_id: "4".to_string()
        }]
    );
}

#[test]
fn conflicting_flags_fall_back_to_score() {
    let raw = "Match_id,Tore Wygorazzi,Tore Gegner,Sieg,Niederlage,Unentschieden\n\
               7,1,0,Ja,Ja,Nein\n";
    let loaded = parse_team_table(raw).unwrap();
    assert_eq!(loaded.rows[0].outcome, Outcome::Win);
    assert!(!loaded
        .issues
        .iter()
        .any(|i| matches!(i, DataIssue::OutcomeMismatch { .. })));
}

#[test]
fn header_only_table_is_empty() {
    let loaded = parse_player_table("Name,T,A\n").unwrap();
    assert!(loaded.rows.is_empty());
}

#[test]
fn latin1_names_survive_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("season.csv");
    fs::write(&path, b"Name,T,A,+\nD.Geissb\xFChler,1,2,1\nB.Jordi,0,1,0\n").unwrap();

    let loaded = load_player_table(&path).expect("latin-1 table should load");
    let names: Vec<&str> = loaded.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["D.Geissbühler", "B.Jordi"]);
    assert_eq!(loaded.rows[0].assists, 2);
}

#[test]
fn utf8_and_latin1_cells_mix() {
    let raw: &[u8] = b"Name;Gegner;T\nL\xFCthi;Z\xFCrich;3\nM\xC3\xBCller;Bern;1\n";
    let loaded = parse_player_table(raw).unwrap();
    assert_eq!(loaded.rows[0].name, "Lüthi");
    assert_eq!(loaded.rows[0].opponent, "Zürich");
    assert_eq!(loaded.rows[0].goals, 3);
    assert_eq!(loaded.rows[1].name, "Müller");
}
