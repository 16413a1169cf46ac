use std::fs;
use std::path::{Path, PathBuf};

use wygo_stats::config::Config;
use wygo_stats::live::{FlushOutcome, LiveSession, LiveStore, SessionPhase};
use wygo_stats::records::{CounterField, Line};
use wygo_stats::state::{AppState, InputMode, Screen};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn seeded_store(dir: &Path) -> PathBuf {
    let path = dir.join("live.csv");
    fs::copy(fixture_path("live_store.csv"), &path).expect("fixture should copy");
    path
}

fn roster() -> Vec<String> {
    ["Anna", "Ben", "Eli"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn blank_or_nan_match_never_touches_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_store(dir.path());
    let before = fs::read(&path).unwrap();

    let mut session = LiveSession::new(LiveStore::new(&path), &roster(), true);
    for id in ["", "   ", "nan", "NaN"] {
        session.set_match(id, "Nobody");
        session.edit_cell("Anna", CounterField::Goals, 1).unwrap();
        session.set_line("Ben", Line::Numbered(3)).unwrap();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.flush().unwrap(), FlushOutcome::NoMatchSelected);
    }

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn flush_replaces_only_its_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_store(dir.path());

    let mut session = LiveSession::new(LiveStore::new(&path), &roster(), false);
    session.set_match(" 5 ", "Bears");
    session.edit_cell("Ben", CounterField::Assists, 2).unwrap();
    let outcome = session.flush().unwrap();
    assert_eq!(
        outcome,
        FlushOutcome::Written {
            match_id: "5".to_string(),
            rows: 3,
            total_rows: 4,
        }
    );

    let stored = LiveStore::new(&path).load().unwrap().rows;
    let eli_6 = stored.iter().find(|r| r.match_id == "6").expect("match 6 kept");
    assert_eq!(eli_6.name, "Eli");
    assert_eq!(eli_6.faceoffs_won, 2);

    let match_5: Vec<_> = stored.iter().filter(|r| r.match_id == "5").collect();
    assert_eq!(match_5.len(), 3);
    // The session started blank, so the earlier goal for Anna is replaced.
    assert_eq!(match_5.iter().find(|r| r.name == "Anna").unwrap().goals, 0);
    assert_eq!(match_5.iter().find(|r| r.name == "Ben").unwrap().assists, 2);
}

#[test]
fn other_matches_pass_through_a_flush_unchanged() {
    let header = "Name,Match_id,Gegner,Linie,Gespielt,T,A,+,-,Strafen,Bully +,Bully -,\
                  Boxplay +,Boxplay -,Powerplay +,Powerplay -,Linie-Plus,Linie-Minus";
    let odd_line = "Anna,1,Tigers,Sturm,vielleicht,2,0,0,0,0,0,0,0,0,0,0,0,0";
    let nameless = ",1,Tigers,2,Ja,3,0,0,0,0,0,0,0,0,0,0,0,0";
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.csv");
    fs::write(&path, format!("{header}\n{odd_line}\n{nameless}\n")).unwrap();

    let mut session = LiveSession::new(LiveStore::new(&path), &["Ben".to_string()], false);
    session.set_match("2", "Owls");
    session.edit_cell("Ben", CounterField::Goals, 1).unwrap();
    session.flush().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], header);
    assert_eq!(lines[1], odd_line);
    assert_eq!(lines[2], nameless);
    assert!(lines[3].starts_with("Ben,2,Owls,,Nein,1,"));
}

#[test]
fn repeated_flush_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_store(dir.path());

    let mut session = LiveSession::new(LiveStore::new(&path), &roster(), false);
    session.set_match("7", "Lynx");
    session.edit_cell("Eli", CounterField::FaceoffsWon, 3).unwrap();
    session.flush().unwrap();
    let once = fs::read(&path).unwrap();
    session.flush().unwrap();
    session.flush().unwrap();
    assert_eq!(fs::read(&path).unwrap(), once);
}

#[test]
fn last_flush_wins_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_store(dir.path());

    let mut first = LiveSession::new(LiveStore::new(&path), &roster(), false);
    let mut second = LiveSession::new(LiveStore::new(&path), &roster(), false);
    first.set_match("8", "Owls");
    second.set_match("8", "Owls");
    first.edit_cell("Anna", CounterField::Goals, 4).unwrap();
    second.edit_cell("Anna", CounterField::Goals, 1).unwrap();

    first.flush().unwrap();
    second.flush().unwrap();

    let stored = LiveStore::new(&path).load().unwrap().rows;
    let anna: Vec<_> = stored
        .iter()
        .filter(|r| r.match_id == "8" && r.name == "Anna")
        .collect();
    assert_eq!(anna.len(), 1);
    assert_eq!(anna[0].goals, 1);
}

#[test]
fn resume_in_a_fresh_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_store(dir.path());

    let mut session = LiveSession::new(LiveStore::new(&path), &["Zoe".to_string()], true);
    let restored = session.resume_match("5").unwrap();
    assert_eq!(restored, 2);
    assert_eq!(session.match_id(), "5");
    assert_eq!(session.opponent(), "Bears");
    assert_eq!(session.row("Anna").unwrap().goals, 1);
    // Roster players without saved rows stay in the session, blank.
    assert_eq!(session.row("Zoe").unwrap().goals, 0);
    assert_eq!(session.rows().len(), 3);

    assert_eq!(session.resume_match("nan").unwrap(), 0);
}

#[test]
fn app_state_live_flow() {
    let dir = tempfile::tempdir().unwrap();
    let live = seeded_store(dir.path());
    let config = Config {
        player_csv: fixture_path("season_players.csv"),
        match_csv: fixture_path("matches.csv"),
        live_csv: live.clone(),
        export_xlsx: dir.path().join("out.xlsx"),
        roster: Vec::new(),
        ..Config::default()
    };
    let mut state = AppState::new(config);
    state.reload();

    // Roster derived from the live store first, then the season table.
    let names: Vec<&str> = state.live.rows().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Anna", "Ben", "Eli", "Cleo", "Dana"]);
    assert_eq!(state.match_ids, vec!["1", "2", "3", "4", "5", "6"]);

    state.screen = Screen::Live;
    state.begin_input(InputMode::MatchId);
    for c in "9".chars() {
        state.input_char(c);
    }
    state.submit_input();
    assert_eq!(state.live.match_id(), "9");

    // Auto-save is on by default: the edit lands in the store at once.
    state.live_edit(1);
    assert_eq!(state.live.phase(), SessionPhase::Flushed);
    assert!(state.match_ids.contains(&"9".to_string()));

    state.live_edit(-1);
    state.live_edit(-1);
    let stored = LiveStore::new(&live).load().unwrap().rows;
    let player = state.selected_live_player().unwrap();
    let row = stored
        .iter()
        .find(|r| r.match_id == "9" && r.name == player)
        .unwrap();
    assert_eq!(row.goals, 0);

    state.export();
    assert!(dir.path().join("out.xlsx").exists());
    assert!(state.logs.iter().any(|l| l.contains("Exported")));
}
