//! Live capture: one in-memory row per rostered player for the match being
//! recorded, merged into the persisted multi-match table on every flush.
//!
//! The store file is rewritten in full on each flush through a temporary file
//! in the same directory that is renamed over the destination, so readers see
//! either the previous or the new table. Writers are not coordinated: two
//! sessions flushing the same file race and the last rename wins.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::normalize::normalize_match_id;
use crate::records::{CounterField, Line, PlayerMatchRecord};
use crate::tables::{self, Loaded, StoredRow};

#[derive(Debug, Clone)]
pub struct LiveStore {
    path: PathBuf,
}

impl LiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted rows; a store that does not exist yet is empty.
    pub fn load(&self) -> Result<Loaded<PlayerMatchRecord>> {
        if !self.path.exists() {
            return Ok(Loaded {
                rows: Vec::new(),
                issues: Vec::new(),
            });
        }
        tables::load_player_table(&self.path)
    }

    /// Replace every persisted row of `match_id` with `current` and write the
    /// table back atomically. Rows of other matches are written back as read.
    /// Returns the number of rows now in the store.
    pub fn merge_match(&self, match_id: &str, current: &[PlayerMatchRecord]) -> Result<usize> {
        let match_id = match_id.trim();
        let combined: Vec<StoredRow> = self
            .load_stored()?
            .into_iter()
            .filter(|r| r.match_id() != match_id)
            .chain(
                current
                    .iter()
                    .cloned()
                    .map(normalized_keys)
                    .map(|r| StoredRow::from_record(&r)),
            )
            .collect();
        let merged = keep_last(combined, |r| (r.match_id().to_string(), r.name().to_string()));
        self.write_atomic(&merged)?;
        Ok(merged.len())
    }

    fn load_stored(&self) -> Result<Vec<StoredRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(&self.path)
            .with_context(|| format!("failed reading live store {}", self.path.display()))?;
        Ok(tables::parse_stored_rows(&raw)?.rows)
    }

    fn write_atomic(&self, rows: &[StoredRow]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed creating {}", dir.display()))?;

        // Dropped (and deleted) on any early return below.
        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed creating temp file in {}", dir.display()))?;
        tables::write_stored_rows(&mut tmp, rows)?;
        tmp.flush().context("flush temp file")?;
        tmp.as_file()
            .sync_all()
            .context("sync temp file")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed replacing {}", self.path.display()))?;
        Ok(())
    }
}

fn key_of(row: &PlayerMatchRecord) -> (String, String) {
    (row.match_id.trim().to_string(), row.name.trim().to_string())
}

fn normalized_keys(mut row: PlayerMatchRecord) -> PlayerMatchRecord {
    row.match_id = row.match_id.trim().to_string();
    row.name = row.name.trim().to_string();
    row
}

/// Drop the persisted rows of `match_id`, append `current`, keep the last row
/// per (match id, player).
pub fn merge_rows(
    persisted: Vec<PlayerMatchRecord>,
    match_id: &str,
    current: &[PlayerMatchRecord],
) -> Vec<PlayerMatchRecord> {
    let match_id = match_id.trim();
    let combined: Vec<PlayerMatchRecord> = persisted
        .into_iter()
        .map(normalized_keys)
        .filter(|r| r.match_id != match_id)
        .chain(current.iter().cloned().map(normalized_keys))
        .collect();
    keep_last(combined, key_of)
}

/// Keep the last row per key, in the order the survivors appeared.
fn keep_last<T>(rows: Vec<T>, key: impl Fn(&T) -> (String, String)) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = rows.into_iter().rev().filter(|r| seen.insert(key(r))).collect();
    kept.reverse();
    kept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No usable match id; flushing does nothing.
    Idle,
    /// Match id set and edits not yet persisted.
    Active,
    /// The store holds exactly the in-memory state.
    Flushed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Decrement refused at 0.
    Floored,
    UnknownPlayer,
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    NoMatchSelected,
    Written {
        match_id: String,
        rows: usize,
        total_rows: usize,
    },
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    store: LiveStore,
    rows: Vec<PlayerMatchRecord>,
    match_id: String,
    opponent: String,
    auto_save: bool,
    dirty: bool,
    last_flush: Option<FlushOutcome>,
}

impl LiveSession {
    pub fn new(store: LiveStore, roster: &[String], auto_save: bool) -> Self {
        let mut session = Self {
            store,
            rows: Vec::with_capacity(roster.len()),
            match_id: String::new(),
            opponent: String::new(),
            auto_save,
            dirty: false,
            last_flush: None,
        };
        for name in roster {
            session.add_player(name);
        }
        session
    }

    pub fn store(&self) -> &LiveStore {
        &self.store
    }

    pub fn rows(&self) -> &[PlayerMatchRecord] {
        &self.rows
    }

    pub fn row(&self, player: &str) -> Option<&PlayerMatchRecord> {
        let player = player.trim();
        self.rows.iter().find(|r| r.name == player)
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn set_auto_save(&mut self, on: bool) {
        self.auto_save = on;
    }

    pub fn last_flush(&self) -> Option<&FlushOutcome> {
        self.last_flush.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        if normalize_match_id(&self.match_id).is_none() {
            SessionPhase::Idle
        } else if self.dirty {
            SessionPhase::Active
        } else {
            SessionPhase::Flushed
        }
    }

    /// Row indices sorted for display: by line, then by name.
    pub fn display_order(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.rows.len()).collect();
        idx.sort_by(|a, b| {
            let (ra, rb) = (&self.rows[*a], &self.rows[*b]);
            ra.line
                .sort_key()
                .cmp(&rb.line.sort_key())
                .then_with(|| ra.name.cmp(&rb.name))
        });
        idx
    }

    /// Returns false for blank or already known names.
    pub fn add_player(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.row(name).is_some() {
            return false;
        }
        let mut row = PlayerMatchRecord::blank(name);
        row.match_id = self.match_id.clone();
        row.opponent = self.opponent.clone();
        self.rows.push(row);
        true
    }

    /// Start (or rename) the match being captured. Storage is not touched.
    pub fn set_match(&mut self, match_id: &str, opponent: &str) {
        self.match_id = match_id.trim().to_string();
        self.opponent = opponent.trim().to_string();
        for row in &mut self.rows {
            row.match_id = self.match_id.clone();
            row.opponent = self.opponent.clone();
        }
        self.dirty = true;
    }

    pub fn edit_cell(
        &mut self,
        player: &str,
        field: CounterField,
        delta: i32,
    ) -> Result<EditOutcome> {
        let Some(row) = self.row_mut(player) else {
            return Ok(EditOutcome::UnknownPlayer);
        };
        let slot = row.counter_mut(field);
        let current = *slot as i64;
        let next = (current + delta as i64).clamp(0, u32::MAX as i64);
        if next == current {
            return Ok(if delta < 0 {
                EditOutcome::Floored
            } else {
                EditOutcome::NoChange
            });
        }
        *slot = next as u32;
        self.after_edit()
    }

    /// Picking a line also marks the player as played.
    pub fn set_line(&mut self, player: &str, line: Line) -> Result<EditOutcome> {
        let Some(row) = self.row_mut(player) else {
            return Ok(EditOutcome::UnknownPlayer);
        };
        if row.line == line {
            return Ok(EditOutcome::NoChange);
        }
        row.line = line;
        if line.is_assigned() {
            row.played = true;
        }
        self.after_edit()
    }

    pub fn set_played(&mut self, player: &str, played: bool) -> Result<EditOutcome> {
        let Some(row) = self.row_mut(player) else {
            return Ok(EditOutcome::UnknownPlayer);
        };
        if row.played == played {
            return Ok(EditOutcome::NoChange);
        }
        row.played = played;
        self.after_edit()
    }

    fn row_mut(&mut self, player: &str) -> Option<&mut PlayerMatchRecord> {
        let player = player.trim();
        self.rows.iter_mut().find(|r| r.name == player)
    }

    fn after_edit(&mut self) -> Result<EditOutcome> {
        self.dirty = true;
        if self.auto_save {
            self.flush()?;
        }
        Ok(EditOutcome::Applied)
    }

    /// Merge the in-memory rows into the store. Without a match id this is a
    /// no-op and the store file is left untouched.
    pub fn flush(&mut self) -> Result<FlushOutcome> {
        let Some(match_id) = normalize_match_id(&self.match_id) else {
            log::debug!("flush skipped: no match selected");
            return Ok(FlushOutcome::NoMatchSelected);
        };

        let current: Vec<PlayerMatchRecord> = self
            .rows
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.match_id = match_id.clone();
                r.opponent = self.opponent.trim().to_string();
                r
            })
            .collect();
        let total_rows = self.store.merge_match(&match_id, &current)?;
        log::debug!(
            "flushed {} rows for match {match_id} into {}",
            current.len(),
            self.store.path().display()
        );

        self.dirty = false;
        let outcome = FlushOutcome::Written {
            match_id,
            rows: current.len(),
            total_rows,
        };
        self.last_flush = Some(outcome.clone());
        Ok(outcome)
    }

    /// Blank match: lines, played flags, counters, match id and opponent are
    /// cleared. Rows already persisted for the previous match stay on disk.
    pub fn reset_match(&mut self) {
        for row in &mut self.rows {
            row.clear_match_values();
        }
        self.match_id.clear();
        self.opponent.clear();
        self.dirty = false;
        self.last_flush = None;
    }

    /// Continue a match that was already (partly) captured: load its persisted
    /// rows into the session. Returns how many rows were restored.
    pub fn resume_match(&mut self, match_id: &str) -> Result<usize> {
        let Some(match_id) = normalize_match_id(match_id) else {
            return Ok(0);
        };
        let persisted: Vec<PlayerMatchRecord> = self
            .store
            .load()?
            .rows
            .into_iter()
            .filter(|r| r.match_id.trim() == match_id)
            .collect();

        let opponent = persisted
            .iter()
            .map(|r| r.opponent.trim())
            .find(|o| !o.is_empty())
            .unwrap_or(self.opponent.as_str())
            .to_string();
        self.reset_match();
        self.set_match(&match_id, &opponent);

        for saved in &persisted {
            self.add_player(&saved.name);
            if let Some(row) = self.row_mut(&saved.name) {
                *row = saved.clone();
                row.name = row.name.trim().to_string();
                row.match_id = match_id.clone();
                row.opponent = opponent.clone();
            }
        }
        self.dirty = persisted.is_empty();
        log::debug!("resumed match {match_id} with {} rows", persisted.len());
        Ok(persisted.len())
    }
}

/// Distinct player names across row sets, in first-appearance order.
pub fn known_players(sources: &[&[PlayerMatchRecord]]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for rows in sources {
        for row in rows.iter() {
            let name = row.name.trim();
            if !name.is_empty() && seen.insert(name.to_string()) {
                out.push(name.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<String> {
        vec!["Anna".to_string(), "Ben".to_string(), "Cleo".to_string()]
    }

    fn saved(name: &str, match_id: &str, goals: u32) -> PlayerMatchRecord {
        PlayerMatchRecord {
            match_id: match_id.to_string(),
            goals,
            ..PlayerMatchRecord::blank(name)
        }
    }

    #[test]
    fn merge_replaces_only_the_active_match() {
        let persisted = vec![saved("Anna", "1", 2), saved("Ben", " 2 ", 1), saved("Anna", "2", 4)];
        let current = vec![saved("Anna", "2", 5)];
        let merged = merge_rows(persisted, "2", &current);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], saved("Anna", "1", 2));
        assert_eq!(merged[1], saved("Anna", "2", 5));
    }

    #[test]
    fn merge_keeps_last_duplicate() {
        let current = vec![saved("Anna", "3", 1), saved(" Anna ", "3", 7)];
        let merged = merge_rows(Vec::new(), "3", &current);
        assert_eq!(merged, vec![saved("Anna", "3", 7)]);
    }

    #[test]
    fn decrement_is_floored_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = LiveStore::new(dir.path().join("live.csv"));
        let mut session = LiveSession::new(store, &roster(), false);
        session.set_match("7", "Tigers");
        assert_eq!(
            session.edit_cell("Anna", CounterField::Goals, -1).unwrap(),
            EditOutcome::Floored
        );
        assert_eq!(session.row("Anna").unwrap().goals, 0);
        assert_eq!(
            session.edit_cell("Anna", CounterField::Goals, 1).unwrap(),
            EditOutcome::Applied
        );
        assert_eq!(session.row("Anna").unwrap().goals, 1);
        assert_eq!(
            session.edit_cell("Nobody", CounterField::Goals, 1).unwrap(),
            EditOutcome::UnknownPlayer
        );
    }

    #[test]
    fn picking_a_line_marks_played() {
        let dir = tempfile::tempdir().unwrap();
        let store = LiveStore::new(dir.path().join("live.csv"));
        let mut session = LiveSession::new(store, &roster(), false);
        session.set_line("Ben", Line::Numbered(2)).unwrap();
        let ben = session.row("Ben").unwrap();
        assert!(ben.played);
        assert_eq!(ben.line, Line::Numbered(2));
    }

    #[test]
    fn flush_without_match_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.csv");
        fs::write(&path, "Name,Match_id,T\nAnna,1,3\n").unwrap();
        let before = fs::read(&path).unwrap();

        let mut session = LiveSession::new(LiveStore::new(&path), &roster(), true);
        session.edit_cell("Anna", CounterField::Goals, 1).unwrap();
        assert_eq!(session.flush().unwrap(), FlushOutcome::NoMatchSelected);
        session.set_match("nan", "");
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.flush().unwrap(), FlushOutcome::NoMatchSelected);

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn flush_is_idempotent_and_keeps_other_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.csv");
        fs::write(&path, "Name,Match_id,T\nAnna,1,3\n").unwrap();

        let mut session = LiveSession::new(LiveStore::new(&path), &roster(), false);
        session.set_match("2", "Wolves");
        assert_eq!(session.phase(), SessionPhase::Active);
        session.edit_cell("Cleo", CounterField::Assists, 2).unwrap();

        let first = session.flush().unwrap();
        assert_eq!(
            first,
            FlushOutcome::Written {
                match_id: "2".to_string(),
                rows: 3,
                total_rows: 4,
            }
        );
        assert_eq!(session.phase(), SessionPhase::Flushed);
        let bytes = fs::read(&path).unwrap();
        session.flush().unwrap();
        assert_eq!(fs::read(&path).unwrap(), bytes);

        let stored = session.store().load().unwrap().rows;
        assert_eq!(stored[0].name, "Anna");
        assert_eq!(stored[0].goals, 3);
        assert!(stored[1..].iter().all(|r| r.match_id == "2" && r.opponent == "Wolves"));
    }

    #[test]
    fn auto_save_flushes_each_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("live.csv");
        let mut session = LiveSession::new(LiveStore::new(&path), &roster(), true);
        session.set_match("5", "Bears");
        session.edit_cell("Ben", CounterField::Penalties, 1).unwrap();
        assert_eq!(session.phase(), SessionPhase::Flushed);
        let stored = session.store().load().unwrap().rows;
        assert_eq!(stored.iter().find(|r| r.name == "Ben").unwrap().penalties, 1);
    }

    #[test]
    fn reset_then_resume_restores_persisted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = LiveStore::new(dir.path().join("live.csv"));
        let mut session = LiveSession::new(store, &roster(), true);
        session.set_match("9", "Owls");
        session.edit_cell("Anna", CounterField::Goals, 2).unwrap();

        session.reset_match();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.row("Anna").unwrap().goals, 0);
        assert_eq!(session.match_id(), "");

        assert_eq!(session.resume_match("9").unwrap(), 3);
        assert_eq!(session.opponent(), "Owls");
        assert_eq!(session.row("Anna").unwrap().goals, 2);
        assert_eq!(session.phase(), SessionPhase::Flushed);
    }

    #[test]
    fn roster_skips_blanks_and_duplicates() {
        let names = vec!["Anna".to_string(), " ".to_string(), "Anna ".to_string()];
        let session = LiveSession::new(LiveStore::new("unused.csv"), &names, false);
        assert_eq!(session.rows().len(), 1);
    }

    #[test]
    fn display_order_follows_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = LiveStore::new(dir.path().join("live.csv"));
        let mut session = LiveSession::new(store, &roster(), false);
        session.set_line("Cleo", Line::Numbered(1)).unwrap();
        session.set_line("Anna", Line::Goalie).unwrap();
        let order: Vec<&str> = session
            .display_order()
            .into_iter()
            .map(|i| session.rows()[i].name.as_str())
            .collect();
        assert_eq!(order, vec!["Cleo", "Anna", "Ben"]);
    }
}
