use std::collections::VecDeque;

use crate::config::Config;
use crate::dashboard::{self, DashboardOptions, DashboardView, MatchReport};
use crate::export;
use crate::live::{self, EditOutcome, FlushOutcome, LiveSession, LiveStore, SessionPhase};
use crate::logger;
use crate::records::{CounterField, PlayerMatchRecord, TeamMatchRecord};
use crate::summary;
use crate::tables::{self, DataIssue};

const MAX_LOGS: usize = 200;
const MAX_ISSUES_LOGGED: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Match,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    MatchId,
    Opponent,
    NewPlayer,
    ResumeMatch,
}

impl InputMode {
    pub fn prompt(self) -> &'static str {
        match self {
            InputMode::Normal => "",
            InputMode::MatchId => "Match id",
            InputMode::Opponent => "Opponent",
            InputMode::NewPlayer => "New player",
            InputMode::ResumeMatch => "Resume match id",
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub screen: Screen,
    pub season_rows: Vec<PlayerMatchRecord>,
    /// Snapshot of the live store, kept in step with every flush.
    pub live_rows: Vec<PlayerMatchRecord>,
    pub matches: Vec<TeamMatchRecord>,
    pub match_ids: Vec<String>,
    pub match_selected: usize,
    pub per_game: bool,
    pub full_roster: bool,
    pub live: LiveSession,
    pub live_selected: usize,
    pub live_column: usize,
    pub input: InputMode,
    pub input_buffer: String,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let live = LiveSession::new(
            LiveStore::new(config.live_csv.clone()),
            &config.roster,
            config.auto_save,
        );
        Self {
            config,
            screen: Screen::Dashboard,
            season_rows: Vec::new(),
            live_rows: Vec::new(),
            matches: Vec::new(),
            match_ids: Vec::new(),
            match_selected: 0,
            per_game: false,
            full_roster: false,
            live,
            live_selected: 0,
            live_column: 0,
            input: InputMode::Normal,
            input_buffer: String::new(),
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Move records from the `log` backend into the console.
    pub fn drain_log_records(&mut self) {
        for line in logger::drain() {
            self.push_log(line);
        }
    }

    /// Re-read all three tables. A table that fails to load keeps its
    /// previous rows.
    pub fn reload(&mut self) {
        match tables::load_player_table(&self.config.player_csv) {
            Ok(loaded) => {
                self.log_issues("players", &loaded.issues);
                self.push_log(format!("[INFO] Loaded {} player rows", loaded.rows.len()));
                self.season_rows = loaded.rows;
            }
            Err(err) => self.push_log(format!("[WARN] Player table: {err:#}")),
        }
        match tables::load_team_table(&self.config.match_csv) {
            Ok(loaded) => {
                self.log_issues("matches", &loaded.issues);
                self.push_log(format!("[INFO] Loaded {} matches", loaded.rows.len()));
                self.matches = loaded.rows;
            }
            Err(err) => self.push_log(format!("[WARN] Match table: {err:#}")),
        }
        match self.live.store().load() {
            Ok(loaded) => {
                self.log_issues("live", &loaded.issues);
                self.live_rows = loaded.rows;
            }
            Err(err) => self.push_log(format!("[WARN] Live store: {err:#}")),
        }

        if self.config.roster.is_empty() {
            let names = live::known_players(&[&self.live_rows[..], &self.season_rows[..]]);
            let added = names.iter().filter(|n| self.live.add_player(n.as_str())).count();
            if added > 0 {
                self.push_log(format!("[INFO] Roster: {added} players from tables"));
            }
        }
        self.refresh_match_ids();
    }

    fn log_issues(&mut self, source: &str, issues: &[DataIssue]) {
        for issue in issues.iter().take(MAX_ISSUES_LOGGED) {
            self.push_log(format!("[WARN] {source}: {issue}"));
        }
        if issues.len() > MAX_ISSUES_LOGGED {
            self.push_log(format!(
                "[WARN] {source}: {} more issues",
                issues.len() - MAX_ISSUES_LOGGED
            ));
        }
    }

    fn refresh_match_ids(&mut self) {
        self.match_ids = summary::match_ids(&self.analysis_rows(), &self.matches);
        if self.match_selected >= self.match_ids.len() {
            self.match_selected = self.match_ids.len().saturating_sub(1);
        }
    }

    pub fn analysis_rows(&self) -> Vec<PlayerMatchRecord> {
        summary::combine_sources(&self.season_rows, &self.live_rows)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            limit: if self.full_roster {
                self.config.full_n
            } else {
                self.config.top_n
            },
            per_game: self.per_game,
        }
    }

    pub fn dashboard(&self) -> DashboardView {
        dashboard::build_dashboard(&self.analysis_rows(), &self.matches, self.dashboard_options())
    }

    pub fn selected_match_id(&self) -> Option<&str> {
        self.match_ids.get(self.match_selected).map(String::as_str)
    }

    pub fn match_report(&self) -> Option<MatchReport> {
        let match_id = self.selected_match_id()?;
        Some(dashboard::build_match_report(
            &self.analysis_rows(),
            &self.matches,
            match_id,
            self.dashboard_options(),
        ))
    }

    pub fn toggle_per_game(&mut self) {
        self.per_game = !self.per_game;
        self.push_log(format!(
            "[INFO] Plus-Minus: {}",
            if self.per_game { "per game" } else { "total" }
        ));
    }

    pub fn toggle_full_roster(&mut self) {
        self.full_roster = !self.full_roster;
        let limit = self.dashboard_options().limit;
        self.push_log(format!("[INFO] Showing top {limit}"));
    }

    pub fn select_next(&mut self) {
        match self.screen {
            Screen::Dashboard => {}
            Screen::Match => {
                self.match_selected = wrap_next(self.match_selected, self.match_ids.len())
            }
            Screen::Live => {
                self.live_selected = wrap_next(self.live_selected, self.live.rows().len())
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.screen {
            Screen::Dashboard => {}
            Screen::Match => {
                self.match_selected = wrap_prev(self.match_selected, self.match_ids.len())
            }
            Screen::Live => {
                self.live_selected = wrap_prev(self.live_selected, self.live.rows().len())
            }
        }
    }

    pub fn column_next(&mut self) {
        self.live_column = wrap_next(self.live_column, CounterField::ALL.len());
    }

    pub fn column_prev(&mut self) {
        self.live_column = wrap_prev(self.live_column, CounterField::ALL.len());
    }

    pub fn selected_field(&self) -> CounterField {
        CounterField::ALL[self.live_column.min(CounterField::ALL.len() - 1)]
    }

    /// Name of the highlighted player in display order.
    pub fn selected_live_player(&self) -> Option<String> {
        let order = self.live.display_order();
        let idx = *order.get(self.live_selected)?;
        Some(self.live.rows()[idx].name.clone())
    }

    pub fn live_edit(&mut self, delta: i32) {
        let Some(player) = self.selected_live_player() else {
            self.push_log("[INFO] No player selected");
            return;
        };
        let field = self.selected_field();
        let result = self.live.edit_cell(&player, field, delta);
        self.after_live_edit(&player, result);
    }

    pub fn live_cycle_line(&mut self) {
        let Some(player) = self.selected_live_player() else {
            return;
        };
        let next = self
            .live
            .row(&player)
            .map(|r| r.line.next())
            .unwrap_or_default();
        let result = self.live.set_line(&player, next);
        self.after_live_edit(&player, result);
        // The row may move in display order; keep the cursor on it.
        self.follow_player(&player);
    }

    pub fn live_toggle_played(&mut self) {
        let Some(player) = self.selected_live_player() else {
            return;
        };
        let played = self.live.row(&player).map(|r| r.played).unwrap_or(false);
        let result = self.live.set_played(&player, !played);
        self.after_live_edit(&player, result);
    }

    fn follow_player(&mut self, player: &str) {
        let order = self.live.display_order();
        if let Some(pos) = order
            .iter()
            .position(|idx| self.live.rows()[*idx].name == player)
        {
            self.live_selected = pos;
        }
    }

    fn after_live_edit(&mut self, player: &str, result: anyhow::Result<EditOutcome>) {
        match result {
            Ok(EditOutcome::Applied) => self.sync_live_rows(),
            Ok(EditOutcome::Floored) => {
                let field = self.selected_field().short_label();
                self.push_log(format!("[INFO] {player}: {field} already 0"))
            }
            Ok(EditOutcome::UnknownPlayer) => {
                self.push_log(format!("[WARN] Unknown player {player}"))
            }
            Ok(EditOutcome::NoChange) => {}
            Err(err) => self.push_log(format!("[WARN] Save failed: {err:#}")),
        }
    }

    /// Mirror a successful flush into the analysis snapshot without
    /// re-reading the store.
    fn sync_live_rows(&mut self) {
        if self.live.phase() != SessionPhase::Flushed {
            return;
        }
        let current = self.live.rows().to_vec();
        let rows = std::mem::take(&mut self.live_rows);
        self.live_rows = live::merge_rows(rows, self.live.match_id(), &current);
        self.refresh_match_ids();
    }

    pub fn live_flush(&mut self) {
        match self.live.flush() {
            Ok(FlushOutcome::NoMatchSelected) => {
                self.push_log("[INFO] No match id set, nothing saved");
            }
            Ok(FlushOutcome::Written {
                match_id,
                rows,
                total_rows,
            }) => {
                self.push_log(format!(
                    "[INFO] Saved {rows} rows for match {match_id} ({total_rows} total)"
                ));
                self.sync_live_rows();
            }
            Err(err) => self.push_log(format!("[WARN] Save failed: {err:#}")),
        }
    }

    pub fn live_new_match(&mut self) {
        self.live.reset_match();
        self.live_selected = 0;
        self.push_log("[INFO] New match started, saved data kept");
    }

    pub fn toggle_auto_save(&mut self) {
        let on = !self.live.auto_save();
        self.live.set_auto_save(on);
        self.push_log(format!("[INFO] Auto-save {}", if on { "on" } else { "off" }));
    }

    pub fn begin_input(&mut self, mode: InputMode) {
        self.input = mode;
        self.input_buffer = match mode {
            InputMode::MatchId => self.live.match_id().to_string(),
            InputMode::Opponent => self.live.opponent().to_string(),
            _ => String::new(),
        };
    }

    pub fn input_char(&mut self, c: char) {
        if self.input != InputMode::Normal {
            self.input_buffer.push(c);
        }
    }

    pub fn input_backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn cancel_input(&mut self) {
        self.input = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn submit_input(&mut self) {
        let mode = self.input;
        let value = std::mem::take(&mut self.input_buffer);
        self.input = InputMode::Normal;
        match mode {
            InputMode::Normal => {}
            InputMode::MatchId => {
                let opponent = self.live.opponent().to_string();
                self.live.set_match(&value, &opponent);
                let shown = display_or_dash(self.live.match_id()).to_string();
                self.push_log(format!("[INFO] Match id: {shown}"));
            }
            InputMode::Opponent => {
                let match_id = self.live.match_id().to_string();
                self.live.set_match(&match_id, &value);
                let shown = display_or_dash(self.live.opponent()).to_string();
                self.push_log(format!("[INFO] Opponent: {shown}"));
            }
            InputMode::NewPlayer => {
                if self.live.add_player(&value) {
                    self.push_log(format!("[INFO] Added {}", value.trim()));
                } else {
                    self.push_log("[WARN] Player name empty or already listed");
                }
            }
            InputMode::ResumeMatch => match self.live.resume_match(&value) {
                Ok(0) => self.push_log(format!("[INFO] No saved rows for match {}", value.trim())),
                Ok(n) => {
                    self.live_selected = 0;
                    self.push_log(format!("[INFO] Resumed match {} ({n} rows)", value.trim()));
                }
                Err(err) => self.push_log(format!("[WARN] Resume failed: {err:#}")),
            },
        }
    }

    pub fn export(&mut self) {
        let path = self.config.export_xlsx.clone();
        let rows = self.analysis_rows();
        match export::export_workbook(&path, &rows, &self.matches, self.dashboard_options()) {
            Ok(report) => self.push_log(format!(
                "[INFO] Exported {} players, {} seasons to {}",
                report.players,
                report.seasons,
                path.display()
            )),
            Err(err) => self.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn wrap_next(current: usize, total: usize) -> usize {
    if total == 0 { 0 } else { (current + 1) % total }
}

fn wrap_prev(current: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else if current == 0 {
        total - 1
    } else {
        current - 1
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
