use std::env;
use std::path::PathBuf;

use log::LevelFilter;

use crate::logger;

pub const DEFAULT_PLAYER_CSV: &str = "Spieler_Statistik.csv";
pub const DEFAULT_MATCH_CSV: &str = "Matches.csv";
pub const DEFAULT_LIVE_CSV: &str = "Spieler_Statistik_live.csv";
pub const DEFAULT_EXPORT_XLSX: &str = "wygo_report.xlsx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub player_csv: PathBuf,
    pub match_csv: PathBuf,
    pub live_csv: PathBuf,
    pub export_xlsx: PathBuf,
    /// Live capture roster; empty means "derive from the tables".
    pub roster: Vec<String>,
    pub top_n: usize,
    pub full_n: usize,
    pub auto_save: bool,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_csv: PathBuf::from(DEFAULT_PLAYER_CSV),
            match_csv: PathBuf::from(DEFAULT_MATCH_CSV),
            live_csv: PathBuf::from(DEFAULT_LIVE_CSV),
            export_xlsx: PathBuf::from(DEFAULT_EXPORT_XLSX),
            roster: Vec::new(),
            top_n: 3,
            full_n: 13,
            auto_save: true,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Environment first (after `.env.local` / `.env` were loaded), then
    /// command-line overrides.
    pub fn load() -> Self {
        let args = env::args().skip(1).collect::<Vec<_>>();
        let mut cfg = Self::from_env();
        cfg.apply_args(&args);
        cfg
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str, fallback: PathBuf| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
                .map(PathBuf::from)
                .unwrap_or(fallback)
        };
        let top_n = lookup("WYGO_TOP_N")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.top_n)
            .clamp(1, 50);
        let full_n = lookup("WYGO_FULL_N")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(defaults.full_n)
            .clamp(1, 100);
        let auto_save = lookup("WYGO_AUTOSAVE")
            .map(|val| parse_bool(&val).unwrap_or(defaults.auto_save))
            .unwrap_or(defaults.auto_save);
        let log_level = lookup("WYGO_LOG_LEVEL")
            .and_then(|val| logger::parse_level(&val))
            .unwrap_or(defaults.log_level);

        Self {
            player_csv: path("WYGO_PLAYER_CSV", defaults.player_csv),
            match_csv: path("WYGO_MATCH_CSV", defaults.match_csv),
            live_csv: path("WYGO_LIVE_CSV", defaults.live_csv),
            export_xlsx: path("WYGO_EXPORT_XLSX", defaults.export_xlsx),
            roster: lookup("WYGO_ROSTER")
                .map(|raw| parse_roster(&raw))
                .unwrap_or_default(),
            top_n,
            full_n,
            auto_save,
            log_level,
        }
    }

    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(path) = path_arg(args, "--players") {
            self.player_csv = path;
        }
        if let Some(path) = path_arg(args, "--matches") {
            self.match_csv = path;
        }
        if let Some(path) = path_arg(args, "--live") {
            self.live_csv = path;
        }
        if let Some(path) = path_arg(args, "--xlsx") {
            self.export_xlsx = path;
        }
    }
}

/// `--flag=value` or `--flag value`; blank values are ignored.
pub fn string_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

pub fn path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    string_arg(args, flag).map(PathBuf::from)
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

pub fn parse_roster(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !out.iter().any(|known| known == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
