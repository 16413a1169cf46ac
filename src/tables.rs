//! CSV tables: the season player-stat table, the team match table and the
//! live capture store.
//!
//! Headers are resolved once per file against a declared schema. Columns the
//! file does not carry are reported as [`DataIssue::MissingColumn`] and read
//! as their field default, so record construction never checks for column
//! presence again.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ByteRecord, StringRecord};
use once_cell::sync::Lazy;

use crate::normalize::{FieldKind, Normalized, normalize};
use crate::records::{CounterField, Line, OutcomeFlags, PlayerMatchRecord, TeamMatchRecord};

pub struct ColumnSpec {
    /// Canonical header; also what the writer emits.
    pub header: &'static str,
    /// Accepted spellings after [`header_key`] folding.
    pub aliases: &'static [&'static str],
}

pub const COL_NAME: &str = "Name";
pub const COL_MATCH_ID: &str = "Match_id";
pub const COL_OPPONENT: &str = "Gegner";
pub const COL_LINE: &str = "Linie";
pub const COL_PLAYED: &str = "Gespielt";

pub const COL_DATE: &str = "Datum";
pub const COL_GOALS_FOR: &str = "Tore Wygorazzi";
pub const COL_GOALS_AGAINST: &str = "Tore Gegner";
pub const COL_WIN: &str = "Sieg";
pub const COL_LOSS: &str = "Niederlage";
pub const COL_DRAW: &str = "Unentschieden";
pub const COL_SEASON: &str = "Saison";
pub const COL_LEAGUE: &str = "Liga Wygorazzi";

/// Player table schema in write order.
pub const PLAYER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        header: COL_NAME,
        aliases: &["name", "spieler", "player"],
    },
    ColumnSpec {
        header: COL_MATCH_ID,
        aliases: &["match_id", "matchid", "match-id", "spiel-id", "spielid"],
    },
    ColumnSpec {
        header: COL_OPPONENT,
        aliases: &["gegner", "opponent"],
    },
    ColumnSpec {
        header: COL_LINE,
        aliases: &["linie", "line"],
    },
    ColumnSpec {
        header: COL_PLAYED,
        aliases: &["gespielt", "played"],
    },
    ColumnSpec {
        header: "T",
        aliases: &["t", "tore", "goals"],
    },
    ColumnSpec {
        header: "A",
        aliases: &["a", "assists"],
    },
    ColumnSpec {
        header: "+",
        aliases: &["+", "plus"],
    },
    ColumnSpec {
        header: "-",
        aliases: &["-", "minus"],
    },
    ColumnSpec {
        header: "Strafen",
        aliases: &["strafen", "penalties"],
    },
    ColumnSpec {
        header: "Bully +",
        aliases: &["bully+", "bully-plus", "bullyplus"],
    },
    ColumnSpec {
        header: "Bully -",
        aliases: &["bully-", "bully-minus", "bullyminus"],
    },
    ColumnSpec {
        header: "Boxplay +",
        aliases: &["boxplay+", "boxplay-plus"],
    },
    ColumnSpec {
        header: "Boxplay -",
        aliases: &["boxplay-", "boxplay-minus"],
    },
    ColumnSpec {
        header: "Powerplay +",
        aliases: &["powerplay+", "powerplay-plus"],
    },
    ColumnSpec {
        header: "Powerplay -",
        aliases: &["powerplay-", "powerplay-minus"],
    },
    ColumnSpec {
        header: "Linie-Plus",
        aliases: &["linie-plus", "linie+", "line-plus"],
    },
    ColumnSpec {
        header: "Linie-Minus",
        aliases: &["linie-minus", "linie-", "line-minus"],
    },
];

pub const TEAM_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        header: COL_MATCH_ID,
        aliases: &["match_id", "matchid", "match-id", "spiel-id", "spielid"],
    },
    ColumnSpec {
        header: COL_DATE,
        aliases: &["datum", "date"],
    },
    ColumnSpec {
        header: COL_OPPONENT,
        aliases: &["gegner", "opponent"],
    },
    ColumnSpec {
        header: COL_GOALS_FOR,
        aliases: &["torewygorazzi", "toreteam", "tore", "goalsfor"],
    },
    ColumnSpec {
        header: COL_GOALS_AGAINST,
        aliases: &["toregegner", "goalsagainst"],
    },
    ColumnSpec {
        header: COL_WIN,
        aliases: &["sieg", "win"],
    },
    ColumnSpec {
        header: COL_LOSS,
        aliases: &["niederlage", "loss"],
    },
    ColumnSpec {
        header: COL_DRAW,
        aliases: &["unentschieden", "draw"],
    },
    ColumnSpec {
        header: COL_SEASON,
        aliases: &["saison", "season"],
    },
    ColumnSpec {
        header: COL_LEAGUE,
        aliases: &["ligawygorazzi", "liga", "league"],
    },
];

static PLAYER_ALIASES: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| alias_index(PLAYER_COLUMNS));
static TEAM_ALIASES: Lazy<HashMap<String, &'static str>> =
    Lazy::new(|| alias_index(TEAM_COLUMNS));

fn alias_index(schema: &'static [ColumnSpec]) -> HashMap<String, &'static str> {
    let mut out = HashMap::new();
    for spec in schema {
        out.insert(header_key(spec.header), spec.header);
        for alias in spec.aliases {
            out.insert(header_key(alias), spec.header);
        }
    }
    out
}

/// Fold a header for lookup: trimmed, lowercase, no inner whitespace.
pub fn header_key(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIssue {
    /// Column absent from the file; every row gets the field default.
    MissingColumn { column: &'static str },
    /// Cell present but not understood; the field default was used.
    UnparsableValue {
        line: u64,
        column: &'static str,
        raw: String,
    },
    /// Row without a player name; skipped.
    BlankName { line: u64 },
    /// Exactly one outcome flag is set and it disagrees with the score.
    OutcomeMismatch { match_id: String },
    /// The CSV reader rejected the record; skipped.
    UnreadableRecord { line: u64, reason: String },
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIssue::MissingColumn { column } => {
                write!(f, "missing column '{column}', using defaults")
            }
            DataIssue::UnparsableValue { line, column, raw } => {
                write!(f, "line {line}: unreadable {column} value '{raw}', using default")
            }
            DataIssue::BlankName { line } => write!(f, "line {line}: row without a name skipped"),
            DataIssue::OutcomeMismatch { match_id } => {
                write!(f, "match {match_id}: outcome flag disagrees with the score")
            }
            DataIssue::UnreadableRecord { line, reason } => {
                write!(f, "line {line}: unreadable row skipped ({reason})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub issues: Vec<DataIssue>,
}

impl<T> Loaded<T> {
    pub fn missing_columns(&self) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                DataIssue::MissingColumn { column } => Some(*column),
                _ => None,
            })
            .collect()
    }
}

struct ColumnMap {
    positions: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn resolve(
        headers: &StringRecord,
        schema: &'static [ColumnSpec],
        aliases: &HashMap<String, &'static str>,
        issues: &mut Vec<DataIssue>,
    ) -> Self {
        let mut positions = HashMap::new();
        for (idx, raw) in headers.iter().enumerate() {
            let Some(canonical) = aliases.get(&header_key(raw)) else {
                continue;
            };
            // Some season files repeat a column; the first one wins.
            positions.entry(*canonical).or_insert(idx);
        }
        for spec in schema {
            if !positions.contains_key(spec.header) {
                issues.push(DataIssue::MissingColumn { column: spec.header });
            }
        }
        Self { positions }
    }
}

struct RowReader<'a> {
    record: &'a StringRecord,
    columns: &'a ColumnMap,
    line: u64,
    issues: &'a mut Vec<DataIssue>,
}

impl RowReader<'_> {
    fn field(&mut self, column: &'static str, kind: FieldKind) -> Normalized {
        let raw = self
            .columns
            .positions
            .get(column)
            .and_then(|idx| self.record.get(*idx));
        let value = normalize(raw, kind);
        if value.fell_back {
            self.issues.push(DataIssue::UnparsableValue {
                line: self.line,
                column,
                raw: raw.unwrap_or_default().trim().to_string(),
            });
        }
        value
    }

    fn text(&mut self, column: &'static str) -> String {
        self.field(column, FieldKind::Text).into_text()
    }

    fn count(&mut self, column: &'static str) -> u32 {
        self.field(column, FieldKind::Count).as_count()
    }

    fn flag(&mut self, column: &'static str) -> bool {
        self.field(column, FieldKind::Flag).as_flag()
    }

    fn line_value(&mut self, column: &'static str) -> Line {
        self.field(column, FieldKind::Line).as_line()
    }
}

/// Comma unless the header line is clearly semicolon separated (Excel exports).
fn sniff_delimiter(raw: &[u8]) -> u8 {
    let header = raw.split(|b| *b == b'\n').next().unwrap_or_default();
    let count = |needle: u8| header.iter().filter(|b| **b == needle).count();
    if count(b';') > count(b',') {
        b';'
    } else {
        b','
    }
}

/// UTF-8 when valid, otherwise Latin-1 as written by older Excel exports.
pub fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|b| char::from(*b)).collect(),
    }
}

fn decode_record(record: &ByteRecord) -> StringRecord {
    StringRecord::from(record.iter().map(decode_cell).collect::<Vec<_>>())
}

/// Decoded header plus every non-blank record with its source line.
/// Records the reader rejects become [`DataIssue::UnreadableRecord`].
fn read_records(
    raw: &[u8],
    table: &str,
    issues: &mut Vec<DataIssue>,
) -> Result<(StringRecord, Vec<(u64, StringRecord)>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(sniff_delimiter(raw))
        .from_reader(raw);
    let headers = decode_record(
        reader
            .byte_headers()
            .with_context(|| format!("read {table} header"))?,
    );

    let mut records = Vec::new();
    let mut record = ByteRecord::new();
    let mut next_line = 2;
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map(|p| p.line()).unwrap_or(next_line);
                next_line = line + 1;
                let decoded = decode_record(&record);
                if decoded.iter().all(|cell| cell.trim().is_empty()) {
                    continue;
                }
                records.push((line, decoded));
            }
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(next_line);
                next_line = line + 1;
                let fatal = matches!(err.kind(), csv::ErrorKind::Io(_));
                issues.push(DataIssue::UnreadableRecord {
                    line,
                    reason: err.to_string(),
                });
                if fatal || reader.is_done() {
                    break;
                }
            }
        }
    }
    Ok((headers, records))
}

pub fn parse_player_table(raw: impl AsRef<[u8]>) -> Result<Loaded<PlayerMatchRecord>> {
    let mut issues = Vec::new();
    let (headers, records) = read_records(raw.as_ref(), "player table", &mut issues)?;
    let columns = ColumnMap::resolve(&headers, PLAYER_COLUMNS, &PLAYER_ALIASES, &mut issues);

    let mut rows = Vec::new();
    for (line, record) in &records {
        let line = *line;
        let mut row = RowReader {
            record,
            columns: &columns,
            line,
            issues: &mut issues,
        };

        let name = row.text(COL_NAME);
        if name.is_empty() {
            row.issues.push(DataIssue::BlankName { line });
            continue;
        }
        let mut out = PlayerMatchRecord {
            name,
            match_id: row.text(COL_MATCH_ID),
            opponent: row.text(COL_OPPONENT),
            line: row.line_value(COL_LINE),
            played: row.flag(COL_PLAYED),
            ..PlayerMatchRecord::default()
        };
        for field in CounterField::ALL {
            *out.counter_mut(field) = row.count(field.column());
        }
        rows.push(out);
    }

    Ok(Loaded { rows, issues })
}

pub fn load_player_table(path: &Path) -> Result<Loaded<PlayerMatchRecord>> {
    let raw = fs::read(path)
        .with_context(|| format!("failed reading player table {}", path.display()))?;
    let loaded = parse_player_table(&raw)
        .with_context(|| format!("failed parsing player table {}", path.display()))?;
    log::debug!(
        "loaded {} player rows from {} ({} issues)",
        loaded.rows.len(),
        path.display(),
        loaded.issues.len()
    );
    Ok(loaded)
}

pub fn parse_team_table(raw: impl AsRef<[u8]>) -> Result<Loaded<TeamMatchRecord>> {
    let mut issues = Vec::new();
    let (headers, records) = read_records(raw.as_ref(), "match table", &mut issues)?;
    let columns = ColumnMap::resolve(&headers, TEAM_COLUMNS, &TEAM_ALIASES, &mut issues);

    let mut rows = Vec::new();
    for (line, record) in &records {
        let mut row = RowReader {
            record,
            columns: &columns,
            line: *line,
            issues: &mut issues,
        };

        let match_id = row.text(COL_MATCH_ID);
        let date = row.field(COL_DATE, FieldKind::Date).as_date();
        let opponent = row.text(COL_OPPONENT);
        let goals_for = row.count(COL_GOALS_FOR);
        let goals_against = row.count(COL_GOALS_AGAINST);
        let flags = OutcomeFlags {
            win: row.flag(COL_WIN),
            loss: row.flag(COL_LOSS),
            draw: row.flag(COL_DRAW),
        };
        let season = row.text(COL_SEASON);
        let league = row.text(COL_LEAGUE);

        let outcome = TeamMatchRecord::resolve_outcome(flags, goals_for, goals_against);
        let out = TeamMatchRecord {
            match_id,
            date,
            opponent,
            goals_for,
            goals_against,
            season,
            league,
            flags,
            outcome,
        };
        if flags.single().is_some() && !out.outcome_matches_score() {
            issues.push(DataIssue::OutcomeMismatch {
                match_id: out.match_id.clone(),
            });
        }
        rows.push(out);
    }

    Ok(Loaded { rows, issues })
}

pub fn load_team_table(path: &Path) -> Result<Loaded<TeamMatchRecord>> {
    let raw = fs::read(path)
        .with_context(|| format!("failed reading match table {}", path.display()))?;
    let loaded = parse_team_table(&raw)
        .with_context(|| format!("failed parsing match table {}", path.display()))?;
    log::debug!(
        "loaded {} match rows from {} ({} issues)",
        loaded.rows.len(),
        path.display(),
        loaded.issues.len()
    );
    Ok(loaded)
}

/// Write the full table in declared column order.
pub fn write_player_table(output: impl Write, rows: &[PlayerMatchRecord]) -> Result<()> {
    write_cells(output, rows.iter().map(player_row_cells))
}

fn write_cells(output: impl Write, rows: impl Iterator<Item = Vec<String>>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record(PLAYER_COLUMNS.iter().map(|spec| spec.header))
        .context("write player table header")?;
    for (idx, cells) in rows.enumerate() {
        writer
            .write_record(&cells)
            .with_context(|| format!("write player table row {}", idx + 2))?;
    }
    writer.flush().context("flush player table")?;
    Ok(())
}

const NAME_CELL: usize = 0;
const MATCH_ID_CELL: usize = 1;

/// A live store row as cell text in [`PLAYER_COLUMNS`] order.
///
/// Rows of other matches pass through a flush as read: only the name and
/// match id cells are trimmed, nothing else is reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    cells: Vec<String>,
}

impl StoredRow {
    pub fn from_record(row: &PlayerMatchRecord) -> Self {
        Self {
            cells: player_row_cells(row),
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn name(&self) -> &str {
        &self.cells[NAME_CELL]
    }

    pub fn match_id(&self) -> &str {
        &self.cells[MATCH_ID_CELL]
    }
}

/// Store rows without typed parsing. Missing counter columns read as `"0"`,
/// other missing columns as `""`.
pub fn parse_stored_rows(raw: impl AsRef<[u8]>) -> Result<Loaded<StoredRow>> {
    let mut issues = Vec::new();
    let (headers, records) = read_records(raw.as_ref(), "live store", &mut issues)?;
    let columns = ColumnMap::resolve(&headers, PLAYER_COLUMNS, &PLAYER_ALIASES, &mut issues);

    let rows = records
        .iter()
        .map(|(_, record)| {
            let mut cells: Vec<String> = PLAYER_COLUMNS
                .iter()
                .enumerate()
                .map(|(idx, spec)| {
                    match columns.positions.get(spec.header).and_then(|pos| record.get(*pos)) {
                        Some(cell) => cell.to_string(),
                        None if idx >= COUNTER_START => "0".to_string(),
                        None => String::new(),
                    }
                })
                .collect();
            for key in [NAME_CELL, MATCH_ID_CELL] {
                cells[key] = cells[key].trim().to_string();
            }
            StoredRow { cells }
        })
        .collect();
    Ok(Loaded { rows, issues })
}

pub fn write_stored_rows(output: impl Write, rows: &[StoredRow]) -> Result<()> {
    write_cells(output, rows.iter().map(|row| row.cells.clone()))
}

/// Index of the first counter column; see [`player_row_cells`].
const COUNTER_START: usize = 5;

fn player_row_cells(row: &PlayerMatchRecord) -> Vec<String> {
    let mut cells = vec![
        row.name.clone(),
        row.match_id.clone(),
        row.opponent.clone(),
        row.line.cell(),
        if row.played {
            "Ja".to_string()
        } else {
            "Nein".to_string()
        },
    ];
    cells.extend(CounterField::ALL.iter().map(|f| row.counter(*f).to_string()));
    cells
}
