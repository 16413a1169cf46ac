use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dashboard::{self, DashboardOptions};
use crate::rankings;
use crate::records::{PlayerMatchRecord, TeamMatchRecord};
use crate::summary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub charts: usize,
    pub chart_rows: usize,
    pub players: usize,
    pub seasons: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::from(*n)).collect()
}

/// Workbook with the dashboard charts as tables plus per-player and
/// per-season totals.
pub fn export_workbook(
    path: &Path,
    rows: &[PlayerMatchRecord],
    matches: &[TeamMatchRecord],
    opts: DashboardOptions,
) -> Result<ExportReport> {
    let view = dashboard::build_dashboard(rows, matches, opts);

    let mut chart_rows = vec![header(&["Chart", "Rank", "Key", "Value"])];
    for chart in &view.charts {
        for (idx, entry) in chart.entries.iter().enumerate() {
            chart_rows.push(vec![
                chart.title.as_str().into(),
                ((idx + 1) as u32).into(),
                entry.key.as_str().into(),
                entry.value.into(),
            ]);
        }
    }

    let totals = rankings::player_totals(rows);
    let mut player_rows = vec![header(&[
        "Player",
        "Games",
        "Goals",
        "Assists",
        "Points",
        "Plus-Minus",
        "Plus-Minus / game",
        "Penalties",
        "Face-offs won",
        "Face-offs lost",
        "Face-off %",
        "Powerplay +/-",
        "Boxplay +/-",
    ])];
    for t in &totals {
        player_rows.push(vec![
            t.name.as_str().into(),
            t.games_played.into(),
            t.goals.into(),
            t.assists.into(),
            t.points.into(),
            t.plus_minus.into(),
            t.plus_minus_per_game().into(),
            t.penalties.into(),
            t.faceoffs_won.into(),
            t.faceoffs_lost.into(),
            t.faceoff_pct.into(),
            t.powerplay_net.into(),
            t.boxplay_net.into(),
        ]);
    }

    let seasons = summary::season_summaries(matches);
    let mut season_rows = vec![header(&[
        "Season",
        "League",
        "Games",
        "Goals for",
        "Goals against",
        "Goals for / game",
        "Goals against / game",
        "Wins",
        "Losses",
        "Draws",
    ])];
    for s in &seasons {
        season_rows.push(vec![
            s.season.as_str().into(),
            s.league.as_str().into(),
            s.games.into(),
            s.goals_for.into(),
            s.goals_against.into(),
            s.goals_for_avg.into(),
            s.goals_against_avg.into(),
            s.wins.into(),
            s.losses.into(),
            s.draws.into(),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Charts")?;
        write_rows(sheet, &chart_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &player_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Seasons")?;
        write_rows(sheet, &season_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    log::debug!("exported workbook {}", path.display());

    Ok(ExportReport {
        charts: view.charts.len(),
        chart_rows: chart_rows.len() - 1,
        players: totals.len(),
        seasons: seasons.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match value {
                Cell::Text(text) => worksheet.write_string(r, c, text),
                Cell::Number(num) => worksheet.write_number(r, c, *num),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
