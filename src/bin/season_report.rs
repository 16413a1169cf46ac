use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use wygo_stats::config::{self, Config};
use wygo_stats::dashboard::{self, DashboardOptions, DashboardView, MatchReport, RankedChart};
use wygo_stats::export;
use wygo_stats::live::LiveStore;
use wygo_stats::logger;
use wygo_stats::rankings::{self, PlayerTotals};
use wygo_stats::summary;
use wygo_stats::tables::{self, DataIssue};

#[derive(Serialize)]
struct SeasonReport<'a> {
    dashboard: &'a DashboardView,
    players: &'a [PlayerTotals],
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = Config::from_env();
    cfg.apply_args(&args);
    logger::init(cfg.log_level)?;

    let result = run(&args, &cfg);
    for line in logger::drain() {
        eprintln!("{line}");
    }
    result
}

fn run(args: &[String], cfg: &Config) -> Result<()> {
    let limit = match config::string_arg(args, "--limit") {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid --limit value '{raw}'"))?
            .max(1),
        None => cfg.top_n,
    };
    let opts = DashboardOptions {
        limit,
        per_game: config::has_flag(args, "--per-game"),
    };

    let players = tables::load_player_table(&cfg.player_csv)?;
    print_issues("players", &players.issues);
    let matches = if cfg.match_csv.exists() {
        let loaded = tables::load_team_table(&cfg.match_csv)?;
        print_issues("matches", &loaded.issues);
        loaded.rows
    } else {
        eprintln!("matches: {} not found, season cards skipped", cfg.match_csv.display());
        Vec::new()
    };
    let live = LiveStore::new(cfg.live_csv.clone()).load()?;
    print_issues("live", &live.issues);
    let rows = summary::combine_sources(&players.rows, &live.rows);

    if let Some(match_id) = config::string_arg(args, "--match") {
        if !summary::match_ids(&rows, &matches).contains(&match_id) {
            return Err(anyhow!("match '{match_id}' not found in any table"));
        }
        let report = dashboard::build_match_report(&rows, &matches, &match_id, opts);
        if config::has_flag(args, "--json") {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_match(&report);
        }
        return Ok(());
    }

    let view = dashboard::build_dashboard(&rows, &matches, opts);
    let totals = rankings::player_totals(&rows);
    if config::has_flag(args, "--json") {
        let report = SeasonReport {
            dashboard: &view,
            players: &totals,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_season(&view, &totals);
    }

    if let Some(path) = config::path_arg(args, "--xlsx") {
        let report = export::export_workbook(&path, &rows, &matches, opts)?;
        eprintln!(
            "Workbook written: {} ({} chart rows, {} players, {} seasons)",
            path.display(),
            report.chart_rows,
            report.players,
            report.seasons
        );
    }

    Ok(())
}

fn print_issues(source: &str, issues: &[DataIssue]) {
    if issues.is_empty() {
        return;
    }
    eprintln!("{source}: {} data issues", issues.len());
    for issue in issues.iter().take(6) {
        eprintln!("   - {issue}");
    }
}

fn print_charts(charts: &[RankedChart]) {
    for chart in charts {
        println!();
        println!("{}", chart.title);
        if chart.entries.is_empty() {
            println!("  (no data)");
        }
        for (idx, entry) in chart.entries.iter().enumerate() {
            println!(
                "  {:>2}. {:<20} {:>8}",
                idx + 1,
                entry.key,
                chart.metric.format_value(entry.value)
            );
        }
    }
}

fn print_season(view: &DashboardView, totals: &[PlayerTotals]) {
    println!("Season report");
    for s in &view.seasons {
        println!(
            "{} {}: {} games, GF {} ({:.2}/game), GA {} ({:.2}/game), W-D-L {}-{}-{}",
            s.season,
            s.league,
            s.games,
            s.goals_for,
            s.goals_for_avg,
            s.goals_against,
            s.goals_against_avg,
            s.wins,
            s.draws,
            s.losses
        );
    }
    print_charts(&view.charts);

    println!();
    println!(
        "{:<20} {:>3} {:>3} {:>3} {:>4} {:>5} {:>4} {:>7}",
        "Player", "GP", "G", "A", "P", "+/-", "PIM", "FO%"
    );
    for t in totals {
        println!(
            "{:<20} {:>3} {:>3} {:>3} {:>4} {:>5} {:>4} {:>6.1}%",
            t.name,
            t.games_played,
            t.goals,
            t.assists,
            t.points,
            t.plus_minus,
            t.penalties,
            t.faceoff_pct
        );
    }
}

fn print_match(report: &MatchReport) {
    println!("Match {}", report.match_id);
    match &report.meta {
        Some(meta) => println!(
            "vs {}: {}-{} ({:?}) {} {}",
            meta.opponent,
            meta.goals_for,
            meta.goals_against,
            meta.outcome,
            meta.season,
            meta.league
        ),
        None => println!("No data for this match"),
    }
    for group in &report.lines {
        println!("Line {}: {}", group.line, group.players.join(", "));
    }
    print_charts(&report.charts);
}
