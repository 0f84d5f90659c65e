use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use xg_engine::aggregate::{aggregate_many, count_goals, rank_by_overperformance};
use xg_engine::display::{StatsRow, match_rows};
use xg_engine::match_xg::match_xg_from_source;
use xg_engine::shot::ShotEvent;
use xg_engine::shot_source::{
    InMemoryShotSource, ShotFilter, ShotSource, player_xg, team_xg,
};
use xg_engine::shot_store::{self, SqliteShotSource};
use xg_engine::xg_params::{XgParams, load_params_file, save_params_file};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let params = match arg_value(&args, "--params") {
        Some(path) => load_params_file(&PathBuf::from(path))?,
        None => *XgParams::global(),
    };
    info!(
        penalty_xg = params.penalty_xg,
        floor_distance = params.floor_distance(),
        "xG params resolved"
    );
    if let Some(out) = arg_value(&args, "--write-params") {
        let out = PathBuf::from(out);
        save_params_file(&out, &params)?;
        println!("Params written: {}", out.display());
        return Ok(());
    }

    let source: Box<dyn ShotSource> = if let Some(path) = positional_path(&args) {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read shots file {}", path.display()))?;
        let source = InMemoryShotSource::from_json(&raw)?;
        info!(shots = source.len(), path = %path.display(), "loaded shots file");
        Box::new(source)
    } else {
        let db_path = arg_value(&args, "--db")
            .map(PathBuf::from)
            .or_else(shot_store::default_db_path)
            .context("unable to resolve sqlite path")?;
        info!(db = %db_path.display(), "reading shot store");
        Box::new(SqliteShotSource::open(&db_path)?)
    };

    if let Some(match_id) = arg_num::<u64>(&args, "--match")? {
        let home = arg_num::<u32>(&args, "--home")?.ok_or_else(|| anyhow!("--match needs --home"))?;
        let away = arg_num::<u32>(&args, "--away")?.ok_or_else(|| anyhow!("--match needs --away"))?;
        let result = match_xg_from_source(source.as_ref(), match_id, home, away, &params)?;
        println!("Match {match_id}");
        for row in match_rows(&result, &format!("Home {home}"), &format!("Away {away}")) {
            print_row(&row);
        }
        return Ok(());
    }

    if let Some(player_id) = arg_num::<u32>(&args, "--player")? {
        let stats = player_xg(source.as_ref(), player_id, &params)?;
        print_row(&StatsRow::from_stats(format!("Player {player_id}"), &stats));
        return Ok(());
    }

    if let Some(team_id) = arg_num::<u32>(&args, "--team")? {
        let stats = team_xg(source.as_ref(), team_id, &params)?;
        print_row(&StatsRow::from_stats(format!("Team {team_id}"), &stats));
        return Ok(());
    }

    // No selector: leaderboard over every player in the source.
    let mut by_player: BTreeMap<u32, Vec<ShotEvent>> = BTreeMap::new();
    for stored in source.shots(&ShotFilter::default())? {
        by_player.entry(stored.player_id).or_default().push(stored.shot);
    }
    let groups = by_player
        .into_iter()
        .map(|(id, shots)| {
            let goals = count_goals(&shots);
            (id, shots, goals)
        })
        .collect::<Vec<_>>();
    let mut rows = aggregate_many(&groups, &params);
    rank_by_overperformance(&mut rows);

    println!("Players: {}", rows.len());
    for row in &rows {
        print_row(&StatsRow::from_stats(format!("Player {}", row.key), &row.stats));
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_row(row: &StatsRow) {
    println!(
        "{:<16} xG {:>6}  shots {:>3}  goals {:>2}  +/- {:>6}  xG/shot {:>5}  [{}]",
        row.label,
        row.total_xg,
        row.shots,
        row.goals,
        row.overperformance,
        row.xg_per_shot,
        row.band.label()
    );
}

fn positional_path(args: &[String]) -> Option<PathBuf> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !arg.contains('=');
            continue;
        }
        if !arg.trim().is_empty() {
            return Some(PathBuf::from(arg));
        }
    }
    None
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn arg_num<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    arg_value(args, name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{name} expects a number, got {raw:?}"))
        })
        .transpose()
}
