use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use xg_engine::shot::StoredShot;
use xg_engine::shot_store;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let input = parse_input_arg(&args)
        .ok_or_else(|| anyhow!("usage: shot_ingest <shots.json> [--db=PATH]"))?;

    let db_path = parse_db_path_arg(&args)
        .or_else(shot_store::default_db_path)
        .context("unable to resolve sqlite path")?;

    let raw = fs::read_to_string(&input)
        .with_context(|| format!("read shots file {}", input.display()))?;
    let shots = serde_json::from_str::<Vec<StoredShot>>(&raw).context("parse stored shots")?;

    let out_of_bounds = shots.iter().filter(|s| !s.shot.in_bounds()).count();
    if out_of_bounds > 0 {
        warn!(out_of_bounds, "shots with coordinates outside 0-100 will be extrapolated");
    }

    let mut conn = shot_store::open_db(&db_path)?;
    let upserted = shot_store::upsert_shots(&mut conn, &shots)?;
    let matches = shots.iter().map(|s| s.match_id).collect::<BTreeSet<_>>();
    info!(upserted, matches = matches.len(), "ingest finished");

    println!("Shot ingest complete");
    println!("DB: {}", db_path.display());
    println!("Shots upserted: {upserted}");
    println!("Matches: {}", matches.len());
    if let Some(latest) = shot_store::latest_update(&conn)? {
        println!("Latest update: {latest}");
    }

    Ok(())
}

fn parse_input_arg(args: &[String]) -> Option<PathBuf> {
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if arg == "--db" {
            idx += 2;
            continue;
        }
        if !arg.starts_with("--") && !arg.trim().is_empty() {
            return Some(PathBuf::from(arg));
        }
        idx += 1;
    }
    None
}

fn parse_db_path_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
