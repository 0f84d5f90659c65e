use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{XgStats, aggregate, count_goals};
use crate::shot::{ShotEvent, StoredShot};
use crate::shot_source::{ShotFilter, ShotSource};
use crate::xg_params::XgParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamXgResult {
    pub side: Side,
    #[serde(flatten)]
    pub stats: XgStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchXg {
    pub home: TeamXgResult,
    pub away: TeamXgResult,
}

impl MatchXg {
    pub fn xg_difference(&self) -> f64 {
        crate::aggregate::round2(self.home.stats.total_xg - self.away.stats.total_xg)
    }
}

pub fn compute_match_xg(
    home_shots: &[ShotEvent],
    home_goals: u32,
    away_shots: &[ShotEvent],
    away_goals: u32,
    params: &XgParams,
) -> MatchXg {
    MatchXg {
        home: TeamXgResult {
            side: Side::Home,
            stats: aggregate(home_shots, home_goals, params),
        },
        away: TeamXgResult {
            side: Side::Away,
            stats: aggregate(away_shots, away_goals, params),
        },
    }
}

// Shots from any other team are dropped.
pub fn partition_by_team(
    shots: &[StoredShot],
    home_team_id: u32,
    away_team_id: u32,
) -> (Vec<ShotEvent>, Vec<ShotEvent>) {
    let mut home = Vec::new();
    let mut away = Vec::new();
    let mut dropped = 0usize;
    for stored in shots {
        if stored.team_id == home_team_id {
            home.push(stored.shot.clone());
        } else if stored.team_id == away_team_id {
            away.push(stored.shot.clone());
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!(dropped, home_team_id, away_team_id, "shots outside both sides ignored");
    }
    (home, away)
}

pub fn match_xg_from_source<S: ShotSource + ?Sized>(
    source: &S,
    match_id: u64,
    home_team_id: u32,
    away_team_id: u32,
    params: &XgParams,
) -> Result<MatchXg> {
    let shots = source
        .shots(&ShotFilter::for_match(match_id))
        .with_context(|| format!("load shots for match {match_id}"))?;
    let (home, away) = partition_by_team(&shots, home_team_id, away_team_id);
    Ok(compute_match_xg(
        &home,
        count_goals(&home),
        &away,
        count_goals(&away),
        params,
    ))
}
