use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{XgStats, aggregate_counting_goals};
use crate::shot::{ShotEvent, StoredShot};
use crate::xg_params::XgParams;

// Set fields combine with AND; an empty filter matches every shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFilter {
    pub player_id: Option<u32>,
    pub team_id: Option<u32>,
    pub match_id: Option<u64>,
}

impl ShotFilter {
    pub fn for_player(player_id: u32) -> Self {
        Self {
            player_id: Some(player_id),
            ..Self::default()
        }
    }

    pub fn for_team(team_id: u32) -> Self {
        Self {
            team_id: Some(team_id),
            ..Self::default()
        }
    }

    pub fn for_match(match_id: u64) -> Self {
        Self {
            match_id: Some(match_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, shot: &StoredShot) -> bool {
        self.player_id.is_none_or(|id| shot.player_id == id)
            && self.team_id.is_none_or(|id| shot.team_id == id)
            && self.match_id.is_none_or(|id| shot.match_id == id)
    }
}

pub trait ShotSource {
    fn shots(&self, filter: &ShotFilter) -> Result<Vec<StoredShot>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryShotSource {
    shots: Vec<StoredShot>,
}

impl InMemoryShotSource {
    pub fn new(mut shots: Vec<StoredShot>) -> Self {
        shots.sort_by(|a, b| {
            a.match_id
                .cmp(&b.match_id)
                .then(a.minute.cmp(&b.minute))
                .then(a.shot_id.cmp(&b.shot_id))
        });
        Self { shots }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let shots = serde_json::from_str::<Vec<StoredShot>>(raw).context("parse stored shots")?;
        Ok(Self::new(shots))
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}

impl ShotSource for InMemoryShotSource {
    fn shots(&self, filter: &ShotFilter) -> Result<Vec<StoredShot>> {
        Ok(self
            .shots
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

pub fn shot_events(stored: Vec<StoredShot>) -> Vec<ShotEvent> {
    stored.into_iter().map(|s| s.shot).collect()
}

pub fn player_xg<S: ShotSource + ?Sized>(
    source: &S,
    player_id: u32,
    params: &XgParams,
) -> Result<XgStats> {
    let stored = source
        .shots(&ShotFilter::for_player(player_id))
        .with_context(|| format!("load shots for player {player_id}"))?;
    Ok(aggregate_counting_goals(&shot_events(stored), params))
}

pub fn team_xg<S: ShotSource + ?Sized>(
    source: &S,
    team_id: u32,
    params: &XgParams,
) -> Result<XgStats> {
    let stored = source
        .shots(&ShotFilter::for_team(team_id))
        .with_context(|| format!("load shots for team {team_id}"))?;
    Ok(aggregate_counting_goals(&shot_events(stored), params))
}
