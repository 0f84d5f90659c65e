use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shot::ShotEvent;
use crate::xg_params::XgParams;

// Centre of the goal mouth being attacked.
pub const GOAL_X: f64 = 100.0;
pub const GOAL_Y: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerShotXg {
    #[serde(rename = "xG")]
    pub xg: f64,
    pub is_goal: bool,
}

pub fn shot_distance(shot: &ShotEvent) -> f64 {
    let dx = GOAL_X - shot.x;
    let dy = GOAL_Y - shot.y;
    (dx * dx + dy * dy).sqrt()
}

pub fn calculate_shot_xg(shot: &ShotEvent, params: &XgParams) -> PerShotXg {
    PerShotXg {
        xg: shot_probability(shot, params),
        is_goal: shot.is_goal(),
    }
}

pub fn calculate_shot_xg_default(shot: &ShotEvent) -> PerShotXg {
    calculate_shot_xg(shot, &XgParams::default())
}

fn shot_probability(shot: &ShotEvent, params: &XgParams) -> f64 {
    let p = if shot.is_penalty {
        params.penalty_xg
    } else {
        open_play_probability(shot, params)
    };
    // Params built as struct literals skip validate(), so every path is clamped.
    clamp(p, f64::MIN_POSITIVE, 1.0)
}

fn open_play_probability(shot: &ShotEvent, params: &XgParams) -> f64 {
    if !shot.in_bounds() {
        debug!(x = shot.x, y = shot.y, "extrapolating xG for out-of-range shot");
    }

    let distance = shot_distance(shot);
    let p = (params.max_near - distance * params.decay_rate).max(params.min_floor);
    if shot.is_header {
        p * params.header_multiplier
    } else {
        p
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
