use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shot::ShotEvent;
use crate::xg::calculate_shot_xg;
use crate::xg_params::XgParams;

/// Summary of a shot collection. Every numeric field is rounded to two
/// decimals; the rounding is applied to the exact sum, not to per-shot values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XgStats {
    #[serde(rename = "totalXG")]
    pub total_xg: f64,
    pub shot_count: usize,
    pub actual_goals: u32,
    pub overperformance: f64,
    #[serde(rename = "xGPerShot")]
    pub xg_per_shot: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedStats<K> {
    pub key: K,
    pub stats: XgStats,
}

pub fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    // Avoid handing "-0.00" to the presentation layer.
    if r == 0.0 { 0.0 } else { r }
}

/// `actual_goals` is trusted as given; it may come from a wider source than
/// `shots` (own goals, official score).
pub fn aggregate(shots: &[ShotEvent], actual_goals: u32, params: &XgParams) -> XgStats {
    let shot_count = shots.len();
    let total: f64 = shots.iter().map(|s| calculate_shot_xg(s, params).xg).sum();
    let per_shot = if shot_count > 0 {
        total / shot_count as f64
    } else {
        0.0
    };

    debug!(shot_count, total_xg = total, actual_goals, "aggregated shots");

    XgStats {
        total_xg: round2(total),
        shot_count,
        actual_goals,
        overperformance: round2(actual_goals as f64 - total),
        xg_per_shot: round2(per_shot),
    }
}

pub fn aggregate_default(shots: &[ShotEvent], actual_goals: u32) -> XgStats {
    aggregate(shots, actual_goals, &XgParams::default())
}

pub fn count_goals<'a, I>(shots: I) -> u32
where
    I: IntoIterator<Item = &'a ShotEvent>,
{
    shots.into_iter().filter(|s| s.is_goal()).count() as u32
}

pub fn aggregate_counting_goals(shots: &[ShotEvent], params: &XgParams) -> XgStats {
    aggregate(shots, count_goals(shots), params)
}

// Output order follows input order.
pub fn aggregate_many<K>(groups: &[(K, Vec<ShotEvent>, u32)], params: &XgParams) -> Vec<KeyedStats<K>>
where
    K: Clone + Send + Sync,
{
    groups
        .par_iter()
        .map(|(key, shots, goals)| KeyedStats {
            key: key.clone(),
            stats: aggregate(shots, *goals, params),
        })
        .collect()
}

pub fn rank_by_overperformance<K: Ord>(rows: &mut [KeyedStats<K>]) {
    rows.sort_by(|a, b| {
        b.stats
            .overperformance
            .partial_cmp(&a.stats.overperformance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.stats
                    .total_xg
                    .partial_cmp(&a.stats.total_xg)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.key.cmp(&b.key))
    });
}
