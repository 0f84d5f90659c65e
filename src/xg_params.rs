use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::XgError;

pub const ENV_PENALTY: &str = "XG_PENALTY";
pub const ENV_MAX_NEAR: &str = "XG_MAX_NEAR";
pub const ENV_MIN_FLOOR: &str = "XG_MIN_FLOOR";
pub const ENV_DECAY_RATE: &str = "XG_DECAY_RATE";
pub const ENV_HEADER_MULTIPLIER: &str = "XG_HEADER_MULTIPLIER";

static GLOBAL: Lazy<XgParams> = Lazy::new(|| match XgParams::from_env() {
    Ok(params) => params,
    Err(err) => {
        warn!("falling back to default xG params: {err}");
        XgParams::default()
    }
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XgParams {
    pub penalty_xg: f64,
    pub max_near: f64,
    pub min_floor: f64,
    // Default reaches the floor at the centre spot (distance 50).
    pub decay_rate: f64,
    pub header_multiplier: f64,
}

impl Default for XgParams {
    fn default() -> Self {
        Self {
            penalty_xg: 0.76,
            max_near: 0.40,
            min_floor: 0.02,
            decay_rate: 0.0076,
            header_multiplier: 0.70,
        }
    }
}

impl XgParams {
    pub fn global() -> &'static XgParams {
        &GLOBAL
    }

    pub fn from_env() -> Result<Self, XgError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, XgError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut params = Self::default();
        let fields: [(&str, &mut f64); 5] = [
            (ENV_PENALTY, &mut params.penalty_xg),
            (ENV_MAX_NEAR, &mut params.max_near),
            (ENV_MIN_FLOOR, &mut params.min_floor),
            (ENV_DECAY_RATE, &mut params.decay_rate),
            (ENV_HEADER_MULTIPLIER, &mut params.header_multiplier),
        ];
        for (key, slot) in fields {
            let Some(raw) = lookup(key) else { continue };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            *slot = trimmed.parse::<f64>().map_err(|_| XgError::ParseEnv {
                key: key.to_string(),
                value: raw.clone(),
            })?;
        }
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), XgError> {
        let checks = [
            ("penalty_xg", self.penalty_xg),
            ("max_near", self.max_near),
            ("min_floor", self.min_floor),
            ("decay_rate", self.decay_rate),
            ("header_multiplier", self.header_multiplier),
        ];
        for (name, value) in checks {
            if !value.is_finite() {
                return Err(invalid(name, value, "must be finite"));
            }
        }
        if self.penalty_xg <= 0.0 || self.penalty_xg > 1.0 {
            return Err(invalid("penalty_xg", self.penalty_xg, "must be in (0, 1]"));
        }
        if self.min_floor <= 0.0 {
            return Err(invalid("min_floor", self.min_floor, "must be positive"));
        }
        if self.max_near <= self.min_floor || self.max_near > 1.0 {
            return Err(invalid(
                "max_near",
                self.max_near,
                "must be above min_floor and at most 1",
            ));
        }
        if self.decay_rate <= 0.0 {
            return Err(invalid("decay_rate", self.decay_rate, "must be positive"));
        }
        if self.header_multiplier <= 0.0 || self.header_multiplier >= 1.0 {
            return Err(invalid(
                "header_multiplier",
                self.header_multiplier,
                "must be in (0, 1)",
            ));
        }
        Ok(())
    }

    pub fn floor_distance(&self) -> f64 {
        (self.max_near - self.min_floor) / self.decay_rate
    }
}

fn invalid(name: &'static str, value: f64, reason: &'static str) -> XgError {
    XgError::InvalidParam {
        name,
        value,
        reason,
    }
}

pub fn load_params_file(path: &Path) -> Result<XgParams> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read xG params {}", path.display()))?;
    let params = serde_json::from_str::<XgParams>(&raw).context("parse xG params")?;
    params.validate().context("validate xG params")?;
    Ok(params)
}

pub fn save_params_file(path: &Path, params: &XgParams) -> Result<()> {
    params.validate().context("validate xG params")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(params).context("serialize xG params")?;
    fs::write(&tmp, json).context("write xG params")?;
    fs::rename(&tmp, path).context("swap xG params")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let params = XgParams::default();
        assert!(params.validate().is_ok());
        assert!((params.floor_distance() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn lookup_overrides_only_present_keys() {
        let params =
            XgParams::from_lookup(lookup_from(&[(ENV_PENALTY, "0.79"), (ENV_MAX_NEAR, " ")]))
                .unwrap();
        assert_eq!(params.penalty_xg, 0.79);
        assert_eq!(params.max_near, XgParams::default().max_near);
    }

    #[test]
    fn lookup_rejects_non_numeric() {
        let err = XgParams::from_lookup(lookup_from(&[(ENV_DECAY_RATE, "fast")])).unwrap_err();
        assert_eq!(
            err,
            XgError::ParseEnv {
                key: ENV_DECAY_RATE.to_string(),
                value: "fast".to_string(),
            }
        );
    }

    #[test]
    fn validate_rejects_header_multiplier_of_one() {
        let params = XgParams {
            header_multiplier: 1.0,
            ..XgParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(XgError::InvalidParam {
                name: "header_multiplier",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_floor_above_near() {
        let params = XgParams {
            min_floor: 0.5,
            ..XgParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn save_reports_unwritable_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a dir").unwrap();
        let path = blocker.join("xg_params.json");

        let err = save_params_file(&path, &XgParams::default()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains(&format!("create {}", blocker.display())), "{msg}");
    }

    #[test]
    fn params_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("xg_params.json");
        let params = XgParams {
            penalty_xg: 0.78,
            ..XgParams::default()
        };
        save_params_file(&path, &params).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(load_params_file(&path).unwrap(), params);
    }
}
