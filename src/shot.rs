use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Result tag attached to a shot by the event store. Tags are matched
/// exactly; anything else, including other casings, is kept verbatim in
/// `Other` and never counts as a goal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShotOutcome {
    Goal,
    Saved,
    Missed,
    Blocked,
    OffTarget,
    PenaltyGoal,
    PenaltyMiss,
    Other(String),
}

impl ShotOutcome {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "goal" => Self::Goal,
            "saved" => Self::Saved,
            "missed" => Self::Missed,
            "blocked" => Self::Blocked,
            "off_target" => Self::OffTarget,
            "penalty_goal" => Self::PenaltyGoal,
            "penalty_miss" => Self::PenaltyMiss,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Goal => "goal",
            Self::Saved => "saved",
            Self::Missed => "missed",
            Self::Blocked => "blocked",
            Self::OffTarget => "off_target",
            Self::PenaltyGoal => "penalty_goal",
            Self::PenaltyMiss => "penalty_miss",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_goal(&self) -> bool {
        matches!(self, Self::Goal | Self::PenaltyGoal)
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShotOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShotOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// Coordinates are 0-100 with `x` increasing toward the goal being attacked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotEvent {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub shot_outcome: Option<ShotOutcome>,
    #[serde(default)]
    pub is_header: bool,
    #[serde(default)]
    pub is_penalty: bool,
}

impl ShotEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            shot_outcome: None,
            is_header: false,
            is_penalty: false,
        }
    }

    pub fn with_outcome(mut self, outcome: ShotOutcome) -> Self {
        self.shot_outcome = Some(outcome);
        self
    }

    pub fn header(mut self) -> Self {
        self.is_header = true;
        self
    }

    pub fn penalty(mut self) -> Self {
        self.is_penalty = true;
        self
    }

    // Missing outcome counts as not scored.
    pub fn is_goal(&self) -> bool {
        self.shot_outcome.as_ref().is_some_and(ShotOutcome::is_goal)
    }

    pub fn in_bounds(&self) -> bool {
        (0.0..=100.0).contains(&self.x) && (0.0..=100.0).contains(&self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredShot {
    pub shot_id: u64,
    pub match_id: u64,
    pub team_id: u32,
    pub player_id: u32,
    #[serde(default)]
    pub minute: Option<u16>,
    #[serde(flatten)]
    pub shot: ShotEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_parse_is_exact_and_keeps_unknown_tags() {
        assert_eq!(ShotOutcome::parse("goal"), ShotOutcome::Goal);
        assert_eq!(ShotOutcome::parse("off_target"), ShotOutcome::OffTarget);
        assert_eq!(
            ShotOutcome::parse("Goal"),
            ShotOutcome::Other("Goal".to_string())
        );
        assert!(!ShotOutcome::parse(" GOAL ").is_goal());
        assert!(!ShotOutcome::parse("Penalty_Goal").is_goal());
        assert_eq!(
            ShotOutcome::parse("hit_woodwork"),
            ShotOutcome::Other("hit_woodwork".to_string())
        );
        assert_eq!(ShotOutcome::parse("hit_woodwork").as_str(), "hit_woodwork");
    }

    #[test]
    fn only_goal_tags_count_as_goals() {
        assert!(ShotOutcome::Goal.is_goal());
        assert!(ShotOutcome::PenaltyGoal.is_goal());
        assert!(!ShotOutcome::PenaltyMiss.is_goal());
        assert!(!ShotOutcome::Saved.is_goal());
        assert!(!ShotOutcome::Other("goal_disallowed".to_string()).is_goal());
        assert!(!ShotEvent::new(90.0, 50.0).is_goal());
    }

    #[test]
    fn shot_event_parses_camel_case_json() {
        let raw = r#"{"x":88.5,"y":47.0,"shotOutcome":"penalty_goal","isPenalty":true}"#;
        let shot: ShotEvent = serde_json::from_str(raw).expect("shot should parse");
        assert_eq!(shot.shot_outcome, Some(ShotOutcome::PenaltyGoal));
        assert!(shot.is_penalty);
        assert!(!shot.is_header);
        assert!(shot.is_goal());
    }

    #[test]
    fn shot_event_tolerates_null_outcome() {
        let raw = r#"{"x":70,"y":30,"shotOutcome":null}"#;
        let shot: ShotEvent = serde_json::from_str(raw).expect("shot should parse");
        assert!(shot.shot_outcome.is_none());
        assert!(!shot.is_goal());
    }

    #[test]
    fn stored_shot_flattens_event_fields() {
        let raw = r#"{"shotId":7,"matchId":100,"teamId":3,"playerId":9,"minute":61,
                      "x":92.0,"y":52.0,"shotOutcome":"saved","isHeader":true}"#;
        let stored: StoredShot = serde_json::from_str(raw).expect("stored shot should parse");
        assert_eq!(stored.player_id, 9);
        assert_eq!(stored.minute, Some(61));
        assert!(stored.shot.is_header);
        assert_eq!(stored.shot.shot_outcome, Some(ShotOutcome::Saved));
    }
}
