use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied identifier of a contestant.
///
/// Ids are opaque strings so that hosts can use whatever key they already
/// have (user ids, lobby codes). Any non-blank value is valid, `"0"` included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContestantId(String);

impl ContestantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for ContestantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContestantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContestantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ContestantId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for ContestantId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// A solo player or a pre-formed team waiting for a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: ContestantId,
    /// Skill measure used for balancing; teams use their members' average
    #[serde(default)]
    pub skill_rating: f64,
    /// Half-width of the acceptable skill distance
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default = "default_member_count")]
    pub member_count: u32,
    /// Rounds this contestant failed to match while queued
    #[serde(default)]
    pub wait_rounds: u32,
}

fn default_member_count() -> u32 {
    1
}

impl Contestant {
    pub fn new(id: impl Into<ContestantId>, skill_rating: f64, tolerance: f64, member_count: u32) -> Self {
        Self {
            id: id.into(),
            skill_rating,
            tolerance,
            member_count,
            wait_rounds: 0,
        }
    }

    pub fn solo(id: impl Into<ContestantId>, skill_rating: f64, tolerance: f64) -> Self {
        Self::new(id, skill_rating, tolerance, 1)
    }

    pub fn is_team(&self) -> bool {
        self.member_count > 1
    }

    /// Absolute skill distance to a reference rating
    pub fn distance_to(&self, reference: f64) -> f64 {
        (self.skill_rating - reference).abs()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One seat-holder in a group: a real entry or a robot filling an empty seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Candidate<T> {
    Real(T),
    Robot,
}

impl<T> Candidate<T> {
    pub fn is_robot(&self) -> bool {
        matches!(self, Candidate::Robot)
    }

    pub fn real(&self) -> Option<&T> {
        match self {
            Candidate::Real(value) => Some(value),
            Candidate::Robot => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Candidate<U> {
        match self {
            Candidate::Real(value) => Candidate::Real(f(value)),
            Candidate::Robot => Candidate::Robot,
        }
    }
}

/// The two opposing rosters of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Red,
    Blue,
}
