//! Session data model.
//!
//! A session groups measurement points captured in one outing. Real sessions are
//! numbered from 1; number 0 is reserved for the synthetic aggregate of all of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::measurement::MeasurementPoint;

pub const AGGREGATE_SESSION_NUMBER: i64 = 0;
pub const AGGREGATE_SESSION_ID: &str = "all";
pub const AGGREGATE_SESSION_NAME: &str = "All";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub number: i64,
    pub name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Owned points in insertion order.
    pub points: Vec<MeasurementPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// New, not yet persisted, real session. Blank names fall back to the numbered default.
    pub fn new(number: i64, name: Option<&str>, now: DateTime<Utc>) -> Self {
        let name = normalize_name(name).unwrap_or_else(|| default_name(number));
        Self {
            id: Uuid::new_v4().to_string(),
            number,
            name: Some(name),
            started_at: now,
            ended_at: None,
            points: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.number == AGGREGATE_SESSION_NUMBER
    }

    pub fn display_name(&self) -> String {
        if self.is_aggregate() {
            return AGGREGATE_SESSION_NAME.to_string();
        }
        normalize_name(self.name.as_deref()).unwrap_or_else(|| default_name(self.number))
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Read-only union of `sessions`: their points concatenated in the given order,
    /// spanning the earliest start to the latest end.
    pub fn aggregate(sessions: &[Session]) -> Session {
        let real = sessions.iter().filter(|session| !session.is_aggregate());

        let mut started_at: Option<DateTime<Utc>> = None;
        let mut ended_at: Option<DateTime<Utc>> = None;
        let mut points = Vec::new();
        for session in real {
            started_at = Some(match started_at {
                Some(current) => current.min(session.started_at),
                None => session.started_at,
            });
            ended_at = match (ended_at, session.ended_at) {
                (Some(current), Some(end)) => Some(current.max(end)),
                (current, end) => current.or(end),
            };
            points.extend(session.points.iter().cloned());
        }

        let started_at = started_at.unwrap_or_else(Utc::now);
        Session {
            id: AGGREGATE_SESSION_ID.to_string(),
            number: AGGREGATE_SESSION_NUMBER,
            name: Some(AGGREGATE_SESSION_NAME.to_string()),
            started_at,
            ended_at,
            points,
            created_at: started_at,
            updated_at: ended_at.unwrap_or(started_at),
        }
    }
}

pub fn default_name(number: i64) -> String {
    format!("Session {number}")
}

pub(crate) fn normalize_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
