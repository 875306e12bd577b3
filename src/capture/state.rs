use serde::{Deserialize, Serialize};

use crate::db::models::Session;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    NoSession,
    HasActiveSession,
}

/// The active-session pointer. Owned by the capture controller only.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    Active(Session),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::NoSession => SessionStatus::NoSession,
            SessionState::Active(_) => SessionStatus::HasActiveSession,
        }
    }

    pub fn active(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            SessionState::NoSession => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        match self {
            SessionState::Active(session) => Some(session),
            SessionState::NoSession => None,
        }
    }

    pub fn is_active(&self, session_id: &str) -> bool {
        self.active().is_some_and(|session| session.id == session_id)
    }

    pub fn activate(&mut self, session: Session) {
        *self = SessionState::Active(session);
    }

    pub fn clear(&mut self) {
        *self = SessionState::NoSession;
    }
}

/// Serializable view of the session state for display collaborators.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub number: Option<i64>,
    pub display_name: Option<String>,
    pub point_count: usize,
    pub ended: bool,
    pub feedback: bool,
}

impl SessionSnapshot {
    pub fn from_state(state: &SessionState, feedback: bool) -> Self {
        let active = state.active();
        Self {
            status: state.status(),
            session_id: active.map(|s| s.id.clone()),
            number: active.map(|s| s.number),
            display_name: active.map(Session::display_name),
            point_count: active.map_or(0, |s| s.points.len()),
            ended: active.is_some_and(Session::is_ended),
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn starts_without_session() {
        let state = SessionState::default();
        assert_eq!(state.status(), SessionStatus::NoSession);
        assert!(state.active().is_none());
    }

    #[test]
    fn activate_and_clear() {
        let mut state = SessionState::default();
        let session = Session::new(1, None, Utc::now());
        let id = session.id.clone();
        state.activate(session);
        assert!(state.is_active(&id));

        let snapshot = SessionSnapshot::from_state(&state, false);
        assert_eq!(snapshot.status, SessionStatus::HasActiveSession);
        assert_eq!(snapshot.display_name.as_deref(), Some("Session 1"));

        state.clear();
        assert_eq!(state.status(), SessionStatus::NoSession);
    }
}
