use std::{sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, Utc};
use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::{
    db::{
        models::session::{normalize_name, AGGREGATE_SESSION_ID},
        Database, MeasurementPoint, Session,
    },
    ranging::{CameraImage, CurrentDistance, DepthFrame},
    settings::CaptureSettings,
    stats::SessionStats,
};

use super::{
    error::{CaptureError, CaptureResult, SessionError, SessionResult},
    feedback::FeedbackFlag,
    location::{LocationFix, LocationProvider},
    photo::PhotoEncoder,
    state::{SessionSnapshot, SessionState},
};

/// Store precision; keeps in-memory timestamps equal to what reads back.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn store_failure(action: &str, err: anyhow::Error) -> SessionError {
    error!("Failed to {action}: {err:#}");
    SessionError::Store(err)
}

/// Owns the active-session pointer and turns capture triggers into stored points.
#[derive(Clone)]
pub struct CaptureController {
    state: Arc<Mutex<SessionState>>,
    db: Database,
    photo: PhotoEncoder,
    feedback: FeedbackFlag,
    feedback_duration: Duration,
}

impl CaptureController {
    pub fn new(db: Database, settings: &CaptureSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            db,
            photo: PhotoEncoder::new(settings.photo_max_dimension, settings.photo_quality),
            feedback: FeedbackFlag::new(),
            feedback_duration: Duration::from_millis(settings.feedback_ms),
        }
    }

    pub fn feedback(&self) -> &FeedbackFlag {
        &self.feedback
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.state.lock().await;
        SessionSnapshot::from_state(&guard, self.feedback.is_raised())
    }

    pub async fn active_session(&self) -> Option<Session> {
        self.state.lock().await.active().cloned()
    }

    /// Leaves `NoSession`: re-activates the most recently started session, or starts
    /// session 1 on an empty store. An already active session is kept as is.
    pub async fn restore_or_start(&self) -> SessionResult<Session> {
        let mut state = self.state.lock().await;
        if let Some(active) = state.active() {
            return Ok(active.clone());
        }

        let latest = self
            .db
            .latest_session()
            .await
            .map_err(|err| store_failure("load latest session", err))?;
        if let Some(session) = latest {
            info!(
                "Restored session {} ({} points)",
                session.display_name(),
                session.points.len()
            );
            state.activate(session.clone());
            return Ok(session);
        }

        let session = self.insert_next_session(None).await?;
        info!("Started first session {}", session.display_name());
        state.activate(session.clone());
        Ok(session)
    }

    /// Creates the next numbered session and makes it active. The previously active
    /// session is left as it was.
    pub async fn create_session(&self, name: Option<&str>) -> SessionResult<Session> {
        let mut state = self.state.lock().await;
        let session = self.insert_next_session(name).await?;
        info!("Created session {}", session.display_name());
        state.activate(session.clone());
        Ok(session)
    }

    async fn insert_next_session(&self, name: Option<&str>) -> SessionResult<Session> {
        let number = self
            .db
            .max_session_number()
            .await
            .map_err(|err| store_failure("read session numbers", err))?
            + 1;
        let session = Session::new(number, name, now());
        self.db
            .insert_session(&session)
            .await
            .map_err(|err| store_failure("insert session", err))?;
        Ok(session)
    }

    /// Soft-closes the active session (if it differs) and activates `session_id`.
    pub async fn switch_to(&self, session_id: &str) -> SessionResult<Session> {
        if session_id == AGGREGATE_SESSION_ID {
            return Err(SessionError::AggregateSession);
        }

        let mut state = self.state.lock().await;
        if let Some(active) = state.active() {
            if active.id == session_id {
                return Ok(active.clone());
            }
        }

        let target = self
            .db
            .get_session(session_id)
            .await
            .map_err(|err| store_failure("load session", err))?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let closed = state.active_mut().map(|previous| {
            let ended_at = now();
            previous.ended_at = Some(ended_at);
            previous.updated_at = ended_at;
            (previous.id.clone(), ended_at)
        });

        state.activate(target.clone());
        info!("Switched to session {}", target.display_name());

        if let Some((previous_id, ended_at)) = closed {
            self.db
                .mark_session_ended(&previous_id, ended_at)
                .await
                .map_err(|err| store_failure(&format!("persist end of session {previous_id}"), err))?;
        }

        Ok(target)
    }

    /// Stamps the active session's end time. It stays active.
    pub async fn end_active_session(&self) -> SessionResult<Option<Session>> {
        let mut state = self.state.lock().await;
        let Some(active) = state.active_mut() else {
            return Ok(None);
        };

        let ended_at = now();
        active.ended_at = Some(ended_at);
        active.updated_at = ended_at;
        let ended = active.clone();

        self.db
            .mark_session_ended(&ended.id, ended_at)
            .await
            .map_err(|err| store_failure(&format!("persist end of session {}", ended.id), err))?;

        info!("Ended session {}", ended.display_name());
        Ok(Some(ended))
    }

    /// Deletes a session and its points. Refused for the last remaining session.
    /// Deleting the active session leaves no session active.
    pub async fn delete_session(&self, session_id: &str) -> SessionResult<()> {
        if session_id == AGGREGATE_SESSION_ID {
            return Err(SessionError::AggregateSession);
        }

        let mut state = self.state.lock().await;
        self.ensure_exists(session_id).await?;
        let count = self
            .db
            .count_sessions()
            .await
            .map_err(|err| store_failure("count sessions", err))?;
        if count <= 1 {
            return Err(SessionError::LastSession);
        }

        self.db
            .delete_session(session_id)
            .await
            .map_err(|err| store_failure(&format!("delete session {session_id}"), err))?;
        if state.is_active(session_id) {
            state.clear();
            info!("Deleted active session {session_id}; no session active");
        } else {
            info!("Deleted session {session_id}");
        }
        Ok(())
    }

    /// Blank names clear the stored name so the default label shows again.
    pub async fn rename_session(&self, session_id: &str, name: Option<&str>) -> SessionResult<()> {
        if session_id == AGGREGATE_SESSION_ID {
            return Err(SessionError::AggregateSession);
        }

        let mut state = self.state.lock().await;
        self.ensure_exists(session_id).await?;

        let name = normalize_name(name);
        self.db
            .rename_session(session_id, name.clone())
            .await
            .map_err(|err| store_failure(&format!("rename session {session_id}"), err))?;
        if let Some(active) = state.active_mut().filter(|s| s.id == session_id) {
            active.name = name;
        }
        Ok(())
    }

    /// Returns whether the point existed.
    pub async fn delete_point(&self, point_id: &str) -> SessionResult<bool> {
        let mut state = self.state.lock().await;
        let removed = self
            .db
            .delete_point(point_id)
            .await
            .map_err(|err| store_failure(&format!("delete point {point_id}"), err))?;
        if let Some(active) = state.active_mut() {
            active.points.retain(|point| point.id != point_id);
        }
        Ok(removed)
    }

    async fn ensure_exists(&self, session_id: &str) -> SessionResult<()> {
        let found = self
            .db
            .get_session(session_id)
            .await
            .map_err(|err| store_failure("load session", err))?;
        match found {
            Some(_) => Ok(()),
            None => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    pub async fn list_sessions(&self) -> SessionResult<Vec<Session>> {
        self.db
            .list_sessions()
            .await
            .map_err(|err| store_failure("list sessions", err))
    }

    pub async fn aggregate_session(&self) -> SessionResult<Session> {
        let sessions = self.list_sessions().await?;
        Ok(Session::aggregate(&sessions))
    }

    /// Statistics for a stored session or for the aggregate.
    pub async fn session_stats(&self, session_id: &str) -> SessionResult<SessionStats> {
        let session = if session_id == AGGREGATE_SESSION_ID {
            self.aggregate_session().await?
        } else {
            self.db
                .get_session(session_id)
                .await
                .map_err(|err| store_failure("load session", err))?
                .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?
        };
        Ok(SessionStats::for_session(&session))
    }

    /// Trigger path: reads the distance and fix current at this instant.
    pub async fn capture(
        &self,
        distance: &CurrentDistance,
        location: &dyn LocationProvider,
        frame: Option<&DepthFrame>,
    ) -> CaptureResult<MeasurementPoint> {
        let image = frame.and_then(|f| f.image.as_ref());
        self.capture_point(distance.get(), location.latest_fix(), image)
            .await
    }

    /// Records one measurement on the active session.
    ///
    /// Preconditions are checked in order: active session, distance reading,
    /// location fix. A photo that cannot be derived is dropped, not fatal.
    pub async fn capture_point(
        &self,
        distance: Option<f32>,
        fix: Option<LocationFix>,
        image: Option<&CameraImage>,
    ) -> CaptureResult<MeasurementPoint> {
        let mut state = self.state.lock().await;
        let session_id = state
            .active()
            .map(|session| session.id.clone())
            .ok_or(CaptureError::NoActiveSession)?;
        let distance = distance.ok_or(CaptureError::NoReading)?;
        let fix = fix.ok_or(CaptureError::NoLocation)?;

        let photo = match image {
            Some(image) => self.derive_photo(image.clone()).await,
            None => None,
        };

        let point = MeasurementPoint::new(
            &session_id,
            now(),
            f64::from(distance),
            fix.latitude,
            fix.longitude,
            photo,
        );

        if let Err(err) = self.db.insert_point(&point).await {
            error!("Failed to store measurement for session {session_id}: {err:#}");
            return Err(CaptureError::Store(err));
        }

        if let Some(active) = state.active_mut() {
            active.points.push(point.clone());
        }
        self.feedback.raise_for(self.feedback_duration);

        info!(
            "Captured {:.2} m at ({:.5}, {:.5}) in session {session_id}{}",
            point.distance_m,
            point.latitude,
            point.longitude,
            if point.has_photo() { " with photo" } else { "" }
        );
        Ok(point)
    }

    async fn derive_photo(&self, image: CameraImage) -> Option<Vec<u8>> {
        let encoder = self.photo;
        match tokio::task::spawn_blocking(move || encoder.encode(&image)).await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(err)) => {
                warn!("Photo derivation failed, capturing without photo: {err:#}");
                None
            }
            Err(join_err) => {
                warn!("Photo worker failed, capturing without photo: {join_err}");
                None
            }
        }
    }
}
