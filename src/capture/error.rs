/// Why a capture was refused. Nothing is recorded when any of these is returned.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("no active session")]
    NoActiveSession,
    #[error("no confident distance reading")]
    NoReading,
    #[error("no location fix available")]
    NoLocation,
    #[error("failed to store measurement: {0:#}")]
    Store(anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("the last remaining session cannot be deleted")]
    LastSession,
    #[error("the aggregate session is read-only")]
    AggregateSession,
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session store failure: {0:#}")]
    Store(anyhow::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
pub type SessionResult<T> = Result<T, SessionError>;
