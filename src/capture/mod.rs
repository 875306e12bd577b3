pub mod controller;
pub mod error;
pub mod feedback;
pub mod location;
pub mod photo;
pub mod state;

pub use controller::CaptureController;
pub use error::{CaptureError, CaptureResult, SessionError, SessionResult};
pub use feedback::FeedbackFlag;
pub use location::{LocationFix, LocationProvider, SharedLocation};
pub use photo::PhotoEncoder;
pub use state::{SessionSnapshot, SessionState, SessionStatus};
