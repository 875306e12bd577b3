pub mod measurement;
pub mod session;

pub use measurement::MeasurementPoint;
pub use session::{Session, AGGREGATE_SESSION_NUMBER};
