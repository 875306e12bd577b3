pub mod config;
pub mod controller;
pub mod distance;
pub mod engine;
pub mod frame;
pub mod loop_worker;
pub mod smoothing;
pub mod window;

pub use config::{RangingConfig, SharedRangingConfig};
pub use controller::{FrameSender, RangingController};
pub use distance::CurrentDistance;
pub use engine::{FrameSample, RangingEngine};
pub use frame::{CameraImage, ConfidenceLevel, DepthFrame, DepthMap, DepthSource, Grid};
