//! SQLite-backed store for sessions and their measurement points.

mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{MeasurementPoint, Session};
