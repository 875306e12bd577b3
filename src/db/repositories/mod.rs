pub mod measurements;
pub mod sessions;
