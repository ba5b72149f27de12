pub mod constants;
pub mod error;
pub mod extract;
pub mod format;
pub mod progress;
pub mod ready;
pub mod sample_log;
pub mod schedule;
pub mod segment;
pub mod status;
pub mod tracker;
