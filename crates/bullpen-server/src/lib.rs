// Library root: re-exports the server modules so integration tests and the
// binary share one API.

pub mod api;
pub mod config;
pub mod storage;
pub mod telemetry;
