// Core library: pitcher appearance ingestion, fatigue scoring and ranking.
//
// Everything here is synchronous and free of I/O beyond the `Read` handed to
// the ingestion parser, so the HTTP layer can rebuild a snapshot per request.

pub mod dates;
pub mod fatigue;
pub mod ingest;
pub mod pitcher;
pub mod query;
pub mod status;

pub use fatigue::fatigue;
pub use ingest::{ingest_reader, ingest_str, IngestStats, Snapshot};
pub use pitcher::{Appearance, Pitcher, ScoredPitcher};
pub use query::{ListParams, Query, QueryError, SortKey, SortOrder};
pub use status::FatigueStatus;
