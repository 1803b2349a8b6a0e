//! The embedded SQL store: migrations, WAL concurrency, and the
//! repositories for every record Laminark persists. Schema-on-write, one
//! `Store` per process, reachable from both the long-lived worker and a
//! short-lived hook subprocess.

mod codec;
mod error;
mod graph;
mod observations;
mod paths;
mod schema;
mod sessions;
mod shift_log;
mod stashes;
mod staleness;
mod store;
mod threshold_history;

pub use error::{Error, Result};
pub use observations::ObservationFilter;
pub use schema::{Migration, MIGRATIONS};
pub use store::{HealthReport, Store};
