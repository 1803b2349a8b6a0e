//! Session lifecycle (C3), the classify-extract-gate-link processor loop
//! (C4), the curation pass (C8), and context injection (C9) — the layer
//! that turns persisted observations into graph structure and hands
//! recovered context back to the host.

pub mod context;
pub mod curation;
pub mod error;
pub mod processor;
pub mod quality_gate;
pub mod session;
pub mod worker;

pub use context::WELCOME_LINE;
pub use curation::{run_once as run_curation, CurationReport};
pub use error::{Error, Result};
pub use processor::{process_observation, run_batch, ProcessOutcome};
pub use session::{handle_session_end, handle_session_start, handle_stop};
pub use worker::Worker;
