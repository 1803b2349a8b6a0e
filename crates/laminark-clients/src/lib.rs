//! Thin ports to the LLM and embedding services (§4.10) — both are external
//! collaborators the rest of the system reaches only through these traits —
//! plus the three agent calls built on top of an `LlmPort`: classifier,
//! entity extractor, relationship inferrer.

pub mod agents;
pub mod error;
pub mod extract;
pub mod http;
pub mod ports;

pub use agents::{classify, extract_entities, infer_relationships};
pub use error::{Error, Result};
pub use extract::extract_json;
pub use http::HttpSession;
pub use ports::{EmbeddingPort, LlmPort};
