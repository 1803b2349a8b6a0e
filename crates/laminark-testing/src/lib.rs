//! Testing infrastructure shared by Laminark's crates.
//!
//! - `fakes`: in-memory stand-ins for the two external ports (LLM, embeddings)
//! - `fixtures`: builders for hook events and observations
//! - `process`: background process management for exercising the `serve` binary

pub mod fakes;
pub mod fixtures;
pub mod process;

pub use fakes::{FakeEmbeddingPort, FakeLlmPort};
