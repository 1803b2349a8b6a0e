//! In-memory stand-ins for the C10 ports (§4.10), so the rest of the system
//! can be exercised without a real LLM or embedding service.

use std::collections::VecDeque;
use std::sync::Mutex;

use laminark_clients::{EmbeddingPort, Error, LlmPort, Result};

/// Replays a scripted sequence of `complete` responses, one per call, and
/// records every `(system, user)` pair it was asked. Once the script is
/// exhausted, every further call returns `Error::ConnectionFailed` — this
/// makes an under-scripted test fail loudly instead of silently repeating
/// the last response.
pub struct FakeLlmPort {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeLlmPort {
    pub fn new() -> Self {
        Self { responses: Mutex::new(VecDeque::new()), calls: Mutex::new(Vec::new()) }
    }

    /// Every call returns this same JSON string.
    pub fn always(response: impl Into<String>) -> Self {
        let port = Self::new();
        port.push(response);
        port
    }

    pub fn push(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: Error) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for FakeLlmPort {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmPort for FakeLlmPort {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push((system.to_string(), user.to_string()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(err)) => Err(err),
            None => Err(Error::ConnectionFailed("FakeLlmPort: script exhausted".into())),
        }
    }
}

/// Returns a fixed-dimensionality vector derived from the input text's byte
/// sum, so equal inputs produce equal vectors and distinct inputs usually
/// don't, without pulling in a real embedding model.
pub struct FakeEmbeddingPort {
    dimensions: usize,
}

impl FakeEmbeddingPort {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for FakeEmbeddingPort {
    fn default() -> Self {
        Self::new(8)
    }
}

impl EmbeddingPort for FakeEmbeddingPort {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let seed: u32 = text.bytes().fold(0u32, |acc, b| acc.wrapping_add(b as u32));
        Ok((0..self.dimensions)
            .map(|i| ((seed.wrapping_add(i as u32) % 1000) as f32) / 1000.0)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_responses_play_back_in_order() {
        let llm = FakeLlmPort::new();
        llm.push("first");
        llm.push("second");
        assert_eq!(llm.complete("sys", "a").unwrap(), "first");
        assert_eq!(llm.complete("sys", "b").unwrap(), "second");
        assert_eq!(llm.call_count(), 2);
    }

    #[test]
    fn exhausted_script_errors_instead_of_repeating() {
        let llm = FakeLlmPort::always("only");
        assert_eq!(llm.complete("sys", "a").unwrap(), "only");
        assert!(llm.complete("sys", "b").is_err());
    }

    #[test]
    fn embedding_is_deterministic_for_equal_input() {
        let embedder = FakeEmbeddingPort::new(4);
        let a = embedder.embed("hello").unwrap();
        let b = embedder.embed("hello").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }
}
