use crate::Result;

/// `(system, user) → text` — the LLM inference service, called as an
/// external collaborator (§0 Non-goals). Implementations decide how a
/// session is established and torn down; callers only see one blocking call.
/// `Send + Sync` so a port can be shared into the C4/C8 background workers.
pub trait LlmPort: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// `text → vector` — the embedding model, the other external collaborator.
pub trait EmbeddingPort: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
