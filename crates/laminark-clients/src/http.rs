use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use crate::ports::{EmbeddingPort, LlmPort};
use crate::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP bridge to the LLM/embedding services (§4.10, §0 Non-goals
/// — both are external collaborators reached through these ports). Holds
/// one `reqwest::blocking::Client` and reuses it across calls to amortize
/// connection setup; any error tears the session down so the next call
/// builds a fresh one.
pub struct HttpSession {
    base_url: String,
    api_key: Option<String>,
    client: Mutex<Option<reqwest::blocking::Client>>,
}

impl HttpSession {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { base_url: base_url.into(), api_key, client: Mutex::new(None) }
    }

    fn client(&self) -> Result<reqwest::blocking::Client> {
        let mut guard = self.client.lock().expect("client mutex poisoned");
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
        *guard = Some(built.clone());
        Ok(built)
    }

    fn teardown(&self) {
        *self.client.lock().expect("client mutex poisoned") = None;
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let client = self.client()?;
        let url = format!("{}{path}", self.base_url);
        let mut req = client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let result = req.send().and_then(|resp| resp.error_for_status());
        match result {
            Ok(resp) => resp.json::<Value>().map_err(|e| {
                self.teardown();
                Error::ParseError(e.to_string())
            }),
            Err(err) => {
                self.teardown();
                Err(Self::classify_transport_error(err, &url))
            }
        }
    }

    fn classify_transport_error(err: reqwest::Error, url: &str) -> Error {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN =>
            {
                Error::Unauthorized
            }
            Some(status) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
            Some(status) if status.is_server_error() => {
                Error::ServerError(status.as_u16(), err.to_string())
            }
            _ => Error::ConnectionFailed(format!("{url}: {err}")),
        }
    }
}

impl LlmPort for HttpSession {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        let prompt = format!("<instructions>{system}</instructions>\n{user}");
        let body = json!({ "prompt": prompt });
        let response = self.post("/v1/complete", &body)?;
        response
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::ParseError("response missing string field `text`".into()))
    }
}

impl EmbeddingPort for HttpSession {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({ "text": text });
        let response = self.post("/v1/embed", &body)?;
        let values = response
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ParseError("response missing array field `embedding`".into()))?;
        values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| Error::ParseError("`embedding` contained a non-numeric element".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_builds_a_client_lazily() {
        let session = HttpSession::new("http://example.invalid", None);
        assert!(session.client.lock().unwrap().is_none());
        let _ = session.client().unwrap();
        assert!(session.client.lock().unwrap().is_some());
    }

    #[test]
    fn teardown_clears_the_cached_client() {
        let session = HttpSession::new("http://example.invalid", Some("key".into()));
        let _ = session.client().unwrap();
        session.teardown();
        assert!(session.client.lock().unwrap().is_none());
    }
}
