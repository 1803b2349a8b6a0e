use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Which host lifecycle event fired (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookEventName {
    PostToolUse,
    PostToolUseFailure,
    SessionStart,
    SessionEnd,
    Stop,
}

impl std::str::FromStr for HookEventName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PostToolUse" => Ok(HookEventName::PostToolUse),
            "PostToolUseFailure" => Ok(HookEventName::PostToolUseFailure),
            "SessionStart" => Ok(HookEventName::SessionStart),
            "SessionEnd" => Ok(HookEventName::SessionEnd),
            "Stop" => Ok(HookEventName::Stop),
            other => Err(Error::UnknownVariant {
                field: "hook_event_name",
                value: other.to_string(),
            }),
        }
    }
}

/// The stdin JSON envelope delivered to the hook process (§6).
///
/// `tool_name`/`tool_input`/`tool_response`/`tool_use_id` are only present for
/// `PostToolUse`/`PostToolUseFailure`; everything else leaves them `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct HookEvent {
    pub hook_event_name: String,
    pub session_id: String,
    pub cwd: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<Value>,
    #[serde(default)]
    pub tool_response: Option<Value>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
}

impl HookEvent {
    pub fn event_name(&self) -> Result<HookEventName> {
        self.hook_event_name.parse()
    }
}
