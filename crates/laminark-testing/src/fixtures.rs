//! Builders for hook events and observations, so integration tests don't
//! have to hand-roll every field of the hook IPC envelope (§6) or the
//! observation record (§3) each time.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use laminark_types::{Classification, HookEvent, Observation, ObservationKind, ObservationSource, ProjectTag};

pub const DEFAULT_SESSION_ID: &str = "test-session-0001";
pub const DEFAULT_CWD: &str = "/tmp/laminark-test-project";

/// A `PostToolUse` event for the `Write` tool.
pub fn write_event(file_path: &str, content: &str) -> HookEvent {
    tool_event("Write", json!({"file_path": file_path, "content": content}), None)
}

/// A `PostToolUse` event for the `Edit` tool.
pub fn edit_event(file_path: &str, old_string: &str, new_string: &str) -> HookEvent {
    tool_event(
        "Edit",
        json!({"file_path": file_path, "old_string": old_string, "new_string": new_string}),
        None,
    )
}

/// A `PostToolUse` event for the `Bash` tool, with a command and its output.
pub fn bash_event(command: &str, output: &str) -> HookEvent {
    tool_event("Bash", json!({"command": command}), Some(json!({"output": output})))
}

fn tool_event(tool_name: &str, tool_input: Value, tool_response: Option<Value>) -> HookEvent {
    HookEvent {
        hook_event_name: "PostToolUse".to_string(),
        session_id: DEFAULT_SESSION_ID.to_string(),
        cwd: DEFAULT_CWD.to_string(),
        tool_name: Some(tool_name.to_string()),
        tool_input: Some(tool_input),
        tool_response,
        tool_use_id: None,
    }
}

pub fn session_start_event() -> HookEvent {
    lifecycle_event("SessionStart")
}

pub fn session_end_event() -> HookEvent {
    lifecycle_event("SessionEnd")
}

pub fn stop_event() -> HookEvent {
    lifecycle_event("Stop")
}

fn lifecycle_event(name: &str) -> HookEvent {
    HookEvent {
        hook_event_name: name.to_string(),
        session_id: DEFAULT_SESSION_ID.to_string(),
        cwd: DEFAULT_CWD.to_string(),
        tool_name: None,
        tool_input: None,
        tool_response: None,
        tool_use_id: None,
    }
}

/// A ready-to-persist observation with sensible defaults; override fields on
/// the returned struct for whatever the test needs to vary.
pub fn observation(project_tag: &str, content: &str) -> Observation {
    let now = Utc::now();
    Observation {
        id: Uuid::new_v4(),
        project_tag: ProjectTag::new(project_tag),
        session_id: None,
        content: content.to_string(),
        title: None,
        source: ObservationSource::hook("Write"),
        kind: ObservationKind::Change,
        classification: None,
        classified_at: None,
        embedding: None,
        embedding_model: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

/// A classified observation, as it would look after C4 has run on it.
pub fn classified_observation(project_tag: &str, content: &str, classification: Classification) -> Observation {
    let mut obs = observation(project_tag, content);
    obs.classification = Some(classification);
    obs.classified_at = Some(obs.created_at);
    obs
}
