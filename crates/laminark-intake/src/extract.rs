use serde_json::Value;

use laminark_types::truncate;

/// Map a tool-use event to a one-line semantic summary (§4.2 step 2).
/// Returns `None` when the extraction would be empty or uninformative,
/// signalling the event should be dropped rather than admitted.
pub fn extract_summary(tool_name: &str, tool_input: Option<&Value>, tool_response: Option<&Value>) -> Option<String> {
    let input = tool_input.unwrap_or(&Value::Null);

    match tool_name {
        "Write" => {
            let path = str_field(input, "file_path")?;
            let content = str_field(input, "content").unwrap_or_default();
            if content.is_empty() {
                return None;
            }
            Some(format!("[Write] Created {path}\n{}", truncate(&content, 200)))
        }
        "Edit" => {
            let path = str_field(input, "file_path")?;
            let old = str_field(input, "old_string").unwrap_or_default();
            let new = str_field(input, "new_string").unwrap_or_default();
            Some(format!(
                "[Edit] Modified {path}: replaced \"{}\" with \"{}\"",
                truncate(&old, 80),
                truncate(&new, 80)
            ))
        }
        "Bash" => {
            let command = str_field(input, "command")?;
            let response = response_text(tool_response).unwrap_or_default();
            Some(format!(
                "[Bash] $ {}\n{}",
                truncate(&command, 100),
                truncate(&response, 200)
            ))
        }
        "Read" => {
            let path = str_field(input, "file_path")?;
            Some(format!("[Read] {path}"))
        }
        "Glob" | "Grep" => {
            let pattern = str_field(input, "pattern")?;
            let scope = str_field(input, "path").unwrap_or_else(|| "cwd".to_string());
            Some(format!("[{tool_name}] pattern={pattern} in {scope}"))
        }
        _ => {
            let rendered = serde_json::to_string(input).unwrap_or_default();
            if rendered.is_empty() || rendered == "null" {
                return None;
            }
            Some(format!("[{tool_name}] {}", truncate(&rendered, 200)))
        }
    }
    .filter(|summary| is_informative(summary))
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn response_text(tool_response: Option<&Value>) -> Option<String> {
    let response = tool_response?;
    if let Some(s) = response.as_str() {
        return Some(s.to_string());
    }
    response
        .get("output")
        .or_else(|| response.get("stdout"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn is_informative(summary: &str) -> bool {
    let body = summary.splitn(2, ']').nth(1).unwrap_or(summary).trim();
    !body.is_empty()
}
