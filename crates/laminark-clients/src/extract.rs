use serde_json::Value;

use crate::{Error, Result};

/// Finds a JSON object in an LLM response that may be bare JSON, wrapped in
/// a markdown code fence, or embedded in surrounding prose (§4.10).
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = extract_fenced(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&fenced) {
            return Ok(value);
        }
    }

    if let Some(embedded) = extract_embedded(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&embedded) {
            return Ok(value);
        }
    }

    Err(Error::NoJsonFound)
}

fn extract_fenced(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_open = &text[start + 3..];
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let end = after_open.find("```")?;
    Some(after_open[..end].trim().to_string())
}

/// Scans for the first balanced `{...}` span, tracking string/escape state
/// so braces inside quoted strings don't throw off the depth count.
fn extract_embedded(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_parses_directly() {
        let value = extract_json(r#"{"signal": "signal"}"#).unwrap();
        assert_eq!(value["signal"], "signal");
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let text = "Sure, here's the result:\n```json\n{\"a\": 1}\n```\nLet me know if you need more.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn fenced_without_language_tag_is_unwrapped() {
        let text = "```\n{\"a\": 2}\n```";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn embedded_json_in_prose_is_found() {
        let text = "I think the answer is {\"a\": {\"b\": 3}} based on the content.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["a"]["b"], 3);
    }

    #[test]
    fn braces_inside_strings_do_not_break_depth_tracking() {
        let text = r#"prefix {"reason": "uses { and } in prose"} suffix"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["reason"], "uses { and } in prose");
    }

    #[test]
    fn no_json_anywhere_is_an_error() {
        assert!(matches!(extract_json("no json here"), Err(Error::NoJsonFound)));
    }
}
