//! Pull a JSON object out of model output.
//!
//! Models asked for "JSON only" still wrap it in code fences or a
//! sentence of preamble often enough that strict parsing is not an option.

use serde::de::DeserializeOwned;

use crate::error::ReasoningError;

/// Parse `text` as `T`, tolerating Markdown fences and surrounding prose.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ReasoningError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ReasoningError::Parse("empty response".to_string()));
    }

    let mut last_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Some(fenced) = fenced_block(trimmed) {
        match serde_json::from_str::<T>(fenced) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e.to_string(),
        }
    }

    for (start, _) in trimmed.match_indices('{') {
        if let Some(candidate) = balanced_object(&trimmed[start..]) {
            match serde_json::from_str::<T>(candidate) {
                Ok(value) => return Ok(value),
                Err(e) => last_error = e.to_string(),
            }
        }
    }

    Err(ReasoningError::Parse(last_error))
}

/// The body of the first ```` ``` ```` fence, minus an info string such as `json`.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// The shortest prefix of `text` (which starts with `{`) that closes every
/// brace, ignoring braces inside JSON strings.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
