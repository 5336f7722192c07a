//! Best-effort JSON extraction from free-form LLM output (spec §4.5).
//!
//! LLM output is structurally unreliable: it may be wrapped in a fenced
//! code block, truncated mid-object, or padded with stray backticks. This
//! module is a pure function ahead of `serde_json` decode — it never
//! validates schema, only produces a string that `serde_json` can parse
//! (design note §9: "dynamic JSON from LLM <-> typed DTO").

/// Strips a surrounding ```json ... ``` or ``` ... ``` fence, tolerating a
/// missing closing fence (truncated output), then trims stray backticks.
fn strip_fence(input: &str) -> &str {
    let trimmed = input.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let without_open = without_open.trim_start();
    match without_open.rfind("```") {
        Some(idx) => without_open[..idx].trim(),
        None => without_open.trim_end_matches('`').trim(),
    }
}

/// Scans forward from the first `{`/`[`, tracking brace/bracket depth with
/// string-literal and backslash-escape awareness. Returns the balanced
/// substring if a matching close was found, or a best-effort repaired
/// string (closing the open string and appending balancing brackets) if the
/// output was truncated mid-structure.
pub fn extract_json(text: &str) -> Option<String> {
    let candidate = strip_fence(text);
    let bytes: Vec<char> = candidate.chars().collect();

    let start = bytes.iter().position(|&c| c == '{' || c == '[')?;

    let mut depth_stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut end: Option<usize> = None;

    for (i, &c) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth_stack.push('}'),
            '[' => depth_stack.push(']'),
            '}' | ']' => {
                if depth_stack.pop() != Some(c) {
                    // Mismatched closer; keep scanning rather than aborting,
                    // truncation repair below will still attempt a fix.
                }
                if depth_stack.is_empty() {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    if let Some(end) = end {
        let result: String = bytes[start..=end].iter().collect();
        return Some(result);
    }

    // Truncated: best-effort repair.
    let mut repaired: String = bytes[start..].iter().collect();
    if in_string {
        repaired.push('"');
    }
    while let Some(closer) = depth_stack.pop() {
        repaired.push(closer);
    }

    serde_json::from_str::<serde_json::Value>(&repaired)
        .ok()
        .map(|_| repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_fenced_json_block() {
        let input = "```json\n{\"type\":\"stock\",\"symbols\":[\"AAPL\"]}\n```";
        let extracted = extract_json(input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value, json!({"type": "stock", "symbols": ["AAPL"]}));
    }

    #[test]
    fn extracts_from_plain_fence_without_json_tag() {
        let input = "```\n{\"a\": 1}\n```";
        let extracted = extract_json(input).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&extracted).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn repairs_truncated_object_with_unclosed_brace_and_bracket() {
        let input = "```json\n{\"type\":\"stock\",\"sector\":\"technology\",\"symbols\":[\"AAPL\",\"MSFT\"";
        let extracted = extract_json(input).expect("should produce a parseable repair");
        let value: serde_json::Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value["type"], "stock");
        assert_eq!(value["sector"], "technology");
        assert_eq!(value["symbols"], json!(["AAPL", "MSFT"]));
    }

    #[test]
    fn repairs_truncation_mid_string() {
        let input = "{\"name\": \"Bitcoi";
        let extracted = extract_json(input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value["name"], "Bitcoi");
    }

    #[test]
    fn picks_whichever_of_brace_or_bracket_appears_first() {
        let input = "noise [1, 2, 3] trailing";
        let extracted = extract_json(input).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&extracted).unwrap(),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn respects_escaped_quotes_inside_strings() {
        let input = r#"{"text": "she said \"hi\"", "n": 1}"#;
        let extracted = extract_json(input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&extracted).unwrap();
        assert_eq!(value["text"], "she said \"hi\"");
    }

    #[test]
    fn returns_none_when_nothing_parses() {
        let input = "no json here at all, just prose.";
        assert!(extract_json(input).is_none());
    }
}
