// =============================================================================
// JSON recovery from free-form model output
// =============================================================================
//
// Generative models wrap their JSON in markdown fences, preambles, and
// sign-offs.  Extraction tries three strategies in order:
//
//   1. the contents of the first fenced code block,
//   2. the substring from the first `{` to the last `}`,
//   3. the raw text as-is.
//
// The first candidate that deserialises into the target type wins.  A miss on
// all three is a `MalformedAiResponse` — the caller decides which safe
// default that degrades to.
// =============================================================================

use serde::de::DeserializeOwned;

use crate::error::PipelineError;

/// Deserialise `T` out of free-form model `text`.
pub fn extract<T: DeserializeOwned>(text: &str) -> Result<T, PipelineError> {
    for candidate in candidates(text) {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return Ok(value);
        }
    }

    let preview: String = text.chars().take(120).collect();
    Err(PipelineError::MalformedAiResponse(preview))
}

/// Candidate JSON substrings, most-specific first.
fn candidates(text: &str) -> Vec<&str> {
    let mut found = Vec::with_capacity(3);

    if let Some(fenced) = fenced_block(text) {
        found.push(fenced);
    }
    if let Some(braced) = brace_substring(text) {
        found.push(braced);
    }
    found.push(text.trim());

    found
}

/// Contents of the first ``` fence pair, with an optional language tag on the
/// opening line.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip a language tag such as `json` on the opening line.
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Substring spanning the first `{` through the last `}`.
fn brace_substring(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        answer: i64,
    }

    #[test]
    fn extracts_from_fenced_block() {
        let text = "Here is my analysis:\n```json\n{\"answer\": 1}\n```\nHope that helps!";
        let probe: Probe = extract(text).unwrap();
        assert_eq!(probe.answer, 1);
    }

    #[test]
    fn fence_without_language_tag() {
        let text = "```\n{\"answer\": 2}\n```";
        let probe: Probe = extract(text).unwrap();
        assert_eq!(probe.answer, 2);
    }

    #[test]
    fn extracts_brace_substring_when_no_fence() {
        let text = "Sure! The result is {\"answer\": 3} as requested.";
        let probe: Probe = extract(text).unwrap();
        assert_eq!(probe.answer, 3);
    }

    #[test]
    fn extracts_raw_json() {
        let probe: Probe = extract("  {\"answer\": 4}  ").unwrap();
        assert_eq!(probe.answer, 4);
    }

    #[test]
    fn fenced_beats_brace_substring() {
        // A brace outside the fence must not shadow the fenced payload.
        let text = "ignore {\"answer\": 99} this\n```json\n{\"answer\": 5}\n```";
        let probe: Probe = extract(text).unwrap();
        assert_eq!(probe.answer, 5);
    }

    #[test]
    fn broken_fence_falls_through_to_braces() {
        // The fence never closes, but the brace strategy still lands.
        let text = "```json\n{\"answer\": 6}";
        let probe: Probe = extract(text).unwrap();
        assert_eq!(probe.answer, 6);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = extract::<Probe>("not json").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedAiResponse(_)));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = extract::<Probe>("{\"different\": true}").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedAiResponse(_)));
    }
}
