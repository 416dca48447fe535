//! Parsing of model responses and the heuristic fallbacks used when a
//! response is not valid JSON.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Returns the JSON payload of a response.
///
/// The content of the first ```` ```json ```` fence wins, then the first bare
/// fence, then the whole trimmed text. A fence only counts when it opens a
/// line, so backticks inside a JSON string are left alone.
#[must_use]
pub fn extract_json_block(content: &str) -> &str {
    let trimmed = content.trim();

    for open in ["```json", "```"] {
        if let Some(start) = fence_at_line_start(trimmed, open) {
            let after_fence = &trimmed[start + open.len()..];
            let end = fence_at_line_start(after_fence, "```").or_else(|| after_fence.find("```"));
            if let Some(end) = end {
                return after_fence[..end].trim();
            }
        }
    }

    trimmed
}

/// Byte offset of the first `fence` that starts a line.
fn fence_at_line_start(text: &str, fence: &str) -> Option<usize> {
    text.match_indices(fence).map(|(i, _)| i).find(|&i| {
        let before = text[..i].trim_end_matches([' ', '\t']);
        before.is_empty() || before.ends_with('\n')
    })
}

/// Parses a response as `T`, looking inside fenced blocks first.
///
/// # Errors
///
/// Returns the decoder error when the payload is not valid JSON for `T`.
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(extract_json_block(content))
}

fn bold_pattern() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"\*\*([^*\n]+?)\*\*").unwrap()
    })
}

fn list_item_pattern() -> &'static Regex {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    ITEM.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+?)\s*$").unwrap()
    })
}

/// Terms emphasized as `**bold**` in free text, first occurrence order,
/// without duplicates.
#[must_use]
pub fn heuristic_tags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    bold_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches(':').trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Bulleted or numbered list entries in free text, with emphasis markers removed.
#[must_use]
pub fn heuristic_list_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| list_item_pattern().captures(line))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().replace("**", "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Existing tags first, then each new tag not already present, in order.
///
/// Comparison is exact; duplicates inside `new` are dropped too.
#[must_use]
pub fn merge_tags(existing: &[String], new: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut merged = existing.to_vec();
    for tag in new {
        if seen.insert(tag.as_str()) {
            merged.push(tag.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_extract_json_fenced() {
        let content = "Here you go:\n```json\n{\"tags\": [\"a\"]}\n```\nthanks";
        assert_eq!(extract_json_block(content), "{\"tags\": [\"a\"]}");
    }

    #[test]
    fn test_extract_json_bare_fence() {
        assert_eq!(extract_json_block("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_extract_json_plain_and_unclosed() {
        assert_eq!(extract_json_block("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(extract_json_block("```json {\"a\""), "```json {\"a\"");
    }

    #[test]
    fn test_backticks_inside_json_string_are_not_fences() {
        let raw = r#"{"summary":"run ```npm i``` first"}"#;
        assert_eq!(extract_json_block(raw), raw);

        let value: serde_json::Value = parse_json(raw).unwrap();
        assert_eq!(value["summary"], "run ```npm i``` first");

        let fenced = "```json\n{\"summary\":\"run ```npm i``` first\"}\n```";
        let value: serde_json::Value = parse_json(fenced).unwrap();
        assert_eq!(value["summary"], "run ```npm i``` first");
    }

    #[test]
    fn test_single_line_fence() {
        assert_eq!(extract_json_block("```json {\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_json_error() {
        assert!(parse_json::<serde_json::Value>("not json at all").is_err());
        let value: serde_json::Value = parse_json("```json\n{\"x\": 2}\n```").unwrap();
        assert_eq!(value["x"], 2);
    }

    #[test]
    fn test_heuristic_tags() {
        let text = "Uses **Figma** and **Auto Layout:** then **Figma** again. **not\nclosed**";
        assert_eq!(heuristic_tags(text), strings(&["Figma", "Auto Layout"]));
        assert!(heuristic_tags("not json at all").is_empty());
    }

    #[test]
    fn test_heuristic_list_items() {
        let text = "Processes:\n- **Wireframing**\n* Prototyping\n2. Handoff\nplain line";
        assert_eq!(
            heuristic_list_items(text),
            strings(&["Wireframing", "Prototyping", "Handoff"])
        );
    }

    #[test]
    fn test_merge_tags_preserves_order() {
        let merged = merge_tags(
            &strings(&["design", "ux"]),
            &strings(&["prototyping", "design", "figma", "prototyping"]),
        );
        assert_eq!(merged, strings(&["design", "ux", "prototyping", "figma"]));
    }

    #[test]
    fn test_merge_tags_idempotent() {
        let existing = strings(&["design"]);
        let new = strings(&["prototyping", "design"]);
        let once = merge_tags(&existing, &new);
        let twice = merge_tags(&once, &new);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_tags_is_case_sensitive() {
        let merged = merge_tags(&strings(&["Design"]), &strings(&["design"]));
        assert_eq!(merged, strings(&["Design", "design"]));
    }
}
