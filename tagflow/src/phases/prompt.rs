//! Bounded prompt construction.
//!
//! All truncation counts Unicode scalar values and always cuts at the same
//! offset for the same input.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::config::PromptLimits;
use crate::core::{NormalizedMetadata, Process};
use crate::source::TranscriptSegment;

/// Cuts `text` to at most `max_chars` characters, appending `marker` when cut.
#[must_use]
pub fn truncate_chars<'a>(text: &'a str, max_chars: usize, marker: &str) -> Cow<'a, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((byte_offset, _)) => {
            let mut cut = String::with_capacity(byte_offset + marker.len());
            cut.push_str(&text[..byte_offset]);
            cut.push_str(marker);
            Cow::Owned(cut)
        }
    }
}

/// Joins segment texts with single spaces and caps the result at
/// `limits.transcript_max_chars`.
#[must_use]
pub fn transcript_text(segments: &[TranscriptSegment], limits: &PromptLimits) -> String {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, limits.transcript_max_chars, &limits.truncation_marker).into_owned()
}

fn item_header(metadata: &NormalizedMetadata, transcript: &str, limits: &PromptLimits) -> String {
    let description = truncate_chars(
        &metadata.description,
        limits.description_max_chars,
        &limits.truncation_marker,
    );
    let excerpt = truncate_chars(
        transcript,
        limits.prompt_transcript_chars,
        &limits.truncation_marker,
    );
    format!(
        "Video: {}\nDescription excerpt: {}\n\nTranscript excerpt:\n{}\n",
        metadata.title, description, excerpt
    )
}

/// Prompt asking for the processes demonstrated in the item.
#[must_use]
pub fn process_prompt(metadata: &NormalizedMetadata, transcript: &str, limits: &PromptLimits) -> String {
    let mut prompt = String::from(
        "Identify the processes and workflows demonstrated in this YouTube video.\n\n",
    );
    prompt.push_str(&item_header(metadata, transcript, limits));
    prompt.push_str(
        r#"
Format response as JSON:
```json
{
  "processes": [
    { "name": "Process name", "description": "What it achieves", "steps": ["step 1", "step 2"] }
  ]
}
```

- Only include processes that are actually shown or explained
- Keep steps short and in the order they are performed
"#,
    );
    prompt
}

/// Prompt asking for a summary of the extracted processes.
#[must_use]
pub fn summary_prompt(
    metadata: &NormalizedMetadata,
    processes: &[Process],
    transcript: &str,
    limits: &PromptLimits,
) -> String {
    let mut prompt = String::from("Summarize what this YouTube video teaches.\n\n");
    prompt.push_str(&item_header(metadata, transcript, limits));

    if !processes.is_empty() {
        prompt.push_str("\nProcesses identified:\n");
        for process in processes {
            let _ = write!(prompt, "- {}", process.name);
            if let Some(description) = &process.description {
                let _ = write!(prompt, ": {description}");
            }
            prompt.push('\n');
            for step in &process.steps {
                let _ = writeln!(prompt, "  * {step}");
            }
        }
    }

    prompt.push_str(
        r#"
Format response as JSON:
```json
{ "summary": "Two or three sentences" }
```
"#,
    );
    prompt
}

/// Prompt asking for software mentions and additional tags.
#[must_use]
pub fn info_prompt(
    metadata: &NormalizedMetadata,
    existing_tags: &[String],
    transcript: &str,
    limits: &PromptLimits,
) -> String {
    let mut prompt = String::from(
        "Extract all software tools and related terms from this YouTube video:\n\n",
    );
    prompt.push_str(&item_header(metadata, transcript, limits));
    prompt.push_str(
        r#"
Format response as JSON:
```json
{
  "software": [
    { "name": "Software Name", "description": "Brief description of its purpose and how it's used in the video", "mentions": 1 }
  ],
  "tags": ["tag1", "tag2", "tag3"]
}
```

For software:
- Include ALL software products, platforms, and digital tools
- Focus on their purpose and how they're used in the video
- Count actual mentions accurately
- Be specific (e.g., "Deepseek R1" rather than just "AI")

For tags:
"#,
    );
    let _ = writeln!(
        prompt,
        "- Focus on identifying relevant keywords not already in: {existing_tags:?}"
    );
    prompt.push_str(
        "- Include specific techniques, methodologies, and key concepts\n\
         - Prioritize technical terms over generic descriptions\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert!(matches!(truncate_chars("abc", 3, "..."), Cow::Borrowed("abc")));
        assert_eq!(truncate_chars("", 0, "..."), "");
    }

    #[test]
    fn test_truncate_cuts_and_marks() {
        assert_eq!(truncate_chars("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_chars("abcdef", 0, "~"), "~");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7, "…"), "héllo w…");
    }

    #[test]
    fn test_transcript_truncation_is_deterministic() {
        let limits = PromptLimits::default();
        let text: String = (0..20_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let segments = vec![TranscriptSegment::text(text.clone())];

        let first = transcript_text(&segments, &limits);
        let second = transcript_text(&segments, &limits);

        assert_eq!(first, second);
        assert_eq!(first.len(), 16_000 + 3);
        assert_eq!(&first[..16_000], &text[..16_000]);
        assert!(first.ends_with("..."));
    }

    #[test]
    fn test_transcript_joins_segments() {
        let segments = vec![
            TranscriptSegment::text("intro"),
            TranscriptSegment::text("uses Figma and VSCode"),
        ];
        assert_eq!(
            transcript_text(&segments, &PromptLimits::default()),
            "intro uses Figma and VSCode"
        );
    }

    #[test]
    fn test_info_prompt_caps_description() {
        let limits = PromptLimits::default();
        let metadata = NormalizedMetadata {
            title: "Design tour".into(),
            description: "d".repeat(1000),
            ..Default::default()
        };
        let prompt = info_prompt(&metadata, &["design".into()], "uses Figma", &limits);

        assert!(prompt.contains("Video: Design tour"));
        assert!(prompt.contains(&format!("Description excerpt: {}...\n", "d".repeat(300))));
        assert!(!prompt.contains(&"d".repeat(301)));
        assert!(prompt.contains(r#"not already in: ["design"]"#));
        assert!(prompt.contains("uses Figma"));
    }

    #[test]
    fn test_summary_prompt_lists_processes() {
        let mut process = Process::named("Wireframing");
        process.steps = vec!["sketch".into()];
        let prompt = summary_prompt(
            &NormalizedMetadata::default(),
            &[process],
            "",
            &PromptLimits::default(),
        );
        assert!(prompt.contains("- Wireframing\n  * sketch\n"));
    }
}
