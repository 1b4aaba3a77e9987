//! The fixed pipeline-function set.
//!
//! Every function takes the field's rendered value and returns a transformed
//! string. `summarize` and `extractActions` are heuristic text reducers —
//! approximate by design, but deterministic for the same input. `timestamp`,
//! `date`, and `time` ignore their input and read the clock; they are the
//! only non-deterministic functions.

use chrono::Local;

/// How many characters `truncate` keeps before appending an ellipsis.
const TRUNCATE_LEN: usize = 100;

/// How many leading sentences `summarize` keeps.
const SUMMARY_SENTENCES: usize = 3;

/// Apply a named pipeline function. Returns `None` for unknown names so the
/// caller can fall back to the raw value.
pub fn apply_function(name: &str, value: &str) -> Option<String> {
    let out = match name {
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        "title" => title_case(value),
        "trim" => value.trim().to_string(),
        "wordCount" => value.split_whitespace().count().to_string(),
        "charCount" => value.chars().count().to_string(),
        "truncate" => truncate(value),
        "summarize" => summarize(value),
        "extractActions" => extract_actions(value),
        "format" => format_text(value),
        "timestamp" => Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        "date" => Local::now().format("%Y-%m-%d").to_string(),
        "time" => Local::now().format("%H:%M:%S").to_string(),
        _ => return None,
    };
    Some(out)
}

/// Uppercase the first letter of each whitespace-separated word.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= TRUNCATE_LEN {
        return value.to_string();
    }
    let kept: String = value.chars().take(TRUNCATE_LEN).collect();
    format!("{}...", kept.trim_end())
}

/// Keep the first few sentences as a bulleted digest.
fn summarize(value: &str) -> String {
    let bullets: Vec<String> = sentences(value)
        .into_iter()
        .take(SUMMARY_SENTENCES)
        .map(|s| format!("• {s}"))
        .collect();
    bullets.join("\n")
}

/// Pull out sentences that sound like commitments or tasks.
fn extract_actions(value: &str) -> String {
    const MARKERS: &[&str] = &[
        "will ",
        "need to ",
        "needs to ",
        "should ",
        "must ",
        "have to ",
        "todo",
        "action item",
        "follow up",
        "follow-up",
    ];

    let bullets: Vec<String> = sentences(value)
        .into_iter()
        .filter(|s| {
            let lowered = s.to_lowercase();
            MARKERS.iter().any(|m| lowered.contains(m))
        })
        .map(|s| format!("- {s}"))
        .collect();

    if bullets.is_empty() {
        "No action items found.".to_string()
    } else {
        bullets.join("\n")
    }
}

/// Split into sentences on `.`, `!`, `?`, keeping the terminator.
fn sentences(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for c in value.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trailing = current.trim();
    if !trailing.is_empty() {
        out.push(trailing.to_string());
    }
    out
}

/// Normalize whitespace: trim lines, collapse runs of spaces and blank lines.
fn format_text(value: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in value.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(collapsed);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs.join("\n\n")
}
