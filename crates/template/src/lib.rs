//! Template evaluator for Scribeact actions.
//!
//! Supports a deliberately minimal dialect — variable substitution plus
//! single-argument pipeline functions, no control flow:
//!
//! ```text
//! Summary for {{.Filename}} ({{.WordCount}} words)
//! {{.Transcript | summarize}}
//! Generated {{.Date | timestamp}}
//! ```
//!
//! Grammar (informal):
//! ```text
//! template    = (TEXT | placeholder)*
//! placeholder = "{{" "." FIELD [ "|" FUNCTION ] "}}"
//! FIELD       = Transcript | Filename | Date | Time | FileType | Duration
//!             | WordCount | CharCount | ProcessingTime
//! ```
//!
//! Authors edit templates interactively, so lookups are forgiving: an
//! unknown field renders as the empty string and an unknown function passes
//! the raw value through. Only broken *syntax* (an unterminated or malformed
//! placeholder) is an error.
//!
//! Rendering is pure and deterministic for a fixed `(template, context)`
//! pair, except for the `Date`/`Time` fields and the `timestamp`/`date`/
//! `time` functions, which read the clock by definition.

mod functions;

pub use functions::apply_function;

use chrono::Local;
use scribeact_core::{ActionContext, TemplateError};

/// Render a template against a context.
///
/// Returns an error only for malformed placeholder syntax; see the module
/// docs for the lookup policy.
pub fn render(template: &str, ctx: &ActionContext) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find("{{") {
        output.push_str(&rest[..open]);

        let placeholder_start = offset + open;
        let after_open = &rest[open + 2..];
        let close = after_open
            .find("}}")
            .ok_or(TemplateError::Unterminated {
                position: placeholder_start,
            })?;

        let inner = after_open[..close].trim();
        output.push_str(&expand(inner, placeholder_start, ctx)?);

        let consumed = open + 2 + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Expand the inside of one `{{ ... }}` placeholder.
fn expand(inner: &str, position: usize, ctx: &ActionContext) -> Result<String, TemplateError> {
    if inner.is_empty() {
        return Err(TemplateError::Malformed {
            position,
            reason: "empty placeholder".into(),
        });
    }

    let Some(body) = inner.strip_prefix('.') else {
        return Err(TemplateError::Malformed {
            position,
            reason: format!("expected a field reference like {{{{.Transcript}}}}, got `{inner}`"),
        });
    };

    let (field, function) = match body.split_once('|') {
        Some((field, function)) => (field.trim(), Some(function.trim())),
        None => (body.trim(), None),
    };

    let value = resolve_field(field, ctx);

    Ok(match function {
        // Unknown functions pass the raw value through.
        Some(name) => apply_function(name, &value).unwrap_or(value),
        None => value,
    })
}

/// Look up a named context field. Unknown names resolve to the empty string.
fn resolve_field(name: &str, ctx: &ActionContext) -> String {
    match name {
        "Transcript" => ctx.transcript.clone(),
        "Filename" => ctx.filename.clone(),
        "FileType" => ctx.file_type.clone(),
        "WordCount" => ctx.word_count.to_string(),
        "CharCount" => ctx.char_count.to_string(),
        "Duration" => format_duration(ctx.duration_seconds),
        "ProcessingTime" => format!("{:.1}s", ctx.processing_time_seconds),
        "Date" => Local::now().format("%Y-%m-%d").to_string(),
        "Time" => Local::now().format("%H:%M:%S").to_string(),
        _ => String::new(),
    }
}

/// Format a duration in seconds as `M:SS`, or `H:MM:SS` past an hour.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
