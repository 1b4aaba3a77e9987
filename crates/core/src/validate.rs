//! Action definition validation.
//!
//! `validate` is a pure function from a draft to a (possibly empty) list of
//! human-readable violations. It never panics and never short-circuits: the
//! caller gets every problem at once, which is what an interactive editor
//! needs. Limits and the model allow-list come from [`ValidationLimits`]
//! rather than process-wide constants, so engines with different policies
//! can coexist.

use crate::action::ActionDraft;

/// Field length bounds and the model allow-list.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub max_name_len: usize,
    pub max_description_len: usize,
    pub max_template_len: usize,
    pub max_prompt_len: usize,
    /// Upper bound for `maxTokens`; 0 is always allowed ("use default").
    pub max_tokens_ceiling: u32,
    /// Models a remote-completion action may request. An empty `model`
    /// field always passes (it means "use the configured default").
    pub allowed_models: Vec<String>,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            max_description_len: 500,
            max_template_len: 10_000,
            max_prompt_len: 5_000,
            max_tokens_ceiling: 4_000,
            allowed_models: vec![
                "gpt-3.5-turbo".into(),
                "gpt-3.5-turbo-16k".into(),
                "gpt-4".into(),
                "gpt-4-turbo".into(),
                "gpt-4o".into(),
                "gpt-4o-mini".into(),
            ],
        }
    }
}

/// Validate a user-authored draft. Returns all violations found.
pub fn validate(draft: &ActionDraft, limits: &ValidationLimits) -> Vec<String> {
    let mut violations = Vec::new();

    match &draft.name {
        Some(name) if !name.trim().is_empty() => {
            if name.chars().count() > limits.max_name_len {
                violations.push(format!(
                    "name too long (max {} characters)",
                    limits.max_name_len
                ));
            }
        }
        _ => violations.push("name is required".into()),
    }

    if let Some(description) = &draft.description {
        if description.chars().count() > limits.max_description_len {
            violations.push(format!(
                "description too long (max {} characters)",
                limits.max_description_len
            ));
        }
    }

    match draft.kind.as_deref() {
        Some("template") => validate_template_fields(draft, limits, &mut violations),
        Some("remote-completion") => validate_remote_fields(draft, limits, &mut violations),
        Some(other) => violations.push(format!("invalid action type: {other}")),
        None => violations.push("invalid action type: missing kind".into()),
    }

    violations
}

fn validate_template_fields(
    draft: &ActionDraft,
    limits: &ValidationLimits,
    violations: &mut Vec<String>,
) {
    match &draft.template {
        Some(template) if !template.trim().is_empty() => {
            if template.chars().count() > limits.max_template_len {
                violations.push(format!(
                    "template too long (max {} characters)",
                    limits.max_template_len
                ));
            }
        }
        _ => violations.push("template is required".into()),
    }
}

fn validate_remote_fields(
    draft: &ActionDraft,
    limits: &ValidationLimits,
    violations: &mut Vec<String>,
) {
    match &draft.prompt {
        Some(prompt) if !prompt.trim().is_empty() => {
            if prompt.chars().count() > limits.max_prompt_len {
                violations.push(format!(
                    "prompt too long (max {} characters)",
                    limits.max_prompt_len
                ));
            }
        }
        _ => violations.push("prompt is required".into()),
    }

    if let Some(model) = &draft.model {
        if !model.is_empty() && !limits.allowed_models.iter().any(|m| m == model) {
            violations.push(format!("model not allowed: {model}"));
        }
    }

    if let Some(temperature) = draft.temperature {
        // NaN fails the range check too.
        if !(0.0..=2.0).contains(&temperature) {
            violations.push("temperature must be between 0.0 and 2.0".into());
        }
    }

    if let Some(max_tokens) = draft.max_tokens {
        if max_tokens > limits.max_tokens_ceiling {
            violations.push(format!(
                "maxTokens must be between 0 and {}",
                limits.max_tokens_ceiling
            ));
        }
    }
}
