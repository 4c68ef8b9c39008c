//! Parses stored prompt config and expands `{{key}}` placeholders, resolving
//! content-addressed values through the [`ContentStore`] (`spec.md` §4.C).

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::store::{ContentStore, StoreError};

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("config blob not found for hash {0}")]
    ConfigMissing(String),
    #[error("malformed 'model: <platform>/<model>' line: {0:?}")]
    ConfigInvalid(String),
    #[error("neither config nor request specify a platform/model")]
    ModelUnspecified,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A config blob split into its optional platform/model override and prompt
/// template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    pub platform: Option<String>,
    pub model: Option<String>,
    pub template: String,
}

/// Parse raw config bytes per `spec.md` §3: an optional first line of the
/// exact form `model: <platform>/<model>`, followed by the template.
pub fn parse_config(bytes: &[u8]) -> Result<ParsedConfig, ResolverError> {
    let text = String::from_utf8_lossy(bytes);

    let Some((first_line, rest)) = text.split_once('\n') else {
        return Ok(parse_single_line(&text)?);
    };

    if let Some(spec) = first_line.strip_prefix("model: ") {
        let (platform, model) = parse_model_line(spec)
            .ok_or_else(|| ResolverError::ConfigInvalid(first_line.to_string()))?;
        return Ok(ParsedConfig {
            platform: Some(platform),
            model: Some(model),
            template: rest.to_string(),
        });
    }

    Ok(ParsedConfig {
        platform: None,
        model: None,
        template: text.into_owned(),
    })
}

/// Handle the degenerate case of a config blob with no newline at all.
fn parse_single_line(text: &str) -> Result<ParsedConfig, ResolverError> {
    if let Some(spec) = text.strip_prefix("model: ") {
        let (platform, model) = parse_model_line(spec)
            .ok_or_else(|| ResolverError::ConfigInvalid(text.to_string()))?;
        return Ok(ParsedConfig {
            platform: Some(platform),
            model: Some(model),
            template: String::new(),
        });
    }
    Ok(ParsedConfig {
        platform: None,
        model: None,
        template: text.to_string(),
    })
}

/// Parse `<platform>/<model>`, trimming whitespace around all three tokens.
/// Both halves must be non-empty or the line is invalid.
fn parse_model_line(spec: &str) -> Option<(String, String)> {
    let spec = spec.trim();
    let (platform, model) = spec.split_once('/')?;
    let platform = platform.trim();
    let model = model.trim();
    if platform.is_empty() || model.is_empty() {
        return None;
    }
    Some((platform.to_string(), model.to_string()))
}

/// Resolve `configHash`/`inputJson` into `(platform, model, prompt)` per
/// `spec.md` §4.C, falling back to `request_platform`/`request_model` when
/// the config does not override them.
pub fn resolve_prompt(
    store: &ContentStore,
    config_hash: &str,
    input_json: &str,
    request_platform: &str,
    request_model: &str,
) -> Result<(String, String, String), ResolverError> {
    let config_bytes = store
        .get(config_hash)?
        .ok_or_else(|| ResolverError::ConfigMissing(config_hash.to_string()))?;
    let config = parse_config(&config_bytes)?;

    let inputs = parse_input(input_json);
    let prompt = substitute(&config.template, &inputs, store);

    let platform = config
        .platform
        .filter(|p| !p.is_empty())
        .or_else(|| non_empty(request_platform))
        .ok_or(ResolverError::ModelUnspecified)?;
    let model = config
        .model
        .filter(|m| !m.is_empty())
        .or_else(|| non_empty(request_model))
        .ok_or(ResolverError::ModelUnspecified)?;

    Ok((platform, model, prompt))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Parse `input_json` into a flat string map. Parse failures are logged and
/// treated as an empty mapping, per `spec.md` §4.C step 3.
fn parse_input(input_json: &str) -> HashMap<String, String> {
    if input_json.is_empty() {
        return HashMap::new();
    }
    match serde_json::from_str::<serde_json::Value>(input_json) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let s = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, s)
            })
            .collect(),
        Ok(_) | Err(_) => {
            if !input_json.is_empty() {
                warn!(%input_json, "failed to parse request input as a JSON object; proceeding with no substitutions");
            }
            HashMap::new()
        }
    }
}

/// Replace every `{{ key }}` occurrence (whitespace around `key` ignored) in
/// `template` with either the stored content behind `value` (if `value`
/// looks like a hash present in the store) or `value` itself.
fn substitute(template: &str, inputs: &HashMap<String, String>, store: &ContentStore) -> String {
    let mut result = template.to_string();
    for (key, value) in inputs {
        let replacement = if crate::store::is_hash(value) {
            match store.get(value) {
                Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                _ => value.clone(),
            }
        } else {
            value.clone()
        };
        result = replace_placeholder(&result, key, &replacement);
    }
    result
}

/// Replace all occurrences of `{{\s*key\s*}}` with `replacement`.
fn replace_placeholder(haystack: &str, key: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    loop {
        let Some(open) = rest.find("{{") else {
            out.push_str(rest);
            break;
        };
        let Some(close_rel) = rest[open..].find("}}") else {
            out.push_str(rest);
            break;
        };
        let close = open + close_rel;
        let inner = rest[open + 2..close].trim();
        if inner == key {
            out.push_str(&rest[..open]);
            out.push_str(replacement);
        } else {
            out.push_str(&rest[..close + 2]);
        }
        rest = &rest[close + 2..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_model_line_and_template() {
        let config = parse_config(b"model: openai/gpt-4\nHello {{name}}").unwrap();
        assert_eq!(config.platform.as_deref(), Some("openai"));
        assert_eq!(config.model.as_deref(), Some("gpt-4"));
        assert_eq!(config.template, "Hello {{name}}");
    }

    #[test]
    fn trims_whitespace_around_tokens() {
        let config = parse_config(b"model:  anthropic  /  claude-3  \nTemplate").unwrap();
        assert_eq!(config.platform.as_deref(), Some("anthropic"));
        assert_eq!(config.model.as_deref(), Some("claude-3"));
    }

    #[test]
    fn no_model_line_is_whole_template() {
        let config = parse_config(b"Just a template\nwith two lines").unwrap();
        assert_eq!(config.platform, None);
        assert_eq!(config.model, None);
        assert_eq!(config.template, "Just a template\nwith two lines");
    }

    #[test]
    fn malformed_model_line_is_invalid() {
        let err = parse_config(b"model: onlyplatform\nTemplate").unwrap_err();
        assert!(matches!(err, ResolverError::ConfigInvalid(_)));
    }

    #[test]
    fn empty_model_half_is_invalid() {
        let err = parse_config(b"model: /nomodel\nTemplate").unwrap_err();
        assert!(matches!(err, ResolverError::ConfigInvalid(_)));
    }

    #[test]
    fn missing_space_after_colon_is_not_a_model_line() {
        let config = parse_config(b"model:foo/bar\nTemplate").unwrap();
        assert_eq!(config.platform, None);
        assert_eq!(config.model, None);
        assert_eq!(config.template, "model:foo/bar\nTemplate");
    }

    #[test]
    fn substitution_ignores_brace_whitespace() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let mut inputs = HashMap::new();
        inputs.insert("key".to_string(), "value".to_string());

        for template in ["{{key}}", "{{ key }}", "{{   key   }}"] {
            assert_eq!(substitute(template, &inputs, &store), "value");
        }
    }

    #[test]
    fn substitution_resolves_content_addressed_input() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.put(b"ping").unwrap();
        let mut inputs = HashMap::new();
        inputs.insert("q".to_string(), hash);

        assert_eq!(substitute("Q: {{q}}", &inputs, &store), "Q: ping");
    }

    #[test]
    fn substitution_falls_back_to_raw_value_for_unknown_hash() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let unknown_hash = "a".repeat(64);
        let mut inputs = HashMap::new();
        inputs.insert("q".to_string(), unknown_hash.clone());

        assert_eq!(substitute("Q: {{q}}", &inputs, &store), format!("Q: {unknown_hash}"));
    }

    #[test]
    fn resolve_prompt_end_to_end() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config_hash = store.put(b"model: openai/gpt-4\nQ: {{q}}").unwrap();
        let input_hash = store.put(b"ping").unwrap();
        let input_json = serde_json::json!({ "q": input_hash }).to_string();

        let (platform, model, prompt) =
            resolve_prompt(&store, &config_hash, &input_json, "", "").unwrap();
        assert_eq!(platform, "openai");
        assert_eq!(model, "gpt-4");
        assert_eq!(prompt, "Q: ping");
    }

    #[test]
    fn resolve_prompt_falls_back_to_request_platform_model() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config_hash = store.put(b"Just a template").unwrap();

        let (platform, model, _) =
            resolve_prompt(&store, &config_hash, "", "anthropic", "claude-3").unwrap();
        assert_eq!(platform, "anthropic");
        assert_eq!(model, "claude-3");
    }

    #[test]
    fn resolve_prompt_missing_config_errors() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let missing_hash = "b".repeat(64);
        let err = resolve_prompt(&store, &missing_hash, "", "", "").unwrap_err();
        assert!(matches!(err, ResolverError::ConfigMissing(_)));
    }

    #[test]
    fn resolve_prompt_unspecified_model_errors() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config_hash = store.put(b"Template with no model line").unwrap();
        let err = resolve_prompt(&store, &config_hash, "", "", "").unwrap_err();
        assert!(matches!(err, ResolverError::ModelUnspecified));
    }

    #[test]
    fn invalid_input_json_falls_back_to_no_substitutions() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let config_hash = store.put(b"model: openai/gpt-4\nQ: {{q}}").unwrap();

        let (_, _, prompt) =
            resolve_prompt(&store, &config_hash, "not json", "", "").unwrap();
        assert_eq!(prompt, "Q: {{q}}");
    }
}
