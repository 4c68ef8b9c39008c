//! A single HTTP caller shared by every platform whose wire format is the
//! OpenAI chat-completions shape (`spec.md` §4.B): openai, grok, groq,
//! deepseek, kimi, zai/zhipu, perplexity. Only the endpoint, auth scheme,
//! and a couple of per-platform quirks differ — see [`OpenAiStyleConfig`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::ProviderError;

/// How a platform wants its `Authorization`-equivalent header built.
#[derive(Debug, Clone, Copy)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// Per-platform wiring for the shared OpenAI-compatible caller.
#[derive(Debug, Clone)]
pub struct OpenAiStyleConfig {
    pub platform: &'static str,
    pub endpoint: &'static str,
    pub auth_style: AuthStyle,
    pub env_key: &'static str,
    /// Whether to send `max_tokens` (kimi's API rejects the field).
    pub send_max_tokens: bool,
    /// Whether to send `stream: false` explicitly (grok's compatibility
    /// layer wants it spelled out; the others infer it from its absence).
    pub explicit_stream_false: bool,
    /// Retry once without `temperature` on OpenAI's
    /// `{"error":{"code":"unsupported_value","param":"temperature"}}`.
    pub retry_without_temperature_on_unsupported_value: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorObject>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorObject {
    code: Option<String>,
    param: Option<String>,
}

const MAX_TOKENS: u32 = 4096;

pub async fn invoke(
    client: &Client,
    config: &OpenAiStyleConfig,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String, ProviderError> {
    invoke_with_temperature(client, config, api_key, model, prompt, true).await
}

async fn invoke_with_temperature(
    client: &Client,
    config: &OpenAiStyleConfig,
    api_key: &str,
    model: &str,
    prompt: &str,
    send_temperature: bool,
) -> Result<String, ProviderError> {
    let body = ChatRequest {
        model,
        messages: [ChatMessage { role: "user", content: prompt }],
        temperature: 0.0,
        max_tokens: config.send_max_tokens.then_some(MAX_TOKENS),
        stream: config.explicit_stream_false.then_some(false),
    };

    // Build the request body manually when temperature must be omitted
    // entirely rather than merely set to 0 — some providers treat an
    // explicit `"temperature":0` differently from an absent field.
    let body_value = if send_temperature {
        serde_json::to_value(&body).expect("ChatRequest serializes")
    } else {
        let mut v = serde_json::to_value(&body).expect("ChatRequest serializes");
        if let Some(obj) = v.as_object_mut() {
            obj.remove("temperature");
        }
        v
    };

    let mut request = client.post(config.endpoint).json(&body_value);
    request = match config.auth_style {
        AuthStyle::Bearer => request.bearer_auth(api_key),
    };

    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Http(config.endpoint.to_string(), e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Http(config.endpoint.to_string(), e))?;

    // OpenAI returns the retryable "unsupported_value" error as an HTTP 400,
    // so the body must be inspected before the status short-circuit below —
    // otherwise this retry could never fire.
    if let Ok(parsed) = serde_json::from_str::<ChatResponse>(&text) {
        if let Some(err) = &parsed.error {
            if send_temperature
                && config.retry_without_temperature_on_unsupported_value
                && err.code.as_deref() == Some("unsupported_value")
                && err.param.as_deref() == Some("temperature")
            {
                return Box::pin(invoke_with_temperature(
                    client, config, api_key, model, prompt, false,
                ))
                .await;
            }
        }
    }

    if !status.is_success() {
        return Err(ProviderError::BadStatus(config.platform.to_string(), status, text));
    }

    let parsed: ChatResponse = serde_json::from_str(&text)
        .map_err(|e| ProviderError::Parse(config.platform.to_string(), e))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| ProviderError::EmptyResponse(config.platform.to_string()))
}

/// Build the JSON request body as it would appear for `{}` placeholders —
/// exposed so tests can check the exact shape sent over the wire.
pub fn preview_request_body(model: &str, prompt: &str, send_max_tokens: bool) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
        "temperature": 0,
        "max_tokens": if send_max_tokens { Some(MAX_TOKENS) } else { None },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = preview_request_body("gpt-4", "hi", true);
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["max_tokens"], 4096);
    }

    #[test]
    fn request_body_without_max_tokens() {
        let body = preview_request_body("moonshot-v1", "hi", false);
        assert!(body["max_tokens"].is_null());
    }
}
