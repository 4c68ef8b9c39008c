use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub async fn invoke(
    client: &Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String, ProviderError> {
    let body = MessagesRequest {
        model,
        messages: [Message { role: "user", content: prompt }],
        temperature: 0.0,
        max_tokens: MAX_TOKENS,
    };

    let response = client
        .post(ENDPOINT)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::Http(ENDPOINT.to_string(), e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Http(ENDPOINT.to_string(), e))?;

    if !status.is_success() {
        return Err(ProviderError::BadStatus("anthropic".to_string(), status, text));
    }

    let parsed: MessagesResponse =
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse("anthropic".to_string(), e))?;

    parsed
        .content
        .into_iter()
        .next()
        .map(|c| c.text.trim().to_string())
        .ok_or_else(|| ProviderError::EmptyResponse("anthropic".to_string()))
}
