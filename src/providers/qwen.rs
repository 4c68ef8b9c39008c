use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

const ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
const MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Input<'a> {
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Parameters {
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: Input<'a>,
    parameters: Parameters,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: Output,
}

#[derive(Deserialize)]
struct Output {
    #[serde(default)]
    text: String,
}

pub async fn invoke(
    client: &Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String, ProviderError> {
    let body = GenerationRequest {
        model,
        input: Input { messages: [Message { role: "user", content: prompt }] },
        parameters: Parameters { temperature: 0.0, max_tokens: MAX_TOKENS },
    };

    let response = client
        .post(ENDPOINT)
        .bearer_auth(api_key)
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
        return Err(ProviderError::BadStatus("qwen".to_string(), status, text));
    }

    let parsed: GenerationResponse =
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse("qwen".to_string(), e))?;

    if parsed.output.text.is_empty() {
        return Err(ProviderError::EmptyResponse("qwen".to_string()));
    }
    Ok(parsed.output.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerationRequest {
            model: "qwen-max",
            input: Input { messages: [Message { role: "user", content: "hi" }] },
            parameters: Parameters { temperature: 0.0, max_tokens: 4096 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["input"]["messages"][0]["content"], "hi");
        assert_eq!(value["parameters"]["max_tokens"], 4096);
    }
}
