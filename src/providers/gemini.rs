use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

const MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub async fn invoke(
    client: &Client,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String, ProviderError> {
    let endpoint = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={api_key}"
    );

    let body = GenerateContentRequest {
        contents: [Content { parts: [Part { text: prompt }] }],
        generation_config: GenerationConfig {
            temperature: 0.0,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    };

    let response = client
        .post(&endpoint)
        .json(&body)
        .send()
        .await
        .map_err(|e| ProviderError::Http(endpoint.clone(), e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Http(endpoint.clone(), e))?;

    if !status.is_success() {
        return Err(ProviderError::BadStatus("gemini".to_string(), status, text));
    }

    let parsed: GenerateContentResponse =
        serde_json::from_str(&text).map_err(|e| ProviderError::Parse("gemini".to_string(), e))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text.trim().to_string())
        .ok_or_else(|| ProviderError::EmptyResponse("gemini".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerateContentRequest {
            contents: [Content { parts: [Part { text: "hi" }] }],
            generation_config: GenerationConfig { temperature: 0.0, max_output_tokens: 4096 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 4096);
    }
}
