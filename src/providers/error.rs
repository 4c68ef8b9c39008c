use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("http request to {0} failed: {1}")]
    Http(String, reqwest::Error),

    #[error("provider {0} returned status {1}: {2}")]
    BadStatus(String, reqwest::StatusCode, String),

    #[error("failed to parse response from {0}: {1}")]
    Parse(String, serde_json::Error),

    #[error("provider {0} response had no content at the expected path")]
    EmptyResponse(String),
}
