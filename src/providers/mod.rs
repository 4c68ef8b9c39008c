//! Provider-agnostic LLM dispatch (`spec.md` §4.B).
//!
//! [`invoke`] is the single entry point: it case-folds `platform`, looks up
//! the matching adapter, and returns the trimmed response text. Unknown
//! platforms and missing API keys are per-request fatal errors handled by
//! the caller (`spec.md` §7).

mod anthropic;
mod error;
mod gemini;
mod openai_compatible;
mod qwen;

pub use error::ProviderError;
use openai_compatible::{AuthStyle, OpenAiStyleConfig};
use reqwest::Client;

fn openai_style_configs() -> &'static [OpenAiStyleConfig] {
    const CONFIGS: &[OpenAiStyleConfig] = &[
        OpenAiStyleConfig {
            platform: "openai",
            endpoint: "https://api.openai.com/v1/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "OPENAI_API_KEY",
            send_max_tokens: false,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: true,
        },
        OpenAiStyleConfig {
            platform: "grok",
            endpoint: "https://api.x.ai/v1/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "GROK_API_KEY",
            send_max_tokens: true,
            explicit_stream_false: true,
            retry_without_temperature_on_unsupported_value: false,
        },
        OpenAiStyleConfig {
            platform: "groq",
            endpoint: "https://api.groq.com/openai/v1/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "GROQ_API_KEY",
            send_max_tokens: true,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: false,
        },
        OpenAiStyleConfig {
            platform: "deepseek",
            endpoint: "https://api.deepseek.com/v1/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "DEEPSEEK_API_KEY",
            send_max_tokens: true,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: false,
        },
        OpenAiStyleConfig {
            platform: "kimi",
            endpoint: "https://api.moonshot.cn/v1/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "MOONSHOT_API_KEY",
            send_max_tokens: false,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: false,
        },
        OpenAiStyleConfig {
            platform: "zai",
            endpoint: "https://api.z.ai/api/paas/v4/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "ZAI_API_KEY",
            send_max_tokens: true,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: false,
        },
        OpenAiStyleConfig {
            platform: "perplexity",
            endpoint: "https://api.perplexity.ai/chat/completions",
            auth_style: AuthStyle::Bearer,
            env_key: "PERPLEXITY_API_KEY",
            send_max_tokens: true,
            explicit_stream_false: false,
            retry_without_temperature_on_unsupported_value: false,
        },
    ];
    CONFIGS
}

/// `zhipu` is an alias for `zai`; both dispatch to the same adapter.
fn resolve_openai_style(platform: &str) -> Option<&'static OpenAiStyleConfig> {
    let key = if platform == "zhipu" { "zai" } else { platform };
    openai_style_configs().iter().find(|c| c.platform == key)
}

/// Dispatch `(platform, model, prompt)` to the matching adapter and return
/// its trimmed text response.
pub async fn invoke(
    client: &Client,
    platform: &str,
    model: &str,
    prompt: &str,
) -> Result<String, ProviderError> {
    let platform_key = platform.to_lowercase();

    if let Some(config) = resolve_openai_style(&platform_key) {
        let api_key = std::env::var(config.env_key)
            .map_err(|_| ProviderError::MissingApiKey(config.env_key))?;
        return openai_compatible::invoke(client, config, &api_key, model, prompt).await;
    }

    match platform_key.as_str() {
        "anthropic" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| ProviderError::MissingApiKey("ANTHROPIC_API_KEY"))?;
            anthropic::invoke(client, &api_key, model, prompt).await
        }
        "gemini" => {
            let api_key = std::env::var("GEMINI_API_KEY")
                .map_err(|_| ProviderError::MissingApiKey("GEMINI_API_KEY"))?;
            gemini::invoke(client, &api_key, model, prompt).await
        }
        "qwen" => {
            let api_key = std::env::var("QWEN_API_KEY")
                .map_err(|_| ProviderError::MissingApiKey("QWEN_API_KEY"))?;
            qwen::invoke(client, &api_key, model, prompt).await
        }
        other => Err(ProviderError::UnknownPlatform(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_openai_style_platforms() {
        for name in ["openai", "grok", "groq", "deepseek", "kimi", "zai", "zhipu", "perplexity"] {
            assert!(resolve_openai_style(name).is_some(), "{name} should resolve");
        }
    }

    #[test]
    fn zhipu_aliases_zai() {
        let zai = resolve_openai_style("zai").unwrap();
        let zhipu = resolve_openai_style("zhipu").unwrap();
        assert_eq!(zai.endpoint, zhipu.endpoint);
    }

    #[test]
    fn bespoke_platforms_are_not_openai_style() {
        for name in ["anthropic", "gemini", "qwen"] {
            assert!(resolve_openai_style(name).is_none());
        }
    }

    #[tokio::test]
    async fn unknown_platform_is_an_error() {
        let client = Client::new();
        let err = invoke(&client, "not-a-real-platform", "m", "p").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownPlatform(_)));
    }

    #[allow(unsafe_code)]
    #[tokio::test]
    async fn missing_api_key_is_an_error() {
        // SAFETY: test-only removal of an env var that tests don't rely on elsewhere.
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
        let client = Client::new();
        let err = invoke(&client, "OpenAI", "gpt-4", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey("OPENAI_API_KEY")));
    }
}
