//! Answer generator implementations for PajakGate.
//!
//! All generators implement `pajakgate_core::AnswerGenerator`.
//! [`build_from_config`] turns an [`AppConfig`] into a ready generator.

pub mod gemini;
pub mod instructions;

use std::sync::Arc;
use std::time::Duration;

use pajakgate_config::AppConfig;
use pajakgate_core::answer::AnswerGenerator;
use pajakgate_core::error::ProviderError;

pub use gemini::GeminiProvider;

/// Build the configured answer generator.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is set.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn AnswerGenerator>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "no Gemini API key: set api_key in config.toml or GEMINI_API_KEY".into(),
            )
        })?;

    let mut provider = GeminiProvider::new(api_key, &config.model)
        .with_temperature(config.temperature)
        .with_max_output_tokens(config.max_output_tokens)
        .with_timeout(Duration::from_secs(config.provider.timeout_secs));

    if let Some(url) = &config.provider.api_url {
        provider = provider.with_base_url(url);
    }
    if let Some(instruction) = &config.identity.system_instruction_override {
        provider = provider.with_system_instruction(instruction);
    }

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn blank_api_key_is_not_configured() {
        let config = AppConfig {
            api_key: Some("   ".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());
    }

    #[test]
    fn builds_gemini_from_config() {
        let config = AppConfig {
            api_key: Some("AIza-test".into()),
            ..AppConfig::default()
        };
        let generator = build_from_config(&config).unwrap();
        assert_eq!(generator.name(), "gemini");
    }
}
