use std::str::FromStr;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_PRIMARY_MODEL: &str = "google/gemini-flash-1.5";
const DEFAULT_FALLBACK_MODEL: &str = "z-ai/glm-4.5-air:free";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub llm_base_url: String,
    pub primary_model: String,
    /// `None` when `FALLBACK_MODEL` is set to an empty string.
    pub fallback_model: Option<String>,
    pub llm_temperature: f32,
    pub llm_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub chunk_max_words: usize,
    pub ocr_enabled: bool,
    pub tesseract_cmd: String,
    pub ocr_lang: String,
    pub ocr_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'OPENROUTER_API_KEY' is not set")?;

        let fallback_model = match lookup("FALLBACK_MODEL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => Some(DEFAULT_FALLBACK_MODEL.to_string()),
        };

        let config = Config {
            openrouter_api_key,
            llm_base_url: lookup("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            primary_model: lookup("PRIMARY_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string()),
            fallback_model,
            llm_temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.0)?,
            llm_timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", 120)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            chunk_max_words: parse_or(&lookup, "CHUNK_MAX_WORDS", 500)?,
            ocr_enabled: parse_bool_or(&lookup, "OCR_ENABLED", true)?,
            tesseract_cmd: lookup("TESSERACT_CMD").unwrap_or_else(|| "tesseract".to_string()),
            ocr_lang: lookup("OCR_LANG").unwrap_or_else(|| "eng".to_string()),
            ocr_timeout_secs: parse_or(&lookup, "OCR_TIMEOUT_SECS", 60)?,
            port: parse_or(&lookup, "PORT", 8000)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if !config.llm_temperature.is_finite() {
            bail!("LLM_TEMPERATURE must be a finite number");
        }
        if config.chunk_max_words == 0 {
            bail!("CHUNK_MAX_WORDS must be at least 1");
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{key} must be a boolean, got '{raw}'"),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied_when_only_key_set() {
        let config = Config::from_lookup(lookup_from(&[("OPENROUTER_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.llm_base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.primary_model, "google/gemini-flash-1.5");
        assert_eq!(config.fallback_model.as_deref(), Some("z-ai/glm-4.5-air:free"));
        assert_eq!(config.chunk_max_words, 500);
        assert_eq!(config.port, 8000);
        assert!(config.ocr_enabled);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_empty_fallback_disables_it() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("FALLBACK_MODEL", ""),
        ]))
        .unwrap();
        assert!(config.fallback_model.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("CHUNK_MAX_WORDS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_non_finite_temperature_is_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err = Config::from_lookup(lookup_from(&[
                ("OPENROUTER_API_KEY", "sk-test"),
                ("LLM_TEMPERATURE", raw),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("LLM_TEMPERATURE"), "{raw}");
        }
    }

    #[test]
    fn test_ocr_flag_parsing() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("OCR_ENABLED", "off"),
            ("LLM_BASE_URL", "http://localhost:9999/v1/"),
        ]))
        .unwrap();
        assert!(!config.ocr_enabled);
        assert_eq!(config.llm_base_url, "http://localhost:9999/v1");
    }
}
