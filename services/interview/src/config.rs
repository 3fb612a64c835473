//! Application Configuration Module
//!
//! Centralizes the configuration for the interview service. Settings are
//! loaded from environment variables once at startup; a missing credential
//! is fatal before any session can begin.

use std::env;
use tracing::Level;

// --- Application Constants ---

/// The size of each audio chunk taken from the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// The latency of the playback ring buffer in milliseconds.
pub const OUTPUT_LATENCY_MS: usize = 1000;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub chat_model: String,
    pub language_code: String,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `GEMINI_API_KEY`: Your API key. Required; shared by the chat,
    ///     text-to-speech and speech-to-text services.
    /// *   `CHAT_MODEL`: (Optional) The generation model. Defaults to "gemini-2.0-flash".
    /// *   `SPEECH_LANGUAGE`: (Optional) BCP-47 language code for speech. Defaults to "en-US".
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if not present.
        dotenvy::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY must be set".to_string()))?;

        let chat_model = env::var("CHAT_MODEL")
            .unwrap_or_else(|_| interview_core::gemini::DEFAULT_CHAT_MODEL.to_string());
        let language_code = env::var("SPEECH_LANGUAGE").unwrap_or_else(|_| "en-US".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            gemini_api_key,
            chat_model,
            language_code,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global, so tests that mutate them
    // must not run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in ["GEMINI_API_KEY", "CHAT_MODEL", "SPEECH_LANGUAGE", "RUST_LOG"] {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn missing_api_key_fails_the_same_way_every_time() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();

        for _ in 0..2 {
            match Config::from_env() {
                Err(ConfigError::MissingVar(message)) => {
                    assert!(message.contains("GEMINI_API_KEY"));
                }
                other => panic!("Expected MissingVar, got {other:?}"),
            }
        }
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();
        unsafe { env::set_var("GEMINI_API_KEY", "test-key") };

        let config = Config::from_env().unwrap();
        assert_eq!(config.gemini_api_key, "test-key");
        assert_eq!(config.chat_model, interview_core::gemini::DEFAULT_CHAT_MODEL);
        assert_eq!(config.language_code, "en-US");
        assert_eq!(config.log_level, Level::INFO);

        clear_vars();
    }

    #[test]
    fn an_unparsable_log_level_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        clear_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "test-key");
            env::set_var("RUST_LOG", "loud");
        }

        match Config::from_env() {
            Err(ConfigError::InvalidLogLevel(value)) => assert_eq!(value, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }

        clear_vars();
    }
}
