//! API keys handed to plugins through their role configuration.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HostError, Result};

/// Environment variable consulted when no secrets file exists.
pub const OPENAI_ENV: &str = "OPENAI_API_KEY";
/// Environment variable consulted when no secrets file exists.
pub const GOOGLE_ENV: &str = "GOOGLE_API_KEY";

/// The two provider keys.  `Debug` never prints their values.
#[derive(Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default, alias = "openaiApiKey", alias = "openai_api_key")]
    pub openai_apikey: String,
    #[serde(default, alias = "googleApiKey", alias = "google_api_key")]
    pub google_apikey: String,
}

impl Secrets {
    pub fn new(openai_apikey: impl Into<String>, google_apikey: impl Into<String>) -> Self {
        Self {
            openai_apikey: openai_apikey.into(),
            google_apikey: google_apikey.into(),
        }
    }

    /// Parse a secrets document such as
    /// `{"openai_apikey": "...", "google_apikey": "..."}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| {
            HostError::Configuration(format!(
                "malformed secrets document {}: {e}",
                path.display()
            ))
        })
    }

    /// Read the keys from the environment, loading a `.env` file first if one
    /// is present.  Fails when neither variable is set.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let openai = std::env::var(OPENAI_ENV).unwrap_or_default();
        let google = std::env::var(GOOGLE_ENV).unwrap_or_default();
        if openai.is_empty() && google.is_empty() {
            return Err(HostError::Configuration(format!(
                "no secrets file and neither {OPENAI_ENV} nor {GOOGLE_ENV} is set"
            )));
        }
        Ok(Self::new(openai, google))
    }

    /// Use the file at `path` if it exists, otherwise the environment.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "secrets file absent, using environment");
            Self::from_env()
        }
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &str) -> &'static str {
            if value.is_empty() { "<unset>" } else { "<redacted>" }
        }
        f.debug_struct("Secrets")
            .field("openai_apikey", &redact(&self.openai_apikey))
            .field("google_apikey", &redact(&self.google_apikey))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_values() {
        let secrets = Secrets::new("sk-live-123", "");
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("sk-live-123"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("<unset>"));
    }

    #[test]
    fn from_file_accepts_snake_and_camel_case() {
        let tmp = tempfile::tempdir().expect("tempdir creation must succeed in tests");
        let snake = tmp.path().join("snake.json");
        std::fs::write(&snake, r#"{"openai_apikey": "o", "google_apikey": "g"}"#).unwrap();
        let camel = tmp.path().join("camel.json");
        std::fs::write(&camel, r#"{"openaiApiKey": "o", "googleApiKey": "g"}"#).unwrap();

        for path in [snake, camel] {
            let secrets = Secrets::from_file(&path).unwrap();
            assert_eq!(secrets.openai_apikey, "o");
            assert_eq!(secrets.google_apikey, "g");
        }
    }

    #[test]
    fn missing_key_defaults_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("secrets.json");
        std::fs::write(&path, r#"{"openai_apikey": "o"}"#).unwrap();
        assert_eq!(Secrets::from_file(&path).unwrap().google_apikey, "");
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("secrets.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            Secrets::from_file(&path),
            Err(HostError::Configuration(_))
        ));
    }

    #[test]
    fn load_prefers_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("secrets.json");
        std::fs::write(&path, r#"{"google_apikey": "from-file"}"#).unwrap();
        assert_eq!(Secrets::load(&path).unwrap().google_apikey, "from-file");
    }
}
