//! Runner configuration: environment variables with hardcoded defaults,
//! optionally overridden by a TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// OpenAI-compatible drafting endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DrafterEndpoint {
    pub url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
}

/// Top-level runner configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    /// Drafting backend; absent means every draft takes the template path
    pub drafter: Option<DrafterEndpoint>,
    /// HTTP relay for outbound sends; absent means console transports
    pub relay_url: Option<String>,
    /// Languages the compliance gate accepts (engine defaults when empty)
    #[serde(default)]
    pub supported_languages: Vec<String>,
}

impl RunnerConfig {
    /// Build from environment variables.
    ///
    /// `OUTREACH_LLM_URL` + `OUTREACH_LLM_MODEL` (+ `OUTREACH_LLM_API_KEY`)
    /// enable the drafting backend; `OUTREACH_RELAY_URL` switches transports
    /// from console to the HTTP relay.
    pub fn from_env() -> Self {
        let drafter = match (
            std::env::var("OUTREACH_LLM_URL"),
            std::env::var("OUTREACH_LLM_MODEL"),
        ) {
            (Ok(url), Ok(model)) => Some(DrafterEndpoint {
                url,
                model,
                api_key: std::env::var("OUTREACH_LLM_API_KEY").unwrap_or_default(),
            }),
            _ => None,
        };

        Self {
            drafter,
            relay_url: std::env::var("OUTREACH_RELAY_URL").ok(),
            supported_languages: Vec::new(),
        }
    }

    /// Load from a TOML file, falling back to the environment for fields the
    /// file omits.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: RunnerConfig =
            toml::from_str(&text).with_context(|| format!("Invalid TOML in {}", path.display()))?;

        let env = Self::from_env();
        if config.drafter.is_none() {
            config.drafter = env.drafter;
        }
        if config.relay_url.is_none() {
            config.relay_url = env.relay_url;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_toml_config_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
relay_url = "http://localhost:9900/relay"
supported_languages = ["en", "no"]

[drafter]
url = "http://localhost:8080/v1"
model = "outreach-drafter-8b"
"#
        )
        .unwrap();

        let config = RunnerConfig::load(file.path()).unwrap();
        let drafter = config.drafter.unwrap();
        assert_eq!(drafter.model, "outreach-drafter-8b");
        assert_eq!(drafter.api_key, "");
        assert_eq!(config.relay_url.as_deref(), Some("http://localhost:9900/relay"));
        assert_eq!(config.supported_languages, vec!["en", "no"]);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "drafter = 42").unwrap();
        assert!(RunnerConfig::load(file.path()).is_err());
    }
}
