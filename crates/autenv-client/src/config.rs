use crate::ClientError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    30
}

/// Transport configuration for [`crate::HttpAlmClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    /// Global request timeout. A hung remote call fails the run instead of
    /// blocking the build indefinitely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            timeout_secs: default_timeout_secs(),
        }
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ClientError::Serialization(format!("invalid client config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");

        let config = ClientConfig::new("http://alm.example.com:8080/qcbin").with_timeout_secs(5);
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.url, "http://alm.example.com:8080/qcbin");
        assert_eq!(loaded.timeout_secs, 5);
    }

    #[test]
    fn config_strips_trailing_slash() {
        let config = ClientConfig::new("http://example.com/");
        assert_eq!(config.url, "http://example.com");
    }

    #[test]
    fn timeout_defaults_when_absent() {
        let loaded: ClientConfig = serde_json::from_str(r#"{"url":"http://x"}"#).unwrap();
        assert_eq!(loaded.timeout_secs, 30);
    }
}
