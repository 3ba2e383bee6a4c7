use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct StationConfig {
    /// Scheme, host and port of the station, e.g. `https://nas.local:5001`.
    pub url: String,
    pub username: String,
    #[serde(deserialize_with = "from_file_const_or_env")]
    pub password: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_verify_ssl() -> bool {
    true
}

/// Reads `file:<path>` and `env:<VAR>` values indirectly; anything else is taken literally.
pub fn from_file_const_or_env<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    if let Some(s) = s.strip_prefix("file:") {
        std::fs::read_to_string(s)
            .map(|contents| contents.trim_end().to_string())
            .map_err(serde::de::Error::custom)
    } else if let Some(s) = s.strip_prefix("env:") {
        std::env::var(s).map_err(|e| {
            serde::de::Error::custom(format!("Environment variable '{s}' not found: {e}"))
        })
    } else {
        Ok(s)
    }
}
