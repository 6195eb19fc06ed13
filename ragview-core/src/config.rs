use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;

use crate::errors::{ClientResult, ErrorKind};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_GRAPH_PATH: &str = "graph/graph.json";

/// Settings resolved once at startup and fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub graph_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            graph_path: PathBuf::from(DEFAULT_GRAPH_PATH),
        }
    }
}

/// Optional on-disk layer. Every field may be omitted.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_base_url: Option<String>,
    pub graph_path: Option<PathBuf>,
}

impl ConfigFile {
    pub fn from_toml_str(raw: &str) -> ClientResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn read(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

impl ClientConfig {
    /// Layers explicit overrides on top of an optional file on top of defaults.
    pub fn resolve(
        file: Option<ConfigFile>,
        api_base_url: Option<String>,
        graph_path: Option<PathBuf>,
    ) -> ClientResult<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let config = Self {
            api_base_url: api_base_url
                .or(file.api_base_url)
                .unwrap_or(defaults.api_base_url),
            graph_path: graph_path
                .or(file.graph_path)
                .unwrap_or(defaults.graph_path),
        };
        config.validate()
    }

    pub fn validate(self) -> ClientResult<Self> {
        let trimmed = self.api_base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(ErrorKind::InvalidConfig("API base URL is empty".to_string()).into());
        }
        let url = Url::parse(&trimmed).map_err(|err| {
            ErrorKind::InvalidConfig(format!("API base URL {trimmed:?} is invalid: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ErrorKind::InvalidConfig(format!(
                "API base URL must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }
        if self.graph_path.as_os_str().is_empty() {
            return Err(ErrorKind::InvalidConfig("graph path is empty".to_string()).into());
        }
        Ok(Self {
            api_base_url: trimmed,
            graph_path: self.graph_path,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}
