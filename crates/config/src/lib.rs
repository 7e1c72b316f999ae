//! Layered configuration loading.
//!
//! Values are assembled from three sources, later ones winning:
//!
//! 1. Built-in defaults,
//! 2. A TOML file (`~/.config/inkfeed/inkfeed.toml` by default),
//! 3. `INKFEED_*` environment variables, with `__` separating sections,
//!    e.g. `INKFEED_SERVER__API_TOKEN` sets `server.api_token`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const ENV_PREFIX: &str = "INKFEED_";
const CONFIG_FILE: &str = "inkfeed.toml";

/// Everything inkfeed reads at startup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub download: DownloadConfig,
}

/// Connection details for the aggregation server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL of the server, including any reverse-proxy prefix.
    pub url: String,
    /// Static API token generated in the server's settings page.
    pub api_token: String,
    /// Whole-request timeout for API calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { url: String::new(), api_token: String::new(), timeout_secs: 30 }
    }
}

/// Behaviour of the offline download pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Directory holding downloaded entries. Platform data directory
    /// when unset.
    pub root: Option<PathBuf>,
    /// Fetch images referenced by entry content and embed them locally.
    pub include_images: bool,
    /// Reduce pages to their main content container before rendering.
    pub extract_content: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { root: None, include_images: true, extract_content: false }
    }
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error when a source fails to parse or when the merged
    /// result does not pass [`Config::validate`].
    pub fn load() -> Result<Self> {
        let file = default_config_file();
        Self::from_figment(Self::figment(file.as_deref()))
    }

    /// Load configuration with an explicit file instead of the default path.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_figment(Self::figment(Some(path)))
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            debug!(file = %file.display(), "reading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside a download.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(self.server.url.trim()).or_raise(|| ErrorKind::Invalid {
            field: "server.url",
            value: self.server.url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::Invalid { field: "server.url", value: self.server.url.clone() });
        }
        if self.server.api_token.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid { field: "server.api_token", value: "(empty)".to_string() });
        }
        if self.server.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid { field: "server.timeout_secs", value: "0".to_string() });
        }
        if let Some(root) = &self.download.root
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid {
                field: "download.root",
                value: root.display().to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the library root directory. Does not create it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NoProjectDirs`] when no root is configured and
    /// the platform has no data directory to fall back to.
    pub fn download_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.download.root {
            return Ok(root.clone());
        }
        let dirs = project_dirs().ok_or_raise(|| ErrorKind::NoProjectDirs)?;
        Ok(dirs.data_dir().join("entries"))
    }
}

/// Default configuration file path, when the platform has one.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "inkfeed")
}
