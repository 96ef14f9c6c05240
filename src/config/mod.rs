//! Configuration management for `slide-embed.toml`.
//!
//! # Sections
//!
//! | Section   | Purpose                                            |
//! |-----------|----------------------------------------------------|
//! | `[embed]` | Default width, provisional aspect, base URL         |
//! | `[fetch]` | HTTP user agent, timeout, PDF extension list        |
//!
//! # Example
//!
//! ```toml
//! [embed]
//! default_width = 300
//! aspect = [16, 9]
//! base_url = "https://talks.example.com/"
//!
//! [fetch]
//! user_agent = "slide-embed"
//! timeout_secs = 30
//! pdf_extensions = ["pdf"]
//! ```

mod error;
mod util;

pub use error::ConfigError;
use util::find_config_file;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::log;

/// Default config file name, searched upward from the working directory.
pub const CONFIG_FILE: &str = "slide-embed.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing slide-embed.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Absolute path to the loaded config file (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub embed: EmbedSection,

    #[serde(default)]
    pub fetch: FetchSection,
}

/// `[embed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSection {
    /// Width in px when the `width` attribute is absent or invalid.
    pub default_width: u32,

    /// Provisional aspect `[width, height]` used before a slide is measured.
    pub aspect: [u32; 2],

    /// Base URL relative `src` values resolve against (default: cwd).
    pub base_url: Option<String>,
}

impl Default for EmbedSection {
    fn default() -> Self {
        Self {
            default_width: 300,
            aspect: [16, 9],
            base_url: None,
        }
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Extensions that mark an `application/octet-stream` response as PDF.
    pub pdf_extensions: Vec<String>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            user_agent: concat!("slide-embed/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            pdf_extensions: vec!["pdf".to_string()],
        }
    }
}

impl FetchSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EmbedConfig {
    /// Load configuration, searching upward from `cwd` for `name`.
    ///
    /// A missing file yields the defaults.
    pub fn load(cwd: &Path, name: &Path) -> Result<Self, ConfigError> {
        let Some(path) = find_config_file(cwd, name) else {
            crate::debug!("config"; "no {} found, using defaults", name.display());
            return Ok(Self::default());
        };
        Self::from_path(&path)
    }

    /// Load configuration from a file path, warning about unknown fields.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embed.default_width == 0 {
            return Err(ConfigError::Validation(
                "embed.default_width must be greater than 0".into(),
            ));
        }
        if self.embed.aspect.contains(&0) {
            return Err(ConfigError::Validation(
                "embed.aspect terms must be greater than 0".into(),
            ));
        }
        if let Some(base) = &self.embed.base_url {
            Url::parse(base).map_err(|e| {
                ConfigError::Validation(format!("embed.base_url `{base}` is not absolute: {e}"))
            })?;
        }
        if self.fetch.pdf_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "fetch.pdf_extensions must list at least one extension".into(),
            ));
        }
        Ok(())
    }

    /// Base URL for resolving `src`: configured value or `cwd` as a directory URL.
    pub fn base_url(&self, cwd: &Path) -> Result<Url, ConfigError> {
        if let Some(base) = &self.embed.base_url {
            return Url::parse(base)
                .map_err(|e| ConfigError::Validation(format!("embed.base_url: {e}")));
        }
        Url::from_directory_path(cwd).map_err(|()| {
            ConfigError::Validation(format!("`{}` is not an absolute directory", cwd.display()))
        })
    }

    /// Provisional height/width ratio.
    pub fn fallback_aspect(&self) -> f64 {
        let [w, h] = self.embed.aspect;
        f64::from(h) / f64::from(w)
    }

    /// Extensions with any leading dot removed.
    pub fn pdf_extensions(&self) -> Vec<String> {
        self.fetch
            .pdf_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}
