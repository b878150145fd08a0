//! Server configuration.
//!
//! Settings are resolved from several layers, each overriding the fields
//! it sets in the one before:
//!
//!   1. built-in defaults
//!   2. the user file `<config dir>/jspantom/config.toml`
//!   3. the workspace file `<root>/.jspantom.toml`
//!   4. the client's `initializationOptions`
//!   5. `workspace/didChangeConfiguration` settings under the `jspantom` key
//!
//! TOML files use snake_case keys; the JSON layers also accept camelCase.
//!
//! ```toml
//! tld_sources = ["~/tlds", "/opt/tomcat/tlds"]
//! minimum_word_length = 2
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::Deserialize;
use thiserror::Error;

/// File name of the per-workspace configuration.
pub const WORKSPACE_CONFIG_FILE: &str = ".jspantom.toml";

/// Key under which editors send our settings.
pub const SETTINGS_SECTION: &str = "jspantom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration settings")]
    Json(#[from] serde_json::Error),
}

/// Effective configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directories searched (recursively) for `*.tld` files.  A leading `~`
    /// is the home directory.
    pub tld_sources: Vec<String>,
    /// Shortest prefix that triggers automatic completion.
    ///
    /// Applies only to requests sent for a trigger character or to refine
    /// an incomplete list.  `Invoked` requests are treated as explicit and
    /// always complete, whatever the prefix length.
    pub minimum_word_length: usize,
    /// How often the active document is rescanned for variables.
    pub variable_scan_interval_ms: u64,
    /// How long a cached include scan is trusted without checking its mtime.
    pub include_recheck_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tld_sources: Vec::new(),
            minimum_word_length: 3,
            variable_scan_interval_ms: 800,
            include_recheck_ms: 400,
        }
    }
}

/// One configuration layer; unset fields leave the lower layer alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    #[serde(alias = "tldSources")]
    pub tld_sources: Option<Vec<String>>,
    #[serde(alias = "minimumWordLength")]
    pub minimum_word_length: Option<usize>,
    #[serde(alias = "variableScanIntervalMs")]
    pub variable_scan_interval_ms: Option<u64>,
    #[serde(alias = "includeRecheckMs")]
    pub include_recheck_ms: Option<u64>,
}

impl ConfigLayer {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a TOML layer.  A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(path, &text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// A layer from `initializationOptions`.  `null` is an empty layer.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(value)?)
    }

    /// A layer from `didChangeConfiguration` settings: the object under
    /// [`SETTINGS_SECTION`], or the settings themselves if that key is absent.
    pub fn from_settings(settings: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::from_json(settings.get(SETTINGS_SECTION).unwrap_or(settings))
    }
}

impl Config {
    /// Overwrite every field `layer` sets.
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(sources) = layer.tld_sources {
            self.tld_sources = sources;
        }
        if let Some(len) = layer.minimum_word_length {
            self.minimum_word_length = len;
        }
        if let Some(ms) = layer.variable_scan_interval_ms {
            self.variable_scan_interval_ms = ms;
        }
        if let Some(ms) = layer.include_recheck_ms {
            self.include_recheck_ms = ms;
        }
    }

    /// `<config dir>/jspantom/config.toml`, if the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        let strategy = etcetera::choose_base_strategy().ok()?;
        Some(strategy.config_dir().join("jspantom").join("config.toml"))
    }

    /// Defaults, then the user file, then the workspace file.  Layers that
    /// fail to load are skipped and their errors returned.
    pub fn load(user_file: Option<&Path>, workspace_root: Option<&Path>) -> (Self, Vec<ConfigError>) {
        let mut config = Self::default();
        let mut errors = Vec::new();

        let workspace_file = workspace_root.map(|root| root.join(WORKSPACE_CONFIG_FILE));
        for path in user_file.into_iter().chain(workspace_file.as_deref()) {
            match ConfigLayer::from_file(path) {
                Ok(layer) => config.apply(layer),
                Err(err) => errors.push(err),
            }
        }
        (config, errors)
    }

    pub fn variable_scan_interval(&self) -> Duration {
        Duration::from_millis(self.variable_scan_interval_ms)
    }

    pub fn include_recheck(&self) -> Duration {
        Duration::from_millis(self.include_recheck_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.tld_sources.is_empty());
        assert_eq!(config.minimum_word_length, 3);
        assert_eq!(config.variable_scan_interval(), Duration::from_millis(800));
        assert_eq!(config.include_recheck(), Duration::from_millis(400));
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let user = tempfile::tempdir().unwrap();
        let user_file = user.path().join("config.toml");
        fs::write(&user_file, "tld_sources = [\"~/tlds\"]\nminimum_word_length = 1\n").unwrap();

        let ws = tempfile::tempdir().unwrap();
        fs::write(ws.path().join(WORKSPACE_CONFIG_FILE), "minimum_word_length = 2\n").unwrap();

        let (mut config, errors) = Config::load(Some(&user_file), Some(ws.path()));
        assert!(errors.is_empty());
        assert_eq!(config.tld_sources, ["~/tlds"]);
        assert_eq!(config.minimum_word_length, 2);

        config.apply(ConfigLayer::from_json(&json!({"tldSources": ["/a"], "includeRecheckMs": 10})).unwrap());
        assert_eq!(config.tld_sources, ["/a"]);
        assert_eq!(config.include_recheck_ms, 10);
        assert_eq!(config.minimum_word_length, 2);
    }

    #[test]
    fn missing_files_are_empty_layers() {
        let dir = tempfile::tempdir().unwrap();
        let (config, errors) = Config::load(Some(&dir.path().join("nope.toml")), Some(dir.path()));
        assert!(errors.is_empty());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn broken_file_is_reported_and_skipped() {
        let ws = tempfile::tempdir().unwrap();
        fs::write(ws.path().join(WORKSPACE_CONFIG_FILE), "minimum_word_length = \"x\"").unwrap();
        let (config, errors) = Config::load(None, Some(ws.path()));
        assert_eq!(config, Config::default());
        assert!(matches!(errors.as_slice(), [ConfigError::Toml { .. }]));
    }

    #[test]
    fn settings_section() {
        let layer = ConfigLayer::from_settings(&json!({"jspantom": {"minimumWordLength": 0}})).unwrap();
        assert_eq!(layer.minimum_word_length, Some(0));
        let layer = ConfigLayer::from_settings(&json!({"minimum_word_length": 5})).unwrap();
        assert_eq!(layer.minimum_word_length, Some(5));
        assert_eq!(ConfigLayer::from_json(&serde_json::Value::Null).unwrap(), ConfigLayer::default());
    }
}
