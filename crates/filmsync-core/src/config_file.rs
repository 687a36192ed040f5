use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MatchConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub matching: Option<MatchingConfig>,
    pub catalog: Option<CatalogConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub max_year_deviation: Option<u32>,
    pub fuzzy_threshold: Option<f64>,
    pub pad_width: Option<usize>,
    pub strict_length: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// List ids to sync when none are given on the command line.
    pub lists: Option<Vec<String>>,
    pub cache_path: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory playlists are written to.
    pub directory: Option<String>,
}

impl ConfigFile {
    /// Matching knobs with unset values falling back to [`MatchConfig::default`].
    pub fn match_config(&self) -> MatchConfig {
        let defaults = MatchConfig::default();
        let Some(m) = self.matching.as_ref() else {
            return defaults;
        };
        MatchConfig {
            max_year_deviation: m.max_year_deviation.unwrap_or(defaults.max_year_deviation),
            fuzzy_threshold: m.fuzzy_threshold.unwrap_or(defaults.fuzzy_threshold),
            pad_width: m.pad_width.unwrap_or(defaults.pad_width),
            strict_length: m.strict_length.unwrap_or(defaults.strict_length),
        }
    }

    pub fn lists(&self) -> Vec<String> {
        self.catalog
            .as_ref()
            .and_then(|c| c.lists.clone())
            .unwrap_or_default()
    }

    pub fn cache_path(&self) -> Option<PathBuf> {
        self.catalog
            .as_ref()
            .and_then(|c| c.cache_path.as_ref())
            .map(PathBuf::from)
    }

    pub fn request_timeout_secs(&self) -> Option<u64> {
        self.catalog.as_ref().and_then(|c| c.request_timeout_secs)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output
            .as_ref()
            .and_then(|o| o.directory.as_ref())
            .map(PathBuf::from)
    }
}

/// Platform config directory path: `<config_dir>/filmsync/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("filmsync").join("config.toml"))
}

/// Default location of the catalog cache: `<cache_dir>/filmsync/listcache.db`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("filmsync").join("listcache.db"))
}

/// Load config by cascading CWD `.filmsync.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".filmsync.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match load_explicit(path) {
        Ok(config) => Some(config),
        Err(ConfigError::Read { .. }) => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            None
        }
    }
}

/// Load a config the user asked for by name; missing or malformed files are errors.
pub fn load_explicit(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        matching: Some(MatchingConfig {
            max_year_deviation: overlay
                .matching
                .as_ref()
                .and_then(|m| m.max_year_deviation)
                .or_else(|| base.matching.as_ref().and_then(|m| m.max_year_deviation)),
            fuzzy_threshold: overlay
                .matching
                .as_ref()
                .and_then(|m| m.fuzzy_threshold)
                .or_else(|| base.matching.as_ref().and_then(|m| m.fuzzy_threshold)),
            pad_width: overlay
                .matching
                .as_ref()
                .and_then(|m| m.pad_width)
                .or_else(|| base.matching.as_ref().and_then(|m| m.pad_width)),
            strict_length: overlay
                .matching
                .as_ref()
                .and_then(|m| m.strict_length)
                .or_else(|| base.matching.as_ref().and_then(|m| m.strict_length)),
        }),
        catalog: Some(CatalogConfig {
            lists: overlay
                .catalog
                .as_ref()
                .and_then(|c| c.lists.clone())
                .or_else(|| base.catalog.as_ref().and_then(|c| c.lists.clone())),
            cache_path: overlay
                .catalog
                .as_ref()
                .and_then(|c| c.cache_path.clone())
                .or_else(|| base.catalog.as_ref().and_then(|c| c.cache_path.clone())),
            request_timeout_secs: overlay
                .catalog
                .as_ref()
                .and_then(|c| c.request_timeout_secs)
                .or_else(|| base.catalog.as_ref().and_then(|c| c.request_timeout_secs)),
        }),
        output: Some(OutputConfig {
            directory: overlay
                .output
                .as_ref()
                .and_then(|o| o.directory.clone())
                .or_else(|| base.output.as_ref().and_then(|o| o.directory.clone())),
        }),
    }
}
