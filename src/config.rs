use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::richtext::structured_document::StyleTag;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "Redraft";
const APPLICATION: &str = "redraft";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bracketed reference markers such as `[Extracted from policy.pdf]`
pub const DEFAULT_REFERENCE_PATTERN: &str = r"\[[^\]]*Extracted[^\]]*\]";
/// "Extracted from: [a], [b]." trailers appended to generated answers
pub const DEFAULT_TRAILER_PATTERN: &str = r"\s*Extracted from:.*?(?:\[.*?\](?:,\s*)?)+[.\n]?";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag marking suggested text until it is accepted
    pub pending_tag: StyleTag,
    /// Tag given to reference markers
    pub reference_tag: StyleTag,
    pub reference_pattern: String,
    pub reference_trailer_pattern: String,
    /// Default `tracing` filter when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pending_tag: StyleTag::pending(),
            reference_tag: StyleTag::bold(),
            reference_pattern: DEFAULT_REFERENCE_PATTERN.to_string(),
            reference_trailer_pattern: DEFAULT_TRAILER_PATTERN.to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from the default location. A missing file gives the defaults,
    /// a broken one is reported and also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Config::default();
        };
        if !path.exists() {
            return Config::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Failed to load config: {err}");
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn reference_regex(&self) -> Result<Regex, ConfigError> {
        compile(&self.reference_pattern)
    }

    pub fn trailer_regex(&self) -> Result<Regex, ConfigError> {
        compile(&self.reference_trailer_pattern)
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}
