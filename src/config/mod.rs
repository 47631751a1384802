use anyhow::{anyhow, Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::catalog::omdb::DEFAULT_OMDB_URL;
use crate::catalog::tvmaze::DEFAULT_TVMAZE_URL;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Importer configuration, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tv_root: PathBuf,
    pub documentary_root: PathBuf,
    pub movie_root: PathBuf,
    pub remux_tool: String,
    pub fallback_remux_tool: String,
    /// Candidates shown per source, and the series search limit.
    pub visible_results: usize,
    pub omdb_api_key: Option<String>,
    pub tvmaze_url: String,
    pub omdb_url: String,
    /// Drop characters that SMB shares and FAT filesystems reject.
    pub strip_reserved_characters: bool,
    pub library_ignore: Vec<String>,
    pub disable_source_after_remux: bool,
}

impl Config {
    /// Read the configuration file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        if let Ok(key) = env::var("OMDB_API_KEY") {
            debug!("Using OMDb API key from environment");
            config.omdb_api_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.visible_results == 0 {
            return Err(anyhow!("visible_results must be at least 1"));
        }

        for (name, root) in [
            ("tv_root", &self.tv_root),
            ("documentary_root", &self.documentary_root),
            ("movie_root", &self.movie_root),
        ] {
            if root.as_os_str().is_empty() {
                return Err(anyhow!("{} must be set", name));
            }
        }

        if self.remux_tool.is_empty() || self.fallback_remux_tool.is_empty() {
            return Err(anyhow!("remux tools must not be empty"));
        }

        Ok(())
    }

    /// Compiled `library_ignore` patterns. Invalid patterns are skipped.
    pub fn ignore_patterns(&self) -> Vec<Pattern> {
        self.library_ignore
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("⚠️ Invalid ignore pattern '{}': {}", p, e);
                    None
                }
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tv_root: PathBuf::new(),
            documentary_root: PathBuf::new(),
            movie_root: PathBuf::new(),
            remux_tool: "ffmpeg".to_string(),
            fallback_remux_tool: "ffmpeg".to_string(),
            visible_results: 5,
            omdb_api_key: None,
            tvmaze_url: DEFAULT_TVMAZE_URL.to_string(),
            omdb_url: DEFAULT_OMDB_URL.to_string(),
            strip_reserved_characters: false,
            library_ignore: vec!["@eaDir".to_string(), "#recycle".to_string(), ".*".to_string()],
            disable_source_after_remux: false,
        }
    }
}
