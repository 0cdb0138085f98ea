//! Portal configuration.
//!
//! # Responsibility
//! - Layer an optional TOML file and `LEARNPATH__*` environment overrides.
//! - Resolve relative paths against the config file directory.
//!
//! # Invariants
//! - Every field has a default; an empty source yields a usable config.
//! - A returned config has passed [`PortalConfig::validate`].

use crate::offline::worker::WorkerSettings;
use crate::search::scan::SearchSettings;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys use `__` (`LEARNPATH__CACHE__STATIC_NAME`).
pub const ENV_PREFIX: &str = "LEARNPATH";

pub const DEFAULT_DATABASE_FILE: &str = "data/learnpath.db";
pub const DEFAULT_CACHE_FILE: &str = "data/offline-cache.db";

#[derive(Debug)]
pub enum ConfigError {
    Source(config::ConfigError),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "failed to read configuration: {err}"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(value: config::ConfigError) -> Self {
        Self::Source(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub content_root: PathBuf,
    pub public_root: PathBuf,
    pub structure_file: PathBuf,
    pub glossary_file: PathBuf,
    /// Durable state database (`data/learnpath.db`). `None` keeps state in memory.
    pub database_path: Option<PathBuf>,
    /// Offline cache database (`data/offline-cache.db`). `None` keeps cached
    /// responses in memory.
    pub cache_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub cache: WorkerSettings,
    pub search: SearchSettings,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("public/content"),
            public_root: PathBuf::from("public"),
            structure_file: PathBuf::from("data/structure.json"),
            glossary_file: PathBuf::from("data/glossary.json"),
            database_path: Some(PathBuf::from(DEFAULT_DATABASE_FILE)),
            cache_path: Some(PathBuf::from(DEFAULT_CACHE_FILE)),
            log_level: "info".to_string(),
            log_dir: None,
            cache: WorkerSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl PortalConfig {
    /// Loads configuration from `file` (if any) plus environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("search.axes")
                .with_list_parse_key("cache.static_assets"),
        );

        let mut loaded: Self = builder.build()?.try_deserialize()?;
        if let Some(base) = file.and_then(Path::parent) {
            loaded.resolve_paths(base);
        }
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rebases every relative path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        rebase(&mut self.content_root, base);
        rebase(&mut self.public_root, base);
        rebase(&mut self.structure_file, base);
        rebase(&mut self.glossary_file, base);
        for path in [&mut self.database_path, &mut self.cache_path, &mut self.log_dir]
            .into_iter()
            .flatten()
        {
            rebase(path, base);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = &self.cache;
        if cache.static_name.trim().is_empty() || cache.content_name.trim().is_empty() {
            return Err(ConfigError::Invalid("cache names must not be empty".to_string()));
        }
        if cache.static_name == cache.content_name {
            return Err(ConfigError::Invalid(
                "static and content cache names must differ".to_string(),
            ));
        }
        if !cache.content_prefix.starts_with('/') || !cache.content_prefix.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "content prefix `{}` must start and end with `/`",
                cache.content_prefix
            )));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if path.is_relative() && !base.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}
