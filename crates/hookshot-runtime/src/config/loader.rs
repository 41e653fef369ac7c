//! Layered configuration loading.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. [`HookshotConfig::default`]
//! 2. values handed to [`ConfigLoader::merge`]
//! 3. the profile file, e.g. `hookshot.production.toml`
//! 4. the base file, `hookshot.toml`
//! 5. `HOOKSHOT_*` environment variables
//!
//! Files are looked up in the working directory, then in
//! `<user config dir>/hookshot`, unless search paths are given. Which file
//! formats are read depends on the `toml-config` (default) and `yaml-config`
//! features.
//!
//! Nested keys are separated by `__` in variable names:
//! `HOOKSHOT_LOGGING__LEVEL=debug` sets `logging.level`, and
//! `HOOKSHOT_EVENTS__COLLECT_LISTENERS=true` sets `events.collect_listeners`.
//! `HOOKSHOT_PROFILE` picks the profile.
//!
//! ```rust,ignore
//! use hookshot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("./config")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::HookshotConfig;

const ENV_PREFIX: &str = "HOOKSHOT_";

/// Base file names, in lookup order.
const BASE_FILES: &[&str] = &["hookshot.toml", "config.toml", "hookshot.yaml", "hookshot.yml"];

/// Selects the profile file merged under the base file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    /// Any other name, lowercased.
    Custom(String),
}

impl Profile {
    /// The name used in profile file names.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting the `dev` and `prod` short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "production" | "prod" => Self::Production,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Reads `HOOKSHOT_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        match std::env::var("HOOKSHOT_PROFILE") {
            Ok(name) => Self::parse(&name),
            Err(_) => Self::default(),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration file format enabled by a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// The format of `path`, by extension, if it is enabled.
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str())? {
            #[cfg(feature = "toml-config")]
            "toml" => Some(Self::Toml),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    #[allow(unused_variables)]
    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// Builds a [`HookshotConfig`] from defaults, files and the environment.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader searching the default locations, with the profile
    /// from `HOOKSHOT_PROFILE`.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            read_env: true,
        }
    }

    /// Overrides the profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Searches `path` for configuration files. Replaces the default
    /// locations; may be given several times.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_owned());
        self
    }

    /// Reads exactly this file instead of searching. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_owned());
        self
    }

    /// Applies `HOOKSHOT_*` variables (the default).
    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    /// Ignores the environment.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Merges configuration values programmatically, below files and the
    /// environment.
    pub fn merge(mut self, config: HookshotConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`] when an explicit file is missing, and
    /// [`ConfigError::ParseError`] for unsupported files or values that do not
    /// fit the schema.
    pub fn load(self) -> ConfigResult<HookshotConfig> {
        let profile = self.profile.clone();
        let config: HookshotConfig = self
            .into_figment()?
            .extract()
            .map_err(|e| ConfigError::ParseError(format!("Failed to extract configuration: {e}")))?;

        debug!(
            profile = %profile,
            level = %config.logging.level,
            listener_types = config.events.listeners.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn into_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HookshotConfig::default()))
            .merge(self.overrides.clone());

        figment = match &self.file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                let format = FileFormat::of(path).ok_or_else(|| {
                    ConfigError::ParseError(format!(
                        "Unsupported or disabled configuration file format: {}",
                        path.display()
                    ))
                })?;
                info!(path = %path.display(), "Loading configuration file");
                format.merge_into(figment, path)
            }
            None => self.merge_found_files(figment),
        };

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }
        Ok(figment)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("hookshot")))
            .collect()
    }

    /// Merges the first base file found, preceded by its profile file.
    fn merge_found_files(&self, mut figment: Figment) -> Figment {
        let dirs = self.search_dirs();
        for dir in &dirs {
            for name in BASE_FILES {
                let base = dir.join(name);
                let Some(format) = FileFormat::of(&base) else {
                    continue;
                };
                if !base.exists() {
                    continue;
                }

                if let Some((stem, ext)) = name.rsplit_once('.') {
                    let profiled = dir.join(format!("{stem}.{}.{ext}", self.profile));
                    if profiled.exists() {
                        debug!(path = %profiled.display(), "Loading profile configuration");
                        figment = format.merge_into(figment, &profiled);
                    }
                }
                info!(path = %base.display(), "Loading configuration file");
                return format.merge_into(figment, &base);
            }
        }
        debug!(paths = ?dirs, "No configuration file found, using defaults");
        figment
    }
}

/// Loads the configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<HookshotConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<HookshotConfig> {
    ConfigLoader::new().file(path).load()
}
