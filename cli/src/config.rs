use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use resolver::{BuildConfig, OutputFormat};

/// Name of the project file looked up in the working directory.
pub const PROJECT_FILE: &str = "spice.toml";

/// Contents of a `spice.toml` project file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub hide_simulations: Option<bool>,
    pub format: Option<String>,
    pub file_title: Option<String>,
    pub simulation_title: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Toml { path: PathBuf, source: toml::de::Error },
    Format(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read '{}': {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => {
                write!(f, "invalid config '{}': {}", path.display(), source)
            }
            ConfigError::Format(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ProjectConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ProjectConfig::parse(&content, path)
    }

    /// Load `path` if given, else `spice.toml` in the working directory if
    /// it exists, else the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => ProjectConfig::load(path),
            None => {
                let default = Path::new(PROJECT_FILE);
                if default.is_file() {
                    ProjectConfig::load(default)
                } else {
                    Ok(ProjectConfig::default())
                }
            }
        }
    }

    pub fn build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::default();
        if let Some(hide) = self.hide_simulations {
            config.hide_simulations = hide;
        }
        if let Some(title) = &self.file_title {
            config.file_title = title.clone();
        }
        if let Some(title) = &self.simulation_title {
            config.simulation_title = title.clone();
        }
        config
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>, ConfigError> {
        self.format
            .as_deref()
            .map(|name| name.parse().map_err(ConfigError::Format))
            .transpose()
    }
}
