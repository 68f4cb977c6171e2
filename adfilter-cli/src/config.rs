use hls_adfilter::AdFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::server::ServerConfig;

const CONFIG_DIR_NAME: &str = "adfilter";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub filter: AdFilterConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from `path`, or from the platform config directory when no path is given.
    ///
    /// A missing file yields the defaults. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (default_config_path()?, false),
        };

        if !path.exists() {
            if explicit {
                return Err(AppError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        config.filter.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Overwrite the configuration file with the defaults.
    pub fn reset(path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default().show()?)?;
        Ok(path)
    }

    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| AppError::Config("could not determine the config directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_adfilter::VariantSelectionPolicy;

    #[test]
    fn reset_then_load_round_trips_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(written, path);

        let config = AppConfig::load(Some(&path)).unwrap();
        assert!(config.filter.enabled);
        assert_eq!(config.filter.scoring.strong_ad_score, 50);
        assert_eq!(config.server.port, ServerConfig::default().port);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[filter]\nmax_removed_ratio = 0.3\n\n[filter.fetch]\nvariant_policy = \"highest_bandwidth\"\n\n[server]\nport = 9000\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.filter.max_removed_ratio, 0.3);
        assert_eq!(
            config.filter.fetch.variant_policy,
            VariantSelectionPolicy::HighestBandwidth
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.filter.scoring.weights.scte35, 70);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[filter]\nmax_removed_ratio = 1.5\n").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(AppError::Filter(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
