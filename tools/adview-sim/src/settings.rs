use std::fs;
use std::path::{Path, PathBuf};

use adview_core::config::AppConfig;
use serde::Deserialize;

use crate::SimError;

/// `config.toml` for the simulator. Everything is optional.
///
/// ```toml
/// state_file = "/tmp/adview-state.json"
///
/// [app]
/// watch_duration_secs = 5
/// default_backend = "new"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub app: AppConfig,
    pub state_file: Option<PathBuf>,
    pub ads_file: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut p = dirs::config_dir()?;
    p.push("adview");
    p.push("config.toml");
    Some(p)
}

pub fn default_state_path() -> PathBuf {
    let mut p = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    p.push("adview");
    p.push("state.json");
    p
}

impl SimSettings {
    /// Read `path`, or the default location when `None`. A missing default
    /// file yields defaults; a missing explicit file is an error.
    /// `ADVIEW_*` environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, SimError> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        settings
            .app
            .apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, SimError> {
        let text = fs::read_to_string(path).map_err(|e| SimError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings = toml::from_str(&text)?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(default_state_path)
    }
}
