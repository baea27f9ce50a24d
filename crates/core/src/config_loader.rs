use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Merges `Progno.toml`, an optional profile file, `PROGNO_*` environment
/// variables and `Progno.json` from a config directory.
pub struct ConfigLoader {
    dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new("config")
    }
}

impl ConfigLoader {
    /// Creates a loader reading from `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn figment(&self, profile: Option<&str>) -> Figment {
        let mut figment = Figment::new().merge(Toml::file(self.dir.join("Progno.toml")));
        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(self.dir.join(format!("Progno.{profile}.toml"))));
        }
        figment
            .merge(Env::prefixed("PROGNO_").split("__"))
            .join(Json::file(self.dir.join("Progno.json")))
    }

    /// Loads application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load(&self) -> Result<AppConfig> {
        let config: AppConfig = self.figment(None).extract()?;
        Ok(config)
    }

    /// Loads application configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(&self, profile: &str) -> Result<AppConfig> {
        let config: AppConfig = self.figment(Some(profile)).extract()?;
        Ok(config)
    }
}
