//! Configuration for osurec.
//!
//! Layered with `figment`, later layers winning:
//!
//! 1. built-in defaults,
//! 2. the per-user `config.toml` (e.g. `~/.config/osurec/config.toml`),
//! 3. an explicitly requested file,
//! 4. `OSUREC_*` environment variables (`OSUREC_OSU_ROOT`, `OSUREC_SETTLE_DELAY_MS`, ...).

pub mod error;

use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "maps.db";
const ENV_PREFIX: &str = "OSUREC_";
/// Used when the platform has no notion of a per-user data directory.
const FALLBACK_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The osu! installation directory (contains `osu!.db`, `Songs/`, `Data/r/`).
    pub osu_root: Option<PathBuf>,
    /// Catalog override. Defaults to `<osu_root>/osu!.db`.
    pub catalog: Option<PathBuf>,
    /// Replay directory override. Defaults to `<osu_root>/Data/r`.
    pub replays: Option<PathBuf>,
    /// Where the index database lives. Defaults to the per-user data directory.
    pub data_dir: Option<PathBuf>,
    /// How long to wait after a replay appears before reading it.
    pub settle_delay_ms: u64,
    /// File name suffix identifying replays.
    pub result_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osu_root: None,
            catalog: None,
            replays: None,
            data_dir: None,
            settle_delay_ms: 2_000,
            result_suffix: ".osr".to_string(),
        }
    }
}

impl Config {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "osurec")
    }

    /// The per-user configuration file, if the platform has one.
    pub fn user_config_file() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// All layers, including the per-user file.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        Self::layered(Self::user_config_file().as_deref(), explicit)
    }

    /// Defaults, then the given files (missing files are skipped), then the environment.
    pub fn layered(user: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        for file in [user, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads all layers and validates the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.osu_root.as_ref().is_none_or(|root| root.as_os_str().is_empty()) {
            exn::bail!(ErrorKind::Invalid("osu_root is not set".to_string()));
        }
        if self.result_suffix.is_empty() {
            exn::bail!(ErrorKind::Invalid("result_suffix must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn osu_root(&self) -> Result<&Path> {
        self.osu_root.as_deref().ok_or_raise(|| ErrorKind::Invalid("osu_root is not set".to_string()))
    }

    pub fn catalog_path(&self) -> Result<PathBuf> {
        match &self.catalog {
            Some(catalog) => Ok(catalog.clone()),
            None => Ok(self.osu_root()?.join("osu!.db")),
        }
    }

    pub fn replay_dir(&self) -> Result<PathBuf> {
        match &self.replays {
            Some(replays) => Ok(replays.clone()),
            None => Ok(self.osu_root()?.join("Data").join("r")),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
    }

    /// The index database file. Its directory is created on connect.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE_NAME)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
