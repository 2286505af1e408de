use std::{env, path::PathBuf, sync::OnceLock, time::Duration};

use config::{ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::debug;

use crate::{autosave::AutosaveOptions, draft::DraftToken};

const DEFAULT_CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub progress_tick_ms: u64,
    pub suppress_initial_load: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        let defaults = AutosaveOptions::default();
        Self {
            enabled: defaults.enabled,
            interval_ms: millis(defaults.interval),
            progress_tick_ms: millis(defaults.progress_tick),
            suppress_initial_load: defaults.suppress_initial_load,
        }
    }
}

impl AutosaveConfig {
    /// Initial-load suppression only applies when resuming `existing_token`.
    /// A new document has nothing loaded, so its first edit is a real one.
    pub fn to_options(&self, existing_token: Option<DraftToken>) -> AutosaveOptions {
        AutosaveOptions {
            enabled: self.enabled,
            interval: Duration::from_millis(self.interval_ms),
            progress_tick: Duration::from_millis(self.progress_tick_ms),
            suppress_initial_load: self.suppress_initial_load && existing_token.is_some(),
            existing_token,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn new() -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();

        let mut builder = defaults(&data_dir, &config_dir)?;

        let config_files = [
            ("config.json5", FileFormat::Json5),
            ("config.json", FileFormat::Json),
            ("config.yaml", FileFormat::Yaml),
            ("config.toml", FileFormat::Toml),
        ];
        for (file, format) in &config_files {
            let source = File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        let cfg: Self = builder
            .add_source(
                Environment::with_prefix(PROJECT_NAME.as_str())
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if CONFIG.set(cfg.clone()).is_err() {
            debug!("Config was already loaded, keeping the first one");
        }

        Ok(cfg)
    }

    /// The loaded config, or the built-in defaults if nothing was loaded yet.
    pub fn get() -> &'static Self {
        CONFIG.get_or_init(Self::default)
    }

    /// Installs `cfg` as the global config. Returns false if one was already set.
    pub fn set_for_tests(cfg: Self) -> bool {
        CONFIG.set(cfg).is_ok()
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.config.data_dir.join("drafts")
    }
}

fn defaults(
    data_dir: &std::path::Path,
    config_dir: &std::path::Path,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Ok(config::Config::builder()
        .set_default("data_dir", data_dir.to_string_lossy().into_owned())?
        .set_default("config_dir", config_dir.to_string_lossy().into_owned())?
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Json5)))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("plus.lit", "", env!("CARGO_PKG_NAME"))
}
