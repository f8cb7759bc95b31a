use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::{busy::BusyIndicatorSize, notification::NotificationTitles, BusyDialog};

pub const DEFAULT_SETTINGS_FILE: &str = "view_core.toml";
const ENV_PREFIX: &str = "VIEW_CORE__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub busy_indicator_delay_ms: u64,
    pub busy_indicator_size: BusyIndicatorSize,
    pub refresh_after_change: bool,
    pub error_title: String,
    pub warning_title: String,
    pub success_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            busy_indicator_delay_ms: 2000,
            busy_indicator_size: BusyIndicatorSize::Auto,
            refresh_after_change: true,
            error_title: "Error".into(),
            warning_title: "Warning".into(),
            success_title: "Success".into(),
        }
    }
}

impl Settings {
    pub fn notification_titles(&self) -> NotificationTitles {
        NotificationTitles {
            error: self.error_title.clone(),
            success: self.success_title.clone(),
            warning: self.warning_title.clone(),
        }
    }

    pub fn busy_dialog(&self) -> BusyDialog {
        BusyDialog::new(
            Duration::from_millis(self.busy_indicator_delay_ms),
            self.busy_indicator_size,
        )
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    busy_indicator_delay_ms: Option<u64>,
    busy_indicator_size: Option<BusyIndicatorSize>,
    refresh_after_change: Option<bool>,
    error_title: Option<String>,
    warning_title: Option<String>,
    success_title: Option<String>,
}

impl SettingsFile {
    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.busy_indicator_delay_ms {
            settings.busy_indicator_delay_ms = v;
        }
        if let Some(v) = self.busy_indicator_size {
            settings.busy_indicator_size = v;
        }
        if let Some(v) = self.refresh_after_change {
            settings.refresh_after_change = v;
        }
        if let Some(v) = self.error_title {
            settings.error_title = v;
        }
        if let Some(v) = self.warning_title {
            settings.warning_title = v;
        }
        if let Some(v) = self.success_title {
            settings.success_title = v;
        }
    }
}

/// Defaults, then `view_core.toml` in the working directory if present, then
/// `VIEW_CORE__*` environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if Path::new(DEFAULT_SETTINGS_FILE).exists() {
        match read_settings_file(Path::new(DEFAULT_SETTINGS_FILE)) {
            Ok(file_cfg) => file_cfg.apply(&mut settings),
            Err(err) => warn!("ignoring settings file: {err}"),
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Defaults overlaid with an explicit settings file. Environment overrides still apply.
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();
    read_settings_file(path.as_ref())?.apply(&mut settings);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

    if let Some(v) = var("BUSY_INDICATOR_DELAY_MS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => settings.busy_indicator_delay_ms = parsed,
            Err(_) => warn!(value = %v, "invalid busy indicator delay override"),
        }
    }
    if let Some(v) = var("BUSY_INDICATOR_SIZE") {
        match v.parse::<BusyIndicatorSize>() {
            Ok(parsed) => settings.busy_indicator_size = parsed,
            Err(err) => warn!("{err}"),
        }
    }
    if let Some(v) = var("REFRESH_AFTER_CHANGE") {
        match v.trim().parse::<bool>() {
            Ok(parsed) => settings.refresh_after_change = parsed,
            Err(_) => warn!(value = %v, "invalid refresh-after-change override"),
        }
    }
    if let Some(v) = var("ERROR_TITLE") {
        settings.error_title = v;
    }
    if let Some(v) = var("WARNING_TITLE") {
        settings.warning_title = v;
    }
    if let Some(v) = var("SUCCESS_TITLE") {
        settings.success_title = v;
    }
}
