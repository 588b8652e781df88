//! Settings for the quick-settings panel.
//!
//! Resolved once at startup from, in order of precedence: environment variables,
//! the `[quick_settings]` table of the shared dotfiles config, and built-in defaults
//! under `~/.config/hypr/`. Nothing else in the crate reads the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

const DEFAULT_BRIGHTNESS_STEP: u32 = 5;
const DEFAULT_TIMEOUT_SECS: f64 = 6.0;
const DEFAULT_LR_GUARD_MS: u64 = 320;
const DEFAULT_LOG_FILTER: &str = "info";

/// Expands a leading `~/` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

// --- Config file model ---

#[derive(Deserialize, Debug, Default)]
pub struct QuickSettingsConfig {
    brightness_script: Option<String>,
    sunset_script: Option<String>,
    vibrance_script: Option<String>,
    hyprland_conf: Option<String>,
    vibrance_shader: Option<String>,
    brightness_step: Option<i64>,
    timeout_secs: Option<f64>,
    lr_guard_ms: Option<u64>,
    log_filter: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct GlobalConfig {
    #[serde(default)]
    quick_settings: QuickSettingsConfig,
}

fn config_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Cannot find home dir")?
        .join(".config/rust-dotfiles/config.toml"))
}

/// Reads the `[quick_settings]` table. A missing file yields an empty table.
pub fn load_file_config(path: &Path) -> Result<QuickSettingsConfig> {
    if !path.exists() {
        return Ok(QuickSettingsConfig::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: GlobalConfig = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config.quick_settings)
}

/// Immutable runtime settings, passed by reference to every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub brightness_script: PathBuf,
    pub sunset_script: PathBuf,
    pub vibrance_script: PathBuf,
    pub hyprland_conf: PathBuf,
    pub vibrance_shader: PathBuf,
    pub brightness_step: u32,
    pub cmd_timeout: Duration,
    pub lr_guard: Duration,
    pub log_filter: String,
}

impl Settings {
    /// Builds settings from the real environment and the dotfiles config.
    pub fn load() -> Result<Self> {
        let file = load_file_config(&config_path()?)?;
        Self::from_lookup(file, |key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup layered over `file`.
    pub fn from_lookup<F>(file: QuickSettingsConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, from_file: Option<String>, default: &str| -> PathBuf {
            let raw = lookup(key)
                .filter(|v| !v.is_empty())
                .or(from_file)
                .unwrap_or_else(|| default.to_string());
            expand_path(&raw)
        };

        let brightness_step = match lookup("HYPR_BRIGHTNESS_STEP") {
            Some(raw) => raw.trim().parse::<u32>().with_context(|| {
                format!("HYPR_BRIGHTNESS_STEP must be a non-negative integer, got {raw:?}")
            })?,
            None => match file.brightness_step {
                Some(step) => u32::try_from(step).with_context(|| {
                    format!("quick_settings.brightness_step must be a non-negative integer, got {step}")
                })?,
                None => DEFAULT_BRIGHTNESS_STEP,
            },
        };

        let timeout_secs = match lookup("HYPR_SETTINGS_TIMEOUT") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("HYPR_SETTINGS_TIMEOUT must be a number, got {raw:?}"))?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        let cmd_timeout = Duration::try_from_secs_f64(timeout_secs)
            .map_err(|_| anyhow!("timeout must be a non-negative number of seconds, got {timeout_secs}"))?;

        let lr_guard_ms = match lookup("HYPR_TUI_LR_GUARD_MS") {
            Some(raw) => raw.trim().parse::<u64>().with_context(|| {
                format!("HYPR_TUI_LR_GUARD_MS must be a non-negative integer, got {raw:?}")
            })?,
            None => file.lr_guard_ms.unwrap_or(DEFAULT_LR_GUARD_MS),
        };

        let log_filter = lookup("HYPR_TUI_LOG")
            .filter(|v| !v.is_empty())
            .or(file.log_filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            brightness_script: path(
                "HYPR_BRIGHTNESS_SCRIPT",
                file.brightness_script,
                "~/.config/hypr/scripts/hypr-ddc-brightness.sh",
            ),
            sunset_script: path(
                "HYPR_SUNSET_SCRIPT",
                file.sunset_script,
                "~/.config/hypr/scripts/hyprsunset_ctl.sh",
            ),
            vibrance_script: path(
                "HYPR_VIBRANCE_SCRIPT",
                file.vibrance_script,
                "~/.config/hypr/scripts/vibrance_shader.sh",
            ),
            hyprland_conf: path("HYPRLAND_CONF", file.hyprland_conf, "~/.config/hypr/hyprland.conf"),
            vibrance_shader: path(
                "VIBRANCE_SHADER_FILE",
                file.vibrance_shader,
                "~/.config/hypr/shaders/vibrance",
            ),
            brightness_step,
            cmd_timeout,
            lr_guard: Duration::from_millis(lr_guard_ms),
            log_filter,
        })
    }

    /// The three helper executables, in display order.
    pub fn helpers(&self) -> [&Path; 3] {
        [&self.brightness_script, &self.sunset_script, &self.vibrance_script]
    }

    /// First helper that does not exist on disk, if any.
    pub fn missing_helper(&self) -> Option<&Path> {
        self.helpers().into_iter().find(|p| !p.exists())
    }
}
