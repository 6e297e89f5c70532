// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::stream::{DEFAULT_FRAMERATE, TestPresentation};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamDefaults,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDefaults {
    /// Capture frame rate when --framerate is not given
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// videotestsrc pattern for the synthetic video source
    #[serde(default = "default_test_pattern")]
    pub test_pattern: String,

    /// audiotestsrc wave for the synthetic audio source
    #[serde(default = "default_test_wave")]
    pub test_wave: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print both pipelines as gst-launch-1.0 commands before streaming
    #[serde(default = "default_true_config")]
    pub print_pipelines: bool,

    /// Log level used when no -v flag is given (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_framerate() -> u32 {
    DEFAULT_FRAMERATE
}

fn default_test_pattern() -> String {
    "ball".to_string()
}

fn default_test_wave() -> String {
    "ticks".to_string()
}

fn default_true_config() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            test_pattern: default_test_pattern(),
            test_wave: default_test_wave(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            print_pipelines: true,
            log_level: default_log_level(),
        }
    }
}

impl StreamDefaults {
    pub fn presentation(&self) -> TestPresentation {
        TestPresentation {
            pattern: self.test_pattern.clone(),
            wave: self.test_wave.clone(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("rtpcast")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("rtpcast")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from `path`, falling back to defaults when no file
    /// exists. An existing file that does not parse is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Read and parse a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Write the default config to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn create_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Config::default().save_to(path)?;
        Ok(true)
    }

    /// `--init-config`: report an existing config, or write defaults.
    ///
    /// An existing file is only replaced when `force` is set; without it a
    /// file that does not parse is reported and left untouched.
    pub fn init_at(path: &Path, force: bool) -> Result<InitOutcome> {
        if !path.exists() {
            Config::default().save_to(path)?;
            return Ok(InitOutcome::Created);
        }
        if force {
            Config::default().save_to(path)?;
            return Ok(InitOutcome::Replaced);
        }
        Self::load_from(path)
            .map(InitOutcome::Existing)
            .context("Existing config left unchanged; fix it or pass --force to replace it with defaults")
    }
}

/// Result of [`Config::init_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Existing(Config),
    Created,
    Replaced,
}
