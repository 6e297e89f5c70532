//! Host platform detection

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

/// Operating system family the pipelines are compiled for.
///
/// Picks the capture source elements and the macOS-specific format
/// normalization stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
}

impl Platform {
    /// Detect the platform this binary was built for.
    pub fn detect() -> Result<Self, ConfigError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Result<Self, ConfigError> {
        match os {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
        }
    }

    pub fn video_source(&self) -> &'static str {
        match self {
            Platform::Linux => "v4l2src",
            Platform::MacOs => "avfvideosrc",
        }
    }

    pub fn audio_source(&self) -> &'static str {
        match self {
            Platform::Linux => "pipewiresrc",
            Platform::MacOs => "osxaudiosrc",
        }
    }

    /// macOS capture sources need scaling, rate and format conversion before
    /// the caps filter can be satisfied.
    pub fn normalizes_video(&self) -> bool {
        matches!(self, Platform::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "darwin" | "osx" | "mac" => Ok(Platform::MacOs),
            other => Self::from_os(other),
        }
    }
}
