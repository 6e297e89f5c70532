//! Validated stream configuration.

use serde::Serialize;

use super::catalog::{self, EncoderDescriptor, Resolution};
use super::device::DeviceSelection;
use super::error::ConfigError;
use super::graph::Branch;

pub const DEFAULT_FRAMERATE: u32 = 30;
pub const MAX_FRAMERATE: u32 = 240;

/// Split `host:port`, requiring exactly one colon, a non-empty host and a
/// port in 1..=65535.
pub fn parse_address(addr: &str) -> Result<(String, u16), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidAddress { reason };

    let parts: Vec<&str> = addr.split(':').collect();
    let [host, port] = parts.as_slice() else {
        return Err(invalid(format!("expected format host:port, got: {}", addr)));
    };

    if host.is_empty() {
        return Err(invalid("host cannot be empty".to_string()));
    }

    // Digits only: no sign, no whitespace
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("invalid port number: {}", port)));
    }
    let port: u64 = port
        .parse()
        .map_err(|_| invalid(format!("invalid port number: {}", port)))?;

    if !(1..=65535).contains(&port) {
        return Err(invalid(format!(
            "port must be between 1 and 65535, got: {}",
            port
        )));
    }

    Ok((host.to_string(), port as u16))
}

/// Optional knobs on top of the three positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Defaults to the video port + 1 when unset.
    pub audio_port: Option<u32>,
    pub framerate: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            audio_port: None,
            framerate: DEFAULT_FRAMERATE,
        }
    }
}

/// Where and how to encode: everything except the sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamTarget {
    #[serde(serialize_with = "serialize_encoder")]
    encoder: EncoderDescriptor,
    resolution: Resolution,
    host: String,
    video_port: u16,
    audio_port: u16,
    framerate: u32,
}

fn serialize_encoder<S: serde::Serializer>(
    encoder: &EncoderDescriptor,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(encoder.id())
}

impl StreamTarget {
    /// Validate `[encoder] [resolution] [host:port]` positionals.
    pub fn from_args(args: &[String], options: StreamOptions) -> Result<Self, ConfigError> {
        match args {
            [encoder, resolution, address] => Self::resolve(encoder, resolution, address, options),
            _ => Err(ConfigError::WrongArgumentCount(args.len())),
        }
    }

    /// Validate in order: encoder, resolution, their compatibility, address,
    /// audio port, frame rate.
    pub fn resolve(
        encoder: &str,
        resolution: &str,
        address: &str,
        options: StreamOptions,
    ) -> Result<Self, ConfigError> {
        let encoder = catalog::lookup_encoder(encoder)?;
        let resolution = catalog::lookup_resolution(resolution)?;
        catalog::check_compatibility(encoder, resolution)?;

        let (host, video_port) = parse_address(address)?;
        let audio_port = resolve_audio_port(video_port, options.audio_port)?;

        if options.framerate == 0 || options.framerate > MAX_FRAMERATE {
            return Err(ConfigError::InvalidFramerate(options.framerate));
        }

        Ok(Self {
            encoder,
            resolution,
            host,
            video_port,
            audio_port,
            framerate: options.framerate,
        })
    }

    pub fn encoder(&self) -> EncoderDescriptor {
        self.encoder
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn video_port(&self) -> u16 {
        self.video_port
    }

    pub fn audio_port(&self) -> u16 {
        self.audio_port
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }
}

fn resolve_audio_port(video_port: u16, requested: Option<u32>) -> Result<u16, ConfigError> {
    let port = requested.unwrap_or(u32::from(video_port) + 1);
    if !(1..=65535).contains(&port) {
        return Err(ConfigError::InvalidAudioPort {
            port,
            reason: "port must be between 1 and 65535".to_string(),
        });
    }
    if port == u32::from(video_port) {
        return Err(ConfigError::InvalidAudioPort {
            port,
            reason: "must differ from the video port".to_string(),
        });
    }
    Ok(port as u16)
}

/// How synthetic sources look and sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestPresentation {
    /// `videotestsrc` pattern nick
    pub pattern: String,
    /// `audiotestsrc` wave nick
    pub wave: String,
}

impl Default for TestPresentation {
    fn default() -> Self {
        Self {
            pattern: "ball".to_string(),
            wave: "ticks".to_string(),
        }
    }
}

/// Complete input to the pipeline compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    target: StreamTarget,
    video: DeviceSelection,
    audio: DeviceSelection,
    presentation: TestPresentation,
}

impl StreamConfig {
    pub fn new(target: StreamTarget, video: DeviceSelection, audio: DeviceSelection) -> Self {
        Self {
            target,
            video,
            audio,
            presentation: TestPresentation::default(),
        }
    }

    /// Both branches fed by synthetic sources.
    pub fn with_test_sources(target: StreamTarget) -> Self {
        Self::new(
            target,
            DeviceSelection::test_source(Branch::Video),
            DeviceSelection::test_source(Branch::Audio),
        )
    }

    pub fn with_presentation(mut self, presentation: TestPresentation) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn target(&self) -> &StreamTarget {
        &self.target
    }

    pub fn encoder(&self) -> EncoderDescriptor {
        self.target.encoder
    }

    pub fn resolution(&self) -> Resolution {
        self.target.resolution
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }

    pub fn video_port(&self) -> u16 {
        self.target.video_port
    }

    pub fn audio_port(&self) -> u16 {
        self.target.audio_port
    }

    pub fn framerate(&self) -> u32 {
        self.target.framerate
    }

    pub fn source(&self, branch: Branch) -> &DeviceSelection {
        match branch {
            Branch::Video => &self.video,
            Branch::Audio => &self.audio,
        }
    }

    pub fn presentation(&self) -> &TestPresentation {
        &self.presentation
    }
}
