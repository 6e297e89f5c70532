use clap::{ArgAction, Parser};

use rtpcast::engine::Platform;

#[derive(Parser)]
#[command(name = "rtpcast")]
#[command(version)]
#[command(about = "Stream a camera and microphone as RTP over UDP using GStreamer")]
#[command(
    long_about = "Stream a camera and microphone as RTP over UDP using GStreamer.

Example:
  rtpcast vtenc_h264_hw VGA 192.168.1.10:5000

streams H.264 video at 640x480 to 192.168.1.10:5000 and Opus audio to
192.168.1.10:5001 (video port + 1)."
)]
pub struct Cli {
    /// [encoder] [resolution] [host:port]
    #[arg(value_name = "ARGS", num_args = 0..)]
    pub args: Vec<String>,

    /// List supported encoders and resolutions
    #[arg(short, long)]
    pub list: bool,

    /// Capture frame rate (overrides config)
    #[arg(long, value_name = "FPS")]
    pub framerate: Option<u32>,

    /// UDP port for the audio stream (default: video port + 1)
    #[arg(long, value_name = "PORT")]
    pub audio_port: Option<u32>,

    /// Use synthetic test sources instead of prompting for devices
    #[arg(long)]
    pub test_sources: bool,

    /// Compile and print both pipelines without streaming
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run, print the stage graphs as JSON
    #[arg(long, requires = "dry_run")]
    pub json: bool,

    /// Compile for another platform instead of the host (linux, macos)
    #[arg(long, value_name = "OS", value_parser = parse_platform)]
    pub platform: Option<Platform>,

    /// Show config status and location, or create default config if missing
    #[arg(long)]
    pub init_config: bool,

    /// With --init-config, replace an existing config file with defaults
    #[arg(long, requires = "init_config")]
    pub force: bool,

    /// Increase log verbosity (-v debug for rtpcast, -vv everything)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}

pub fn parse() -> Cli {
    Cli::parse()
}
