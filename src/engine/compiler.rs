//! Pipeline graph compiler.
//!
//! Turns a [`StreamConfig`] into two linear stage graphs, one per branch.
//! Compilation is pure: the platform is passed in, nothing is probed, and
//! the same inputs always give equal graphs.

use serde::Serialize;

use super::catalog::{CodecFamily, Conversion, EncoderDescriptor, EncoderRule};
use super::device::DeviceSelection;
use super::error::GraphError;
use super::graph::{Branch, Caps, PipelineGraph, PropertyValue, StageRole, StageSpec};
use super::platform::Platform;
use super::stream::StreamConfig;

pub const AUDIO_RATE: i64 = 48_000;
pub const AUDIO_CHANNELS: i64 = 2;
pub const OPUS_BITRATE: i64 = 128_000;
/// Opus frame duration in milliseconds
pub const OPUS_FRAME_SIZE: i64 = 20;

/// Both graphs of a stream, compiled for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledStream {
    pub platform: Platform,
    pub video: PipelineGraph,
    pub audio: PipelineGraph,
}

/// Compile the video and audio graphs.
pub fn compile(config: &StreamConfig, platform: Platform) -> Result<CompiledStream, GraphError> {
    Ok(CompiledStream {
        platform,
        video: compile_video(config, platform)?,
        audio: compile_audio(config, platform)?,
    })
}

/// Compile the video branch:
/// source, [normalization], capture caps, [conversion], queue, encoder,
/// [parser], payloader, udpsink.
pub fn compile_video(config: &StreamConfig, platform: Platform) -> Result<PipelineGraph, GraphError> {
    let encoder = config.encoder();
    let rule = encoder.rule();

    let mut stages = vec![video_source(config, platform)];
    stages.extend(normalization_stages(platform));
    stages.push(StageSpec::caps_filter(capture_caps(config, rule, platform)));
    stages.extend(conversion_stages(rule.conversion));
    stages.push(
        StageSpec::new(StageRole::Queue, "queue")
            .with("max-size-buffers", 1)
            .with("leaky", "downstream"),
    );
    stages.push(encoder_stage(encoder));

    let (parser, payloader) = parser_and_payloader(encoder.family());
    stages.extend(parser);
    stages.push(payloader);
    stages.push(udp_sink(config.host(), config.video_port()));

    PipelineGraph::new(Branch::Video, stages)
}

/// Compile the audio branch: source, caps, queue, audioconvert,
/// audioresample, queue, opusenc, rtpopuspay, udpsink.
pub fn compile_audio(config: &StreamConfig, platform: Platform) -> Result<PipelineGraph, GraphError> {
    let caps = Caps::new("audio/x-raw")
        .int("rate", AUDIO_RATE)
        .int("channels", AUDIO_CHANNELS);

    let stages = vec![
        audio_source(config, platform),
        StageSpec::caps_filter(caps),
        audio_queue(),
        StageSpec::new(StageRole::FormatConvert, "audioconvert"),
        StageSpec::new(StageRole::Resample, "audioresample"),
        audio_queue(),
        StageSpec::new(StageRole::Encoder, "opusenc")
            .with("bitrate", OPUS_BITRATE)
            .with("frame-size", OPUS_FRAME_SIZE),
        StageSpec::new(StageRole::Payloader, "rtpopuspay"),
        udp_sink(config.host(), config.audio_port()),
    ];

    PipelineGraph::new(Branch::Audio, stages)
}

fn video_source(config: &StreamConfig, platform: Platform) -> StageSpec {
    match config.source(Branch::Video) {
        DeviceSelection::TestSource { .. } => StageSpec::new(StageRole::Source, "videotestsrc")
            .with("is-live", true)
            .with("pattern", config.presentation().pattern.clone()),
        DeviceSelection::Device(device) => {
            let mut stage = StageSpec::new(StageRole::Source, platform.video_source());
            if let Some((name, value)) = device.identifying_property(platform, Branch::Video) {
                stage = stage.with(name, value);
            }
            if platform == Platform::MacOs {
                stage = stage.with("do-stats", true);
            }
            stage.with("do-timestamp", true)
        }
    }
}

fn audio_source(config: &StreamConfig, platform: Platform) -> StageSpec {
    let stage = match config.source(Branch::Audio) {
        DeviceSelection::TestSource { .. } => StageSpec::new(StageRole::Source, "audiotestsrc")
            .with("is-live", true)
            .with("wave", config.presentation().wave.clone()),
        DeviceSelection::Device(device) => {
            let stage = StageSpec::new(StageRole::Source, platform.audio_source());
            match device.identifying_property(platform, Branch::Audio) {
                Some((name, value)) => stage.with(name, value),
                None => stage,
            }
        }
    };
    stage.with("do-timestamp", true)
}

/// Scaling, rate and format conversion ahead of the capture caps. Only
/// macOS capture needs them.
fn normalization_stages(platform: Platform) -> Vec<StageSpec> {
    if !platform.normalizes_video() {
        return Vec::new();
    }
    vec![
        StageSpec::new(StageRole::Scale, "videoscale"),
        StageSpec::new(StageRole::RateConvert, "videorate"),
        StageSpec::new(StageRole::FormatConvert, "videoconvert"),
    ]
}

fn capture_caps(config: &StreamConfig, rule: &EncoderRule, platform: Platform) -> Caps {
    let resolution = config.resolution();
    let mut caps = Caps::new("video/x-raw")
        .int("width", i64::from(resolution.width))
        .int("height", i64::from(resolution.height))
        .fraction("framerate", i64::from(config.framerate()), 1);
    if let Some(format) = rule.capture_format {
        caps = caps.text("format", format.as_str());
    }
    if platform == Platform::MacOs {
        caps = caps.fraction("pixel-aspect-ratio", 1, 1);
    }
    caps
}

/// Stages moving frames into the format the encoder consumes.
pub fn conversion_stages(conversion: Conversion) -> Vec<StageSpec> {
    match conversion {
        Conversion::Direct => Vec::new(),
        Conversion::Software(format) => vec![
            StageSpec::new(StageRole::FormatConvert, "videoconvert"),
            StageSpec::caps_filter(Caps::new("video/x-raw").text("format", format.as_str())),
        ],
        Conversion::Nvmm(format) => vec![
            StageSpec::new(StageRole::FormatConvert, "nvvideoconvert"),
            StageSpec::caps_filter(
                Caps::new("video/x-raw")
                    .with_features("memory:NVMM")
                    .text("format", format.as_str()),
            ),
        ],
    }
}

fn encoder_stage(encoder: EncoderDescriptor) -> StageSpec {
    StageSpec::new(StageRole::Encoder, encoder.id()).with_all(encoder.rule().properties)
}

/// Parser (absent for VP8) and RTP payloader for a codec family.
pub fn parser_and_payloader(family: CodecFamily) -> (Option<StageSpec>, StageSpec) {
    let parser = |factory| Some(StageSpec::new(StageRole::Parser, factory));
    let payloader = |factory| StageSpec::new(StageRole::Payloader, factory);
    let low_latency = |stage: StageSpec| {
        stage
            .with("config-interval", -1)
            .with("aggregate-mode", PropertyValue::text("zero-latency"))
    };

    match family {
        CodecFamily::H264 => (parser("h264parse"), low_latency(payloader("rtph264pay"))),
        CodecFamily::H265 => (parser("h265parse"), low_latency(payloader("rtph265pay"))),
        CodecFamily::Vp8 => (None, payloader("rtpvp8pay")),
        CodecFamily::Vp9 => (parser("vp9parse"), payloader("rtpvp9pay")),
        CodecFamily::Av1 => (parser("av1parse"), payloader("rtpav1pay")),
    }
}

fn udp_sink(host: &str, port: u16) -> StageSpec {
    StageSpec::new(StageRole::Sink, "udpsink")
        .with("host", host.to_string())
        .with("port", port)
        .with("sync", false)
        .with("async", false)
}

fn audio_queue() -> StageSpec {
    StageSpec::new(StageRole::Queue, "queue")
        .with("max-size-buffers", 10)
        .with("max-size-time", 0)
        .with("max-size-bytes", 0)
}
