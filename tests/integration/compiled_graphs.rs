use crate::common::assertions::{assert_contains_in_order, assert_linear_shape};
use crate::common::helpers::{DEST, compile_synthetic, pipewire_mic, target, v4l2_camera};
use rtpcast::engine::catalog;
use rtpcast::engine::{
    CodecFamily, ConfigError, Platform, StageRole, StreamConfig, StreamOptions, StreamTarget,
    compile,
};

const PLATFORMS: [Platform; 2] = [Platform::Linux, Platform::MacOs];

#[test]
fn every_encoder_compiles_to_a_linear_chain() {
    for encoder in catalog::encoders() {
        for resolution in ["QVGA", "VGA", "HD", "4K"] {
            let target = match StreamTarget::resolve(
                encoder.id(),
                resolution,
                DEST,
                StreamOptions::default(),
            ) {
                Ok(target) => target,
                Err(ConfigError::IncompatibleConfiguration { .. }) => continue,
                Err(e) => panic!("{} {}: {}", encoder.id(), resolution, e),
            };
            let config = StreamConfig::with_test_sources(target);

            for platform in PLATFORMS {
                let compiled = compile(&config, platform).unwrap();
                assert_linear_shape(&compiled.video);
                assert_linear_shape(&compiled.audio);

                let enc = compiled.video.find(StageRole::Encoder).unwrap();
                assert_eq!(enc.factory, encoder.id());
            }
        }
    }
}

#[test]
fn payloader_matches_codec_family() {
    for encoder in catalog::encoders() {
        let compiled = compile_synthetic(encoder.id(), "HD", Platform::Linux);
        let payloader = compiled.video.find(StageRole::Payloader).unwrap().factory;
        let parser = compiled.video.find(StageRole::Parser).map(|s| s.factory);

        let (expected_parser, expected_payloader) = match encoder.family() {
            CodecFamily::H264 => (Some("h264parse"), "rtph264pay"),
            CodecFamily::H265 => (Some("h265parse"), "rtph265pay"),
            CodecFamily::Vp8 => (None, "rtpvp8pay"),
            CodecFamily::Vp9 => (Some("vp9parse"), "rtpvp9pay"),
            CodecFamily::Av1 => (Some("av1parse"), "rtpav1pay"),
        };
        assert_eq!(parser, expected_parser, "{}", encoder.id());
        assert_eq!(payloader, expected_payloader, "{}", encoder.id());
    }
}

#[test]
fn audio_chain_is_identical_for_every_encoder() {
    let reference = compile_synthetic("x264enc", "HD", Platform::Linux).audio;
    for encoder in catalog::encoders() {
        let audio = compile_synthetic(encoder.id(), "HD", Platform::Linux).audio;
        assert_eq!(audio, reference, "{}", encoder.id());
    }
}

#[test]
fn compilation_is_deterministic() {
    for platform in PLATFORMS {
        let a = compile_synthetic("vp9enc", "FHD", platform);
        let b = compile_synthetic("vp9enc", "FHD", platform);
        assert_eq!(a, b);
        assert_eq!(a.video.launch_command(), b.video.launch_command());
    }
}

#[test]
fn linux_devices_are_addressed_by_path_and_serial() {
    let config = StreamConfig::new(target("vah264enc", "HD"), v4l2_camera(), pipewire_mic());
    let compiled = compile(&config, Platform::Linux).unwrap();

    assert_eq!(
        compiled.video.source().launch_tokens(),
        vec!["v4l2src", "device=/dev/video2", "do-timestamp=true"]
    );
    assert_eq!(
        compiled.audio.source().launch_tokens(),
        vec!["pipewiresrc", "target-object=57", "do-timestamp=true"]
    );
}

#[test]
fn options_flow_into_caps_and_sinks() {
    let options = StreamOptions {
        audio_port: Some(7000),
        framerate: 60,
    };
    let target = StreamTarget::resolve("nvh265enc", "FHD", "192.168.1.10:5000", options).unwrap();
    let compiled = compile(&StreamConfig::with_test_sources(target), Platform::Linux).unwrap();

    assert_contains_in_order(
        &compiled.video.launch_line(),
        &[
            "video/x-raw,width=1920,height=1080,framerate=60/1,format=NV12",
            "nvh265enc",
            "udpsink host=192.168.1.10 port=5000",
        ],
    );
    assert_contains_in_order(
        &compiled.audio.launch_line(),
        &["opusenc", "udpsink host=192.168.1.10 port=7000"],
    );
}

#[test]
fn macos_normalizes_before_capture_caps() {
    let compiled = compile_synthetic("vtenc_h264_hw", "HD", Platform::MacOs);
    assert_contains_in_order(
        &compiled.video.launch_line(),
        &[
            "videotestsrc",
            "videoscale",
            "videorate",
            "videoconvert",
            "pixel-aspect-ratio=1/1",
            "vtenc_h264_hw realtime=true",
        ],
    );

    let linux = compile_synthetic("vtenc_h264_hw", "HD", Platform::Linux);
    assert!(!linux.video.factories().contains(&"videoscale"));
}

#[test]
fn videotoolbox_rejects_small_resolutions() {
    let err = StreamTarget::resolve("vtenc_h264_hw", "QVGA", DEST, StreamOptions::default())
        .unwrap_err();
    match err {
        ConfigError::IncompatibleConfiguration {
            message,
            remediation,
        } => {
            assert!(message.contains("640x480"), "{}", message);
            assert!(remediation.contains("VGA"), "{}", remediation);
            assert!(remediation.contains("x264enc"), "{}", remediation);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn compiled_stream_serializes_to_json() {
    let compiled = compile_synthetic("vp8enc", "VGA", Platform::Linux);
    let json = serde_json::to_value(&compiled).unwrap();

    assert_eq!(json["platform"], "linux");
    assert_eq!(json["video"]["branch"], "video");
    assert_eq!(json["video"]["stages"][0]["factory"], "videotestsrc");
    assert_eq!(json["video"]["stages"][0]["role"], "source");
    assert_eq!(json["audio"]["stages"].as_array().map(Vec::len), Some(9));
}
