use crate::common::helpers::target;
use rtpcast::engine::device::{self, parse_monitor_report};
use rtpcast::engine::{
    Branch, DeviceHandle, DeviceMonitor, DeviceSelection, EngineError, Platform, StreamConfig,
    StreamError, compile,
};
use std::io::Cursor;

const REPORT: &str = "Probing devices...


Device found:

\tname  : HD Pro Webcam C920
\tclass : Video/Source
\tcaps  : video/x-raw, format=YUY2, width=1280, height=720, framerate=10/1
\tproperties:
\t\tapi.v4l2.path = /dev/video0
\t\tdevice.product.name = HD Pro Webcam C920
\tgst-launch-1.0 v4l2src device=/dev/video0 ! ...


Device found:

\tname  : HD Pro Webcam C920 Analog Stereo
\tclass : Audio/Source
\tcaps  : audio/x-raw, format=S16LE, rate=32000, channels=2
\tproperties:
\t\tobject.serial = 63
\t\tnode.name = alsa_input.usb-046d_HD_Pro_Webcam_C920-02.analog-stereo
\tgst-launch-1.0 pipewiresrc target-object=63 ! ...

";

/// Monitor serving a canned `gst-device-monitor-1.0` report.
struct ReportMonitor(&'static str);

impl DeviceMonitor for ReportMonitor {
    fn enumerate(&self, class: &str, _caps: &str) -> Result<Vec<DeviceHandle>, EngineError> {
        Ok(parse_monitor_report(self.0, class))
    }
}

struct BrokenMonitor;

impl DeviceMonitor for BrokenMonitor {
    fn enumerate(&self, _class: &str, _caps: &str) -> Result<Vec<DeviceHandle>, EngineError> {
        Err(EngineError::Unavailable(
            "gst-device-monitor-1.0 not found".to_string(),
        ))
    }
}

fn select(
    monitor: &dyn DeviceMonitor,
    branch: Branch,
    input: &str,
) -> (Result<DeviceSelection, StreamError>, String) {
    let mut input = Cursor::new(input.as_bytes().to_vec());
    let mut output = Vec::new();
    let result = device::select_device(monitor, branch, &mut input, &mut output);
    (result, String::from_utf8(output).unwrap())
}

#[test]
fn selected_devices_compile_into_source_properties() {
    let monitor = ReportMonitor(REPORT);
    let (video, prompt) = select(&monitor, Branch::Video, "1\n");
    let (audio, _) = select(&monitor, Branch::Audio, "1\n");
    let (video, audio) = (video.unwrap(), audio.unwrap());

    assert!(prompt.contains("Available Video/Source devices:"));
    assert!(prompt.contains("  0: Test Source (videotestsrc)"));
    assert!(prompt.contains("  1: HD Pro Webcam C920"));
    assert_eq!(video.display_name(), "HD Pro Webcam C920");

    let config = StreamConfig::new(target("x264enc", "HD"), video, audio);
    let compiled = compile(&config, Platform::Linux).unwrap();
    assert!(
        compiled
            .video
            .launch_line()
            .starts_with("v4l2src device=/dev/video0 do-timestamp=true ! ")
    );
    assert!(
        compiled
            .audio
            .launch_line()
            .starts_with("pipewiresrc target-object=63 do-timestamp=true ! ")
    );
}

#[test]
fn zero_picks_the_test_source() {
    let monitor = ReportMonitor(REPORT);
    let (selection, _) = select(&monitor, Branch::Audio, "0\n");
    assert_eq!(selection.unwrap(), DeviceSelection::test_source(Branch::Audio));
}

#[test]
fn invalid_entries_reprompt() {
    let monitor = ReportMonitor(REPORT);
    let (selection, prompt) = select(&monitor, Branch::Video, "7\nfirst\n1\n");

    assert!(!selection.unwrap().is_test_source());
    assert_eq!(
        prompt
            .matches("Invalid selection. Please enter a number between 0 and 1.")
            .count(),
        2
    );
    assert_eq!(prompt.matches("Select device [0-1]: ").count(), 3);
}

#[test]
fn no_devices_falls_back_without_prompting() {
    let monitor = ReportMonitor("Probing devices...\n");
    let (selection, output) = select(&monitor, Branch::Video, "");

    assert_eq!(selection.unwrap(), DeviceSelection::test_source(Branch::Video));
    assert!(output.contains("No Video/Source devices found, using Test Source (videotestsrc)"));
    assert!(!output.contains("Select device"));
}

#[test]
fn end_of_input_is_an_error() {
    let monitor = ReportMonitor(REPORT);
    let (selection, _) = select(&monitor, Branch::Video, "");
    assert!(matches!(selection, Err(StreamError::Device(_))));
}

#[test]
fn monitor_failure_is_a_device_error() {
    let (selection, _) = select(&BrokenMonitor, Branch::Audio, "1\n");
    match selection {
        Err(StreamError::Device(message)) => {
            assert!(message.contains("gst-device-monitor-1.0"), "{}", message)
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
