//! Capture device discovery and interactive selection.
//!
//! Devices come from a [`DeviceMonitor`]. The default monitor shells out to
//! `gst-device-monitor-1.0` and parses its report; the native GStreamer
//! backend provides its own implementation.

use std::io::{BufRead, Write};
use std::process::Command;

use tracing::{debug, warn};

use super::error::{EngineError, StreamError};
use super::graph::{Branch, PropertyValue};
use super::platform::Platform;

/// Device class used when enumerating sources for a branch.
pub fn device_class(branch: Branch) -> &'static str {
    match branch {
        Branch::Video => "Video/Source",
        Branch::Audio => "Audio/Source",
    }
}

/// Caps filter applied while enumerating sources for a branch.
pub fn device_caps(branch: Branch) -> &'static str {
    match branch {
        Branch::Video => "video/x-raw",
        Branch::Audio => "audio/x-raw",
    }
}

/// Label shown for the synthetic source of a branch.
pub fn test_source_label(branch: Branch) -> &'static str {
    match branch {
        Branch::Video => "videotestsrc",
        Branch::Audio => "audiotestsrc",
    }
}

/// A capture device reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    display_name: String,
    class: String,
    index: usize,
    /// Provider properties (`api.v4l2.path`, `avf.unique_id`, ...)
    properties: Vec<(String, String)>,
    /// Element properties suggested by the provider for its source element
    element_properties: Vec<(String, String)>,
}

impl DeviceHandle {
    pub fn new(display_name: impl Into<String>, class: impl Into<String>, index: usize) -> Self {
        Self {
            display_name: display_name.into(),
            class: class.into(),
            index,
            properties: Vec::new(),
            element_properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_element_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.element_properties.push((key.into(), value.into()));
        self
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Position in the enumeration this handle came from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        lookup(&self.properties, key)
    }

    fn element_property(&self, key: &str) -> Option<&str> {
        lookup(&self.element_properties, key)
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.property(key))
    }

    /// Property that points the platform's source element at this device.
    ///
    /// Returns `None` when the device carries nothing usable, in which case
    /// the source element opens its default device.
    pub fn identifying_property(
        &self,
        platform: Platform,
        branch: Branch,
    ) -> Option<(&'static str, PropertyValue)> {
        match (platform, branch) {
            (Platform::MacOs, Branch::Video) => {
                let index = self
                    .element_property("device-index")
                    .or_else(|| self.property("device-index"))
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(self.index as i64);
                Some(("device-index", PropertyValue::Int(index)))
            }
            (Platform::MacOs, Branch::Audio) => {
                if let Some(id) = self.element_property("unique-id").or_else(|| self.property("unique-id")) {
                    return Some(("unique-id", PropertyValue::from(id.to_string())));
                }
                self.element_property("device")
                    .and_then(|v| v.parse::<i64>().ok())
                    .map(|id| ("device", PropertyValue::Int(id)))
            }
            (Platform::Linux, Branch::Video) => self
                .element_property("device")
                .or_else(|| self.first_of(&["api.v4l2.path", "device.path", "device", "path"]))
                .map(|path| ("device", PropertyValue::from(path.to_string()))),
            (Platform::Linux, Branch::Audio) => self
                .element_property("target-object")
                .or_else(|| {
                    self.first_of(&["target-object", "object.serial", "node.name", "node.id"])
                })
                .map(|target| ("target-object", PropertyValue::from(target.to_string()))),
        }
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.as_str())
}

/// Which source feeds a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelection {
    Device(DeviceHandle),
    TestSource { label: String },
}

impl DeviceSelection {
    /// The synthetic source for a branch.
    pub fn test_source(branch: Branch) -> Self {
        DeviceSelection::TestSource {
            label: test_source_label(branch).to_string(),
        }
    }

    pub fn is_test_source(&self) -> bool {
        matches!(self, DeviceSelection::TestSource { .. })
    }

    pub fn display_name(&self) -> &str {
        match self {
            DeviceSelection::Device(handle) => handle.display_name(),
            DeviceSelection::TestSource { label } => label,
        }
    }
}

/// Enumerates capture devices of one class.
pub trait DeviceMonitor {
    fn enumerate(&self, class: &str, caps: &str) -> Result<Vec<DeviceHandle>, EngineError>;
}

/// Device monitor backed by the `gst-device-monitor-1.0` tool.
#[derive(Debug, Default, Clone)]
pub struct ToolDeviceMonitor;

impl DeviceMonitor for ToolDeviceMonitor {
    fn enumerate(&self, class: &str, caps: &str) -> Result<Vec<DeviceHandle>, EngineError> {
        let filter = format!("{}:{}", class, caps);
        debug!(filter = %filter, "running gst-device-monitor-1.0");

        let output = Command::new("gst-device-monitor-1.0")
            .arg(&filter)
            .output()
            .map_err(|e| {
                EngineError::Unavailable(format!("gst-device-monitor-1.0 could not be run: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Unavailable(format!(
                "gst-device-monitor-1.0 failed: {}",
                stderr.trim()
            )));
        }

        let report = String::from_utf8_lossy(&output.stdout);
        Ok(parse_monitor_report(&report, class))
    }
}

/// Parse a `gst-device-monitor-1.0` report into handles, keeping only
/// devices of `class`.
pub fn parse_monitor_report(report: &str, class: &str) -> Vec<DeviceHandle> {
    let mut devices: Vec<DeviceHandle> = Vec::new();
    let mut current: Option<DeviceHandle> = None;
    let mut in_properties = false;

    let finish = |device: Option<DeviceHandle>, devices: &mut Vec<DeviceHandle>| {
        if let Some(mut device) = device {
            if device.class == class {
                device.index = devices.len();
                devices.push(device);
            }
        }
    };

    for raw in report.lines() {
        let line = raw.trim();

        if line.starts_with("Device found:") {
            finish(current.take(), &mut devices);
            current = Some(DeviceHandle::new("", "", 0));
            in_properties = false;
            continue;
        }

        let Some(device) = current.as_mut() else {
            continue;
        };

        if line.is_empty() {
            in_properties = false;
            continue;
        }

        if let Some(hint) = line.strip_prefix("gst-launch-1.0 ") {
            in_properties = false;
            device.element_properties = parse_launch_hint(hint);
            continue;
        }

        if line == "properties:" {
            in_properties = true;
            continue;
        }

        if in_properties {
            if let Some((key, value)) = line.split_once(" = ") {
                device
                    .properties
                    .push((key.trim().to_string(), unquote(value.trim()).to_string()));
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            match key.trim() {
                "name" => device.display_name = value.trim().to_string(),
                "class" => device.class = value.trim().to_string(),
                _ => {}
            }
        }
    }
    finish(current.take(), &mut devices);

    devices
}

/// `v4l2src device=/dev/video0 ! ...` -> `[("device", "/dev/video0")]`
fn parse_launch_hint(hint: &str) -> Vec<(String, String)> {
    let source = hint.split('!').next().unwrap_or_default();
    let tokens = shlex::split(source).unwrap_or_default();
    tokens
        .iter()
        .skip(1)
        .filter_map(|token| token.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Ask the user to pick a device for `branch`.
///
/// Entry 0 is always the test source. Invalid entries re-prompt; end of
/// input is an error. With no devices the test source is used without
/// asking.
pub fn prompt_selection<R: BufRead, W: Write>(
    branch: Branch,
    devices: Vec<DeviceHandle>,
    input: &mut R,
    output: &mut W,
) -> Result<DeviceSelection, StreamError> {
    let class = device_class(branch);
    let label = test_source_label(branch);
    let io_err = |e: std::io::Error| StreamError::Device(format!("failed to write prompt: {}", e));

    if devices.is_empty() {
        warn!(class, "no devices found, falling back to test source");
        writeln!(output, "\nNo {} devices found, using Test Source ({})", class, label)
            .map_err(io_err)?;
        return Ok(DeviceSelection::test_source(branch));
    }

    writeln!(output, "\nAvailable {} devices:", class).map_err(io_err)?;
    writeln!(output, "  0: Test Source ({})", label).map_err(io_err)?;
    for (i, device) in devices.iter().enumerate() {
        writeln!(output, "  {}: {}", i + 1, device.display_name()).map_err(io_err)?;
    }

    let max = devices.len();
    loop {
        write!(output, "Select device [0-{}]: ", max).map_err(io_err)?;
        output.flush().map_err(io_err)?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| StreamError::Device(format!("failed to read input: {}", e)))?;
        if read == 0 {
            return Err(StreamError::Device(format!(
                "no {} device selected (end of input)",
                branch
            )));
        }

        match line.trim().parse::<usize>() {
            Ok(0) => return Ok(DeviceSelection::test_source(branch)),
            Ok(n) if n <= max => {
                let mut devices = devices;
                return Ok(DeviceSelection::Device(devices.swap_remove(n - 1)));
            }
            _ => {
                writeln!(
                    output,
                    "Invalid selection. Please enter a number between 0 and {}.",
                    max
                )
                .map_err(io_err)?;
            }
        }
    }
}

/// Enumerate devices for `branch` and prompt for one.
pub fn select_device<M, R, W>(
    monitor: &M,
    branch: Branch,
    input: &mut R,
    output: &mut W,
) -> Result<DeviceSelection, StreamError>
where
    M: DeviceMonitor + ?Sized,
    R: BufRead,
    W: Write,
{
    let devices = monitor
        .enumerate(device_class(branch), device_caps(branch))
        .map_err(|e| StreamError::Device(e.to_string()))?;
    debug!(%branch, count = devices.len(), "enumerated devices");
    prompt_selection(branch, devices, input, output)
}
