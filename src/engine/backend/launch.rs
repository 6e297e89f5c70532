//! Engine backed by the GStreamer command line tools.
//!
//! Elements, property values and link caps are checked up front against
//! `gst-inspect-1.0` reports, then a playing pipeline is one
//! `gst-launch-1.0 -e` child process. Its output is parsed line by line into
//! [`PipelineEvent`]s.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::inspect::{ElementInfo, ElementInspector, MediaFormat};
use super::{LoopMessage, MediaEngine, PipelineEvent, PipelineState};
use crate::engine::error::EngineError;
use crate::engine::graph::{Branch, PropertyValue};

const LAUNCH_PROGRAM: &str = "gst-launch-1.0";
const STOP_GRACE: Duration = Duration::from_secs(2);
const STOP_POLL: Duration = Duration::from_millis(50);

/// Element recorded by the launch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchElement {
    name: String,
    factory: String,
    properties: Vec<(String, PropertyValue)>,
    info: Option<Arc<ElementInfo>>,
}

impl LaunchElement {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn properties(&self) -> &[(String, PropertyValue)] {
        &self.properties
    }

    fn caps_filter(&self) -> Option<MediaFormat> {
        self.properties.iter().find_map(|(key, value)| match value {
            PropertyValue::Caps(caps) if key == "caps" => Some(MediaFormat::of_caps(caps)),
            _ => None,
        })
    }

    /// Formats the element takes in, `None` when unconstrained.
    fn accepted_formats(&self) -> Option<Vec<MediaFormat>> {
        match self.caps_filter() {
            Some(format) => Some(vec![format]),
            None => self.info.as_ref().and_then(|info| info.sink_formats.clone()),
        }
    }

    /// Formats the element puts out when `incoming` flows in. Elements with
    /// `ANY` src caps pass `incoming` through; uninspected ones are unknown.
    fn produced_formats(&self, incoming: Option<Vec<MediaFormat>>) -> Option<Vec<MediaFormat>> {
        if let Some(format) = self.caps_filter() {
            return Some(vec![format]);
        }
        let info = self.info.as_ref()?;
        match &info.src_formats {
            Some(formats) => Some(formats.clone()),
            None => incoming,
        }
    }

    /// `factory name=<name> key=value ...` with caps always quoted.
    pub fn launch_tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.factory.clone(), format!("name={}", self.name)];
        for (key, value) in &self.properties {
            let rendered = match value {
                PropertyValue::Caps(caps) => format!("\"{}\"", caps),
                other => other.to_launch_value(),
            };
            tokens.push(format!("{}={}", key, rendered));
        }
        tokens
    }
}

struct RunningLaunch {
    child: Child,
    stopping: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
}

/// Pipeline recorded by the launch engine; owns the child process while
/// playing.
pub struct LaunchPipeline {
    name: String,
    elements: Vec<LaunchElement>,
    /// Element indices in link order
    chain: Vec<usize>,
    /// Formats leaving the end of the chain, `None` when unknown
    tail_formats: Option<Vec<MediaFormat>>,
    watcher: Option<(Branch, Sender<LoopMessage>)>,
    state: PipelineState,
    process: Option<RunningLaunch>,
}

impl LaunchPipeline {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elements: Vec::new(),
            chain: Vec::new(),
            tail_formats: None,
            watcher: None,
            state: PipelineState::Null,
            process: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[LaunchElement] {
        &self.elements
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn is_fully_linked(&self) -> bool {
        match self.elements.len() {
            0 => false,
            1 => true,
            n => self.chain.len() == n,
        }
    }

    /// Arguments for `gst-launch-1.0`, elements in link order.
    pub fn launch_args(&self) -> Vec<String> {
        let order: Vec<usize> = if self.chain.is_empty() {
            (0..self.elements.len()).collect()
        } else {
            self.chain.clone()
        };

        let mut args = Vec::new();
        for (i, idx) in order.iter().enumerate() {
            if i > 0 {
                args.push("!".to_string());
            }
            args.extend(self.elements[*idx].launch_tokens());
        }
        args
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        let Some(mut running) = self.process.take() else {
            return Ok(());
        };
        running.stopping.store(true, Ordering::SeqCst);

        let state_error = |reason: String| EngineError::StateChange {
            pipeline: self.name.clone(),
            target: PipelineState::Null.to_string(),
            reason,
        };

        if !interrupt(&running.child) {
            running.child.kill().ok();
        }

        let deadline = Instant::now() + STOP_GRACE;
        loop {
            match running.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pipeline = %self.name, %status, "gst-launch-1.0 exited");
                    break;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(STOP_POLL),
                Ok(None) => {
                    warn!(pipeline = %self.name, "gst-launch-1.0 did not stop, killing it");
                    running.child.kill().ok();
                    running
                        .child
                        .wait()
                        .map_err(|e| state_error(format!("failed to reap gst-launch-1.0: {}", e)))?;
                    break;
                }
                Err(e) => return Err(state_error(format!("failed to wait for gst-launch-1.0: {}", e))),
            }
        }

        if let Some(monitor) = running.monitor.take() {
            monitor.join().ok();
        }
        Ok(())
    }
}

impl Drop for LaunchPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(pipeline = %self.name, error = %e, "failed to stop pipeline on drop");
        }
    }
}

/// Ask gst-launch to shut down cleanly. Returns false when the signal could
/// not be delivered.
#[cfg(unix)]
fn interrupt(child: &Child) -> bool {
    let pid = child.id() as libc::pid_t;
    // SAFETY: kill(2) on the pid of a child we spawned and have not reaped.
    unsafe { libc::kill(pid, libc::SIGINT) == 0 }
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> bool {
    false
}

/// Media engine that runs each pipeline as a `gst-launch-1.0` process.
#[derive(Debug)]
pub struct LaunchEngine {
    inspector: Option<ElementInspector>,
    launch_program: String,
}

impl Default for LaunchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchEngine {
    pub fn new() -> Self {
        Self {
            inspector: Some(ElementInspector::new()),
            launch_program: LAUNCH_PROGRAM.to_string(),
        }
    }

    /// Skip element and property checks. Pipelines still launch.
    pub fn unchecked() -> Self {
        Self {
            inspector: None,
            launch_program: LAUNCH_PROGRAM.to_string(),
        }
    }

    /// Check against `inspector` instead of a fresh `gst-inspect-1.0` cache.
    pub fn with_inspector(mut self, inspector: ElementInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn with_launch_program(mut self, program: impl Into<String>) -> Self {
        self.launch_program = program.into();
        self
    }

    fn spawn(&self, pipeline: &mut LaunchPipeline) -> Result<(), EngineError> {
        let args = pipeline.launch_args();
        info!(pipeline = %pipeline.name, "starting {}", self.launch_program);
        debug!(pipeline = %pipeline.name, args = %args.join(" "));

        let mut cmd = Command::new(&self.launch_program);
        cmd.arg("-e")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Keep terminal Ctrl-C away from the child; shutdown is driven by us.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| EngineError::StateChange {
            pipeline: pipeline.name.clone(),
            target: PipelineState::Playing.to_string(),
            reason: format!("failed to spawn {}: {}", self.launch_program, e),
        })?;

        let (line_tx, line_rx) = mpsc::channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, line_tx);
        }

        let stopping = Arc::new(AtomicBool::new(false));
        let watcher = pipeline.watcher.clone();
        let name = pipeline.name.clone();
        let stop_flag = stopping.clone();

        let monitor = thread::spawn(move || {
            let mut parser = LaunchOutputParser::new();
            let emit = |event: PipelineEvent| {
                if stop_flag.load(Ordering::SeqCst) {
                    debug!(pipeline = %name, ?event, "event while stopping");
                    return;
                }
                match &watcher {
                    Some((branch, sender)) => {
                        let _ = sender.send(LoopMessage::Pipeline {
                            branch: *branch,
                            event,
                        });
                    }
                    None => debug!(pipeline = %name, ?event, "unwatched event"),
                }
            };

            for line in line_rx {
                debug!(pipeline = %name, "{}", line);
                for event in parser.parse_line(&line) {
                    emit(event);
                }
            }
            if let Some(event) = parser.finish() {
                emit(event);
            }
            if !parser.saw_terminal() {
                emit(PipelineEvent::Error {
                    message: "gst-launch-1.0 exited without end-of-stream".to_string(),
                    debug: None,
                });
            }
        });

        pipeline.process = Some(RunningLaunch {
            child,
            stopping,
            monitor: Some(monitor),
        });
        Ok(())
    }
}

fn join_formats(formats: &[MediaFormat]) -> String {
    formats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

impl MediaEngine for LaunchEngine {
    type Element = LaunchElement;
    type Pipeline = LaunchPipeline;

    fn create_pipeline(&self, name: &str) -> Result<Self::Pipeline, EngineError> {
        Ok(LaunchPipeline::new(name))
    }

    fn create_element(&self, factory: &str, name: &str) -> Result<Self::Element, EngineError> {
        let info = match &self.inspector {
            Some(inspector) => Some(
                inspector
                    .element(factory)?
                    .ok_or_else(|| EngineError::UnknownStageType(factory.to_string()))?,
            ),
            None => None,
        };
        Ok(LaunchElement {
            name: name.to_string(),
            factory: factory.to_string(),
            properties: Vec::new(),
            info,
        })
    }

    fn set_property(
        &self,
        element: &mut Self::Element,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), EngineError> {
        if let Some(info) = &element.info {
            let rejected = |reason: String| EngineError::InvalidProperty {
                stage: element.name.clone(),
                property: name.to_string(),
                value: value.to_string(),
                reason,
            };
            let spec = info
                .property(name)
                .ok_or_else(|| rejected(format!("{} has no such property", element.factory)))?;
            spec.check(value).map_err(rejected)?;
        }
        element.properties.push((name.to_string(), value.clone()));
        Ok(())
    }

    fn add_element(
        &self,
        pipeline: &mut Self::Pipeline,
        element: &Self::Element,
    ) -> Result<(), EngineError> {
        if pipeline.index_of(&element.name).is_some() {
            return Err(EngineError::InvalidProperty {
                stage: element.name.clone(),
                property: "name".to_string(),
                value: element.name.clone(),
                reason: format!("pipeline '{}' already has an element with this name", pipeline.name),
            });
        }
        pipeline.elements.push(element.clone());
        Ok(())
    }

    fn link(
        &self,
        pipeline: &mut Self::Pipeline,
        upstream: &Self::Element,
        downstream: &Self::Element,
    ) -> Result<(), EngineError> {
        let failed = || EngineError::LinkFailed {
            upstream: upstream.name.clone(),
            downstream: downstream.name.clone(),
        };
        let up = pipeline.index_of(&upstream.name).ok_or_else(failed)?;
        let down = pipeline.index_of(&downstream.name).ok_or_else(failed)?;
        if up == down || pipeline.chain.contains(&down) {
            return Err(failed());
        }

        let extends_chain = match pipeline.chain.last() {
            None => true,
            Some(&tail) => tail == up,
        };
        if !extends_chain {
            return Err(failed());
        }

        let produced = if pipeline.chain.is_empty() {
            pipeline.elements[up].produced_formats(None)
        } else {
            pipeline.tail_formats.clone()
        };
        let flowing = match (produced, pipeline.elements[down].accepted_formats()) {
            (Some(produced), Some(accepted)) => {
                let common: Vec<MediaFormat> = produced
                    .iter()
                    .filter(|format| accepted.iter().any(|a| a.accepts(format)))
                    .cloned()
                    .collect();
                if common.is_empty() {
                    debug!(
                        upstream = %upstream.name,
                        downstream = %downstream.name,
                        produced = %join_formats(&produced),
                        accepted = %join_formats(&accepted),
                        "caps do not intersect"
                    );
                    return Err(failed());
                }
                Some(common)
            }
            (Some(produced), None) => Some(produced),
            (None, accepted) => accepted,
        };

        if pipeline.chain.is_empty() {
            pipeline.chain.push(up);
        }
        pipeline.chain.push(down);
        pipeline.tail_formats = pipeline.elements[down].produced_formats(flowing);
        Ok(())
    }

    fn set_state(
        &self,
        pipeline: &mut Self::Pipeline,
        state: PipelineState,
    ) -> Result<(), EngineError> {
        match state {
            PipelineState::Playing => {
                if pipeline.process.is_none() {
                    if !pipeline.is_fully_linked() {
                        return Err(EngineError::StateChange {
                            pipeline: pipeline.name.clone(),
                            target: state.to_string(),
                            reason: "pipeline has unlinked elements".to_string(),
                        });
                    }
                    self.spawn(pipeline)?;
                }
            }
            PipelineState::Null => pipeline.stop()?,
            PipelineState::Ready | PipelineState::Paused => {}
        }
        pipeline.state = state;
        Ok(())
    }

    fn watch(
        &self,
        pipeline: &mut Self::Pipeline,
        branch: Branch,
        sender: Sender<LoopMessage>,
    ) -> Result<(), EngineError> {
        pipeline.watcher = Some((branch, sender));
        Ok(())
    }
}

#[derive(Debug)]
struct PendingError {
    message: String,
    expect_debug: bool,
}

/// Turns `gst-launch-1.0` output lines into pipeline events.
///
/// Errors span several lines (`ERROR: ...`, `Additional debug info:`, the
/// detail line), so the parser keeps an error pending until its detail
/// arrives or another line shows up.
#[derive(Debug, Default)]
pub struct LaunchOutputParser {
    pending: Option<PendingError>,
    terminal_seen: bool,
}

impl LaunchOutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether end-of-stream or an error has been reported.
    pub fn saw_terminal(&self) -> bool {
        self.terminal_seen
    }

    /// Parse a single line of gst-launch output
    pub fn parse_line(&mut self, line: &str) -> Vec<PipelineEvent> {
        let line = line.trim();
        let mut events = Vec::new();

        if let Some(pending) = self.pending.as_mut() {
            if line == "Additional debug info:" {
                pending.expect_debug = true;
                return events;
            }
            if pending.expect_debug && !line.is_empty() {
                let debug = Some(line.to_string());
                events.extend(self.flush(debug));
                return events;
            }
            events.extend(self.flush(None));
        }

        if let Some(rest) = line.strip_prefix("ERROR: ") {
            self.pending = Some(PendingError {
                message: rest.to_string(),
                expect_debug: false,
            });
        } else if let Some(rest) = line.strip_prefix("WARNING: erroneous pipeline: ") {
            events.push(self.terminal(PipelineEvent::Error {
                message: format!("erroneous pipeline: {}", rest),
                debug: None,
            }));
        } else if let Some(rest) = line.strip_prefix("WARNING: ") {
            events.push(PipelineEvent::Warning {
                message: rest.to_string(),
            });
        } else if line.starts_with("Got EOS from element") {
            events.push(self.terminal(PipelineEvent::EndOfStream));
        } else if let Some(rest) = line.strip_prefix("Setting pipeline to ") {
            let state = rest.split_whitespace().next().unwrap_or_default();
            if !state.is_empty() {
                events.push(PipelineEvent::StateChanged {
                    state: state.to_string(),
                });
            }
        }

        events
    }

    /// Flush anything still pending once output has ended.
    pub fn finish(&mut self) -> Option<PipelineEvent> {
        self.flush(None)
    }

    fn flush(&mut self, debug: Option<String>) -> Option<PipelineEvent> {
        let pending = self.pending.take()?;
        Some(self.terminal(PipelineEvent::Error {
            message: pending.message,
            debug,
        }))
    }

    fn terminal(&mut self, event: PipelineEvent) -> PipelineEvent {
        self.terminal_seen = true;
        event
    }
}
