//! Media engine capability.
//!
//! The materializer and the lifecycle coordinator only talk to a
//! [`MediaEngine`]. Two engines exist: [`LaunchEngine`] drives the
//! `gst-launch-1.0` tool, and `GstEngine` (behind the `gstreamer` feature)
//! uses the GStreamer libraries directly.

mod inspect;
mod launch;
#[cfg(feature = "gstreamer")]
mod gst;

pub use inspect::{
    ElementInfo, ElementInspector, MediaFormat, PropertyKind, PropertySpec, parse_element_info,
};
pub use launch::{LaunchElement, LaunchEngine, LaunchOutputParser, LaunchPipeline};
#[cfg(feature = "gstreamer")]
pub use gst::GstEngine;

use std::fmt;
use std::sync::mpsc::Sender;

use super::error::EngineError;
use super::graph::{Branch, PropertyValue};

/// Target state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Null => "NULL",
            PipelineState::Ready => "READY",
            PipelineState::Paused => "PAUSED",
            PipelineState::Playing => "PLAYING",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a running pipeline reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    EndOfStream,
    Error {
        message: String,
        debug: Option<String>,
    },
    StateChanged {
        state: String,
    },
    Warning {
        message: String,
    },
}

impl PipelineEvent {
    /// End of stream and errors end the whole stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::EndOfStream | PipelineEvent::Error { .. })
    }
}

/// Message delivered to the coordinator's run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopMessage {
    Pipeline { branch: Branch, event: PipelineEvent },
    /// User interrupt (Ctrl-C)
    Interrupted,
}

/// Operations needed to build and run a linear pipeline.
///
/// Elements are added to a pipeline before they are linked, and properties
/// are applied before an element is added.
pub trait MediaEngine {
    type Element;
    type Pipeline;

    fn create_pipeline(&self, name: &str) -> Result<Self::Pipeline, EngineError>;

    fn create_element(&self, factory: &str, name: &str) -> Result<Self::Element, EngineError>;

    fn set_property(
        &self,
        element: &mut Self::Element,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), EngineError>;

    fn add_element(
        &self,
        pipeline: &mut Self::Pipeline,
        element: &Self::Element,
    ) -> Result<(), EngineError>;

    fn link(
        &self,
        pipeline: &mut Self::Pipeline,
        upstream: &Self::Element,
        downstream: &Self::Element,
    ) -> Result<(), EngineError>;

    fn set_state(
        &self,
        pipeline: &mut Self::Pipeline,
        state: PipelineState,
    ) -> Result<(), EngineError>;

    /// Forward the pipeline's events to `sender`, tagged with `branch`.
    fn watch(
        &self,
        pipeline: &mut Self::Pipeline,
        branch: Branch,
        sender: Sender<LoopMessage>,
    ) -> Result<(), EngineError>;
}
