// Streaming engine - independent of the command line

pub mod backend;
pub mod catalog;
pub mod compiler;
pub mod device;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod materialize;
pub mod platform;
pub mod stream;

pub use backend::{LaunchEngine, LoopMessage, MediaEngine, PipelineEvent, PipelineState};
pub use catalog::{
    CodecFamily, EncoderDescriptor, Resolution, check_compatibility, list_encoders,
    list_resolutions, lookup_encoder, lookup_resolution,
};
pub use compiler::{CompiledStream, compile, compile_audio, compile_video};
pub use device::{DeviceHandle, DeviceMonitor, DeviceSelection};
pub use error::{ConfigError, EngineError, GraphError, StreamError};
pub use graph::{Branch, Caps, PipelineGraph, PropertyValue, StageRole, StageSpec};
pub use lifecycle::{Coordinator, HandleState, Shutdown};
pub use materialize::{materialize, materialize_stream};
pub use platform::Platform;
pub use stream::{StreamConfig, StreamOptions, StreamTarget, TestPresentation, parse_address};
