//! Error taxonomy for the streaming engine.
//!
//! Configuration problems are caught before any engine interaction,
//! construction problems while materializing a graph, and runtime problems
//! while both pipelines are playing.

use thiserror::Error;

use super::graph::Branch;

/// Invalid user input, detected before anything touches the media engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported encoder: {token}\n\n{remediation}")]
    UnknownEncoder { token: String, remediation: String },

    #[error("unsupported resolution: {token}\n\n{remediation}")]
    UnknownResolution { token: String, remediation: String },

    #[error("{message}\n\n{remediation}")]
    IncompatibleConfiguration { message: String, remediation: String },

    #[error("invalid address format: {reason}\nExpected format: host:port (e.g., 192.168.1.10:5000)")]
    InvalidAddress { reason: String },

    #[error("invalid audio port {port}: {reason}")]
    InvalidAudioPort { port: u32, reason: String },

    #[error("invalid framerate {0}: must be between 1 and 240")]
    InvalidFramerate(u32),

    #[error(
        "requires exactly 3 arguments: [encoder] [resolution] [host:port], got {0}\nUse --help for more information or --list to see supported encoders and resolutions"
    )]
    WrongArgumentCount(usize),

    #[error("unsupported OS: {0} (supported: linux, macos)")]
    UnsupportedPlatform(String),
}

/// A compiled stage sequence that does not have the shape of a linear
/// source-to-sink pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{0} pipeline has no stages")]
    Empty(Branch),

    #[error("{branch} pipeline must start with a source stage, found '{found}'")]
    MissingSource { branch: Branch, found: String },

    #[error("{branch} pipeline must end with a network sink stage, found '{found}'")]
    MissingSink { branch: Branch, found: String },

    #[error("{branch} pipeline has a stray {role} stage at position {index}")]
    MisplacedTerminal {
        branch: Branch,
        role: &'static str,
        index: usize,
    },
}

/// Failures reported by the media engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown stage type '{0}' (is the GStreamer plugin providing it installed?)")]
    UnknownStageType(String),

    #[error("stage '{stage}' rejected property {property}={value}: {reason}")]
    InvalidProperty {
        stage: String,
        property: String,
        value: String,
        reason: String,
    },

    #[error("failed to link {upstream} to {downstream}")]
    LinkFailed { upstream: String, downstream: String },

    #[error("failed to change pipeline '{pipeline}' to {target}: {reason}")]
    StateChange {
        pipeline: String,
        target: String,
        reason: String,
    },

    #[error("media engine unavailable: {0}")]
    Unavailable(String),

    #[error("media engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for a streaming run.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("failed to create {branch} pipeline: {source}")]
    Construction {
        branch: Branch,
        #[source]
        source: EngineError,
    },

    #[error("failed to start {branch} pipeline: {source}")]
    StateChange {
        branch: Branch,
        #[source]
        source: EngineError,
    },

    #[error("{branch} pipeline error: {message}")]
    Runtime {
        branch: Branch,
        message: String,
        debug: Option<String>,
    },

    #[error("device selection failed: {0}")]
    Device(String),
}

impl StreamError {
    /// Diagnostic detail attached to a runtime error, if the engine supplied any.
    pub fn debug_detail(&self) -> Option<&str> {
        match self {
            StreamError::Runtime { debug, .. } => debug.as_deref(),
            _ => None,
        }
    }
}
