//! Lifecycle coordinator for the video and audio pipelines.
//!
//! Both pipelines report into one channel, and Ctrl-C is delivered into the
//! same channel. The coordinator consumes it on a single thread: the first
//! end-of-stream, error or interrupt stops both pipelines and ends the run.
//! Anything arriving after that is ignored.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use super::backend::{LoopMessage, MediaEngine, PipelineEvent, PipelineState};
use super::error::StreamError;
use super::graph::Branch;

/// Lifecycle of one pipeline handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Built,
    Playing,
    Stopping,
    Terminated,
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    EndOfStream { branch: Branch },
    Interrupted,
}

struct PipelineHandle<P> {
    branch: Branch,
    pipeline: P,
    state: HandleState,
}

impl<P> PipelineHandle<P> {
    fn new(branch: Branch, pipeline: P) -> Self {
        Self {
            branch,
            pipeline,
            state: HandleState::Built,
        }
    }
}

/// Owns both pipelines and the run loop.
pub struct Coordinator<E: MediaEngine> {
    engine: E,
    video: PipelineHandle<E::Pipeline>,
    audio: PipelineHandle<E::Pipeline>,
    sender: Sender<LoopMessage>,
    receiver: Receiver<LoopMessage>,
    exited: bool,
}

impl<E: MediaEngine> Coordinator<E> {
    pub fn new(engine: E, video: E::Pipeline, audio: E::Pipeline) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            engine,
            video: PipelineHandle::new(Branch::Video, video),
            audio: PipelineHandle::new(Branch::Audio, audio),
            sender,
            receiver,
            exited: false,
        }
    }

    /// Sender into the run loop, for interrupt handlers.
    pub fn sender(&self) -> Sender<LoopMessage> {
        self.sender.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self, branch: Branch) -> HandleState {
        match branch {
            Branch::Video => self.video.state,
            Branch::Audio => self.audio.state,
        }
    }

    pub fn pipeline(&self, branch: Branch) -> &E::Pipeline {
        match branch {
            Branch::Video => &self.video.pipeline,
            Branch::Audio => &self.audio.pipeline,
        }
    }

    /// True once a terminating message has been handled.
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Watch both pipelines, then play video and audio in that order.
    ///
    /// On failure both pipelines are set to null before the error is
    /// returned.
    pub fn start(&mut self) -> Result<(), StreamError> {
        let result = self.try_start();
        if result.is_err() {
            self.shutdown();
            self.exited = true;
        }
        result
    }

    fn try_start(&mut self) -> Result<(), StreamError> {
        for handle in [&mut self.video, &mut self.audio] {
            self.engine
                .watch(&mut handle.pipeline, handle.branch, self.sender.clone())
                .map_err(|source| StreamError::StateChange {
                    branch: handle.branch,
                    source,
                })?;
        }

        for handle in [&mut self.video, &mut self.audio] {
            self.engine
                .set_state(&mut handle.pipeline, PipelineState::Playing)
                .map_err(|source| StreamError::StateChange {
                    branch: handle.branch,
                    source,
                })?;
            handle.state = HandleState::Playing;
            info!(branch = %handle.branch, "pipeline playing");
        }
        Ok(())
    }

    /// React to one message.
    ///
    /// Returns the outcome when this message ends the run. After that every
    /// further message is ignored and `None` is returned.
    pub fn handle(&mut self, message: LoopMessage) -> Option<Result<Shutdown, StreamError>> {
        if self.exited {
            debug!(?message, "ignoring message after shutdown");
            return None;
        }

        let outcome = match message {
            LoopMessage::Interrupted => {
                info!("interrupted, stopping pipelines");
                Ok(Shutdown::Interrupted)
            }
            LoopMessage::Pipeline { branch, event } => match event {
                PipelineEvent::EndOfStream => {
                    info!(%branch, "end of stream");
                    Ok(Shutdown::EndOfStream { branch })
                }
                PipelineEvent::Error {
                    message,
                    debug: detail,
                } => {
                    // Printed once by the caller
                    debug!(%branch, %message, detail = ?detail, "pipeline error");
                    Err(StreamError::Runtime {
                        branch,
                        message,
                        debug: detail,
                    })
                }
                PipelineEvent::StateChanged { state } => {
                    debug!(%branch, %state, "state changed");
                    return None;
                }
                PipelineEvent::Warning { message } => {
                    warn!(%branch, %message, "pipeline warning");
                    return None;
                }
            },
        };

        self.shutdown();
        self.exited = true;
        Some(outcome)
    }

    /// Block on the event channel until the run ends.
    pub fn run(mut self) -> Result<Shutdown, StreamError> {
        while let Ok(message) = self.receiver.recv() {
            if let Some(outcome) = self.handle(message) {
                return outcome;
            }
        }

        // Unreachable while `self.sender` is alive.
        warn!("event channel closed, stopping pipelines");
        self.shutdown();
        self.exited = true;
        Ok(Shutdown::Interrupted)
    }

    /// Request null on each handle that has not been stopped yet, video
    /// first.
    fn shutdown(&mut self) {
        for handle in [&mut self.video, &mut self.audio] {
            if matches!(handle.state, HandleState::Stopping | HandleState::Terminated) {
                continue;
            }
            handle.state = HandleState::Stopping;
            if let Err(e) = self.engine.set_state(&mut handle.pipeline, PipelineState::Null) {
                warn!(branch = %handle.branch, error = %e, "failed to stop pipeline");
            }
            handle.state = HandleState::Terminated;
        }
    }
}
