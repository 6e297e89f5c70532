//! Native engine on the GStreamer libraries.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use gstreamer as gst;
use gst::glib;
use gst::prelude::*;
use tracing::{debug, warn};

use super::{LoopMessage, MediaEngine, PipelineEvent, PipelineState};
use crate::engine::device::{DeviceHandle, DeviceMonitor};
use crate::engine::error::EngineError;
use crate::engine::graph::{Branch, PropertyValue};

const BUS_POLL_MS: u64 = 100;

/// Pipeline plus the thread polling its bus.
pub struct GstPipeline {
    pipeline: gst::Pipeline,
    stop: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

impl GstPipeline {
    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            watcher.join().ok();
        }
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(pipeline = %self.pipeline.name(), error = %e, "failed to reset pipeline on drop");
        }
    }
}

/// Media engine using GStreamer elements in-process.
#[derive(Debug)]
pub struct GstEngine;

impl GstEngine {
    pub fn new() -> Result<Self, EngineError> {
        gst::init().map_err(|e| EngineError::Unavailable(format!("GStreamer init failed: {}", e)))?;
        Ok(Self)
    }
}

fn to_gst_state(state: PipelineState) -> gst::State {
    match state {
        PipelineState::Null => gst::State::Null,
        PipelineState::Ready => gst::State::Ready,
        PipelineState::Paused => gst::State::Paused,
        PipelineState::Playing => gst::State::Playing,
    }
}

fn to_glib_value(
    element: &gst::Element,
    name: &str,
    value: &PropertyValue,
) -> Result<glib::Value, String> {
    let pspec = element
        .find_property(name)
        .ok_or_else(|| "no such property".to_string())?;
    let value_type = pspec.value_type();

    match value {
        PropertyValue::Caps(caps) => gst::Caps::from_str(&caps.to_string())
            .map(|c| c.to_value())
            .map_err(|e| format!("invalid caps: {}", e)),
        PropertyValue::Str(s) if value_type == glib::Type::STRING => Ok(s.to_value()),
        other => glib::Value::deserialize(&other.to_string(), value_type)
            .map_err(|e| format!("cannot convert to {}: {}", value_type, e)),
    }
}

impl MediaEngine for GstEngine {
    type Element = gst::Element;
    type Pipeline = GstPipeline;

    fn create_pipeline(&self, name: &str) -> Result<Self::Pipeline, EngineError> {
        Ok(GstPipeline {
            pipeline: gst::Pipeline::with_name(name),
            stop: Arc::new(AtomicBool::new(false)),
            watcher: None,
        })
    }

    fn create_element(&self, factory: &str, name: &str) -> Result<Self::Element, EngineError> {
        gst::ElementFactory::make(factory)
            .name(name)
            .build()
            .map_err(|_| EngineError::UnknownStageType(factory.to_string()))
    }

    fn set_property(
        &self,
        element: &mut Self::Element,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), EngineError> {
        let converted =
            to_glib_value(element, name, value).map_err(|reason| EngineError::InvalidProperty {
                stage: element.name().to_string(),
                property: name.to_string(),
                value: value.to_string(),
                reason,
            })?;
        element.set_property_from_value(name, &converted);
        Ok(())
    }

    fn add_element(
        &self,
        pipeline: &mut Self::Pipeline,
        element: &Self::Element,
    ) -> Result<(), EngineError> {
        pipeline
            .pipeline
            .add(element)
            .map_err(|e| EngineError::StateChange {
                pipeline: pipeline.pipeline.name().to_string(),
                target: "add".to_string(),
                reason: e.to_string(),
            })
    }

    fn link(
        &self,
        _pipeline: &mut Self::Pipeline,
        upstream: &Self::Element,
        downstream: &Self::Element,
    ) -> Result<(), EngineError> {
        upstream
            .link(downstream)
            .map_err(|_| EngineError::LinkFailed {
                upstream: upstream.name().to_string(),
                downstream: downstream.name().to_string(),
            })
    }

    fn set_state(
        &self,
        pipeline: &mut Self::Pipeline,
        state: PipelineState,
    ) -> Result<(), EngineError> {
        pipeline
            .pipeline
            .set_state(to_gst_state(state))
            .map(|_| ())
            .map_err(|e| EngineError::StateChange {
                pipeline: pipeline.pipeline.name().to_string(),
                target: state.to_string(),
                reason: e.to_string(),
            })
    }

    fn watch(
        &self,
        pipeline: &mut Self::Pipeline,
        branch: Branch,
        sender: Sender<LoopMessage>,
    ) -> Result<(), EngineError> {
        let bus = pipeline.pipeline.bus().ok_or_else(|| {
            EngineError::Unavailable(format!("{} has no bus", pipeline.pipeline.name()))
        })?;
        let stop = pipeline.stop.clone();
        let pipeline_obj = pipeline.pipeline.clone().upcast::<gst::Object>();

        let handle = thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(BUS_POLL_MS)) else {
                    continue;
                };

                let event = match msg.view() {
                    gst::MessageView::Eos(..) => PipelineEvent::EndOfStream,
                    gst::MessageView::Error(err) => PipelineEvent::Error {
                        message: err.error().to_string(),
                        debug: err.debug().map(|d| d.to_string()),
                    },
                    gst::MessageView::Warning(w) => PipelineEvent::Warning {
                        message: w.error().to_string(),
                    },
                    gst::MessageView::StateChanged(sc)
                        if msg.src() == Some(&pipeline_obj) =>
                    {
                        PipelineEvent::StateChanged {
                            state: format!("{:?}", sc.current()).to_uppercase(),
                        }
                    }
                    _ => continue,
                };

                if sender.send(LoopMessage::Pipeline { branch, event }).is_err() {
                    debug!(%branch, "run loop gone, stopping bus watch");
                    break;
                }
            }
        });

        pipeline.watcher = Some(handle);
        Ok(())
    }
}

impl DeviceMonitor for GstEngine {
    fn enumerate(&self, class: &str, caps: &str) -> Result<Vec<DeviceHandle>, EngineError> {
        let monitor = gst::DeviceMonitor::new();
        let filter = gst::Caps::from_str(caps).ok();
        monitor.add_filter(Some(class), filter.as_ref());
        monitor
            .start()
            .map_err(|e| EngineError::Unavailable(format!("device monitor failed: {}", e)))?;
        let devices = monitor.devices();
        monitor.stop();

        let handles = devices
            .iter()
            .enumerate()
            .map(|(index, device)| {
                let mut handle = DeviceHandle::new(
                    device.display_name().to_string(),
                    device.device_class().to_string(),
                    index,
                );
                if let Some(props) = device.properties() {
                    for (key, value) in props.iter() {
                        let rendered = value
                            .get::<String>()
                            .ok()
                            .or_else(|| value.serialize().ok().map(|s| s.to_string()))
                            .unwrap_or_default();
                        handle = handle.with_property(key.as_str(), rendered);
                    }
                }
                handle
            })
            .collect();

        Ok(handles)
    }
}
