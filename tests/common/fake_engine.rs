#![allow(dead_code)]

use rtpcast::engine::{Branch, EngineError, LoopMessage, MediaEngine, PipelineState, PropertyValue};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

/// One call made against the fake engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreatePipeline(String),
    CreateElement { factory: String, name: String },
    SetProperty { element: String, name: String, value: String },
    Add { pipeline: String, element: String },
    Link { pipeline: String, upstream: String, downstream: String },
    SetState { pipeline: String, state: PipelineState },
    Watch { pipeline: String, branch: Branch },
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub name: String,
    pub factory: String,
}

#[derive(Debug)]
pub struct FakePipeline {
    pub name: String,
    pub elements: Vec<String>,
}

/// Media engine that records every call and fails on request.
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    senders: Mutex<Vec<(Branch, Sender<LoopMessage>)>>,
    missing_factories: Vec<&'static str>,
    rejected_properties: Vec<(&'static str, &'static str)>,
    failing_links: Vec<&'static str>,
    failing_state: Option<(&'static str, PipelineState)>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_factory(mut self, factory: &'static str) -> Self {
        self.missing_factories.push(factory);
        self
    }

    pub fn rejecting_property(mut self, factory: &'static str, property: &'static str) -> Self {
        self.rejected_properties.push((factory, property));
        self
    }

    /// Links into an element of `factory` fail.
    pub fn failing_link_into(mut self, factory: &'static str) -> Self {
        self.failing_links.push(factory);
        self
    }

    pub fn failing_state(mut self, pipeline: &'static str, state: PipelineState) -> Self {
        self.failing_state = Some((pipeline, state));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_factories(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateElement { factory, .. } => Some(factory),
                _ => None,
            })
            .collect()
    }

    pub fn links(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Link {
                    upstream,
                    downstream,
                    ..
                } => Some((upstream, downstream)),
                _ => None,
            })
            .collect()
    }

    /// State requests in order, as (pipeline, state).
    pub fn state_requests(&self) -> Vec<(String, PipelineState)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetState { pipeline, state } => Some((pipeline, state)),
                _ => None,
            })
            .collect()
    }

    pub fn null_count(&self, pipeline: &str) -> usize {
        self.state_requests()
            .iter()
            .filter(|(name, state)| name == pipeline && *state == PipelineState::Null)
            .count()
    }

    /// The sender handed to `watch` for `branch`, to inject events.
    pub fn sender(&self, branch: Branch) -> Option<Sender<LoopMessage>> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .find(|(b, _)| *b == branch)
            .map(|(_, tx)| tx.clone())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MediaEngine for FakeEngine {
    type Element = FakeElement;
    type Pipeline = FakePipeline;

    fn create_pipeline(&self, name: &str) -> Result<FakePipeline, EngineError> {
        self.record(Call::CreatePipeline(name.to_string()));
        Ok(FakePipeline {
            name: name.to_string(),
            elements: Vec::new(),
        })
    }

    fn create_element(&self, factory: &str, name: &str) -> Result<FakeElement, EngineError> {
        self.record(Call::CreateElement {
            factory: factory.to_string(),
            name: name.to_string(),
        });
        if self.missing_factories.iter().any(|f| *f == factory) {
            return Err(EngineError::UnknownStageType(factory.to_string()));
        }
        Ok(FakeElement {
            name: name.to_string(),
            factory: factory.to_string(),
        })
    }

    fn set_property(
        &self,
        element: &mut FakeElement,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), EngineError> {
        self.record(Call::SetProperty {
            element: element.name.clone(),
            name: name.to_string(),
            value: value.to_launch_value(),
        });
        if self
            .rejected_properties
            .iter()
            .any(|(factory, property)| *factory == element.factory && *property == name)
        {
            return Err(EngineError::InvalidProperty {
                stage: element.name.clone(),
                property: name.to_string(),
                value: value.to_launch_value(),
                reason: "rejected by fake engine".to_string(),
            });
        }
        Ok(())
    }

    fn add_element(&self, pipeline: &mut FakePipeline, element: &FakeElement) -> Result<(), EngineError> {
        self.record(Call::Add {
            pipeline: pipeline.name.clone(),
            element: element.name.clone(),
        });
        pipeline.elements.push(element.name.clone());
        Ok(())
    }

    fn link(
        &self,
        pipeline: &mut FakePipeline,
        upstream: &FakeElement,
        downstream: &FakeElement,
    ) -> Result<(), EngineError> {
        self.record(Call::Link {
            pipeline: pipeline.name.clone(),
            upstream: upstream.name.clone(),
            downstream: downstream.name.clone(),
        });
        if self.failing_links.iter().any(|f| *f == downstream.factory) {
            return Err(EngineError::LinkFailed {
                upstream: upstream.name.clone(),
                downstream: downstream.name.clone(),
            });
        }
        Ok(())
    }

    fn set_state(&self, pipeline: &mut FakePipeline, state: PipelineState) -> Result<(), EngineError> {
        self.record(Call::SetState {
            pipeline: pipeline.name.clone(),
            state,
        });
        if self
            .failing_state
            .is_some_and(|(name, target)| name == pipeline.name && target == state)
        {
            return Err(EngineError::StateChange {
                pipeline: pipeline.name.clone(),
                target: state.to_string(),
                reason: "refused by fake engine".to_string(),
            });
        }
        Ok(())
    }

    fn watch(
        &self,
        pipeline: &mut FakePipeline,
        branch: Branch,
        sender: Sender<LoopMessage>,
    ) -> Result<(), EngineError> {
        self.record(Call::Watch {
            pipeline: pipeline.name.clone(),
            branch,
        });
        self.senders.lock().unwrap().push((branch, sender));
        Ok(())
    }
}
