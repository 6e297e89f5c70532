//! Graph materializer: builds engine pipelines from compiled graphs.

use tracing::debug;

use super::backend::MediaEngine;
use super::compiler::CompiledStream;
use super::error::{EngineError, StreamError};
use super::graph::{Branch, PipelineGraph};

/// Engine-side name of the element for stage `index` of a branch.
pub fn element_name(branch: Branch, index: usize, factory: &str) -> String {
    format!("{}-{}-{}", branch, index, factory)
}

/// Instantiate `graph` on `engine`.
///
/// Each stage is created, configured, added and linked to its predecessor,
/// in order. The first failure is returned and the partly built pipeline is
/// dropped without ever changing state.
pub fn materialize<E: MediaEngine>(
    engine: &E,
    graph: &PipelineGraph,
) -> Result<E::Pipeline, EngineError> {
    let branch = graph.branch();
    let mut pipeline = engine.create_pipeline(&branch.pipeline_name())?;
    let mut previous: Option<E::Element> = None;

    for (index, stage) in graph.stages().iter().enumerate() {
        let name = element_name(branch, index, stage.factory);
        let mut element = engine.create_element(stage.factory, &name)?;

        for (property, value) in &stage.properties {
            engine.set_property(&mut element, property, value)?;
        }

        engine.add_element(&mut pipeline, &element)?;
        if let Some(upstream) = &previous {
            engine.link(&mut pipeline, upstream, &element)?;
        }
        debug!(%branch, element = %name, role = %stage.role, "stage ready");
        previous = Some(element);
    }

    Ok(pipeline)
}

/// Materialize both branches, video first.
pub fn materialize_stream<E: MediaEngine>(
    engine: &E,
    stream: &CompiledStream,
) -> Result<(E::Pipeline, E::Pipeline), StreamError> {
    let build = |graph: &PipelineGraph| {
        materialize(engine, graph).map_err(|source| StreamError::Construction {
            branch: graph.branch(),
            source,
        })
    };
    let video = build(&stream.video)?;
    let audio = build(&stream.audio)?;
    Ok((video, audio))
}
