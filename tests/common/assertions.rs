#![allow(dead_code)]

use rtpcast::engine::{PipelineGraph, StageRole};

/// Shape every compiled graph must have: one source first, one udpsink last,
/// and a queue right in front of the encoder.
pub fn assert_linear_shape(graph: &PipelineGraph) {
    let roles = graph.roles();
    assert_eq!(roles.first(), Some(&StageRole::Source), "{}", graph.launch_line());
    assert_eq!(roles.last(), Some(&StageRole::Sink), "{}", graph.launch_line());
    assert_eq!(graph.sink().factory, "udpsink");
    assert_eq!(
        roles.iter().filter(|r| **r == StageRole::Source).count(),
        1,
        "{}",
        graph.launch_line()
    );
    assert_eq!(
        roles.iter().filter(|r| **r == StageRole::Sink).count(),
        1,
        "{}",
        graph.launch_line()
    );

    let encoder = graph
        .position(StageRole::Encoder)
        .unwrap_or_else(|| panic!("no encoder in: {}", graph.launch_line()));
    assert_eq!(
        roles[encoder - 1],
        StageRole::Queue,
        "queue must precede encoder: {}",
        graph.launch_line()
    );

    let payloader = graph
        .position(StageRole::Payloader)
        .unwrap_or_else(|| panic!("no payloader in: {}", graph.launch_line()));
    assert!(payloader > encoder, "{}", graph.launch_line());
    assert_eq!(payloader + 1, graph.len() - 1, "{}", graph.launch_line());
}

/// Assert the launch line contains each fragment, in the given order.
pub fn assert_contains_in_order(line: &str, fragments: &[&str]) {
    let mut rest = line;
    for fragment in fragments {
        match rest.find(fragment) {
            Some(at) => rest = &rest[at + fragment.len()..],
            None => panic!("'{}' missing or out of order in: {}", fragment, line),
        }
    }
}
