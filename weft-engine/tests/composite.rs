//! Composite components and boundary bridging.

mod common;

use std::sync::Arc;
use weft_components::{Capture, Copy, Inject, LineToWords, StartsWith};
use weft_engine::prelude::*;

fn relay_graph() -> Graph {
    let mut inner = Graph::new("relay_inner");
    inner.add_component("copy", Arc::new(Copy)).unwrap();
    inner.export("copy.IN", "IN").unwrap();
    inner.export("copy.OUT", "OUT").unwrap();
    inner
}

#[tokio::test]
async fn packets_flow_through_a_composite() {
    let relay = SubGraph::new("relay", relay_graph()).unwrap();
    let capture = Capture::new();
    let values = capture.values();

    let mut graph = Graph::new("composite_flow");
    graph.add_component("source", Arc::new(Inject)).unwrap();
    graph.add_component("relay", Arc::new(relay)).unwrap();
    graph.add_component("sink", Arc::new(capture)).unwrap();
    graph.initialize("source.CONST", "through").unwrap();
    graph.connect("source.OUT", "relay.IN").unwrap();
    graph.connect("relay.OUT", "sink.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);

    let captured: Vec<String> = values.lock().iter().filter_map(|v| v.as_string()).collect();
    assert_eq!(captured, vec!["through".to_string()]);
}

#[tokio::test]
async fn iip_on_a_composite_port_feeds_the_inner_network() {
    let relay = SubGraph::new("relay", relay_graph()).unwrap();
    let capture = Capture::new();
    let values = capture.values();

    let mut graph = Graph::new("composite_iip");
    graph.add_component("relay", Arc::new(relay)).unwrap();
    graph.add_component("sink", Arc::new(capture)).unwrap();
    graph.initialize("relay.IN", "seeded").unwrap();
    graph.connect("relay.OUT", "sink.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(values.lock()[0].as_string(), Some("seeded".to_string()));
}

#[tokio::test]
async fn composites_nest() {
    let mut middle = Graph::new("middle");
    let inner_relay = SubGraph::new("inner_relay", relay_graph()).unwrap();
    middle.add_component("hop", Arc::new(inner_relay)).unwrap();
    middle.export("hop.IN", "IN").unwrap();
    middle.export("hop.OUT", "OUT").unwrap();

    let outer_relay = SubGraph::new("outer_relay", middle).unwrap();
    let capture = Capture::new();
    let values = capture.values();

    let mut graph = Graph::new("nested");
    graph.add_component("source", Arc::new(Inject)).unwrap();
    graph.add_component("relay", Arc::new(outer_relay)).unwrap();
    graph.add_component("sink", Arc::new(capture)).unwrap();
    graph.initialize("source.CONST", "deep").unwrap();
    graph.connect("source.OUT", "relay.IN").unwrap();
    graph.connect("relay.OUT", "sink.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(values.lock()[0].as_string(), Some("deep".to_string()));
}

#[tokio::test]
async fn composite_declares_the_inner_port_surface() {
    let mut inner = Graph::new("filter_inner");
    inner.add_component("splitter", Arc::new(LineToWords)).unwrap();
    inner.add_component("filter", Arc::new(StartsWith)).unwrap();
    inner.connect("splitter.OUT", "filter.IN").unwrap();
    inner.export("splitter.IN", "LINE").unwrap();
    inner.export("filter.TEST", "PREFIX").unwrap();
    inner.export("filter.ACC", "MATCHES").unwrap();
    inner.export("filter.REJ", "REST").unwrap();

    let composite = SubGraph::new("word_filter", inner).unwrap();
    let info = composite.info();

    assert!(info.composite);
    assert_eq!(info.inputs.len(), 2);
    assert_eq!(info.outputs.len(), 2);
    assert!(info.get_input("LINE").is_some());
    assert!(info.get_input("PREFIX").is_some());
    assert!(info.get_output("MATCHES").is_some());
    assert_eq!(info.get_input("LINE").unwrap().port_type, PortType::String);
}

#[tokio::test]
async fn composite_word_filter_runs_end_to_end() {
    let mut inner = Graph::new("filter_inner");
    inner.add_component("splitter", Arc::new(LineToWords)).unwrap();
    inner.add_component("filter", Arc::new(StartsWith)).unwrap();
    inner.connect("splitter.OUT", "filter.IN").unwrap();
    inner.export("splitter.IN", "LINE").unwrap();
    inner.export("filter.TEST", "PREFIX").unwrap();
    inner.export("filter.ACC", "MATCHES").unwrap();
    inner.export("filter.REJ", "REST").unwrap();

    let composite = SubGraph::new("word_filter", inner).unwrap();
    let matches = Capture::new();
    let match_values = matches.values();
    let rest = Capture::new();
    let rest_values = rest.values();

    let mut graph = Graph::new("composite_filter");
    graph.add_component("words", Arc::new(composite)).unwrap();
    graph.add_component("yes", Arc::new(matches)).unwrap();
    graph.add_component("no", Arc::new(rest)).unwrap();
    graph.initialize("words.LINE", "grape apple grain").unwrap();
    graph.initialize("words.PREFIX", "gr").unwrap();
    graph.connect("words.MATCHES", "yes.IN").unwrap();
    graph.connect("words.REST", "no.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);

    let got: Vec<String> = match_values.lock().iter().filter_map(|v| v.as_string()).collect();
    assert_eq!(got, vec!["grape".to_string(), "grain".to_string()]);
    let rest: Vec<String> = rest_values.lock().iter().filter_map(|v| v.as_string()).collect();
    assert_eq!(rest, vec!["apple".to_string()]);
}
