//! End-to-end pipeline scenarios.

mod common;

use parking_lot::Mutex;
use std::sync::Arc;
use weft_components::{Capture, Inject, LineToWords, Output, StartsWith, WordsToLine};
use weft_engine::prelude::*;

#[tokio::test]
async fn hello_goodbye_world_pipeline() {
    let lines = Arc::new(Mutex::new(Vec::new()));

    let mut graph = Graph::new("hello_goodbye_world");
    graph.add_component("source", Arc::new(Inject)).unwrap();
    graph.add_component("splitter", Arc::new(LineToWords)).unwrap();
    graph.add_component("filter", Arc::new(StartsWith)).unwrap();
    graph.add_component("joiner", Arc::new(WordsToLine)).unwrap();
    graph
        .add_component("display", Arc::new(Output::with_sink(Arc::clone(&lines))))
        .unwrap();

    graph
        .initialize("source.CONST", "Hello Goodbye World")
        .unwrap();
    graph.initialize("filter.TEST", "G").unwrap();
    graph.initialize("joiner.MEASURE", 0_i64).unwrap();

    graph.connect("source.OUT", "splitter.IN").unwrap();
    graph.connect("splitter.OUT", "filter.IN").unwrap();
    graph.connect("filter.REJ", "joiner.IN").unwrap();
    graph.connect("joiner.OUT", "display.IN").unwrap();

    // Words starting with G are accepted and discarded; the rest survive.
    let discard = Capture::new();
    graph.add_component("bin", Arc::new(discard)).unwrap();
    graph.connect("filter.ACC", "bin.IN").unwrap();

    let events = Arc::new(RingBufferSink::with_default_capacity());
    let mut network =
        Network::new(graph).with_events(Arc::clone(&events) as Arc<dyn EventSink>);
    let handle = network.handle();

    let report = network.run().await.unwrap();

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(
        *lines.lock(),
        vec!["Hello".to_string(), "World".to_string()]
    );

    for name in ["source", "splitter", "filter", "joiner", "display"] {
        assert_eq!(handle.component_state(name), Some(ComponentState::Terminated));
    }

    assert_eq!(events.by_tag("network-started").len(), 1);
    assert_eq!(events.by_tag("network-terminated").len(), 1);
    assert_eq!(events.by_tag("component-errored").len(), 0);
    assert!(!events.by_tag("packet-sent").is_empty());
}

#[tokio::test]
async fn iip_feeds_first_receive_then_end_of_stream() {
    struct Probe;

    impl Component for Probe {
        fn info(&self) -> ComponentInfo {
            ComponentInfo::new("test", "probe")
                .with_inputs(vec![PortDefinition::input("IN", PortType::Number)])
        }

        fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
            Box::pin(async move {
                let input = ctx.input("IN")?;
                let first = input.receive_once().await?;
                assert_eq!(first.and_then(|v| v.as_i64()), Some(42));
                assert_eq!(input.receive().await?, None);
                Ok(())
            })
        }
    }

    let mut graph = Graph::new("iip_only");
    graph.add_component("probe", Arc::new(Probe)).unwrap();
    graph.initialize("probe.IN", 42_i64).unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());
}

#[tokio::test]
async fn declared_default_behaves_like_an_initial_packet() {
    let capture = Capture::new();
    let values = capture.values();

    let mut graph = Graph::new("default_test");
    graph.add_component("joiner", Arc::new(WordsToLine)).unwrap();
    graph.add_component("sink", Arc::new(capture)).unwrap();
    graph.add_component("source", Arc::new(Inject)).unwrap();
    graph.initialize("source.CONST", "only").unwrap();
    // joiner.MEASURE is left unconnected; its declared default of 0 is used.
    graph.connect("source.OUT", "joiner.IN").unwrap();
    graph.connect("joiner.OUT", "sink.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());
    assert_eq!(values.lock()[0].as_string(), Some("only".to_string()));
}

#[tokio::test]
async fn required_port_must_be_fed() {
    let mut graph = Graph::new("missing_required");
    graph.add_component("splitter", Arc::new(LineToWords)).unwrap();

    let err = Network::new(graph).run().await.unwrap_err();
    assert_eq!(err.code(), "E109");
}

#[tokio::test]
async fn counters_balance_at_quiescence() {
    let capture = Capture::new();

    let mut graph = Graph::new("conservation");
    graph
        .add_component("generator", Arc::new(common::Generator::new(50)))
        .unwrap();
    graph.add_component("sink", Arc::new(capture)).unwrap();
    graph.connect("generator.OUT", "sink.IN").unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.counters.sends, 50);
    assert_eq!(report.counters.receives, 50);
    assert_eq!(report.counters.dropped_on_close, 0);
}

#[tokio::test]
async fn run_twice_is_rejected() {
    let mut graph = Graph::new("run_once");
    graph
        .add_component("generator", Arc::new(common::Generator::new(1)))
        .unwrap();
    graph
        .add_component("sink", Arc::new(Capture::new()))
        .unwrap();
    graph.connect("generator.OUT", "sink.IN").unwrap();

    let mut network = Network::new(graph);
    network.run().await.unwrap();
    let err = network.run().await.unwrap_err();
    assert_eq!(err.code(), "E111");
}
