//! Graph descriptions driving the runtime.

use weft_components::std_registry;
use weft_engine::prelude::*;

const WORD_FILTER_JSON: &str = r#"{
    "name": "word_filter",
    "components": {
        "source":   {"kind": "std::inject"},
        "splitter": {"kind": "std::line-to-words"},
        "filter":   {"kind": "std::starts-with"},
        "joiner":   {"kind": "std::words-to-line"},
        "bin":      {"kind": "std::discard"},
        "sink":     {"kind": "std::capture"}
    },
    "connections": [
        {"src": {"component": "source", "port": "OUT"},
         "tgt": {"component": "splitter", "port": "IN"}},
        {"src": {"component": "splitter", "port": "OUT"},
         "tgt": {"component": "filter", "port": "IN"}},
        {"src": {"component": "filter", "port": "ACC"},
         "tgt": {"component": "bin", "port": "IN"}},
        {"src": {"component": "filter", "port": "REJ"},
         "tgt": {"component": "joiner", "port": "IN"}, "capacity": 4},
        {"src": {"component": "joiner", "port": "OUT"},
         "tgt": {"component": "sink", "port": "IN"}}
    ],
    "iips": [
        {"tgt": {"component": "source", "port": "CONST"}, "value": "Hello Goodbye World"},
        {"tgt": {"component": "filter", "port": "TEST"}, "value": "G"},
        {"tgt": {"component": "joiner", "port": "MEASURE"}, "value": 0}
    ]
}"#;

#[tokio::test]
async fn graph_built_from_json_runs() {
    let registry = std_registry();
    let definition = GraphDefinition::from_json(WORD_FILTER_JSON).unwrap();
    let graph = Graph::from_definition(&definition, &registry).unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.counters.sends, report.counters.receives);
}

#[tokio::test]
async fn definition_survives_a_builder_roundtrip() {
    let registry = std_registry();
    let definition = GraphDefinition::from_json(WORD_FILTER_JSON).unwrap();
    let graph = Graph::from_definition(&definition, &registry).unwrap();

    let exported = graph.to_definition();
    assert_eq!(exported.components.len(), definition.components.len());
    assert_eq!(exported.connections.len(), definition.connections.len());
    assert_eq!(exported.iips.len(), definition.iips.len());

    // And the exported document still builds and runs.
    let rebuilt = Graph::from_definition(&exported, &registry).unwrap();
    let report = Network::new(rebuilt).run().await.unwrap();
    assert!(report.is_success());
}

#[tokio::test]
async fn yaml_definitions_load_too() {
    let yaml = r#"
name: tiny
components:
  source:
    kind: std::inject
  sink:
    kind: std::discard
connections:
  - src: {component: source, port: OUT}
    tgt: {component: sink, port: IN}
iips:
  - tgt: {component: source, port: CONST}
    value: 1
"#;
    let registry = std_registry();
    let definition = GraphDefinition::from_yaml(yaml).unwrap();
    let graph = Graph::from_definition(&definition, &registry).unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.counters.sends, 1);
    assert_eq!(report.counters.receives, 1);
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let registry = std_registry();
    let definition = GraphDefinition::from_json(
        r#"{"name": "bad", "components": {"x": {"kind": "std::nonexistent"}}}"#,
    )
    .unwrap();
    let err = Graph::from_definition(&definition, &registry).unwrap_err();
    assert_eq!(err.code(), "E112");
}

#[tokio::test]
async fn control_surface_lists_and_describes() {
    let registry = std_registry();
    let definition = GraphDefinition::from_json(WORD_FILTER_JSON).unwrap();
    let graph = Graph::from_definition(&definition, &registry).unwrap();

    let components = graph.list_components();
    assert_eq!(components.len(), 6);
    assert!(components
        .iter()
        .any(|(name, kind)| name == "filter" && kind == "std::starts-with"));

    let connections = graph.list_connections();
    assert_eq!(connections.len(), 5);

    let spec = registry.describe("std::words-to-line").unwrap();
    assert_eq!(spec.kind, "std::words-to-line");
    assert!(spec.inports.iter().any(|p| p.name == "MEASURE"));
}
