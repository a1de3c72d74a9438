//! Deadlock detection.

mod common;

use std::sync::Arc;
use std::time::Duration;
use weft_engine::prelude::*;

fn fast_scan() -> NetworkConfig {
    NetworkConfig::default().with_deadlock_scan_interval(Some(Duration::from_millis(20)))
}

#[tokio::test]
async fn send_cycle_deadlock_is_reported() {
    // a and b each send two packets into a capacity-1 cycle before
    // reading anything: both block on their second send.
    let mut graph = Graph::new("send_cycle");
    graph
        .add_component("a", Arc::new(common::SendTwoThenRead))
        .unwrap();
    graph
        .add_component("b", Arc::new(common::SendTwoThenRead))
        .unwrap();
    graph.connect_with_capacity("a.OUT", "b.IN", 1).unwrap();
    graph.connect_with_capacity("b.OUT", "a.IN", 1).unwrap();

    let events = Arc::new(RingBufferSink::with_default_capacity());
    let report = Network::new(graph)
        .with_config(fast_scan())
        .with_events(Arc::clone(&events) as Arc<dyn EventSink>)
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Deadlocked);
    let mut suspended = report.suspended.clone();
    suspended.sort();
    assert_eq!(suspended, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(events.by_tag("network-deadlocked").len(), 1);

    // Nothing was lost or duplicated: both first sends sit in the queues
    // and are accounted for by the closing drain.
    assert_eq!(report.counters.sends, 2);
    assert_eq!(report.counters.receives, 0);
    assert_eq!(report.counters.dropped_on_close, 2);
}

#[tokio::test]
async fn receive_cycle_deadlock_is_reported() {
    let mut graph = Graph::new("receive_cycle");
    graph.add_component("a", Arc::new(common::WaitForever)).unwrap();
    graph.add_component("b", Arc::new(common::WaitForever)).unwrap();
    graph.connect("a.OUT", "b.IN").unwrap();
    graph.connect("b.OUT", "a.IN").unwrap();

    let report = Network::new(graph)
        .with_config(fast_scan())
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Deadlocked);
    assert_eq!(report.suspended.len(), 2);
}

#[tokio::test]
async fn drain_policy_lets_receivers_finish() {
    let mut graph = Graph::new("drain_cycle");
    graph.add_component("a", Arc::new(common::WaitForever)).unwrap();
    graph.add_component("b", Arc::new(common::WaitForever)).unwrap();
    graph.connect("a.OUT", "b.IN").unwrap();
    graph.connect("b.OUT", "a.IN").unwrap();

    let mut network = Network::new(graph)
        .with_config(fast_scan().with_deadlock_policy(DeadlockPolicy::Drain));
    let handle = network.handle();
    let report = network.run().await.unwrap();

    // The forced drain delivered end-of-stream to both receivers, so the
    // bodies returned normally; the report still names the deadlock.
    assert_eq!(report.status, RunStatus::Deadlocked);
    assert!(report.failures.is_empty());
    assert_eq!(handle.component_state("a"), Some(ComponentState::Terminated));
    assert_eq!(handle.component_state("b"), Some(ComponentState::Terminated));
}

#[tokio::test]
async fn healthy_pipeline_is_not_flagged() {
    let consumer = common::SlowConsumer::new(Duration::from_millis(2));

    let mut graph = Graph::new("healthy");
    graph
        .add_component("producer", Arc::new(common::Generator::new(30)))
        .unwrap();
    graph.add_component("consumer", Arc::new(consumer)).unwrap();
    graph
        .connect_with_capacity("producer.OUT", "consumer.IN", 2)
        .unwrap();

    let report = Network::new(graph)
        .with_config(fast_scan())
        .run()
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.suspended.is_empty());
}
