//! Fan-out fidelity.

mod common;

use std::sync::Arc;
use weft_components::Capture;
use weft_engine::prelude::*;

struct FanProducer {
    values: Vec<i64>,
}

impl Component for FanProducer {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "fan-producer")
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Number).fanout()])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let out = ctx.output("OUT")?;
            for v in &self.values {
                out.send_value(*v).await?;
            }
            Ok(())
        })
    }
}

#[tokio::test]
async fn each_downstream_receives_the_full_ordered_sequence() {
    let sinks: Vec<Capture> = (0..3).map(|_| Capture::new()).collect();
    let handles: Vec<_> = sinks.iter().map(|c| c.values()).collect();

    let mut graph = Graph::new("fanout");
    graph
        .add_component(
            "producer",
            Arc::new(FanProducer {
                values: vec![1, 2, 3],
            }),
        )
        .unwrap();
    for (i, sink) in sinks.into_iter().enumerate() {
        let name = format!("sink{}", i);
        graph.add_component(name.clone(), Arc::new(sink)).unwrap();
        graph
            .connect("producer.OUT", &format!("{}.IN", name))
            .unwrap();
    }

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());

    for values in &handles {
        let got: Vec<i64> = values.lock().iter().filter_map(|v| v.as_i64()).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }
    // Three downstreams times three packets.
    assert_eq!(report.counters.receives, 9);
    assert_eq!(report.counters.sends, 9);
}

#[tokio::test]
async fn fanout_backpressure_follows_the_slowest_downstream() {
    let fast = Capture::new();
    let fast_values = fast.values();
    let slow = common::SlowConsumer::new(std::time::Duration::from_millis(2));
    let slow_received = slow.received();

    let mut graph = Graph::new("fanout_slow");
    graph
        .add_component(
            "producer",
            Arc::new(FanProducer {
                values: (0..20).collect(),
            }),
        )
        .unwrap();
    graph.add_component("fast", Arc::new(fast)).unwrap();
    graph.add_component("slow", Arc::new(slow)).unwrap();
    graph
        .connect_with_capacity("producer.OUT", "fast.IN", 2)
        .unwrap();
    graph
        .connect_with_capacity("producer.OUT", "slow.IN", 2)
        .unwrap();

    let report = Network::new(graph).run().await.unwrap();
    assert!(report.is_success());
    assert_eq!(fast_values.lock().len(), 20);
    assert_eq!(slow_received.load(std::sync::atomic::Ordering::SeqCst), 20);
}
