//! Shared helper components for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_engine::prelude::*;

/// Emits the integers `0..count` on OUT, stopping quietly when the
/// downstream closes.
pub struct Generator {
    count: i64,
}

impl Generator {
    pub fn new(count: i64) -> Self {
        Self { count }
    }
}

impl Component for Generator {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "generator")
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Number)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let out = ctx.output("OUT")?;
            for i in 0..self.count {
                match out.send_value(i).await {
                    Ok(()) => {}
                    Err(FlowError::DownstreamClosed { .. }) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })
    }
}

/// Consumes IN with a fixed delay per packet, counting what it saw.
pub struct SlowConsumer {
    delay: Duration,
    received: Arc<AtomicUsize>,
}

impl SlowConsumer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            received: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn received(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.received)
    }
}

impl Component for SlowConsumer {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "slow-consumer")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while input.receive_value().await?.is_some() {
                self.received.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
            }
            Ok(())
        })
    }
}

/// Forwards IN to OUT, failing when the nth packet arrives.
pub struct FailAfter {
    fail_on: usize,
}

impl FailAfter {
    pub fn new(fail_on: usize) -> Self {
        Self { fail_on }
    }
}

impl Component for FailAfter {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "fail-after")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any)])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            let mut seen = 0_usize;
            while let Some(packet) = input.receive().await? {
                seen += 1;
                if seen == self.fail_on {
                    ctx.release(packet);
                    return Err(FlowError::ComponentFailed {
                        component: ctx.name().to_string(),
                        cause: format!("refusing packet {}", seen),
                    });
                }
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Sends two packets on OUT before reading anything from IN.
pub struct SendTwoThenRead;

impl Component for SendTwoThenRead {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "send-two-then-read")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any).optional()])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let out = ctx.output("OUT")?;
            out.send_value(1_i64).await?;
            out.send_value(2_i64).await?;
            let input = ctx.input("IN")?;
            while input.receive_value().await?.is_some() {}
            Ok(())
        })
    }
}

/// Waits forever on receive from IN without ever sending.
pub struct WaitForever;

impl Component for WaitForever {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "wait-forever")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any).optional()])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while input.receive_value().await?.is_some() {}
            Ok(())
        })
    }
}

/// Takes one packet from IN, keeps it, and never suspends on a port
/// again. Ignores cancellation.
pub struct Stubborn;

impl Component for Stubborn {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("test", "stubborn")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any).optional()])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let _kept = input.receive().await?;
            std::future::pending::<()>().await;
            Ok(())
        })
    }
}
