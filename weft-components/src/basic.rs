//! Basic stream components.

use futures::future::select_all;
use parking_lot::Mutex;
use std::sync::Arc;
use weft_engine::prelude::*;

/// Inject a single value from the CONST parameter port to OUT.
pub struct Inject;

impl Component for Inject {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "inject")
            .with_description("Inject the CONST parameter as a single packet on OUT")
            .with_inputs(vec![
                PortDefinition::input("CONST", PortType::Any)
                    .optional()
                    .with_description("Value to inject"),
            ])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let constant = ctx.input("CONST")?.receive_once().await?;
            if let Some(value) = constant {
                match ctx.output("OUT")?.send_value(value).await {
                    Ok(()) | Err(FlowError::DownstreamClosed { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })
    }
}

/// Pass packets from IN to OUT unchanged.
pub struct Passthru;

impl Component for Passthru {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "passthru")
            .with_description("Pass a stream of packets to an output stream")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any)])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            while let Some(packet) = input.receive().await? {
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

/// Copy incoming payloads to OUT.
pub struct Copy;

impl Component for Copy {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "copy")
            .with_description("Copy all incoming packets to output")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any)])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            while let Some(value) = input.receive_value().await? {
                out.send_value(value).await?;
            }
            Ok(())
        })
    }
}

/// Repeat each packet from IN to OUT, COUNT times.
///
/// Without a COUNT parameter each packet repeats until the downstream
/// closes.
pub struct Repeat;

impl Component for Repeat {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "repeat")
            .with_description("Repeat each packet from IN to OUT, COUNT times")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::Any),
                PortDefinition::input("COUNT", PortType::Number)
                    .optional()
                    .with_description(
                        "Number of repetitions; repeats forever when absent",
                    ),
            ])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let count = ctx
                .input("COUNT")?
                .receive_once()
                .await?
                .and_then(|v| v.as_i64());
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;

            'stream: while let Some(value) = input.receive_value().await? {
                let mut emitted = 0_i64;
                loop {
                    if let Some(limit) = count {
                        if emitted >= limit {
                            break;
                        }
                    }
                    match out.send_value(value.clone()).await {
                        Ok(()) => emitted += 1,
                        Err(FlowError::DownstreamClosed { .. }) => {
                            input.close();
                            break 'stream;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            Ok(())
        })
    }
}

/// Discard all incoming packets.
pub struct Discard;

impl Component for Discard {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "discard")
            .with_description("Discards all incoming packets")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::Any)
                    .with_description("Stream of packets to be discarded"),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while input.receive_value().await?.is_some() {}
            Ok(())
        })
    }
}

/// Count a stream of packets, passing them through and emitting the
/// final count on COUNT.
pub struct Counter;

impl Component for Counter {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "counter")
            .with_description("Count a stream of packets and output the result on COUNT")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::Any).with_description("Incoming stream"),
            ])
            .with_outputs(vec![
                PortDefinition::output("OUT", PortType::Any)
                    .with_description("Stream being passed through"),
                PortDefinition::output("COUNT", PortType::Number)
                    .with_description("Count packet to be output"),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            let count_port = ctx.output("COUNT")?;

            let mut count = 0_i64;
            while let Some(packet) = input.receive().await? {
                count += 1;
                out.send(packet).await?;
            }
            count_port.send_value(count).await?;
            Ok(())
        })
    }
}

/// Collect incoming payloads into a shared buffer, for embedding
/// programs that want a network's results back.
pub struct Capture {
    values: Arc<Mutex<Vec<Value>>>,
}

impl Capture {
    /// Create a capture component with an empty buffer.
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the captured payloads.
    pub fn values(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.values)
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Capture {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "capture")
            .with_description("Collect incoming payloads for retrieval after the run")
            .with_inputs(vec![PortDefinition::input("IN", PortType::Any)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            while let Some(value) = input.receive_value().await? {
                self.values.lock().push(value);
            }
            Ok(())
        })
    }
}

/// Merge the elements of an array input into one output stream,
/// first-in first-out across elements.
pub struct Merge;

impl Component for Merge {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "merge")
            .with_description("Merge multiple input streams, first-in, first-out")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::Any)
                    .array()
                    .with_description("Incoming packets"),
            ])
            .with_outputs(vec![
                PortDefinition::output("OUT", PortType::Any).with_description("Merged output"),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let elements = ctx.input_array("IN")?;
            let out = ctx.output("OUT")?;

            let mut open: Vec<&InputHandle> = elements.iter().collect();
            while !open.is_empty() {
                let (result, index) = {
                    let receives = open
                        .iter()
                        .map(|handle| Box::pin(handle.receive()))
                        .collect::<Vec<_>>();
                    let (result, index, rest) = select_all(receives).await;
                    drop(rest);
                    (result, index)
                };
                match result? {
                    Some(packet) => out.send(packet).await?,
                    None => {
                        open.remove(index);
                    }
                }
            }
            Ok(())
        })
    }
}
