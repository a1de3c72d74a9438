//! Text stream components.

use parking_lot::Mutex;
use std::sync::Arc;
use weft_engine::prelude::*;

/// Split each incoming line into whitespace-separated words.
pub struct LineToWords;

impl Component for LineToWords {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "line-to-words")
            .with_description("Split each incoming line into words")
            .with_inputs(vec![PortDefinition::input("IN", PortType::String)])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::String)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            while let Some(value) = input.receive_value().await? {
                let line = value.as_string().unwrap_or_default();
                for word in line.split_whitespace() {
                    out.send_value(word).await?;
                }
            }
            Ok(())
        })
    }
}

/// Route each word to ACC when it starts with the TEST prefix, REJ
/// otherwise.
pub struct StartsWith;

impl Component for StartsWith {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "starts-with")
            .with_description("Split a stream on a prefix test")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::String),
                PortDefinition::input("TEST", PortType::String),
            ])
            .with_outputs(vec![
                PortDefinition::output("ACC", PortType::String),
                PortDefinition::output("REJ", PortType::String),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let test = ctx
                .input("TEST")?
                .receive_once()
                .await?
                .and_then(|v| v.as_string())
                .unwrap_or_default();

            let input = ctx.input("IN")?;
            let acc = ctx.output("ACC")?;
            let rej = ctx.output("REJ")?;
            while let Some(packet) = input.receive().await? {
                let matches = packet
                    .payload()
                    .as_string()
                    .is_some_and(|s| s.starts_with(&test));
                if matches {
                    acc.send(packet).await?;
                } else {
                    rej.send(packet).await?;
                }
            }
            Ok(())
        })
    }
}

/// Join incoming words into lines no longer than MEASURE characters.
///
/// A MEASURE of zero emits each word as its own line.
pub struct WordsToLine;

impl Component for WordsToLine {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "words-to-line")
            .with_description("Join incoming words into measured lines")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::String),
                PortDefinition::input("MEASURE", PortType::Number).with_default(0_i64),
            ])
            .with_outputs(vec![PortDefinition::output("OUT", PortType::String)])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let measure = ctx
                .input("MEASURE")?
                .receive_once()
                .await?
                .and_then(|v| v.as_i64())
                .unwrap_or(0) as usize;

            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;

            let mut line = String::new();
            while let Some(value) = input.receive_value().await? {
                let word = value.as_string().unwrap_or_default();
                if !line.is_empty() && line.len() + 1 + word.len() > measure {
                    out.send_value(std::mem::take(&mut line)).await?;
                    line = word;
                } else {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(&word);
                }
            }
            if !line.is_empty() {
                out.send_value(line).await?;
            }
            Ok(())
        })
    }
}

/// Log each incoming payload and pass it through when OUT is connected.
pub struct Output {
    lines: Option<Arc<Mutex<Vec<String>>>>,
}

impl Output {
    /// Create an output component that only logs.
    pub fn new() -> Self {
        Self { lines: None }
    }

    /// Create an output component that also records rendered lines.
    pub fn with_sink(lines: Arc<Mutex<Vec<String>>>) -> Self {
        Self { lines: Some(lines) }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Output {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("std", "output")
            .with_description("Display the content of incoming packets")
            .with_inputs(vec![
                PortDefinition::input("IN", PortType::Any)
                    .with_description("Packets to be displayed"),
            ])
            .with_outputs(vec![
                PortDefinition::output("OUT", PortType::Any)
                    .with_description("Pass-through, if connected"),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let input = ctx.input("IN")?;
            let out = ctx.output("OUT")?;
            while let Some(packet) = input.receive().await? {
                let rendered = packet
                    .payload()
                    .as_string()
                    .unwrap_or_else(|| packet.payload().inner().to_string());
                tracing::info!(component = %ctx.name(), "{}", rendered);
                if let Some(lines) = &self.lines {
                    lines.lock().push(rendered);
                }
                out.send(packet).await?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Capture;

    #[tokio::test]
    async fn line_to_words_splits_on_whitespace() {
        let mut graph = Graph::new("split_test");
        let capture = Capture::new();
        let values = capture.values();

        graph.add_component("source", Arc::new(crate::basic::Inject)).unwrap();
        graph.add_component("split", Arc::new(LineToWords)).unwrap();
        graph.add_component("sink", Arc::new(capture)).unwrap();
        graph.initialize("source.CONST", "one  two three").unwrap();
        graph.connect("source.OUT", "split.IN").unwrap();
        graph.connect("split.OUT", "sink.IN").unwrap();

        let report = Network::new(graph).run().await.unwrap();
        assert!(report.is_success());
        let words: Vec<String> = values.lock().iter().filter_map(|v| v.as_string()).collect();
        assert_eq!(words, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn starts_with_routes_by_prefix() {
        let mut graph = Graph::new("prefix_test");
        let accepted = Capture::new();
        let accepted_values = accepted.values();
        let rejected = Capture::new();
        let rejected_values = rejected.values();

        graph.add_component("source", Arc::new(crate::basic::Inject)).unwrap();
        graph.add_component("split", Arc::new(LineToWords)).unwrap();
        graph.add_component("filter", Arc::new(StartsWith)).unwrap();
        graph.add_component("acc", Arc::new(accepted)).unwrap();
        graph.add_component("rej", Arc::new(rejected)).unwrap();

        graph.initialize("source.CONST", "good bad great").unwrap();
        graph.initialize("filter.TEST", "g").unwrap();
        graph.connect("source.OUT", "split.IN").unwrap();
        graph.connect("split.OUT", "filter.IN").unwrap();
        graph.connect("filter.ACC", "acc.IN").unwrap();
        graph.connect("filter.REJ", "rej.IN").unwrap();

        let report = Network::new(graph).run().await.unwrap();
        assert!(report.is_success());

        let acc: Vec<String> = accepted_values.lock().iter().filter_map(|v| v.as_string()).collect();
        let rej: Vec<String> = rejected_values.lock().iter().filter_map(|v| v.as_string()).collect();
        assert_eq!(acc, vec!["good", "great"]);
        assert_eq!(rej, vec!["bad"]);
    }

    #[tokio::test]
    async fn words_to_line_respects_measure() {
        let mut graph = Graph::new("join_test");
        let capture = Capture::new();
        let values = capture.values();

        graph.add_component("source", Arc::new(crate::basic::Inject)).unwrap();
        graph.add_component("split", Arc::new(LineToWords)).unwrap();
        graph.add_component("join", Arc::new(WordsToLine)).unwrap();
        graph.add_component("sink", Arc::new(capture)).unwrap();

        graph.initialize("source.CONST", "aa bb cc dd").unwrap();
        graph.initialize("join.MEASURE", 5_i64).unwrap();
        graph.connect("source.OUT", "split.IN").unwrap();
        graph.connect("split.OUT", "join.IN").unwrap();
        graph.connect("join.OUT", "sink.IN").unwrap();

        let report = Network::new(graph).run().await.unwrap();
        assert!(report.is_success());
        let lines: Vec<String> = values.lock().iter().filter_map(|v| v.as_string()).collect();
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[tokio::test]
    async fn output_records_rendered_lines() {
        let mut graph = Graph::new("output_test");
        let lines = Arc::new(Mutex::new(Vec::new()));

        graph.add_component("source", Arc::new(crate::basic::Inject)).unwrap();
        graph
            .add_component("display", Arc::new(Output::with_sink(Arc::clone(&lines))))
            .unwrap();
        graph.initialize("source.CONST", "hello").unwrap();
        graph.connect("source.OUT", "display.IN").unwrap();

        let report = Network::new(graph).run().await.unwrap();
        assert!(report.is_success());
        assert_eq!(*lines.lock(), vec!["hello".to_string()]);
    }
}
