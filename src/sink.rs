//! Destinations for drained notifications.

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};

use anyhow::Result;

use crate::types::{NotificationMessage, ProbeEvent, ProbeStatus};

/// Receives every message the orchestrator drains, in order.
pub trait NotificationSink {
    fn emit(&mut self, msg: &NotificationMessage) -> Result<()>;
}

/// Render one event the way text sinks print it.
pub fn format_event(e: &ProbeEvent, include_jitter: bool) -> String {
    let mut line = format!(
        "{} Probing {} [{}]:{}/tcp - {} - time={:.2}ms",
        e.timestamp,
        e.destination,
        e.address,
        e.port,
        e.status.describe(),
        e.rtt_ms
    );
    if include_jitter && e.status == ProbeStatus::Open {
        line.push_str(&format!(" jitter={:.2}ms", e.jitter_or_sentinel()));
    }
    line
}

/// Human-readable lines plus the final summary paragraph.
///
/// Progress records are not written; they only make sense on a live
/// terminal.
pub struct TextSink<W: Write> {
    out: W,
    label: String,
    include_jitter: bool,
}

pub type ConsoleSink = TextSink<Stdout>;
pub type FileSink = TextSink<BufWriter<File>>;

impl<W: Write> TextSink<W> {
    /// `label` names the target in the summary paragraph, e.g. `host:443`.
    pub fn new(out: W, label: impl Into<String>, include_jitter: bool) -> Self {
        Self {
            out,
            label: label.into(),
            include_jitter,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl ConsoleSink {
    pub fn stdout(label: impl Into<String>, include_jitter: bool) -> Self {
        Self::new(io::stdout(), label, include_jitter)
    }
}

impl FileSink {
    pub fn file(file: File, label: impl Into<String>, include_jitter: bool) -> Self {
        Self::new(BufWriter::new(file), label, include_jitter)
    }
}

impl<W: Write> NotificationSink for TextSink<W> {
    fn emit(&mut self, msg: &NotificationMessage) -> Result<()> {
        match msg {
            NotificationMessage::Event(e) => {
                writeln!(self.out, "{}", format_event(e, self.include_jitter))?;
            }
            NotificationMessage::Statistics(s) => {
                writeln!(self.out)?;
                write!(self.out, "{}", s.render(&self.label, self.include_jitter))?;
            }
            NotificationMessage::Warning(w) => writeln!(self.out, "WARNING: {w}")?,
            NotificationMessage::Information(i) => writeln!(self.out, "{i}")?,
            NotificationMessage::Progress(_) => return Ok(()),
        }
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> NotificationSink for JsonLinesSink<W> {
    fn emit(&mut self, msg: &NotificationMessage) -> Result<()> {
        serde_json::to_writer(&mut self.out, msg)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Host callback surface.
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(&NotificationMessage)> NotificationSink for CallbackSink<F> {
    fn emit(&mut self, msg: &NotificationMessage) -> Result<()> {
        (self.0)(msg);
        Ok(())
    }
}

/// Keeps every message; handy for embedding and tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub messages: Vec<NotificationMessage>,
}

impl CollectingSink {
    pub fn events(&self) -> impl Iterator<Item = &ProbeEvent> {
        self.messages.iter().filter_map(NotificationMessage::as_event)
    }

    pub fn statistics_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.as_statistics().is_some())
            .count()
    }
}

impl NotificationSink for CollectingSink {
    fn emit(&mut self, msg: &NotificationMessage) -> Result<()> {
        self.messages.push(msg.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Statistics;

    fn event(status: ProbeStatus, jitter: Option<f64>) -> ProbeEvent {
        ProbeEvent {
            timestamp: "2024-01-01T00:00:00Z".into(),
            destination: "example.test".into(),
            address: "192.0.2.1".into(),
            port: 80,
            status,
            rtt_ms: 1.5,
            jitter_ms: jitter,
        }
    }

    #[test]
    fn event_line_format() {
        let line = format_event(&event(ProbeStatus::Open, Some(0.25)), true);
        assert_eq!(
            line,
            "2024-01-01T00:00:00Z Probing example.test [192.0.2.1]:80/tcp - Port is open - time=1.50ms jitter=0.25ms"
        );
        let line = format_event(&event(ProbeStatus::Open, None), true);
        assert!(line.ends_with("jitter=-1.00ms"));
        let line = format_event(&event(ProbeStatus::Timeout, None), true);
        assert!(line.contains("No response"));
        assert!(!line.contains("jitter"));
    }

    #[test]
    fn text_sink_writes_summary_and_skips_progress() {
        let mut sink = TextSink::new(Vec::new(), "example.test:80", false);
        sink.emit(&NotificationMessage::Progress(crate::types::ProgressRecord {
            activity: "halfway there".into(),
            percent: 10,
        }))
        .unwrap();
        sink.emit(&NotificationMessage::Event(event(ProbeStatus::Open, None)))
            .unwrap();
        let mut stats = Statistics::new();
        stats.record_open(1.5, false);
        sink.emit(&NotificationMessage::Statistics(stats.finalize()))
            .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!text.contains("halfway there"));
        assert!(text.contains("Probing statistics for example.test:80:"));
        assert!(text.contains("Attempted = 1, Connected = 1, Failed = 0"));
    }

    #[test]
    fn json_lines_are_parseable() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&NotificationMessage::Information("hello".into()))
            .unwrap();
        sink.emit(&NotificationMessage::Event(event(ProbeStatus::Timeout, None)))
            .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: NotificationMessage = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.as_event().unwrap().status, ProbeStatus::Timeout);
    }

    #[test]
    fn callback_sink_sees_every_message() {
        let mut seen = 0;
        {
            let mut sink = CallbackSink(|_: &NotificationMessage| seen += 1);
            sink.emit(&NotificationMessage::Warning("a".into())).unwrap();
            sink.emit(&NotificationMessage::Warning("b".into())).unwrap();
        }
        assert_eq!(seen, 2);
    }
}
