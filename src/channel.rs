//! Worker-to-orchestrator notification channel.
//!
//! Backed by an unbounded tokio mpsc queue: pushes never block the worker
//! and messages are delivered in the order they were pushed.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::trace;

use crate::types::{NotificationMessage, ProbeEvent, ProgressRecord};

pub fn notification_channel() -> (Notifier, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier { tx }, Inbox { rx })
}

/// Producer half, owned by the worker.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<NotificationMessage>,
}

impl Notifier {
    pub fn push(&self, msg: NotificationMessage) {
        if self.tx.send(msg).is_err() {
            trace!("notification dropped, receiver closed");
        }
    }

    pub fn event(&self, event: ProbeEvent) {
        self.push(NotificationMessage::Event(event));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(NotificationMessage::Information(text.into()));
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.push(NotificationMessage::Warning(text.into()));
    }

    pub fn progress(&self, activity: impl Into<String>, percent: u8) {
        self.push(NotificationMessage::Progress(ProgressRecord {
            activity: activity.into(),
            percent: percent.min(100),
        }));
    }
}

/// Consumer half, owned by the orchestrator.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<NotificationMessage>,
}

impl Inbox {
    /// Take every message queued right now without waiting.
    pub fn try_drain(&mut self) -> Vec<NotificationMessage> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => out.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// Wait for the next message; `None` once every notifier is gone and the
    /// queue is empty.
    pub async fn recv(&mut self) -> Option<NotificationMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (tx, mut rx) = notification_channel();
        for i in 0..100 {
            tx.info(format!("msg {i}"));
        }
        drop(tx);
        let mut seen = Vec::new();
        while let Some(msg) = rx.recv().await {
            if let NotificationMessage::Information(text) = msg {
                seen.push(text);
            }
        }
        let expected: Vec<String> = (0..100).map(|i| format!("msg {i}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn push_from_another_task_is_visible() {
        let (tx, mut rx) = notification_channel();
        let producer = tokio::spawn(async move {
            for i in 0..1_000u32 {
                tx.progress("working", (i % 101) as u8);
            }
        });
        producer.await.unwrap();
        assert_eq!(rx.try_drain().len(), 1_000);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn push_after_receiver_dropped_is_ignored() {
        let (tx, rx) = notification_channel();
        drop(rx);
        tx.warn("nobody listening");
    }

    #[test]
    fn progress_is_clamped() {
        let (tx, mut rx) = notification_channel();
        tx.progress("over", 250);
        let msgs = rx.try_drain();
        assert_eq!(
            msgs,
            vec![NotificationMessage::Progress(ProgressRecord {
                activity: "over".into(),
                percent: 100
            })]
        );
    }
}
