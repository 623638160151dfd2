//! In-app toast notices.
//!
//! Every store in this crate reports user-visible outcomes ("Added to cart",
//! "Chat is offline") through a [`Notifier`] handle; the UI layer drains the
//! paired [`NoticeStream`]. The channel is unbounded because notices are tiny
//! and the consumer drains on every frame.

use cardvault_core::{Broadcast, Severity};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::Subscription;

/// A single user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

/// Sending half, cloned into every store.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

/// Receiving half, drained by the UI layer.
#[derive(Debug)]
pub struct NoticeStream {
    rx: mpsc::UnboundedReceiver<Notice>,
}

impl Notifier {
    /// Create a connected notifier/stream pair.
    #[must_use]
    pub fn channel() -> (Self, NoticeStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, NoticeStream { rx })
    }

    /// Push a notice with an explicit severity.
    pub fn push(&self, severity: Severity, text: impl Into<String>) {
        // A closed stream means the UI is gone; dropping the notice is fine.
        let _ = self.tx.send(Notice {
            severity,
            text: text.into(),
        });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(Severity::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(Severity::Success, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.push(Severity::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(Severity::Error, text);
    }

    /// Surface every broadcast from a change feed as a notice.
    ///
    /// The returned task ends when the feed closes; abort it (or drop the
    /// feed's gateway) on teardown.
    #[must_use]
    pub fn relay_broadcasts(&self, mut feed: Subscription<Broadcast>) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                let row = event.into_row();
                notifier.push(row.severity, row.message);
            }
        })
    }
}

impl NoticeStream {
    /// Wait for the next notice. Returns `None` once every notifier is gone.
    pub async fn next(&mut self) -> Option<Notice> {
        self.rx.recv().await
    }

    /// Drain without waiting; empty when nothing is queued.
    pub fn drain(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.rx.try_recv() {
            out.push(notice);
        }
        out
    }
}
