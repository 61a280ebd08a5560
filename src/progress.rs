/*!
 * Pipeline progress reporting.
 *
 * Stages publish `(percent, message)` events over a bounded channel. The
 * percentage is derived from fixed stage weights and never goes backwards
 * within a run, even when concurrent workers report out of order.
 */

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Pipeline stages and the share of the progress range they cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Audio extraction and splitting
    Split,
    /// Speech-to-text over all chunks
    Transcription,
    /// Timeline reconciliation
    Merge,
    /// Translation of all (chunk, language) pairs
    Translation,
    /// Writing outputs and removing temporary files
    Cleanup,
}

impl Stage {
    /// Percentage range `[start, end]` of this stage
    pub fn range(self) -> (f64, f64) {
        match self {
            Stage::Split => (0.0, 10.0),
            Stage::Transcription => (10.0, 50.0),
            Stage::Merge => (50.0, 60.0),
            Stage::Translation => (60.0, 90.0),
            Stage::Cleanup => (90.0, 100.0),
        }
    }

    /// Map a completed fraction of this stage to an overall percentage
    pub fn percent_at(self, fraction: f64) -> f64 {
        let (start, end) = self.range();
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        start + (end - start) * fraction
    }
}

/// One progress update
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Overall completion, 0..=100
    pub percent: f64,
    /// Human readable stage message
    pub message: String,
}

/// Producer side of the progress channel
///
/// Clones share the high-water mark, so the sequence seen by the consumer is
/// non-decreasing across all of them.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<ProgressEvent>>,
    last_percent: Arc<Mutex<f64>>,
}

impl ProgressReporter {
    /// Create a reporter and the receiving end of its bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
                last_percent: Arc::new(Mutex::new(0.0)),
            },
            receiver,
        )
    }

    /// Reporter that only tracks the percentage
    pub fn disabled() -> Self {
        Self {
            sender: None,
            last_percent: Arc::new(Mutex::new(0.0)),
        }
    }

    /// Report progress within a stage; `fraction` is the completed share of the stage
    pub async fn report(&self, stage: Stage, fraction: f64, message: impl Into<String>) {
        let mut last = self.last_percent.lock().await;
        let percent = stage.percent_at(fraction).max(*last);
        *last = percent;

        if let Some(sender) = &self.sender {
            let event = ProgressEvent {
                percent,
                message: message.into(),
            };
            // Send while holding the lock so events arrive in percentage order.
            // A closed receiver only means nobody is listening anymore.
            let _ = sender.send(event).await;
        }
    }

    /// Highest percentage reported so far
    pub async fn current(&self) -> f64 {
        *self.last_percent.lock().await
    }
}
