//! Observability boundary: change events and source-health conditions are
//! fanned out to registered notifiers.

use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{ChangeEvent, ExchangeId, GenerationId};

/// Events emitted by the engine for external alerting/logging collaborators.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new generation became active.
    GenerationCommitted {
        generation: GenerationId,
        exchange: ExchangeId,
        records: usize,
        changes: usize,
    },
    /// Field-level diff of one reconciliation, for audit.
    Changes(Vec<ChangeEvent>),
    /// An exchange's data has not refreshed within the configured bound.
    /// Raised once per staleness episode, not once per retry.
    StaleSource { exchange: ExchangeId, age: Duration },
    /// A previously stale exchange refreshed successfully again.
    SourceRecovered { exchange: ExchangeId },
}

/// Sink for engine events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Fan-out registry of notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: &Event) {
        for notifier in &self.notifiers {
            notifier.notify(event);
        }
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

/// Notifier that writes events to the tracing log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) {
        match event {
            Event::GenerationCommitted {
                generation,
                exchange,
                records,
                changes,
            } => {
                info!(
                    generation = %generation,
                    exchange = %exchange,
                    records,
                    changes,
                    "Generation committed"
                );
            }
            Event::Changes(changes) => {
                for change in changes {
                    info!(change = %change, "Reference data changed");
                }
            }
            Event::StaleSource { exchange, age } => {
                warn!(exchange = %exchange, age_secs = age.as_secs(), "Source is stale");
            }
            Event::SourceRecovered { exchange } => {
                info!(exchange = %exchange, "Source recovered");
            }
        }
    }
}
