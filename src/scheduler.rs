//! Poll scheduler: one independent polling loop per configured exchange.
//!
//! Each tick fetches the adapter's listing, normalizes it and hands it to
//! the reconciliation engine for that exchange only. Failed adapter calls
//! retry with exponential backoff inside the cycle; once the age of the last
//! successful refresh crosses the staleness threshold, a single
//! `StaleSource` event is raised until the source recovers. Slow cycles are
//! coalesced (`MissedTickBehavior::Skip`), so at most one poll per exchange
//! is in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::ExchangeId;
use crate::normalize::normalize_listing;
use crate::notify::{Event, NotifierRegistry};
use crate::port::adapter::ExchangeAdapter;
use crate::port::store::GenerationStore;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::resolver::SymbolResolver;
use crate::retry::Backoff;

/// Per-exchange polling parameters.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Adapter retries within one cycle, on top of the first attempt.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Age of the last successful refresh after which the source is stale.
    pub stale_after: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_retries: 4,
            backoff: Backoff::default(),
            stale_after: Duration::from_secs(300),
        }
    }
}

/// One exchange's polling loop.
pub struct Poller<S> {
    adapter: Arc<dyn ExchangeAdapter>,
    resolver: Arc<SymbolResolver>,
    reconciler: Arc<Reconciler<S>>,
    notifiers: Arc<NotifierRegistry>,
    config: PollerConfig,
}

impl<S: GenerationStore + 'static> Poller<S> {
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        resolver: Arc<SymbolResolver>,
        reconciler: Arc<Reconciler<S>>,
        notifiers: Arc<NotifierRegistry>,
        config: PollerConfig,
    ) -> Self {
        Self {
            adapter,
            resolver,
            reconciler,
            notifiers,
            config,
        }
    }

    /// Spawn the polling loop. The task polls immediately, then on every
    /// interval tick, until the shutdown signal flips.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let exchange = self.adapter.exchange().clone();
            info!(
                exchange = %exchange,
                interval_secs = self.config.interval.as_secs(),
                "Poller started"
            );

            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last_success = Instant::now();
            let mut stale = false;

            loop {
                tokio::select! {
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            info!(exchange = %exchange, "Poller shutting down");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // A cycle that survives the select is never torn by
                        // shutdown: it finishes (or fails) whole before the
                        // next iteration observes the signal.
                        match self.poll_once(&exchange).await {
                            Ok(()) => {
                                last_success = Instant::now();
                                if stale {
                                    stale = false;
                                    self.notifiers.notify_all(&Event::SourceRecovered {
                                        exchange: exchange.clone(),
                                    });
                                }
                            }
                            Err(()) => {
                                let age = last_success.elapsed();
                                if !stale && age >= self.config.stale_after {
                                    stale = true;
                                    self.notifiers.notify_all(&Event::StaleSource {
                                        exchange: exchange.clone(),
                                        age,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    /// One full cycle: fetch with retries, normalize, reconcile. The error
    /// carries no payload; everything is already logged and the caller only
    /// needs success/failure for staleness tracking.
    async fn poll_once(&self, exchange: &ExchangeId) -> Result<(), ()> {
        let raw = self.fetch_with_retries(exchange).await?;

        let listing = normalize_listing(&self.resolver, exchange, raw, Utc::now());
        debug!(
            exchange = %exchange,
            records = listing.records.len(),
            rejects = listing.rejects.len(),
            "Listing normalized"
        );

        match self.reconciler.reconcile(&listing, false) {
            Ok(ReconcileOutcome::Committed { generation, changes }) => {
                debug!(
                    exchange = %exchange,
                    generation = %generation.id,
                    changes = changes.len(),
                    "Cycle committed"
                );
                Ok(())
            }
            Ok(ReconcileOutcome::Unchanged { .. }) => Ok(()),
            Err(e) => {
                // Fatal to this cycle only; the previous generation stays
                // active and the next tick starts clean.
                error!(exchange = %exchange, error = %e, "Reconciliation failed");
                Err(())
            }
        }
    }

    async fn fetch_with_retries(
        &self,
        exchange: &ExchangeId,
    ) -> Result<Vec<crate::domain::RawInstrumentDescriptor>, ()> {
        let attempts = self.config.max_retries + 1;
        for attempt in 0..attempts {
            match self.adapter.list_instruments().await {
                Ok(raw) => return Ok(raw),
                Err(e) => {
                    warn!(
                        exchange = %exchange,
                        attempt = attempt + 1,
                        attempts,
                        error = %e,
                        "Adapter call failed"
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.config.backoff.delay(attempt)).await;
                    }
                }
            }
        }
        Err(())
    }
}
