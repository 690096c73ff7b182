use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::execution::MirrorDispatcher;
use crate::models::MakerOrderEvent;
use crate::ports::{RawActivityRecord, VenueQuery};

use super::normalize::normalize_record;

#[derive(Debug, Clone)]
pub struct IngestorConfig {
    pub tick_interval: Duration,
    pub query_timeout: Duration,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            query_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestorState {
    Stopped,
    Running,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub markets_polled: usize,
    pub markets_failed: usize,
    pub events_dispatched: usize,
    pub results_recorded: usize,
}

/// Polls the venue on a fixed interval for every watched market and hands
/// each new maker event to the dispatcher, one at a time, in venue order.
///
/// A failed query for one market is logged and skipped; the next tick is the
/// retry. There is no backoff beyond the tick interval.
#[derive(Clone)]
pub struct EventIngestor {
    inner: Arc<IngestorInner>,
}

struct IngestorInner {
    venue: Arc<dyn VenueQuery>,
    dispatcher: MirrorDispatcher,
    config: IngestorConfig,
    watches: Mutex<HashMap<String, MarketWatch>>,
    state_tx: watch::Sender<IngestorState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct MarketWatch {
    makers: HashSet<String>,
    cursor: Cursor,
}

/// Latest observed instant for a market plus the order ids seen at exactly
/// that instant, so equal-timestamp records are neither lost nor replayed.
#[derive(Debug, Clone)]
struct Cursor {
    since: DateTime<Utc>,
    seen_at_since: HashSet<String>,
}

impl Cursor {
    fn starting_at(since: DateTime<Utc>) -> Self {
        Self {
            since,
            seen_at_since: HashSet::new(),
        }
    }

    fn is_new(&self, event: &MakerOrderEvent) -> bool {
        event.observed_at > self.since
            || (event.observed_at == self.since && !self.seen_at_since.contains(&event.source_order_id))
    }

    fn advance(&mut self, event: &MakerOrderEvent) {
        if event.observed_at > self.since {
            self.since = event.observed_at;
            self.seen_at_since.clear();
        }
        if event.observed_at == self.since {
            self.seen_at_since.insert(event.source_order_id.clone());
        }
    }
}

impl EventIngestor {
    pub fn new(venue: Arc<dyn VenueQuery>, dispatcher: MirrorDispatcher, config: IngestorConfig) -> Self {
        let (state_tx, _) = watch::channel(IngestorState::Stopped);
        Self {
            inner: Arc::new(IngestorInner {
                venue,
                dispatcher,
                config,
                watches: Mutex::new(HashMap::new()),
                state_tx,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> IngestorState {
        *self.inner.state_tx.borrow()
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Watch `makers` on `market`. A newly watched market starts its cursor
    /// now, so only activity from this point on is mirrored.
    pub fn subscribe(&self, market: &str, makers: &[String]) {
        self.subscribe_from(market, makers, Utc::now());
    }

    /// Like `subscribe`, with an explicit starting cursor for new markets.
    pub fn subscribe_from(&self, market: &str, makers: &[String], since: DateTime<Utc>) {
        let mut watches = self.inner.watches.lock();
        let watch = watches.entry(market.to_string()).or_insert_with(|| {
            tracing::info!(market, since = %since, "Market added to ingestion");
            MarketWatch {
                makers: HashSet::new(),
                cursor: Cursor::starting_at(since),
            }
        });
        for maker in makers {
            if watch.makers.insert(maker.clone()) {
                tracing::debug!(market, maker = %maker, "Maker subscribed");
            }
        }
        gauge!("tracked_markets").set(watches.len() as f64);
    }

    /// Stop watching `maker` on `market`; the market is dropped once no
    /// makers remain.
    pub fn unsubscribe(&self, market: &str, maker: &str) {
        let mut watches = self.inner.watches.lock();
        let Some(watch) = watches.get_mut(market) else {
            return;
        };
        watch.makers.remove(maker);
        if watch.makers.is_empty() {
            watches.remove(market);
            tracing::info!(market, "Market dropped from ingestion");
        }
        gauge!("tracked_markets").set(watches.len() as f64);
    }

    /// Subscribe every `(maker, market)` pair present in the registry.
    pub fn sync_with_registry(&self) {
        let mut by_market: HashMap<String, Vec<String>> = HashMap::new();
        for (maker, market) in self.inner.dispatcher.registry().tracked_pairs() {
            by_market.entry(market).or_default().push(maker);
        }
        for (market, makers) in by_market {
            self.subscribe(&market, &makers);
        }
    }

    /// Current watches as `market → makers`, sorted for stable output.
    pub fn subscriptions(&self) -> Vec<(String, Vec<String>)> {
        let watches = self.inner.watches.lock();
        let mut out: Vec<(String, Vec<String>)> = watches
            .iter()
            .map(|(market, w)| {
                let mut makers: Vec<String> = w.makers.iter().cloned().collect();
                makers.sort();
                (market.clone(), makers)
            })
            .collect();
        out.sort();
        out
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Stopped → Running. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut task = self.inner.task.lock();
        if self.state() == IngestorState::Running {
            return false;
        }

        self.inner.state_tx.send_replace(IngestorState::Running);
        let this = self.clone();
        let state_rx = self.inner.state_tx.subscribe();
        *task = Some(tokio::spawn(async move { this.run_loop(state_rx).await }));

        tracing::info!(
            interval_secs = self.inner.config.tick_interval.as_secs(),
            "Event ingestor started"
        );
        true
    }

    /// Running → Stopped. Waits for an in-progress tick to finish.
    pub async fn stop(&self) -> bool {
        let handle = {
            let mut task = self.inner.task.lock();
            if self.state() == IngestorState::Stopped {
                return false;
            }
            self.inner.state_tx.send_replace(IngestorState::Stopped);
            task.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Event ingestor task ended abnormally");
            }
        }
        tracing::info!("Event ingestor stopped");
        true
    }

    async fn run_loop(self, mut state_rx: watch::Receiver<IngestorState>) {
        let mut ticker = interval(self.inner.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume the first immediate tick

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.run_tick().await;
                    if summary.events_dispatched > 0 {
                        tracing::info!(
                            markets = summary.markets_polled,
                            events = summary.events_dispatched,
                            results = summary.results_recorded,
                            "Ingestion tick complete"
                        );
                    }
                }
                changed = state_rx.changed() => {
                    if changed.is_err() || *state_rx.borrow() == IngestorState::Stopped {
                        break;
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Poll every watched market once and dispatch the new events.
    pub async fn run_tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        for (market, makers, since) in self.due_markets() {
            let query = tokio::time::timeout(
                self.inner.config.query_timeout,
                self.inner.venue.query_recent_activity(&market, since),
            )
            .await;

            let records = match query {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    tracing::warn!(market = %market, error = %e, "Activity query failed, skipping market this tick");
                    counter!("ingest_query_failures").increment(1);
                    summary.markets_failed += 1;
                    continue;
                }
                Err(_) => {
                    tracing::warn!(market = %market, "Activity query timed out, skipping market this tick");
                    counter!("ingest_query_failures").increment(1);
                    summary.markets_failed += 1;
                    continue;
                }
            };
            summary.markets_polled += 1;

            let events = self.take_new_events(&market, &makers, &records);
            tracing::debug!(
                market = %market,
                records = records.len(),
                new_events = events.len(),
                "Market polled"
            );

            for event in &events {
                let results = self.inner.dispatcher.dispatch(event).await;
                summary.events_dispatched += 1;
                summary.results_recorded += results.len();
            }
        }

        summary
    }

    /// Markets with at least one registry bucket behind them. Makers whose
    /// bucket disappeared are pruned here.
    fn due_markets(&self) -> Vec<(String, HashSet<String>, DateTime<Utc>)> {
        let registry = self.inner.dispatcher.registry();
        let mut watches = self.inner.watches.lock();

        watches.retain(|market, watch| {
            watch.makers.retain(|maker| {
                let keep = registry.has_bucket(maker, market);
                if !keep {
                    tracing::info!(market = %market, maker = %maker, "No positions left, maker unsubscribed");
                }
                keep
            });
            !watch.makers.is_empty()
        });
        gauge!("tracked_markets").set(watches.len() as f64);

        watches
            .iter()
            .map(|(market, w)| (market.clone(), w.makers.clone(), w.cursor.since))
            .collect()
    }

    /// Normalize `records`, keep those from watched makers not yet seen, and
    /// advance the market cursor past everything observed.
    fn take_new_events(
        &self,
        market: &str,
        makers: &HashSet<String>,
        records: &[RawActivityRecord],
    ) -> Vec<MakerOrderEvent> {
        let mut watches = self.inner.watches.lock();
        let Some(watch) = watches.get_mut(market) else {
            return Vec::new();
        };

        // Every record is judged against the cursor as it stood before the
        // batch, so records sharing one timestamp are all admitted.
        let mut observed = Vec::new();
        let mut in_batch: HashSet<String> = HashSet::new();
        for raw in records {
            let event = match normalize_record(raw, market) {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::debug!(market, error = %e, "Dropping activity record");
                    continue;
                }
            };
            if watch.cursor.is_new(&event) && in_batch.insert(event.source_order_id.clone()) {
                observed.push(event);
            }
        }

        for event in &observed {
            watch.cursor.advance(event);
        }

        observed
            .into_iter()
            .filter(|ev| makers.contains(&ev.maker_address))
            .collect()
    }
}
