// Rebuild Coordinator: the single writer of engine snapshots
// IDLE -> REBUILDING -> IDLE. Requests arriving mid-rebuild share at most one follow-up.

use std::{
    sync::{
        atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, mpsc::error::TrySendError, watch},
    task::JoinHandle,
    time::{interval_at, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    engine::{EngineSnapshot, RouteEngine},
    error::EngineError,
    graph::{FlightGraph, GraphBuilder},
    inventory::FlightInventory,
    route_cache::RouteCache,
    route_computer::find_routes,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RebuildReason {
    Startup,
    Timer,
    InventoryChanged,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RebuildState {
    Idle = 0,
    Rebuilding = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    // A rebuild will start as soon as the loop picks it up
    Scheduled,
    // Queued behind the rebuild in progress
    Queued,
    // A rebuild was already queued
    Coalesced,
    Stopped,
}

#[derive(Debug, Default)]
struct RebuildFlags {
    state: AtomicU8,
    // every request takes the next ticket
    requested: AtomicU64,
    // highest ticket covered by a rebuild that has started
    started: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    coalesced: AtomicUsize,
}

impl RebuildFlags {
    fn state(&self) -> RebuildState {
        match self.state.load(Ordering::SeqCst) {
            0 => RebuildState::Idle,
            _ => RebuildState::Rebuilding,
        }
    }

    fn set_state(&self, state: RebuildState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn next_ticket(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn pending(&self) -> bool {
        self.requested.load(Ordering::SeqCst) > self.started.load(Ordering::SeqCst)
    }
}

/// Cloneable handle for requesting rebuilds. The queue holds a single
/// signal, so bursts of requests collapse into one rebuild.
#[derive(Debug, Clone)]
pub struct RebuildTrigger {
    tx: mpsc::Sender<RebuildReason>,
    flags: Arc<RebuildFlags>,
}

impl RebuildTrigger {
    pub fn channel() -> (Self, mpsc::Receiver<RebuildReason>) {
        let (tx, rx) = mpsc::channel(1);
        let trigger = Self {
            tx,
            flags: Arc::new(RebuildFlags::default()),
        };
        (trigger, rx)
    }

    pub fn request(&self, reason: RebuildReason) -> TriggerOutcome {
        if self.tx.is_closed() {
            return TriggerOutcome::Stopped;
        }

        // Counted before sending: the next rebuild to start covers this request
        // whether it rides on this signal or on one already queued.
        self.flags.next_ticket();
        match self.tx.try_send(reason) {
            Ok(()) => match self.flags.state() {
                RebuildState::Idle => TriggerOutcome::Scheduled,
                RebuildState::Rebuilding => TriggerOutcome::Queued,
            },
            Err(TrySendError::Full(_)) => {
                self.flags.coalesced.fetch_add(1, Ordering::SeqCst);
                warn!(?reason, "rebuild already queued, coalescing trigger");
                TriggerOutcome::Coalesced
            }
            Err(TrySendError::Closed(_)) => TriggerOutcome::Stopped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildSummary {
    pub graph_version: u64,
    pub location_count: usize,
    pub flight_count: usize,
    pub excluded_count: usize,
    pub warmed_pairs: usize,
    pub elapsed_ms: u64,
    pub reason: RebuildReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RebuildEvent {
    Completed(RebuildSummary),
    Failed { reason: RebuildReason, error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebuildStatus {
    pub state: RebuildState,
    pub pending: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub coalesced: usize,
    pub graph_version: u64,
    pub last_summary: Option<RebuildSummary>,
}

// Outcome of the latest rebuild, shared with the requests it covered
#[derive(Debug)]
struct FinishedRebuild {
    covers: u64,
    result: Result<RebuildSummary, EngineError>,
}

pub struct RebuildCoordinator {
    engine: Arc<RouteEngine>,
    inventory: Arc<dyn FlightInventory>,
    trigger: RebuildTrigger,
    receiver: Mutex<Option<mpsc::Receiver<RebuildReason>>>,
    rebuild_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<RebuildEvent>,
    shutdown: watch::Sender<bool>,
    last_summary: RwLock<Option<RebuildSummary>>,
    last_finished: RwLock<Option<FinishedRebuild>>,
    interval: Option<Duration>,
    inventory_timeout: Duration,
}

impl RebuildCoordinator {
    pub fn new(engine: Arc<RouteEngine>, inventory: Arc<dyn FlightInventory>) -> Self {
        let config = engine.config();
        let (trigger, receiver) = RebuildTrigger::channel();
        let (events, _) = broadcast::channel(config.notification_capacity);
        let (shutdown, _) = watch::channel(false);
        let interval = match config.rebuild_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let inventory_timeout = Duration::from_millis(config.inventory_timeout_ms);

        Self {
            engine,
            inventory,
            trigger,
            receiver: Mutex::new(Some(receiver)),
            rebuild_lock: tokio::sync::Mutex::new(()),
            events,
            shutdown,
            last_summary: RwLock::new(None),
            last_finished: RwLock::new(None),
            interval,
            inventory_timeout,
        }
    }

    pub fn engine(&self) -> &Arc<RouteEngine> {
        &self.engine
    }

    pub fn trigger(&self) -> RebuildTrigger {
        self.trigger.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RebuildEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> RebuildStatus {
        let flags = &self.trigger.flags;
        RebuildStatus {
            state: flags.state(),
            pending: flags.pending(),
            succeeded: flags.succeeded.load(Ordering::SeqCst),
            failed: flags.failed.load(Ordering::SeqCst),
            coalesced: flags.coalesced.load(Ordering::SeqCst),
            graph_version: self.engine.graph_version(),
            last_summary: self.last_summary.read().clone(),
        }
    }

    /// Spawn the scheduling loop and queue the startup rebuild. Returns None if
    /// the loop was already started.
    pub fn start(coordinator: Arc<RebuildCoordinator>) -> Option<JoinHandle<()>> {
        let receiver = coordinator.receiver.lock().take()?;
        let shutdown = coordinator.shutdown.subscribe();
        coordinator.trigger.request(RebuildReason::Startup);

        Some(tokio::spawn(async move {
            coordinator.run(receiver, shutdown).await;
        }))
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn run(
        &self,
        mut receiver: mpsc::Receiver<RebuildReason>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let ticker = self
            .interval
            .map(|period| spawn_ticker(self.trigger.clone(), period, shutdown.clone()));

        info!(interval = ?self.interval, "rebuild coordinator started");

        loop {
            let reason = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                Some(reason) = receiver.recv() => reason,
            };

            // The signal stands for every request made so far, including the
            // ones coalesced onto it. Failures are already logged and broadcast.
            let ticket = self.trigger.flags.requested.load(Ordering::SeqCst);
            let _ = self.rebuild_for(reason, ticket).await;
        }

        if let Some(ticker) = ticker {
            let _ = ticker.await;
        }
        info!("rebuild coordinator stopped");
    }

    /// Run a rebuild and wait for its outcome. Callers arriving while one is
    /// in progress share a single follow-up; on failure the published
    /// snapshot is left untouched.
    pub async fn rebuild_now(&self, reason: RebuildReason) -> Result<RebuildSummary, EngineError> {
        let ticket = self.trigger.flags.next_ticket();
        self.rebuild_for(reason, ticket).await
    }

    async fn rebuild_for(
        &self,
        reason: RebuildReason,
        ticket: u64,
    ) -> Result<RebuildSummary, EngineError> {
        let _guard = self.rebuild_lock.lock().await;
        let flags = &self.trigger.flags;

        // A rebuild that started after this request was made already covers it
        let covered = self
            .last_finished
            .read()
            .as_ref()
            .filter(|finished| finished.covers >= ticket)
            .map(|finished| finished.result.clone());
        if let Some(result) = covered {
            flags.coalesced.fetch_add(1, Ordering::SeqCst);
            debug!(?reason, ticket, "rebuild request covered by a completed rebuild");
            return result;
        }

        let covers = flags.requested.load(Ordering::SeqCst);
        flags.started.fetch_max(covers, Ordering::SeqCst);
        flags.set_state(RebuildState::Rebuilding);
        let result = self.rebuild(reason).await;
        flags.set_state(RebuildState::Idle);

        match &result {
            Ok(summary) => {
                flags.succeeded.fetch_add(1, Ordering::SeqCst);
                *self.last_summary.write() = Some(summary.clone());
                info!(
                    version = summary.graph_version,
                    location_count = summary.location_count,
                    flight_count = summary.flight_count,
                    excluded = summary.excluded_count,
                    warmed = summary.warmed_pairs,
                    elapsed_ms = summary.elapsed_ms,
                    ?reason,
                    "route graph rebuilt"
                );
                let _ = self.events.send(RebuildEvent::Completed(summary.clone()));
            }
            Err(e) => {
                flags.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    error = %e,
                    ?reason,
                    live_version = self.engine.graph_version(),
                    "rebuild failed, keeping previous snapshot"
                );
                let _ = self.events.send(RebuildEvent::Failed {
                    reason,
                    error: e.to_string(),
                });
            }
        }

        *self.last_finished.write() = Some(FinishedRebuild {
            covers,
            result: result.clone(),
        });
        result
    }

    async fn rebuild(&self, reason: RebuildReason) -> Result<RebuildSummary, EngineError> {
        let started = Instant::now();

        let flights = tokio::time::timeout(self.inventory_timeout, self.inventory.load_flights())
            .await
            .map_err(|_| EngineError::InventoryTimeout(self.inventory_timeout.as_millis() as u64))??;

        let version = self.engine.graph_version() + 1;
        let graph = Arc::new(GraphBuilder::build(flights, version)?);
        let cache = Arc::new(RouteCache::new(version));
        let warmed_pairs = self.warm(&graph, &cache).await;

        let summary = RebuildSummary {
            graph_version: version,
            location_count: graph.location_count(),
            flight_count: graph.flight_count(),
            excluded_count: graph.excluded_count(),
            warmed_pairs,
            elapsed_ms: started.elapsed().as_millis() as u64,
            reason,
        };

        self.engine.publish(EngineSnapshot { graph, cache });
        Ok(summary)
    }

    // Precompute warm pairs in parallel on the blocking pool.
    async fn warm(&self, graph: &Arc<FlightGraph>, cache: &RouteCache) -> usize {
        let constraints = self.engine.default_constraints().clone();

        let tasks = self
            .engine
            .warm_policy()
            .warm_pairs()
            .into_iter()
            .map(|key| {
                let graph = Arc::clone(graph);
                let constraints = constraints.clone();
                tokio::task::spawn_blocking(move || {
                    let routes = find_routes(&graph, &key.source, &key.destination, &constraints);
                    (key, routes)
                })
            });

        let mut warmed = 0;
        for joined in join_all(tasks).await {
            match joined {
                Ok((key, Ok(routes))) => {
                    if cache.put(&key.source, &key.destination, Arc::new(routes), graph.version()) {
                        warmed += 1;
                    }
                }
                Ok((key, Err(e))) => {
                    warn!(source = %key.source, destination = %key.destination, error = %e, "skipping warm pair");
                }
                Err(e) => warn!(error = %e, "warm task failed"),
            }
        }

        warmed
    }
}

// Timer ticks go through the trigger queue like any other request, so a tick
// landing mid-rebuild coalesces with whatever is already queued.
fn spawn_ticker(
    trigger: RebuildTrigger,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let outcome = trigger.request(RebuildReason::Timer);
                    debug!(?outcome, "rebuild timer fired");
                }
            }
        }
    })
}
