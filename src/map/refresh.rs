use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::fleet::{Snapshot, SnapshotSource};

use super::cluster::cluster;
use super::markers::{InteractionState, MarkerLayer};
use super::projection::Projection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A popup or expanded cluster is open; nothing was fetched.
    Suppressed,
    /// The previous fetch has not come back yet.
    InFlight,
    Started,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied {
        entities: usize,
        located: usize,
        clusters: usize,
    },
    Failed(String),
    /// The result arrived after the user opened something and was dropped.
    Discarded,
}

/// Drives the periodic fetch → cluster → render cycle.
///
/// Fetches run on a worker thread; results are picked up by [`poll`] on the
/// UI thread. At most one fetch is outstanding at a time.
///
/// [`poll`]: Refresher::poll
pub struct Refresher {
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    radius_px: f32,
    next_tick: Option<Instant>,
    in_flight: Option<Receiver<Result<Snapshot, String>>>,
    last_snapshot: Option<Snapshot>,
    last_applied: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl Refresher {
    pub fn new(source: Arc<dyn SnapshotSource>, interval: Duration, radius_px: f32) -> Self {
        Self {
            source,
            interval,
            radius_px,
            next_tick: None,
            in_flight: None,
            last_snapshot: None,
            last_applied: None,
            last_error: None,
        }
    }

    pub fn set_radius_px(&mut self, radius_px: f32) {
        self.radius_px = radius_px;
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn last_applied(&self) -> Option<DateTime<Utc>> {
        self.last_applied
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The first tick is due immediately.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_none_or(|next| now >= next)
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_tick
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn request_now(&mut self) {
        self.next_tick = None;
    }

    /// Ticks if the interval has elapsed and schedules the next tick.
    pub fn run_due(&mut self, now: Instant, interaction: &InteractionState) -> Option<TickOutcome> {
        if !self.is_due(now) {
            return None;
        }
        self.next_tick = Some(now + self.interval);
        Some(self.tick(interaction))
    }

    pub fn tick(&mut self, interaction: &InteractionState) -> TickOutcome {
        if interaction.is_engaged() {
            log::debug!("refresh skipped: popup or expanded cluster is open");
            return TickOutcome::Suppressed;
        }

        if self.in_flight.is_some() {
            log::debug!("refresh skipped: previous fetch still running");
            return TickOutcome::InFlight;
        }

        log::debug!("fetching snapshot from {}", self.source.describe());
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        thread::spawn(move || {
            let result = source.fetch().map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        self.in_flight = Some(rx);
        TickOutcome::Started
    }

    /// Applies a finished fetch, if there is one.
    pub fn poll(
        &mut self,
        layer: &mut MarkerLayer,
        projection: &dyn Projection,
    ) -> Option<RefreshOutcome> {
        let rx = self.in_flight.take()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => {
                self.in_flight = Some(rx);
                return None;
            }
            Err(TryRecvError::Disconnected) => Err("snapshot fetch worker disconnected".to_owned()),
        };

        let outcome = match result {
            Err(error) => {
                log::warn!("snapshot refresh failed: {error}");
                self.last_error = Some(error.clone());
                RefreshOutcome::Failed(error)
            }
            Ok(snapshot) if layer.interaction().is_engaged() => {
                log::info!(
                    "dropping snapshot of {} vehicles: user opened a popup or cluster meanwhile",
                    snapshot.entities.len()
                );
                RefreshOutcome::Discarded
            }
            Ok(snapshot) => {
                self.last_error = None;
                self.last_applied = Some(snapshot.fetched_at);
                let outcome = self.apply(snapshot, layer, projection);
                if let RefreshOutcome::Applied {
                    entities,
                    located,
                    clusters,
                } = &outcome
                {
                    log::info!(
                        "snapshot applied: {entities} vehicles, {located} located, {clusters} clusters"
                    );
                }
                outcome
            }
        };

        Some(outcome)
    }

    /// Re-clusters the last snapshot for the current view without fetching.
    pub fn recluster(&mut self, layer: &mut MarkerLayer, projection: &dyn Projection) -> bool {
        if layer.interaction().is_engaged() {
            return false;
        }
        let Some(snapshot) = self.last_snapshot.take() else {
            return false;
        };
        self.apply(snapshot, layer, projection);
        true
    }

    fn apply(
        &mut self,
        snapshot: Snapshot,
        layer: &mut MarkerLayer,
        projection: &dyn Projection,
    ) -> RefreshOutcome {
        let clusters = cluster(&snapshot.entities, projection, self.radius_px);
        let outcome = RefreshOutcome::Applied {
            entities: snapshot.entities.len(),
            located: snapshot.located_count(),
            clusters: clusters.len(),
        };
        layer.render_snapshot(clusters);
        self.last_snapshot = Some(snapshot);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};

    use crate::fleet::Entity;

    use super::super::cluster::tests::{PixelProjection, vehicle};
    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        entities: Mutex<Vec<Entity>>,
        gate: Option<Mutex<Receiver<()>>>,
    }

    impl CountingSource {
        fn new(entities: Vec<Entity>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                entities: Mutex::new(entities),
                gate: None,
            })
        }

        fn gated(entities: Vec<Entity>) -> (Arc<Self>, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let source = Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                entities: Mutex::new(entities),
                gate: Some(Mutex::new(rx)),
            });
            (source, tx)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SnapshotSource for CountingSource {
        fn fetch(&self) -> Result<Snapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let gate = gate.lock().map_err(|_| anyhow!("gate poisoned"))?;
                gate.recv().map_err(|_| anyhow!("gate closed"))?;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("connection refused"));
            }
            let entities = self
                .entities
                .lock()
                .map_err(|_| anyhow!("entities poisoned"))?
                .clone();
            Ok(Snapshot::new(entities))
        }
    }

    fn fleet() -> Vec<Entity> {
        vec![
            vehicle("a", 100.0, 100.0),
            vehicle("b", 110.0, 100.0),
            vehicle("c", 300.0, 100.0),
        ]
    }

    fn refresher(source: Arc<CountingSource>) -> Refresher {
        Refresher::new(source, Duration::from_secs(10), 28.0)
    }

    fn settle(refresher: &mut Refresher, layer: &mut MarkerLayer) -> RefreshOutcome {
        for _ in 0..1_000 {
            if let Some(outcome) = refresher.poll(layer, &PixelProjection) {
                return outcome;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("fetch never completed");
    }

    fn loaded() -> (Arc<CountingSource>, Refresher, MarkerLayer) {
        let source = CountingSource::new(fleet());
        let mut refresher = refresher(Arc::clone(&source));
        let mut layer = MarkerLayer::new();
        layer.attach_gesture_handler();
        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::Started);
        settle(&mut refresher, &mut layer);
        (source, refresher, layer)
    }

    #[test]
    fn tick_fetches_clusters_and_renders() {
        let (source, refresher, layer) = loaded();
        assert_eq!(source.calls(), 1);
        assert_eq!(layer.clusters().len(), 2);
        assert_eq!(layer.clusters()[0].len(), 2);
        assert!(layer.clusters()[1].is_single());
        assert_eq!(layer.markers().count(), 2);
        assert!(refresher.last_applied().is_some());
        assert!(!refresher.is_fetching());
    }

    #[test]
    fn open_popup_suppresses_tick() {
        let (source, mut refresher, mut layer) = loaded();
        let entity = layer.clusters()[1].members[0].clone();
        let handle = layer.clusters()[1].marker.expect("rendered");
        layer.open_popup(&entity, handle);
        let before = layer.interaction().rendered_single_markers().clone();

        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::Suppressed);
        assert!(refresher.poll(&mut layer, &PixelProjection).is_none());
        assert_eq!(source.calls(), 1);
        assert_eq!(layer.interaction().rendered_single_markers(), &before);
    }

    #[test]
    fn open_spiderfy_suppresses_tick() {
        let (source, mut refresher, mut layer) = loaded();
        layer.toggle_spiderfy(0, &PixelProjection);

        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::Suppressed);
        assert_eq!(source.calls(), 1);
        assert_eq!(layer.interaction().rendered_spider_markers().len(), 2);
    }

    #[test]
    fn failed_fetch_keeps_previous_markers() {
        let (source, mut refresher, mut layer) = loaded();
        let before = layer.interaction().rendered_single_markers().clone();
        source.fail.store(true, Ordering::SeqCst);

        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::Started);
        let outcome = settle(&mut refresher, &mut layer);
        assert!(matches!(outcome, RefreshOutcome::Failed(ref error) if error.contains("connection refused")));
        assert_eq!(layer.interaction().rendered_single_markers(), &before);
        assert_eq!(layer.markers().count(), 2);
        assert!(refresher.last_error().is_some());

        source.fail.store(false, Ordering::SeqCst);
        refresher.tick(layer.interaction());
        settle(&mut refresher, &mut layer);
        assert!(refresher.last_error().is_none());
    }

    #[test]
    fn overlapping_ticks_do_not_double_fetch() {
        let (source, gate) = CountingSource::gated(fleet());
        let mut refresher = refresher(Arc::clone(&source));
        let mut layer = MarkerLayer::new();

        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::Started);
        assert_eq!(refresher.tick(layer.interaction()), TickOutcome::InFlight);
        assert!(refresher.is_fetching());

        gate.send(()).expect("worker waiting");
        let outcome = settle(&mut refresher, &mut layer);
        assert_eq!(
            outcome,
            RefreshOutcome::Applied {
                entities: 3,
                located: 3,
                clusters: 2
            }
        );
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn result_is_dropped_if_user_engaged_meanwhile() {
        let (source, gate) = CountingSource::gated(fleet());
        let mut refresher = refresher(Arc::clone(&source));
        let mut layer = MarkerLayer::new();
        layer.render_snapshot(cluster(
            &[vehicle("old", 0.0, 0.0)],
            &PixelProjection,
            28.0,
        ));
        let handle = layer.clusters()[0].marker.expect("rendered");
        let entity = layer.clusters()[0].members[0].clone();

        refresher.tick(layer.interaction());
        layer.open_popup(&entity, handle);
        gate.send(()).expect("worker waiting");

        assert_eq!(settle(&mut refresher, &mut layer), RefreshOutcome::Discarded);
        assert_eq!(layer.markers().count(), 1);
        assert!(layer.marker(handle).is_some());
    }

    #[test]
    fn ticks_follow_the_interval() {
        let source = CountingSource::new(Vec::new());
        let mut refresher = refresher(source);
        let layer = MarkerLayer::new();
        let start = Instant::now();

        assert!(refresher.is_due(start));
        assert_eq!(
            refresher.run_due(start, layer.interaction()),
            Some(TickOutcome::Started)
        );
        assert_eq!(refresher.run_due(start + Duration::from_secs(3), layer.interaction()), None);
        assert_eq!(
            refresher.time_until_due(start + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert!(refresher.is_due(start + Duration::from_secs(10)));

        refresher.request_now();
        assert!(refresher.is_due(start));
    }

    #[test]
    fn recluster_uses_new_radius_without_fetching() {
        let (source, mut refresher, mut layer) = loaded();
        refresher.set_radius_px(5.0);
        assert!(refresher.recluster(&mut layer, &PixelProjection));
        assert_eq!(layer.clusters().len(), 3);
        assert_eq!(source.calls(), 1);

        let entity = layer.clusters()[0].members[0].clone();
        let handle = layer.clusters()[0].marker.expect("rendered");
        layer.open_popup(&entity, handle);
        assert!(!refresher.recluster(&mut layer, &PixelProjection));
    }

    #[test]
    fn recluster_needs_a_snapshot() {
        let source = CountingSource::new(Vec::new());
        let mut refresher = refresher(source);
        let mut layer = MarkerLayer::new();
        assert!(!refresher.recluster(&mut layer, &PixelProjection));
    }
}
