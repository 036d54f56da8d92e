use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::models::booking::BookingHeadline;
use crate::observability::metrics::Metrics;

/// Newest-first snapshot of bookings still waiting for dispatch.
#[async_trait]
pub trait RecentBookings: Send + Sync {
    async fn recent_awaiting_dispatch(&self, limit: usize) -> AppResult<Vec<BookingHeadline>>;
}

/// Where "new booking" alerts go. Delivery is best-effort.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn raise(&self, booking: &BookingHeadline);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Uninitialized,
    Primed,
    Polling,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    FetchFailed,
    Empty,
    /// First snapshot since start; remembered without alerting.
    Primed,
    Unchanged,
    /// Bookings newer than the cursor, oldest first.
    Fresh(Vec<BookingHeadline>),
    /// The remembered booking left the window; nothing is alerted.
    CursorLost,
}

impl Tick {
    fn outcome(&self) -> &'static str {
        match self {
            Tick::FetchFailed => "fetch_failed",
            Tick::Empty => "empty",
            Tick::Primed => "primed",
            Tick::Unchanged => "unchanged",
            Tick::Fresh(_) => "fresh",
            Tick::CursorLost => "cursor_lost",
        }
    }
}

/// Last-seen booking id. Lives only in memory, so a restart primes again.
#[derive(Debug)]
pub struct NotificationCursor {
    last_seen: Option<String>,
    state: WatchState,
}

impl Default for NotificationCursor {
    fn default() -> Self {
        Self {
            last_seen: None,
            state: WatchState::Uninitialized,
        }
    }
}

impl NotificationCursor {
    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    pub fn observe(&mut self, snapshot: &[BookingHeadline]) -> Tick {
        let Some(newest) = snapshot.first() else {
            return Tick::Empty;
        };

        let tick = match self.last_seen.as_deref() {
            None => Tick::Primed,
            Some(previous) => match snapshot.iter().position(|b| b.id == previous) {
                Some(0) => Tick::Unchanged,
                Some(position) => Tick::Fresh(
                    snapshot[..position]
                        .iter()
                        .rev()
                        .filter(|booking| booking.status.is_awaiting_dispatch())
                        .cloned()
                        .collect(),
                ),
                None => Tick::CursorLost,
            },
        };

        self.last_seen = Some(newest.id.clone());
        self.state = match self.state {
            WatchState::Uninitialized => WatchState::Primed,
            WatchState::Primed | WatchState::Polling => WatchState::Polling,
        };

        tick
    }
}

pub struct BookingWatcher {
    source: Arc<dyn RecentBookings>,
    sink: Arc<dyn AlertSink>,
    cursor: NotificationCursor,
    window: usize,
    interval: Duration,
    metrics: Metrics,
}

impl BookingWatcher {
    pub fn new(
        source: Arc<dyn RecentBookings>,
        sink: Arc<dyn AlertSink>,
        window: usize,
        interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            source,
            sink,
            cursor: NotificationCursor::default(),
            window,
            interval,
            metrics,
        }
    }

    pub fn cursor(&self) -> &NotificationCursor {
        &self.cursor
    }

    pub async fn tick(&mut self) -> Tick {
        let tick = match self.source.recent_awaiting_dispatch(self.window).await {
            Ok(snapshot) => self.cursor.observe(&snapshot),
            Err(err) => {
                error!(error = %err, "failed to check for new bookings");
                Tick::FetchFailed
            }
        };

        self.metrics
            .booking_polls_total
            .with_label_values(&[tick.outcome()])
            .inc();

        match &tick {
            Tick::Fresh(bookings) => {
                for booking in bookings {
                    self.sink.raise(booking).await;
                }
            }
            Tick::CursorLost => {
                warn!(
                    cursor = self.cursor.last_seen().unwrap_or_default(),
                    "last seen booking left the window; re-anchored without alerts"
                );
            }
            Tick::Primed => {
                debug!(cursor = self.cursor.last_seen().unwrap_or_default(), "booking watcher primed");
            }
            Tick::FetchFailed | Tick::Empty | Tick::Unchanged => {}
        }

        tick
    }

    /// Spawns the polling loop. The first tick runs immediately.
    pub fn start(mut self) -> WatcherHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                window = self.window,
                "booking watcher started"
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        self.tick().await;
                    }
                }
            }

            info!("booking watcher stopped");
        });

        WatcherHandle { stop_tx, task }
    }
}

pub struct WatcherHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signals the loop to exit before its next tick; a tick already in
    /// flight runs to completion.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::{
        AlertSink, BookingWatcher, NotificationCursor, RecentBookings, Tick, WatchState,
    };
    use crate::error::{AppError, AppResult};
    use crate::models::booking::{BookingHeadline, BookingStatus};
    use crate::observability::metrics::Metrics;

    fn headline(id: &str, status: BookingStatus) -> BookingHeadline {
        BookingHeadline {
            id: id.to_string(),
            booking_ref: format!("BC-{id}"),
            user_first_name: Some("Asha".to_string()),
            pickup_address: Some("MG Road".to_string()),
            price_total: Some(450.0),
            status,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
        }
    }

    fn pending(ids: &[&str]) -> Vec<BookingHeadline> {
        ids.iter()
            .map(|id| headline(id, BookingStatus::Pending))
            .collect()
    }

    fn ids(bookings: &[BookingHeadline]) -> Vec<&str> {
        bookings.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn first_snapshot_primes_without_alerts() {
        let mut cursor = NotificationCursor::default();
        assert_eq!(cursor.state(), WatchState::Uninitialized);

        assert_eq!(cursor.observe(&pending(&["c", "b", "a"])), Tick::Primed);
        assert_eq!(cursor.state(), WatchState::Primed);
        assert_eq!(cursor.last_seen(), Some("c"));
    }

    #[test]
    fn identical_snapshot_alerts_nothing() {
        let mut cursor = NotificationCursor::default();
        cursor.observe(&pending(&["c", "b", "a"]));

        assert_eq!(cursor.observe(&pending(&["c", "b", "a"])), Tick::Unchanged);
        assert_eq!(cursor.state(), WatchState::Polling);
    }

    #[test]
    fn newer_bookings_alert_oldest_first() {
        let mut cursor = NotificationCursor::default();
        cursor.observe(&pending(&["c", "b", "a"]));

        match cursor.observe(&pending(&["e", "d", "c", "b"])) {
            Tick::Fresh(fresh) => assert_eq!(ids(&fresh), vec!["d", "e"]),
            other => panic!("expected fresh bookings, got {other:?}"),
        }
        assert_eq!(cursor.last_seen(), Some("e"));
    }

    #[test]
    fn fresh_bookings_are_rechecked_for_status() {
        let mut cursor = NotificationCursor::default();
        cursor.observe(&pending(&["a"]));

        let snapshot = vec![
            headline("c", BookingStatus::Confirmed),
            headline("b", BookingStatus::CancelledByUser),
            headline("a", BookingStatus::Pending),
        ];
        match cursor.observe(&snapshot) {
            Tick::Fresh(fresh) => assert_eq!(ids(&fresh), vec!["c"]),
            other => panic!("expected fresh bookings, got {other:?}"),
        }
    }

    #[test]
    fn lost_cursor_suppresses_and_reanchors() {
        let mut cursor = NotificationCursor::default();
        cursor.observe(&pending(&["c", "b", "a"]));

        assert_eq!(cursor.observe(&pending(&["z", "y", "x"])), Tick::CursorLost);
        assert_eq!(cursor.last_seen(), Some("z"));

        match cursor.observe(&pending(&["new", "z", "y"])) {
            Tick::Fresh(fresh) => assert_eq!(ids(&fresh), vec!["new"]),
            other => panic!("expected fresh bookings, got {other:?}"),
        }
    }

    #[test]
    fn empty_snapshot_keeps_cursor() {
        let mut cursor = NotificationCursor::default();
        assert_eq!(cursor.observe(&[]), Tick::Empty);
        assert_eq!(cursor.state(), WatchState::Uninitialized);

        cursor.observe(&pending(&["a"]));
        assert_eq!(cursor.observe(&[]), Tick::Empty);
        assert_eq!(cursor.last_seen(), Some("a"));
    }

    struct ScriptedSource {
        snapshots: Mutex<Vec<AppResult<Vec<BookingHeadline>>>>,
    }

    impl ScriptedSource {
        fn new(mut snapshots: Vec<AppResult<Vec<BookingHeadline>>>) -> Self {
            snapshots.reverse();
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl RecentBookings for ScriptedSource {
        async fn recent_awaiting_dispatch(&self, limit: usize) -> AppResult<Vec<BookingHeadline>> {
            assert_eq!(limit, 10);
            self.snapshots
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        raised: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn raise(&self, booking: &BookingHeadline) {
            self.raised.lock().unwrap().push(booking.id.clone());
        }
    }

    fn watcher(
        snapshots: Vec<AppResult<Vec<BookingHeadline>>>,
        sink: Arc<RecordingSink>,
    ) -> BookingWatcher {
        BookingWatcher::new(
            Arc::new(ScriptedSource::new(snapshots)),
            sink,
            10,
            Duration::from_millis(20),
            Metrics::new(),
        )
    }

    #[tokio::test]
    async fn cold_start_never_alerts_even_with_many_pending() {
        let sink = Arc::new(RecordingSink::default());
        let mut watcher = watcher(vec![Ok(pending(&["e", "d", "c", "b", "a"]))], sink.clone());

        assert_eq!(watcher.tick().await, Tick::Primed);
        assert!(sink.raised.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_cursor_alone() {
        let sink = Arc::new(RecordingSink::default());
        let mut watcher = watcher(
            vec![
                Ok(pending(&["a"])),
                Err(AppError::Transport("connection reset".to_string())),
                Ok(pending(&["b", "a"])),
            ],
            sink.clone(),
        );

        watcher.tick().await;
        assert_eq!(watcher.tick().await, Tick::FetchFailed);
        assert_eq!(watcher.cursor().last_seen(), Some("a"));

        watcher.tick().await;
        assert_eq!(*sink.raised.lock().unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn started_watcher_alerts_and_stops() {
        let sink = Arc::new(RecordingSink::default());
        let handle = watcher(
            vec![Ok(pending(&["a"])), Ok(pending(&["c", "b", "a"]))],
            sink.clone(),
        )
        .start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(handle.is_finished());
        assert_eq!(
            *sink.raised.lock().unwrap(),
            vec!["b".to_string(), "c".to_string()]
        );
    }

    struct SlowSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RecentBookings for SlowSource {
        async fn recent_awaiting_dispatch(&self, _limit: usize) -> AppResult<Vec<BookingHeadline>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok(pending(&["a"]))
        }
    }

    #[tokio::test]
    async fn stop_during_slow_tick_starts_no_new_fetch() {
        for _ in 0..20 {
            let source = Arc::new(SlowSource {
                fetches: AtomicUsize::new(0),
            });
            let handle = BookingWatcher::new(
                source.clone(),
                Arc::new(RecordingSink::default()),
                10,
                Duration::from_millis(20),
                Metrics::new(),
            )
            .start();

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
            handle.stop();

            tokio::time::sleep(Duration::from_millis(150)).await;
            assert!(handle.is_finished());
            assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        }
    }
}
