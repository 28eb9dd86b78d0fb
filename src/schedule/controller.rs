use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{config::LiveConfig, models::ScheduleEvent, source::ScheduleSource};

use super::{compute_schedule, ScheduleSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const MIN_TICK: Duration = Duration::from_millis(1);

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Re-evaluates the day's schedule on a fixed tick and publishes each
/// snapshot. The event list is fetched once per `start`.
#[derive(Clone)]
pub struct ScheduleController {
    events: Arc<Mutex<Vec<ScheduleEvent>>>,
    ticker: Arc<Mutex<Option<(JoinHandle<()>, CancellationToken)>>>,
    tick_interval: Duration,
    clock: Clock,
    snapshot_tx: Arc<watch::Sender<ScheduleSnapshot>>,
}

impl ScheduleController {
    /// A zero `schedule_tick_ms` is treated as one millisecond.
    pub fn new(config: &LiveConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(ScheduleSnapshot::default());
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: config.schedule_tick().max(MIN_TICK),
            clock: Arc::new(Utc::now),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// Replace the wall clock, e.g. to replay a past event day.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Load the schedule and start ticking. A failed fetch leaves an empty
    /// schedule rather than an error; the view shows nothing scheduled.
    pub async fn start<S: ScheduleSource>(&self, source: &S) -> Result<ScheduleSnapshot> {
        let events = match source.fetch_schedule_events().await {
            Ok(events) => events,
            Err(err) => {
                log_warn!("schedule fetch failed, showing empty schedule: {err:#}");
                Vec::new()
            }
        };
        log_info!("schedule loaded with {} events", events.len());

        *self.events.lock().await = events;
        let snapshot = self.refresh().await;
        self.spawn_ticker().await;
        Ok(snapshot)
    }

    /// Recompute against the clock right now and publish.
    pub async fn refresh(&self) -> ScheduleSnapshot {
        let events = self.events.lock().await;
        let snapshot = compute_schedule(&events, (self.clock)());
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    pub async fn stop(&self) {
        self.cancel_ticker().await;
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some((handle, token)) = ticker_guard.take() {
            token.cancel();
            handle.abort();
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; `start` already published.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let snapshot = controller.refresh().await;
                        log_debug!(
                            "schedule tick: current={:?} overall={:.1}%",
                            snapshot.current_event.as_ref().map(|state| state.event.title.as_str()),
                            snapshot.overall_progress
                        );
                    }
                    _ = cancelled.cancelled() => break,
                }
            }
        });

        *ticker_guard = Some((handle, token));
    }

    async fn cancel_ticker(&self) {
        if let Some((handle, token)) = self.ticker.lock().await.take() {
            token.cancel();
            let _ = handle.await;
            log_info!("schedule ticker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSchedule;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn config() -> LiveConfig {
        LiveConfig {
            schedule_tick_ms: 1_000,
            ..LiveConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_the_clock() {
        let base = Utc.with_ymd_and_hms(2025, 6, 14, 10, 30, 0).unwrap();
        let offset_minutes = Arc::new(AtomicI64::new(15));
        let clock_offset = offset_minutes.clone();
        let controller = ScheduleController::new(&config()).with_clock(Arc::new(move || {
            base + chrono::Duration::minutes(clock_offset.load(Ordering::SeqCst))
        }));

        let source = StaticSchedule::new(vec![
            ScheduleEvent::new("arrival", "Arrival", base, Some(base + chrono::Duration::minutes(30))),
            ScheduleEvent::new(
                "ceremony",
                "Ceremony",
                base + chrono::Duration::minutes(30),
                Some(base + chrono::Duration::minutes(90)),
            ),
        ]);

        let first = controller.start(&source).await.unwrap();
        assert_eq!(first.current_event.unwrap().event.id, "arrival");

        let mut rx = controller.subscribe();
        offset_minutes.store(45, Ordering::SeqCst);
        rx.changed().await.unwrap();
        let current = rx.borrow().current_event.clone().unwrap();
        assert_eq!(current.event.id, "ceremony");
        assert_eq!(current.progress_percentage, Some(25.0));

        controller.stop().await;
        controller.stop().await;
        assert!(!controller.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_still_ticks() {
        let base = Utc.with_ymd_and_hms(2025, 6, 14, 10, 30, 0).unwrap();
        let offset_minutes = Arc::new(AtomicI64::new(0));
        let clock_offset = offset_minutes.clone();
        let config = LiveConfig {
            schedule_tick_ms: 0,
            ..LiveConfig::default()
        };
        let controller = ScheduleController::new(&config).with_clock(Arc::new(move || {
            base + chrono::Duration::minutes(clock_offset.load(Ordering::SeqCst))
        }));
        let source = StaticSchedule::new(vec![
            ScheduleEvent::new("arrival", "Arrival", base, Some(base + chrono::Duration::minutes(30))),
            ScheduleEvent::new("dinner", "Dinner", base + chrono::Duration::minutes(30), None),
        ]);

        controller.start(&source).await.unwrap();
        assert!(controller.is_running().await);

        let mut rx = controller.subscribe();
        offset_minutes.store(40, Ordering::SeqCst);
        rx.changed().await.unwrap();
        let current = rx.borrow().current_event.clone().unwrap();
        assert_eq!(current.event.id, "dinner");

        controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_yields_empty_schedule() {
        let controller = ScheduleController::new(&config());
        let snapshot = controller.start(&StaticSchedule::unavailable()).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.overall_progress, 0.0);
        controller.stop().await;
    }
}
