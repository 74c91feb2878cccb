//! Single-slot notification scheduler.
//!
//! At most one alert is on screen. Offering a new occurrence replaces the
//! visible alert and restarts its countdown. When the countdown elapses (or
//! the operator dismisses) the alert enters its exit transition, and the
//! close callback fires once the exit delay has passed.
//!
//! Both timers are tokio tasks owned by the slot. Every transition aborts the
//! handles it supersedes before arming new ones, and every timer re-checks
//! the slot's instance counter under the lock when it wakes, so a timer that
//! lost a race against `offer`, `dismiss` or `shutdown` never fires.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use vigil_core::config::NotificationConfig;
use vigil_core::Occurrence;

use crate::error::AlertError;
use crate::listener::NotificationListener;
use crate::state::NotificationPhase;

/// Default visible lifetime of an alert.
pub const DEFAULT_AUTO_DISMISS: Duration = Duration::from_millis(5000);
/// Default length of the exit transition.
pub const DEFAULT_EXIT_DELAY: Duration = Duration::from_millis(300);

/// Timer durations used by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTimings {
    pub auto_dismiss: Duration,
    pub exit_delay: Duration,
}

impl Default for SchedulerTimings {
    fn default() -> Self {
        Self {
            auto_dismiss: DEFAULT_AUTO_DISMISS,
            exit_delay: DEFAULT_EXIT_DELAY,
        }
    }
}

impl From<&NotificationConfig> for SchedulerTimings {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            auto_dismiss: Duration::from_millis(config.auto_dismiss_ms),
            exit_delay: Duration::from_millis(config.exit_delay_ms),
        }
    }
}

/// Point-in-time view of the notification slot.
#[derive(Debug, Clone)]
pub struct NotificationSnapshot {
    pub phase: NotificationPhase,
    /// Incremented on every offer. Identifies the current alert.
    pub instance: u64,
    pub occurrence: Option<Occurrence>,
}

struct Slot {
    phase: NotificationPhase,
    instance: u64,
    occurrence: Option<Occurrence>,
    auto_dismiss: Option<JoinHandle<()>>,
    exit_delay: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl Slot {
    fn new() -> Self {
        Self {
            phase: NotificationPhase::Idle,
            instance: 0,
            occurrence: None,
            auto_dismiss: None,
            exit_delay: None,
            shut_down: false,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(handle) = self.auto_dismiss.take() {
            handle.abort();
        }
        if let Some(handle) = self.exit_delay.take() {
            handle.abort();
        }
    }

    fn transition(&mut self, target: NotificationPhase) {
        debug_assert!(
            self.phase.can_transition_to(&target),
            "invalid notification transition {} -> {}",
            self.phase,
            target
        );
        tracing::trace!(from = %self.phase, to = %target, instance = self.instance, "Notification transition");
        self.phase = target;
    }

    /// A timer armed for `instance` expecting `phase` is still current.
    fn is_current(&self, instance: u64, phase: NotificationPhase) -> bool {
        !self.shut_down && self.instance == instance && self.phase == phase
    }
}

struct Shared {
    slot: Mutex<Slot>,
    listener: Arc<dyn NotificationListener>,
    timings: SchedulerTimings,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot state stays consistent even if a listener panicked mid-callback.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm_auto_dismiss(self: &Arc<Self>, instance: u64) -> JoinHandle<()> {
        let deadline = Instant::now() + self.timings.auto_dismiss;
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.auto_dismiss_elapsed(instance);
        })
    }

    fn arm_exit_delay(self: &Arc<Self>, instance: u64) -> JoinHandle<()> {
        let deadline = Instant::now() + self.timings.exit_delay;
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.exit_delay_elapsed(instance);
        })
    }

    /// Showing -> Closing. Caller holds the lock and has checked the phase.
    fn begin_close(self: &Arc<Self>, slot: &mut Slot) {
        slot.cancel_timers();
        slot.transition(NotificationPhase::Closing);
        slot.exit_delay = Some(self.arm_exit_delay(slot.instance));
    }

    fn auto_dismiss_elapsed(self: &Arc<Self>, instance: u64) {
        let mut slot = self.lock();
        if !slot.is_current(instance, NotificationPhase::Showing) {
            tracing::trace!(instance, "Stale auto-dismiss timer ignored");
            return;
        }
        // This task is finishing; dropping its handle is enough.
        slot.auto_dismiss = None;
        tracing::debug!(instance, "Notification auto-dismissed");
        self.begin_close(&mut slot);
    }

    fn exit_delay_elapsed(&self, instance: u64) {
        let mut slot = self.lock();
        if !slot.is_current(instance, NotificationPhase::Closing) {
            tracing::trace!(instance, "Stale exit timer ignored");
            return;
        }
        slot.exit_delay = None;
        slot.transition(NotificationPhase::Idle);
        slot.occurrence = None;
        tracing::debug!(instance, "Notification closed");
        self.listener.on_close();
    }
}

/// Owns the single notification slot and its timers.
///
/// Must be used from within a tokio runtime: timers are spawned tasks.
/// Dropping the scheduler shuts it down.
pub struct NotificationScheduler {
    shared: Arc<Shared>,
}

impl NotificationScheduler {
    pub fn new(listener: Arc<dyn NotificationListener>) -> Self {
        Self::with_timings(listener, SchedulerTimings::default())
    }

    pub fn with_timings(listener: Arc<dyn NotificationListener>, timings: SchedulerTimings) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::new()),
                listener,
                timings,
            }),
        }
    }

    /// Show an alert for `occurrence`, replacing whatever is on screen.
    ///
    /// Any pending auto-dismiss or exit timer is cancelled first. The
    /// replaced alert does not get a close callback.
    pub fn offer(&self, occurrence: Occurrence) -> Result<(), AlertError> {
        self.reserve()?.show(occurrence);
        Ok(())
    }

    /// Claim the slot for an upcoming offer.
    ///
    /// The returned permit holds the slot lock, so no `shutdown`, `dismiss`
    /// or timer can run until it is used or dropped. Dropping it unused
    /// leaves the slot untouched.
    pub fn reserve(&self) -> Result<OfferPermit<'_>, AlertError> {
        let slot = self.shared.lock();
        if slot.shut_down {
            return Err(AlertError::ShuttingDown);
        }
        Ok(OfferPermit {
            shared: &self.shared,
            slot,
        })
    }

    /// Start closing the visible alert ahead of its countdown.
    ///
    /// Returns `false` (and does nothing) unless an alert is currently
    /// showing. Dismissing an alert that is already closing does not
    /// restart its exit transition.
    pub fn dismiss(&self) -> bool {
        let mut slot = self.shared.lock();
        if slot.shut_down || slot.phase != NotificationPhase::Showing {
            tracing::debug!(phase = %slot.phase, "Dismiss ignored");
            return false;
        }
        tracing::debug!(instance = slot.instance, "Notification dismissed by operator");
        self.shared.begin_close(&mut slot);
        true
    }

    /// Cancel all pending timers and stop accepting offers.
    ///
    /// No callbacks fire after this returns. Idempotent.
    pub fn shutdown(&self) {
        let mut slot = self.shared.lock();
        if slot.shut_down {
            return;
        }
        slot.cancel_timers();
        slot.shut_down = true;
        // Teardown is not a visible transition; it bypasses the phase table.
        slot.phase = NotificationPhase::Idle;
        slot.occurrence = None;
        tracing::info!("Notification scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shut_down
    }

    pub fn phase(&self) -> NotificationPhase {
        self.shared.lock().phase
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        let slot = self.shared.lock();
        NotificationSnapshot {
            phase: slot.phase,
            instance: slot.instance,
            occurrence: slot.occurrence.clone(),
        }
    }

    /// Number of timers armed and not yet completed.
    pub fn outstanding_timers(&self) -> usize {
        let slot = self.shared.lock();
        [&slot.auto_dismiss, &slot.exit_delay]
            .into_iter()
            .flatten()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

/// Exclusive claim on a running scheduler's slot, from [`NotificationScheduler::reserve`].
pub struct OfferPermit<'a> {
    shared: &'a Arc<Shared>,
    slot: MutexGuard<'a, Slot>,
}

impl OfferPermit<'_> {
    /// Show `occurrence`, replacing whatever is on screen.
    pub fn show(mut self, occurrence: Occurrence) {
        let replaced = self.slot.phase.is_visible();
        self.slot.cancel_timers();
        self.slot.instance += 1;
        self.slot.transition(NotificationPhase::Showing);

        tracing::info!(
            instance = self.slot.instance,
            occurrence_id = %occurrence.id(),
            category = occurrence.category().code(),
            severity = %occurrence.severity(),
            replaced,
            "Showing notification"
        );
        self.shared.listener.on_show(&occurrence);
        self.slot.occurrence = Some(occurrence);

        let instance = self.slot.instance;
        self.slot.auto_dismiss = Some(self.shared.arm_auto_dismiss(instance));
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use vigil_core::{Category, OccurrenceId};

    #[derive(Default)]
    struct RecordingListener {
        shown: Mutex<Vec<OccurrenceId>>,
        closes: AtomicUsize,
        open: AtomicBool,
        violations: AtomicUsize,
    }

    impl RecordingListener {
        fn shown(&self) -> Vec<OccurrenceId> {
            self.shown.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl NotificationListener for RecordingListener {
        fn on_show(&self, occurrence: &Occurrence) {
            self.shown.lock().unwrap().push(occurrence.id());
            self.open.store(true, Ordering::SeqCst);
        }

        fn on_close(&self) {
            // A close without an open alert means a double close.
            if !self.open.swap(false, Ordering::SeqCst) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn occurrence(category: Category, duration_secs: u32) -> Occurrence {
        Occurrence::new(category, duration_secs, Utc::now())
    }

    fn setup() -> (Arc<RecordingListener>, NotificationScheduler) {
        let listener = Arc::new(RecordingListener::default());
        let scheduler = NotificationScheduler::new(listener.clone());
        (listener, scheduler)
    }

    async fn advance_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn test_timings_default_and_from_config() {
        assert_eq!(
            SchedulerTimings::default(),
            SchedulerTimings {
                auto_dismiss: Duration::from_millis(5000),
                exit_delay: Duration::from_millis(300),
            }
        );

        let config = NotificationConfig {
            visual: true,
            auto_dismiss_ms: 1200,
            exit_delay_ms: 50,
        };
        let timings = SchedulerTimings::from(&config);
        assert_eq!(timings.auto_dismiss, Duration::from_millis(1200));
        assert_eq!(timings.exit_delay, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_shows_immediately() {
        let (listener, scheduler) = setup();
        let occ = occurrence(Category::DarkScreen, 3);
        let id = occ.id();

        scheduler.offer(occ).unwrap();

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.phase, NotificationPhase::Showing);
        assert_eq!(snapshot.instance, 1);
        assert_eq!(snapshot.occurrence.map(|o| o.id()), Some(id));
        assert_eq!(listener.shown(), vec![id]);
        assert_eq!(scheduler.outstanding_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_then_exit_delay() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::Freeze, 12)).unwrap();

        advance_ms(4999).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Showing);

        advance_ms(2).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);
        assert_eq!(listener.closes(), 0);
        assert_eq!(scheduler.outstanding_timers(), 1);

        advance_ms(298).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);

        advance_ms(2).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
        assert_eq!(scheduler.outstanding_timers(), 0);
        assert!(scheduler.snapshot().occurrence.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_auto_dismiss() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::Cut, 1)).unwrap();

        advance_ms(1000).await;
        assert!(scheduler.dismiss());
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);
        assert_eq!(scheduler.outstanding_timers(), 1);

        advance_ms(301).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);

        // The original 5s deadline passes without a second close.
        advance_ms(10_000).await;
        assert_eq!(listener.closes(), 1);
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_is_noop_unless_showing() {
        let (listener, scheduler) = setup();
        assert!(!scheduler.dismiss());
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);

        scheduler.offer(occurrence(Category::Lipsync, 5)).unwrap();
        assert!(scheduler.dismiss());

        // Already closing: the exit transition is not restarted.
        advance_ms(200).await;
        assert!(!scheduler.dismiss());
        advance_ms(101).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_restarts_countdown() {
        let (listener, scheduler) = setup();
        let first = occurrence(Category::DarkScreen, 3);
        let second = occurrence(Category::WrongImage, 70);
        let (first_id, second_id) = (first.id(), second.id());

        scheduler.offer(first).unwrap();
        advance_ms(2000).await;
        scheduler.offer(second).unwrap();

        // First alert's deadline would have been t=5000.
        advance_ms(3500).await;
        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.phase, NotificationPhase::Showing);
        assert_eq!(snapshot.instance, 2);
        assert_eq!(snapshot.occurrence.map(|o| o.id()), Some(second_id));
        assert_eq!(listener.closes(), 0);

        // t=7000 auto-dismiss, t=7300 close.
        advance_ms(1850).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
        assert_eq!(listener.shown(), vec![first_id, second_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_during_exit_transition_suppresses_close() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::Fade, 2)).unwrap();
        scheduler.dismiss();

        advance_ms(100).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);
        scheduler.offer(occurrence(Category::Freeze, 8)).unwrap();
        assert_eq!(scheduler.phase(), NotificationPhase::Showing);
        assert_eq!(scheduler.outstanding_timers(), 1);

        // The cancelled exit timer would have fired at t=300.
        advance_ms(1000).await;
        assert_eq!(listener.closes(), 0);
        assert_eq!(scheduler.phase(), NotificationPhase::Showing);

        advance_ms(4500).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_racing_auto_dismiss() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::Cut, 40)).unwrap();

        // Lands on the same tick as the auto-dismiss deadline; either may win.
        advance_ms(5000).await;
        scheduler.dismiss();
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);

        advance_ms(1000).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
        assert_eq!(listener.violations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_timers() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::DarkScreen, 9)).unwrap();
        assert_eq!(scheduler.outstanding_timers(), 1);

        scheduler.shutdown();
        assert!(scheduler.is_shut_down());
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(scheduler.outstanding_timers(), 0);

        advance_ms(60_000).await;
        assert_eq!(listener.closes(), 0);
        assert_eq!(
            scheduler.offer(occurrence(Category::Freeze, 1)),
            Err(AlertError::ShuttingDown)
        );
        assert!(!scheduler.dismiss());
        assert_eq!(listener.shown().len(), 1);

        // Idempotent
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_exit_transition() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::PixelVariance, 4)).unwrap();
        scheduler.dismiss();
        advance_ms(150).await;

        scheduler.shutdown();
        advance_ms(1000).await;
        assert_eq!(listener.closes(), 0);
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_timers() {
        let listener = Arc::new(RecordingListener::default());
        {
            let scheduler = NotificationScheduler::new(listener.clone());
            scheduler.offer(occurrence(Category::Cut, 3)).unwrap();
        }
        advance_ms(10_000).await;
        assert_eq!(listener.closes(), 0);
        // Only the test's own handle remains once the timer tasks are gone.
        assert_eq!(Arc::strong_count(&listener), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_offers_keep_one_timer() {
        let (listener, scheduler) = setup();
        for i in 0..50u32 {
            scheduler.offer(occurrence(Category::Freeze, i)).unwrap();
            assert!(scheduler.outstanding_timers() <= 1);
            if i % 5 == 0 {
                scheduler.dismiss();
            }
            advance_ms(10).await;
            assert!(scheduler.outstanding_timers() <= 1);
        }
        assert_eq!(listener.closes(), 0);
        assert_eq!(scheduler.snapshot().instance, 50);

        advance_ms(6000).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(listener.closes(), 1);
        assert_eq!(listener.shown().len(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timings() {
        let listener = Arc::new(RecordingListener::default());
        let scheduler = NotificationScheduler::with_timings(
            listener.clone(),
            SchedulerTimings {
                auto_dismiss: Duration::from_millis(100),
                exit_delay: Duration::from_millis(10),
            },
        );
        scheduler.offer(occurrence(Category::DarkScreen, 1)).unwrap();
        advance_ms(105).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);
        advance_ms(10).await;
        assert_eq!(listener.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserve_refused_after_shutdown() {
        let (listener, scheduler) = setup();
        scheduler.shutdown();

        assert!(matches!(scheduler.reserve(), Err(AlertError::ShuttingDown)));
        assert_eq!(
            scheduler.offer(occurrence(Category::Fade, 4)),
            Err(AlertError::ShuttingDown)
        );
        assert!(listener.shown().is_empty());
        assert_eq!(scheduler.snapshot().instance, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unused_permit_leaves_slot_untouched() {
        let (listener, scheduler) = setup();
        scheduler.offer(occurrence(Category::Freeze, 3)).unwrap();
        advance_ms(1000).await;

        drop(scheduler.reserve().unwrap());

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.phase, NotificationPhase::Showing);
        assert_eq!(snapshot.instance, 1);
        assert_eq!(listener.shown().len(), 1);

        // The original countdown keeps running.
        advance_ms(4100).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Closing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_permit_holds_off_shutdown_until_shown() {
        let (listener, scheduler) = setup();
        let scheduler = Arc::new(scheduler);

        let permit = scheduler.reserve().unwrap();
        let shutdown = {
            let scheduler = Arc::clone(&scheduler);
            tokio::task::spawn_blocking(move || scheduler.shutdown())
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(!shutdown.is_finished());

        let occ = occurrence(Category::Cut, 2);
        let id = occ.id();
        permit.show(occ);
        shutdown.await.unwrap();

        // The reserved offer landed before shutdown cleared the slot.
        assert_eq!(listener.shown(), vec![id]);
        assert!(scheduler.is_shut_down());
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(scheduler.outstanding_timers(), 0);
        assert_eq!(listener.closes(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_offer_and_dismiss() {
        let listener = Arc::new(RecordingListener::default());
        let scheduler = Arc::new(NotificationScheduler::with_timings(
            listener.clone(),
            SchedulerTimings {
                auto_dismiss: Duration::from_millis(3),
                exit_delay: Duration::from_millis(1),
            },
        ));

        let mut handles = Vec::new();
        for worker in 0..4u32 {
            let scheduler = Arc::clone(&scheduler);
            handles.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    if (i + worker) % 3 == 0 {
                        scheduler.dismiss();
                    } else {
                        scheduler.offer(occurrence(Category::Cut, i)).unwrap();
                    }
                    assert!(scheduler.outstanding_timers() <= 1);
                    if i % 10 == 0 {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    } else {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.phase(), NotificationPhase::Idle);
        assert_eq!(scheduler.outstanding_timers(), 0);
        assert_eq!(listener.violations.load(Ordering::SeqCst), 0);
        assert!(!listener.open.load(Ordering::SeqCst));
        assert!(listener.closes() <= listener.shown().len());
    }
}
