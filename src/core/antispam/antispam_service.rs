// Anti-spam service - wires the window tracker, the violation scorer, and
// the escalation engine into one pipeline per inbound message event.
//
// NO Discord dependencies here - just pure domain logic behind ports.

use super::activity_window::{is_exempt, ActivityWindowTracker, WindowStore};
use super::antispam_models::{AntiSpamError, AntiSpamSettings, MessageEvent};
use super::clock::Clock;
use super::escalation::{EscalationEngine, ModerationExecutor, ViolationStateStore};
use super::violation_scorer::score_event;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Events between sweeps of idle entries in the per-user lock map.
const LOCK_SWEEP_INTERVAL: u64 = 1024;

/// The full pipeline: exemption check → window update → scoring → escalation.
///
/// Generic over the window and violation-state stores so tests can run
/// against plain in-memory fakes and production can swap in whatever
/// backing it wants without touching the scoring logic.
pub struct AntiSpamService<W: WindowStore, V: ViolationStateStore> {
    settings: Arc<AntiSpamSettings>,
    tracker: ActivityWindowTracker<W>,
    escalation: EscalationEngine<V>,
    clock: Arc<dyn Clock>,
    // Events for one user must apply in arrival order: decay depends on a
    // strictly sequential last_update. Different users never contend.
    // Idle entries are swept every LOCK_SWEEP_INTERVAL events; the map is
    // bounded by concurrent users, not by everyone ever seen.
    user_locks: DashMap<u64, Arc<Mutex<()>>>,
    events_since_sweep: AtomicU64,
}

impl<W: WindowStore, V: ViolationStateStore> AntiSpamService<W, V> {
    /// Build the service. `settings` is expected to be validated already
    /// (see `AntiSpamSettings::validate`).
    pub fn new(settings: AntiSpamSettings, windows: W, states: V, clock: Arc<dyn Clock>) -> Self {
        let settings = Arc::new(settings);
        Self {
            tracker: ActivityWindowTracker::new(Arc::clone(&settings), windows),
            escalation: EscalationEngine::new(Arc::clone(&settings), states, Arc::clone(&clock)),
            settings,
            clock,
            user_locks: DashMap::new(),
            events_since_sweep: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &AntiSpamSettings {
        &self.settings
    }

    /// Process one inbound message event.
    ///
    /// Returns `None` when the message was exempt, otherwise the event's
    /// violation score. Punishment dispatch failures never surface here;
    /// only storage errors do.
    pub async fn process_message(
        &self,
        event: &MessageEvent,
        executor: &dyn ModerationExecutor,
    ) -> Result<Option<u32>, AntiSpamError> {
        if is_exempt(event, &self.settings) {
            return Ok(None);
        }

        let lock = self
            .user_locks
            .entry(event.author_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let _serialized = lock.lock().await;

        let now = self.clock.now();
        let window = self.tracker.record(event, now).await?;
        let score = score_event(&self.settings, &window, event, now);
        tracing::debug!(
            user_id = event.author_id,
            score,
            window_len = window.len(),
            "anti-spam check"
        );
        if score > 0 {
            self.escalation.apply(event, score, executor).await?;
        }

        // Locks held only by the map belong to users with nothing in
        // flight; they get recreated on demand. Our own lock is still
        // held here, so the current entry always survives the sweep.
        let seen = self.events_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % LOCK_SWEEP_INTERVAL == 0 {
            self.user_locks
                .retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        Ok(Some(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antispam::antispam_models::{
        ExecStatus, MemberInfo, MessageFingerprint, UserViolationState,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

    struct MockWindowStore {
        windows: DashMap<u64, Vec<MessageFingerprint>>,
    }

    #[async_trait]
    impl WindowStore for MockWindowStore {
        async fn record_and_prune(
            &self,
            user_id: u64,
            fingerprint: MessageFingerprint,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<MessageFingerprint>, AntiSpamError> {
            let mut entry = self.windows.entry(user_id).or_default();
            let window = entry.value_mut();
            window.push(fingerprint);
            let keep_from = window
                .iter()
                .position(|f| f.timestamp >= cutoff)
                .unwrap_or(window.len());
            window.drain(..keep_from);
            Ok(window.clone())
        }
    }

    struct MockStateStore {
        states: DashMap<u64, UserViolationState>,
    }

    #[async_trait]
    impl ViolationStateStore for MockStateStore {
        async fn get(&self, user_id: u64) -> Result<Option<UserViolationState>, AntiSpamError> {
            Ok(self.states.get(&user_id).map(|s| s.clone()))
        }

        async fn put(&self, user_id: u64, state: UserViolationState) -> Result<(), AntiSpamError> {
            self.states.insert(user_id, state);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingExecutor {
        warns: AtomicU32,
        timeouts: AtomicU32,
        kicks: AtomicU32,
        role_strips: AtomicU32,
        dms: AtomicU32,
    }

    #[async_trait]
    impl ModerationExecutor for CountingExecutor {
        async fn warn_user(&self, _user_id: u64, _text: &str) -> ExecStatus {
            self.warns.fetch_add(1, Ordering::SeqCst);
            ExecStatus::Success
        }

        async fn timeout_member(
            &self,
            _user_id: u64,
            _duration_ms: u64,
            _reason: &str,
        ) -> ExecStatus {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
            ExecStatus::Success
        }

        async fn kick_member(&self, _user_id: u64, _reason: &str) -> ExecStatus {
            self.kicks.fetch_add(1, Ordering::SeqCst);
            ExecStatus::Success
        }

        async fn remove_roles(
            &self,
            _user_id: u64,
            _role_ids: &[u64],
            _reason: &str,
        ) -> ExecStatus {
            self.role_strips.fetch_add(1, Ordering::SeqCst);
            ExecStatus::Success
        }

        async fn send_direct_message(&self, _user_id: u64, _text: &str) -> ExecStatus {
            self.dms.fetch_add(1, Ordering::SeqCst);
            ExecStatus::Success
        }
    }

    struct ManualClock {
        now_ms: AtomicI64,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now_ms: AtomicI64::new(1_700_000_000_000),
            }
        }

        fn advance_ms(&self, ms: i64) {
            self.now_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.now_ms.load(Ordering::SeqCst))
                .expect("test timestamp in range")
        }
    }

    fn service(
        settings: AntiSpamSettings,
    ) -> (
        AntiSpamService<MockWindowStore, MockStateStore>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::new());
        let service = AntiSpamService::new(
            settings,
            MockWindowStore {
                windows: DashMap::new(),
            },
            MockStateStore {
                states: DashMap::new(),
            },
            Arc::<ManualClock>::clone(&clock) as Arc<dyn Clock>,
        );
        (service, clock)
    }

    fn member_event(user_id: u64, content: &str, now: DateTime<Utc>) -> MessageEvent {
        MessageEvent {
            author_id: user_id,
            guild_id: Some(10),
            channel_id: 100,
            channel_parent_id: None,
            content: content.to_string(),
            created_at: now,
            account_created_at: Some(now - Duration::days(30)),
            member: Some(MemberInfo {
                joined_at: Some(now - Duration::days(10)),
                role_ids: vec![7],
                is_admin: false,
            }),
        }
    }

    #[tokio::test]
    async fn exempt_messages_are_skipped_entirely() {
        let (service, clock) = service(AntiSpamSettings::default());
        let executor = CountingExecutor::default();

        let mut event = member_event(1, "I AM AN ADMIN AND I SHOUT", clock.now());
        if let Some(member) = event.member.as_mut() {
            member.is_admin = true;
        }

        let result = service.process_message(&event, &executor).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(executor.warns.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn message_burst_warns_exactly_once() {
        // 7 messages inside the 7s window with max_messages = 6: the rate
        // rule contributes +2, cumulative score crosses the warn threshold.
        let (service, clock) = service(AntiSpamSettings::default());
        let executor = CountingExecutor::default();

        for i in 0..7u32 {
            clock.advance_ms(100);
            let content = format!("{i}{i}{i} hi");
            let event = member_event(1, &content, clock.now());
            let score = service
                .process_message(&event, &executor)
                .await
                .unwrap()
                .expect("member messages are scored");
            if i < 6 {
                assert_eq!(score, 0, "message {i} should not trigger anything");
            } else {
                assert_eq!(score, 2, "seventh message should trip the rate rule");
            }
        }

        assert_eq!(executor.warns.load(Ordering::SeqCst), 1);
        assert_eq!(executor.timeouts.load(Ordering::SeqCst), 0);
        assert_eq!(executor.kicks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_steady_chatter_never_triggers() {
        // Messages spaced wider than the window keep the window small.
        let (service, clock) = service(AntiSpamSettings::default());
        let executor = CountingExecutor::default();

        for i in 0..20u32 {
            clock.advance_ms(8_000);
            let content = format!("{i}{i}{i} hi");
            let event = member_event(1, &content, clock.now());
            let score = service.process_message(&event, &executor).await.unwrap();
            assert_eq!(score, Some(0));
        }

        assert_eq!(executor.warns.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn idle_user_locks_are_swept() {
        let (service, clock) = service(AntiSpamSettings::default());
        let executor = CountingExecutor::default();

        // One quiet message per distinct user, enough to cross a sweep.
        for i in 0..LOCK_SWEEP_INTERVAL + 8 {
            clock.advance_ms(10_000);
            let event = member_event(i + 1, "hello there", clock.now());
            service.process_message(&event, &executor).await.unwrap();
        }

        // Every lock from before the sweep was idle and got dropped.
        assert!((service.user_locks.len() as u64) <= 16);
    }

    #[tokio::test]
    async fn users_are_tracked_independently() {
        let (service, clock) = service(AntiSpamSettings::default());
        let executor = CountingExecutor::default();

        // User 1 bursts, user 2 sends a single message in between.
        for i in 0..7u32 {
            clock.advance_ms(100);
            let content = format!("{i}{i}{i} hi");
            let event = member_event(1, &content, clock.now());
            service.process_message(&event, &executor).await.unwrap();
        }
        let event = member_event(2, "hello there", clock.now());
        let score = service.process_message(&event, &executor).await.unwrap();

        assert_eq!(score, Some(0));
        assert_eq!(executor.warns.load(Ordering::SeqCst), 1);
    }
}
