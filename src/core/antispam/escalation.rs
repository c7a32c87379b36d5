// Escalation state machine - per-user cumulative risk with time-based decay
// and a strictly forward punishment ladder.
//
// At most one punishment fires per qualifying event, and only on forward
// progress through the ladder. Executor failures are logged and swallowed;
// nothing here is allowed to stall event intake.

use super::antispam_models::{
    AntiSpamError, AntiSpamSettings, ExecStatus, MessageEvent, PunishmentKind, PunishmentStep,
    UserViolationState,
};
use super::clock::Clock;
use async_trait::async_trait;
use std::sync::Arc;

const WARN_NOTICE: &str = "Please slow down - avoid sending rapid or repeated messages.";
const FALLBACK_TIMEOUT_MS: u64 = 10 * 60 * 1000;
/// Ladder rung i unlocks at cumulative score 2*(i+1): 2, 4, 6, 8, ...
const STEP_THRESHOLD_SPACING: u32 = 2;

/// Storage port for per-user violation state.
#[async_trait]
pub trait ViolationStateStore: Send + Sync {
    async fn get(&self, user_id: u64) -> Result<Option<UserViolationState>, AntiSpamError>;
    async fn put(&self, user_id: u64, state: UserViolationState) -> Result<(), AntiSpamError>;
}

/// Outbound capability port for punishment actions.
///
/// Every call is fire-and-forget from the engine's perspective: failures
/// come back as an `ExecStatus`, never as an error.
#[async_trait]
pub trait ModerationExecutor: Send + Sync {
    async fn warn_user(&self, user_id: u64, text: &str) -> ExecStatus;
    async fn timeout_member(&self, user_id: u64, duration_ms: u64, reason: &str) -> ExecStatus;
    async fn kick_member(&self, user_id: u64, reason: &str) -> ExecStatus;
    async fn remove_roles(&self, user_id: u64, role_ids: &[u64], reason: &str) -> ExecStatus;
    async fn send_direct_message(&self, user_id: u64, text: &str) -> ExecStatus;
}

/// Cumulative score required to enter ladder rung `step`.
///
/// Public so surfaces that display the ladder share the same numbers.
pub fn step_threshold(step: usize) -> u32 {
    STEP_THRESHOLD_SPACING * (step as u32 + 1)
}

/// Highest rung whose threshold is reached, or `None` below all thresholds.
fn target_step(score: u32, ladder_len: usize) -> Option<usize> {
    (0..ladder_len).rev().find(|&i| score >= step_threshold(i))
}

pub struct EscalationEngine<V: ViolationStateStore> {
    settings: Arc<AntiSpamSettings>,
    store: V,
    clock: Arc<dyn Clock>,
}

impl<V: ViolationStateStore> EscalationEngine<V> {
    pub fn new(settings: Arc<AntiSpamSettings>, store: V, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            store,
            clock,
        }
    }

    /// Merge one event score into the user's cumulative state and punish on
    /// strict forward progress through the ladder.
    ///
    /// Decay and accrual always commit, whether or not a punishment fires.
    /// `current_step` never resets: the escalation memory is permanent for
    /// the process lifetime, only the score is forgiven over time.
    pub async fn apply(
        &self,
        event: &MessageEvent,
        event_score: u32,
        executor: &dyn ModerationExecutor,
    ) -> Result<(), AntiSpamError> {
        let user_id = event.author_id;
        let now = self.clock.now();
        let mut state = self.store.get(user_id).await?.unwrap_or_default();

        // Linear decay: one point forgiven per elapsed whole interval.
        let decayed = match state.last_update {
            Some(last) => {
                let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
                let intervals = (elapsed_ms / self.settings.decay_ms).min(u64::from(u32::MAX));
                state.cumulative_score.saturating_sub(intervals as u32)
            }
            None => state.cumulative_score,
        };
        let new_score = decayed.saturating_add(event_score);
        state.cumulative_score = new_score;
        state.last_update = Some(now);

        let strip_only = self.settings.strip_only_user_ids.contains(&user_id);
        // Strict forward progress only. Same or lower rung (or a strip-only
        // user) records state but fires nothing.
        let advance = match target_step(new_score, self.settings.punishments.len()) {
            Some(step_index) if !strip_only && Some(step_index) > state.current_step => {
                state.current_step = Some(step_index);
                Some(step_index)
            }
            _ => None,
        };

        // State commits before any platform call goes out.
        self.store.put(user_id, state).await?;

        // The role strip runs on any violation, independent of escalation.
        if self.settings.strip_roles_on_violation {
            let role_ids: Vec<u64> = event
                .member
                .as_ref()
                .map(|m| m.role_ids.clone())
                .unwrap_or_default();
            let status = executor
                .remove_roles(user_id, &role_ids, "Anti-spam violation: strip roles")
                .await;
            if status != ExecStatus::Success {
                tracing::warn!(user_id, ?status, "role strip was not applied");
            }
        }

        if let Some(step_index) = advance {
            let step = self.settings.punishments[step_index].clone();
            tracing::info!(
                user_id,
                score = new_score,
                step = step_index,
                kind = ?step.kind,
                "anti-spam escalation"
            );
            self.execute_step(user_id, &step, new_score, executor).await;
        }
        Ok(())
    }

    async fn execute_step(
        &self,
        user_id: u64,
        step: &PunishmentStep,
        score: u32,
        executor: &dyn ModerationExecutor,
    ) {
        let reason = format!("Anti-spam triggered (score={score})");
        match step.kind {
            PunishmentKind::Warn => {
                let status = executor.warn_user(user_id, WARN_NOTICE).await;
                if status != ExecStatus::Success {
                    tracing::warn!(user_id, ?status, "warn notice was not delivered");
                }
            }
            PunishmentKind::Timeout => {
                let duration_ms = step.duration_ms.unwrap_or(FALLBACK_TIMEOUT_MS);
                match executor.timeout_member(user_id, duration_ms, &reason).await {
                    ExecStatus::Success => {
                        let minutes = duration_ms / 60_000;
                        let notice =
                            format!("You have been timed out for {minutes} minutes.");
                        let status = executor.send_direct_message(user_id, &notice).await;
                        if status != ExecStatus::Success {
                            tracing::warn!(user_id, ?status, "timeout notice was not delivered");
                        }
                    }
                    status => tracing::warn!(user_id, ?status, "timeout was not applied"),
                }
            }
            PunishmentKind::Kick => {
                let status = executor.kick_member(user_id, &reason).await;
                if status != ExecStatus::Success {
                    tracing::warn!(user_id, ?status, "kick was not applied");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::antispam::antispam_models::MemberInfo;
    use chrono::{DateTime, Utc};
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    struct MockStateStore {
        states: Arc<DashMap<u64, UserViolationState>>,
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

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Warn,
        Timeout(u64),
        Kick,
        RemoveRoles(Vec<u64>),
        DirectMessage,
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingExecutor {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModerationExecutor for RecordingExecutor {
        async fn warn_user(&self, _user_id: u64, _text: &str) -> ExecStatus {
            self.calls.lock().unwrap().push(Call::Warn);
            ExecStatus::Success
        }

        async fn timeout_member(
            &self,
            _user_id: u64,
            duration_ms: u64,
            _reason: &str,
        ) -> ExecStatus {
            self.calls.lock().unwrap().push(Call::Timeout(duration_ms));
            ExecStatus::Success
        }

        async fn kick_member(&self, _user_id: u64, _reason: &str) -> ExecStatus {
            self.calls.lock().unwrap().push(Call::Kick);
            ExecStatus::Success
        }

        async fn remove_roles(
            &self,
            _user_id: u64,
            role_ids: &[u64],
            _reason: &str,
        ) -> ExecStatus {
            self.calls
                .lock()
                .unwrap()
                .push(Call::RemoveRoles(role_ids.to_vec()));
            ExecStatus::Success
        }

        async fn send_direct_message(&self, _user_id: u64, _text: &str) -> ExecStatus {
            self.calls.lock().unwrap().push(Call::DirectMessage);
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

    fn event_for(user_id: u64) -> MessageEvent {
        MessageEvent {
            author_id: user_id,
            guild_id: Some(10),
            channel_id: 100,
            channel_parent_id: None,
            content: "spam".to_string(),
            created_at: Utc::now(),
            account_created_at: None,
            member: Some(MemberInfo {
                joined_at: None,
                role_ids: vec![7, 8],
                is_admin: false,
            }),
        }
    }

    fn engine(
        settings: AntiSpamSettings,
    ) -> (
        EscalationEngine<MockStateStore>,
        Arc<DashMap<u64, UserViolationState>>,
        Arc<ManualClock>,
    ) {
        let states = Arc::new(DashMap::new());
        let clock = Arc::new(ManualClock::new());
        let engine = EscalationEngine::new(
            Arc::new(settings),
            MockStateStore {
                states: Arc::clone(&states),
            },
            Arc::<ManualClock>::clone(&clock) as Arc<dyn Clock>,
        );
        (engine, states, clock)
    }

    #[test]
    fn step_thresholds_are_evenly_spaced() {
        assert_eq!(step_threshold(0), 2);
        assert_eq!(step_threshold(1), 4);
        assert_eq!(step_threshold(3), 8);
    }

    #[test]
    fn target_step_maps_score_to_highest_reached_rung() {
        assert_eq!(target_step(0, 4), None);
        assert_eq!(target_step(1, 4), None);
        assert_eq!(target_step(2, 4), Some(0));
        assert_eq!(target_step(5, 4), Some(1));
        assert_eq!(target_step(7, 4), Some(2));
        assert_eq!(target_step(8, 4), Some(3));
        assert_eq!(target_step(100, 4), Some(3));
    }

    #[tokio::test]
    async fn decay_forgives_one_point_per_interval() {
        let (engine, states, clock) = engine(AntiSpamSettings {
            decay_ms: 1_000,
            ..Default::default()
        });
        let executor = RecordingExecutor::default();
        let event = event_for(1);

        engine.apply(&event, 5, &executor).await.unwrap();
        assert_eq!(states.get(&1).unwrap().cumulative_score, 5);

        clock.advance_ms(3_000);
        engine.apply(&event, 1, &executor).await.unwrap();
        // max(0, 5 - 3) + 1
        assert_eq!(states.get(&1).unwrap().cumulative_score, 3);
    }

    #[tokio::test]
    async fn decay_floors_at_zero() {
        let (engine, states, clock) = engine(AntiSpamSettings {
            decay_ms: 1_000,
            ..Default::default()
        });
        let executor = RecordingExecutor::default();
        let event = event_for(1);

        engine.apply(&event, 3, &executor).await.unwrap();
        clock.advance_ms(60_000);
        engine.apply(&event, 1, &executor).await.unwrap();
        assert_eq!(states.get(&1).unwrap().cumulative_score, 1);
    }

    #[tokio::test]
    async fn warn_fires_when_score_crosses_first_threshold() {
        let (engine, states, _clock) = engine(AntiSpamSettings::default());
        let executor = RecordingExecutor::default();

        engine.apply(&event_for(1), 2, &executor).await.unwrap();

        assert_eq!(executor.calls(), vec![Call::Warn]);
        assert_eq!(states.get(&1).unwrap().current_step, Some(0));
    }

    #[tokio::test]
    async fn score_spike_skips_straight_to_kick() {
        let (engine, states, _clock) = engine(AntiSpamSettings::default());
        let executor = RecordingExecutor::default();

        engine.apply(&event_for(1), 8, &executor).await.unwrap();

        assert_eq!(executor.calls(), vec![Call::Kick]);
        assert_eq!(states.get(&1).unwrap().current_step, Some(3));
    }

    #[tokio::test]
    async fn timeout_step_notifies_after_success() {
        let (engine, _states, _clock) = engine(AntiSpamSettings::default());
        let executor = RecordingExecutor::default();

        engine.apply(&event_for(1), 4, &executor).await.unwrap();

        assert_eq!(
            executor.calls(),
            vec![Call::Timeout(10 * 60 * 1000), Call::DirectMessage]
        );
    }

    #[tokio::test]
    async fn repeat_at_same_rung_is_suppressed() {
        let (engine, states, _clock) = engine(AntiSpamSettings::default());
        let executor = RecordingExecutor::default();
        let event = event_for(1);

        engine.apply(&event, 4, &executor).await.unwrap();
        let fired = executor.calls().len();

        // Score climbs to 5 but the target rung is still 1.
        engine.apply(&event, 1, &executor).await.unwrap();

        assert_eq!(executor.calls().len(), fired);
        assert_eq!(states.get(&1).unwrap().current_step, Some(1));
        assert_eq!(states.get(&1).unwrap().cumulative_score, 5);
    }

    #[tokio::test]
    async fn current_step_never_decreases_even_after_decay() {
        let (engine, states, clock) = engine(AntiSpamSettings {
            decay_ms: 1_000,
            ..Default::default()
        });
        let executor = RecordingExecutor::default();
        let event = event_for(1);

        engine.apply(&event, 5, &executor).await.unwrap();
        assert_eq!(states.get(&1).unwrap().current_step, Some(1));

        // Long good behavior: score decays away, the step does not.
        clock.advance_ms(3_600_000);
        engine.apply(&event, 2, &executor).await.unwrap();

        let state = states.get(&1).unwrap().clone();
        assert_eq!(state.cumulative_score, 2);
        assert_eq!(state.current_step, Some(1));
        // Crossing only the warn threshold again fires nothing.
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn strip_only_user_only_ever_loses_roles() {
        let (engine, states, _clock) = engine(AntiSpamSettings {
            strip_roles_on_violation: true,
            strip_only_user_ids: vec![1],
            ..Default::default()
        });
        let executor = RecordingExecutor::default();

        engine.apply(&event_for(1), 8, &executor).await.unwrap();

        assert_eq!(executor.calls(), vec![Call::RemoveRoles(vec![7, 8])]);
        // Score still accrues, but no rung is ever entered.
        let state = states.get(&1).unwrap().clone();
        assert_eq!(state.cumulative_score, 8);
        assert_eq!(state.current_step, None);
    }

    #[tokio::test]
    async fn role_strip_runs_even_below_all_thresholds() {
        let (engine, _states, _clock) = engine(AntiSpamSettings {
            strip_roles_on_violation: true,
            ..Default::default()
        });
        let executor = RecordingExecutor::default();

        engine.apply(&event_for(1), 1, &executor).await.unwrap();

        assert_eq!(executor.calls(), vec![Call::RemoveRoles(vec![7, 8])]);
    }
}
