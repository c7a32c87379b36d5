// In-memory anti-spam stores backed by DashMap.
//
// Windows and violation state are intentionally volatile: a restart clears
// both, which is acceptable (and arguably desirable) for short-lived spam
// tracking. The core stays generic so a persistent store can be dropped in
// without touching the pipeline.

use crate::core::antispam::{
    AntiSpamError, MessageFingerprint, UserViolationState, ViolationStateStore, WindowStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryWindowStore {
    windows: DashMap<u64, Vec<MessageFingerprint>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn record_and_prune(
        &self,
        user_id: u64,
        fingerprint: MessageFingerprint,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MessageFingerprint>, AntiSpamError> {
        // The DashMap entry guard makes push + prune atomic per user.
        let mut entry = self.windows.entry(user_id).or_default();
        let window = entry.value_mut();
        window.push(fingerprint);
        // Entries are appended in arrival order, so everything before the
        // first surviving timestamp is stale.
        let keep_from = window
            .iter()
            .position(|f| f.timestamp >= cutoff)
            .unwrap_or(window.len());
        window.drain(..keep_from);
        Ok(window.clone())
    }
}

#[derive(Default)]
pub struct InMemoryViolationStore {
    states: DashMap<u64, UserViolationState>,
}

impl InMemoryViolationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViolationStateStore for InMemoryViolationStore {
    async fn get(&self, user_id: u64) -> Result<Option<UserViolationState>, AntiSpamError> {
        Ok(self.states.get(&user_id).map(|s| s.clone()))
    }

    async fn put(&self, user_id: u64, state: UserViolationState) -> Result<(), AntiSpamError> {
        self.states.insert(user_id, state);
        Ok(())
    }
}
