use crate::Session;
use findit_types::SessionId;
use std::time::Duration;

/// Decides when a registered session can be dropped from memory
pub struct SessionCleanup {
    pub ended_retention: Duration, // keep finished sessions readable for the results screen
    pub idle_threshold: Duration,  // no activity at all
}

impl Default for SessionCleanup {
    fn default() -> Self {
        Self {
            ended_retention: Duration::from_secs(600), // 10 minutes
            idle_threshold: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl SessionCleanup {
    pub fn new(ended_retention: Duration, idle_threshold: Duration) -> Self {
        Self {
            ended_retention,
            idle_threshold,
        }
    }

    pub fn should_evict(&self, session: &Session) -> bool {
        if let Some(ended_for) = session.ended_for() {
            return ended_for >= self.ended_retention;
        }
        session.idle_for() >= self.idle_threshold
    }

    /// Ids of every session in `sessions` that should be evicted
    pub fn collect_evictions<'a>(
        &self,
        sessions: impl IntoIterator<Item = &'a Session>,
    ) -> Vec<SessionId> {
        sessions
            .into_iter()
            .filter(|session| self.should_evict(session))
            .map(|session| session.id)
            .collect()
    }
}
