use findit_types::{EndReason, GameMode, RoundOutcome, SessionId, UserId, Verdict};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SessionStarted {
        session_id: SessionId,
        user_id: UserId,
        mode: GameMode,
    },
    ChallengeDrawn {
        session_id: SessionId,
        word: String,
    },
    ChallengeUnavailable {
        session_id: SessionId,
    },
    SubmissionReceived {
        session_id: SessionId,
        image_ref: String,
    },
    RoundEvaluated {
        session_id: SessionId,
        verdict: Verdict,
        streak: i32,
        failures: i32,
    },
    TimedOut {
        session_id: SessionId,
    },
    SessionEnded {
        session_id: SessionId,
        reason: EndReason,
        outcome: Option<RoundOutcome>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::SessionStarted { session_id, .. }
            | SessionEvent::ChallengeDrawn { session_id, .. }
            | SessionEvent::ChallengeUnavailable { session_id }
            | SessionEvent::SubmissionReceived { session_id, .. }
            | SessionEvent::RoundEvaluated { session_id, .. }
            | SessionEvent::TimedOut { session_id }
            | SessionEvent::SessionEnded { session_id, .. } => *session_id,
        }
    }
}

/// Event handler trait for processing session events
pub trait SessionEventHandler: Send {
    fn handle_event(&mut self, event: SessionEvent);
}

/// Simple event bus for distributing session events
pub struct SessionEventBus {
    handlers: Vec<Box<dyn SessionEventHandler>>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn SessionEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: SessionEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes every event to the tracing log
pub struct TracingEventHandler;

impl SessionEventHandler for TracingEventHandler {
    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SessionStarted {
                session_id,
                user_id,
                mode,
            } => tracing::info!("Session {} started by {} in {:?} mode", session_id, user_id, mode),
            SessionEvent::ChallengeDrawn { session_id, word } => {
                tracing::debug!("Session {} drew challenge '{}'", session_id, word)
            }
            SessionEvent::ChallengeUnavailable { session_id } => {
                tracing::warn!("Session {} has no active challenge to draw", session_id)
            }
            SessionEvent::SubmissionReceived { session_id, .. } => {
                tracing::debug!("Session {} received a submission", session_id)
            }
            SessionEvent::RoundEvaluated {
                session_id,
                verdict,
                streak,
                failures,
            } => tracing::info!(
                "Session {} evaluated {:?} (streak {}, failures {})",
                session_id,
                verdict,
                streak,
                failures
            ),
            SessionEvent::TimedOut { session_id } => {
                tracing::info!("Session {} ran out of time", session_id)
            }
            SessionEvent::SessionEnded {
                session_id, reason, ..
            } => tracing::info!("Session {} ended: {:?}", session_id, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    struct CollectingHandler {
        events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    impl SessionEventHandler for CollectingHandler {
        fn handle_event(&mut self, event: SessionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_event_bus_fans_out_to_every_handler() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let mut bus = SessionEventBus::new();
        bus.add_handler(Box::new(CollectingHandler {
            events: first.clone(),
        }));
        bus.add_handler(Box::new(CollectingHandler {
            events: second.clone(),
        }));
        bus.add_handler(Box::new(TracingEventHandler));

        let session_id = Uuid::new_v4();
        bus.publish_all(vec![
            SessionEvent::ChallengeUnavailable { session_id },
            SessionEvent::TimedOut { session_id },
        ]);

        assert_eq!(first.lock().unwrap().len(), 2);
        assert_eq!(second.lock().unwrap().len(), 2);
        assert_eq!(first.lock().unwrap()[1].session_id(), session_id);
    }
}
