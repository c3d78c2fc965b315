use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use findit_core::{
    BlobStore, ChallengeDeck, ChallengeSource, LabelDetector, LabelSet, MatchHistory, PriorTotals,
    ProfileStore, Session, SessionCleanup, SessionError, SessionEvent, SessionEventBus,
    SessionEventHandler, StatsEngine, TracingEventHandler,
};
use findit_types::{
    GameMode, RoundOutcome, SessionId, SessionPhase, SessionView, SubmitImageResponse, UserId,
};

/// Everything a session needs to reach outside the process
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: Arc<dyn ProfileStore>,
    pub history: Arc<dyn MatchHistory>,
    pub challenges: Arc<dyn ChallengeSource>,
    pub blobs: Arc<dyn BlobStore>,
    pub detector: Arc<dyn LabelDetector>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionManagerError {
    #[error("Session not found")]
    NotFound,
    #[error("Not authorized to access this session")]
    Forbidden,
    #[error("No image provided")]
    EmptyImage,
    #[error("Session is not waiting for a photo (currently {phase:?})")]
    NotAwaitingSubmission { phase: SessionPhase },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("No se pudo subir la imagen. Inténtalo de nuevo.")]
    UploadFailed,
}

/// Registry of live sessions.
///
/// Sessions are mutated only while their map entry is held, and the entry
/// is never held across an await. Network calls for a submission happen
/// between `Session::submit` and `Session::resolve`, so a countdown that
/// expires meanwhile wins over the pending verdict.
pub struct SessionManager {
    sessions: DashMap<SessionId, Session>,
    collaborators: Collaborators,
    event_bus: Mutex<SessionEventBus>,
    round_seconds: u32,
    cleanup: SessionCleanup,
}

impl SessionManager {
    pub fn new(collaborators: Collaborators, round_seconds: u32, cleanup: SessionCleanup) -> Self {
        let mut event_bus = SessionEventBus::new();
        event_bus.add_handler(Box::new(TracingEventHandler));

        Self {
            sessions: DashMap::new(),
            collaborators,
            event_bus: Mutex::new(event_bus),
            round_seconds,
            cleanup,
        }
    }

    /// Register an extra listener for session events
    pub async fn add_event_handler(&self, handler: Box<dyn SessionEventHandler>) {
        self.event_bus.lock().await.add_handler(handler);
    }

    pub async fn start_session(
        &self,
        user_id: UserId,
        mode: GameMode,
    ) -> Result<SessionView, SessionManagerError> {
        let deck = self.load_deck().await;
        let mut session = Session::new(Uuid::new_v4(), user_id, mode, self.round_seconds);
        session.draw_challenge(&deck, &mut rand::thread_rng())?;

        let view = session.view();
        let events = session.take_events();
        self.sessions.insert(session.id, session);
        self.publish(events).await;

        Ok(view)
    }

    pub fn get_view(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<SessionView, SessionManagerError> {
        Ok(self.owned_session(session_id, user_id)?.view())
    }

    /// Upload a photo, ask for its labels and resolve the current round.
    ///
    /// The verdict is `None` when the session moved on (timed out or was
    /// abandoned) while the photo was being evaluated.
    pub async fn submit_image(
        &self,
        session_id: SessionId,
        user_id: UserId,
        image: Vec<u8>,
    ) -> Result<SubmitImageResponse, SessionManagerError> {
        if image.is_empty() {
            return Err(SessionManagerError::EmptyImage);
        }

        let mode = {
            let session = self.owned_session(session_id, user_id)?;
            if session.phase() != SessionPhase::AwaitingSubmission {
                return Err(SessionManagerError::NotAwaitingSubmission {
                    phase: session.phase(),
                });
            }
            session.mode
        };

        let blob = self.collaborators.blobs.upload(image).await.map_err(|e| {
            error!("Failed to upload photo for session {}: {:#}", session_id, e);
            SessionManagerError::UploadFailed
        })?;

        let accepted = self.with_session(session_id, |session| session.submit(&blob.locator));
        if accepted != Some(true) {
            self.delete_blob(&blob).await;
            let session = self.view_after_race(session_id)?;
            return Ok(SubmitImageResponse {
                verdict: None,
                session,
            });
        }

        let labels = match self.collaborators.detector.detect_labels(&blob.locator).await {
            Ok(labels) => LabelSet::new(labels),
            Err(e) => {
                warn!("Label detection failed for session {}: {:#}", session_id, e);
                LabelSet::default()
            }
        };
        self.delete_blob(&blob).await;

        // Time-trial draws the next challenge straight away
        let deck = match mode {
            GameMode::TimeTrial => Some(self.load_deck().await),
            GameMode::Normal => None,
        };

        let (verdict, view, events, finished) = {
            let mut session = self
                .sessions
                .get_mut(&session_id)
                .ok_or(SessionManagerError::NotFound)?;

            let verdict = session.resolve(&labels);
            let mut finished = None;
            if session.phase() == SessionPhase::Incorrect {
                finished = session.finish();
            }
            if let Some(deck) = deck.as_ref() {
                if session.phase() == SessionPhase::AwaitingChallenge {
                    session.draw_challenge(deck, &mut rand::thread_rng())?;
                }
            }

            (verdict, session.view(), session.take_events(), finished)
        };

        self.publish(events).await;
        if let Some(outcome) = finished {
            self.spawn_persist(user_id, outcome);
        }

        Ok(SubmitImageResponse {
            verdict,
            session: view,
        })
    }

    /// Move on after a correct normal-mode photo, or retry a draw that found
    /// no active challenge.
    pub async fn advance(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<SessionView, SessionManagerError> {
        self.owned_session(session_id, user_id)?;
        let deck = self.load_deck().await;

        let (view, events) = {
            let mut session = self
                .sessions
                .get_mut(&session_id)
                .ok_or(SessionManagerError::NotFound)?;

            if session.phase() == SessionPhase::Correct {
                session.next_challenge()?;
            }
            session.draw_challenge(&deck, &mut rand::thread_rng())?;
            (session.view(), session.take_events())
        };

        self.publish(events).await;
        Ok(view)
    }

    /// Leave the game. Progress is discarded and nothing is recorded.
    pub async fn abandon(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<SessionView, SessionManagerError> {
        let (view, events) = {
            let mut session = self.owned_session_mut(session_id, user_id)?;
            session.abandon();
            (session.view(), session.take_events())
        };

        self.publish(events).await;
        Ok(view)
    }

    /// Advance every countdown by one second, then record the sessions that ran out.
    ///
    /// Recording happens on spawned tasks, so a stalled backend never holds up
    /// the next tick.
    pub async fn tick_all(&self) -> usize {
        let mut finished = Vec::new();
        let mut events = Vec::new();

        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if session.tick() {
                if let Some(outcome) = session.finish() {
                    finished.push((session.user_id, outcome));
                }
            }
            events.extend(session.take_events());
        }

        self.publish(events).await;
        let count = finished.len();
        for (user_id, outcome) in finished {
            self.spawn_persist(user_id, outcome);
        }
        count
    }

    /// Drop ended sessions past their retention window and idle ones
    pub fn cleanup_sessions(&self) -> usize {
        let evictions = {
            let entries: Vec<_> = self.sessions.iter().collect();
            self.cleanup
                .collect_evictions(entries.iter().map(|entry| entry.value()))
        };

        for session_id in &evictions {
            if self.sessions.remove(session_id).is_some() {
                info!("Removed inactive session {}", session_id);
            }
        }
        evictions.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    fn spawn_persist(&self, user_id: UserId, outcome: RoundOutcome) {
        let collaborators = self.collaborators.clone();
        tokio::spawn(async move {
            persist_outcome(&collaborators, user_id, &outcome).await;
        });
    }

    async fn load_deck(&self) -> ChallengeDeck {
        match self.collaborators.challenges.active_challenges().await {
            Ok(challenges) => ChallengeDeck::new(challenges),
            Err(e) => {
                error!("Failed to load challenges: {:#}", e);
                ChallengeDeck::default()
            }
        }
    }

    async fn delete_blob(&self, blob: &findit_core::StoredBlob) {
        if let Err(e) = self.collaborators.blobs.delete(blob).await {
            warn!("Failed to delete blob {}: {:#}", blob.key, e);
        }
    }

    async fn publish(&self, events: Vec<SessionEvent>) {
        if events.is_empty() {
            return;
        }
        self.event_bus.lock().await.publish_all(events);
    }

    fn with_session<T>(&self, session_id: SessionId, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.sessions
            .get_mut(&session_id)
            .map(|mut session| f(session.value_mut()))
    }

    fn view_after_race(&self, session_id: SessionId) -> Result<SessionView, SessionManagerError> {
        self.sessions
            .get(&session_id)
            .map(|session| session.view())
            .ok_or(SessionManagerError::NotFound)
    }

    fn owned_session(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<dashmap::mapref::one::Ref<'_, SessionId, Session>, SessionManagerError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(SessionManagerError::NotFound)?;
        if session.user_id != user_id {
            return Err(SessionManagerError::Forbidden);
        }
        Ok(session)
    }

    fn owned_session_mut(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, SessionId, Session>, SessionManagerError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionManagerError::NotFound)?;
        if session.user_id != user_id {
            return Err(SessionManagerError::Forbidden);
        }
        Ok(session)
    }
}

/// Fold the outcome into the profile totals and append the match record.
/// The two writes are independent; a failure in one is logged and does
/// not stop the other.
async fn persist_outcome(collaborators: &Collaborators, user_id: UserId, outcome: &RoundOutcome) {
    let record = StatsEngine::match_record(outcome, chrono::Utc::now().to_rfc3339());

    match collaborators.profiles.load_profile(user_id).await {
        Ok(Some(profile)) => {
            let update = StatsEngine::fold(&PriorTotals::from_profile(&profile), outcome);
            if let Err(e) = collaborators.profiles.apply_stats(user_id, &update).await {
                error!("Failed to update statistics for {}: {:#}", user_id, e);
            }
        }
        Ok(None) => warn!("No profile for {}, statistics not updated", user_id),
        Err(e) => error!("Failed to load profile for {}: {:#}", user_id, e),
    }

    if let Err(e) = collaborators.history.append(user_id, &record).await {
        error!("Failed to record match for {}: {:#}", user_id, e);
    }
}
