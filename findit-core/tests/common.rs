#![allow(dead_code)]

use findit_core::{ChallengeDeck, LabelSet, Session, SessionEvent, SessionEventHandler};
use findit_types::{Challenge, GameMode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

/// Deterministic RNG so draws are reproducible
pub fn test_rng() -> StdRng {
    StdRng::seed_from_u64(0xF1D1)
}

/// A deck where every challenge accepts "spoon" style labels
pub fn spoon_deck() -> ChallengeDeck {
    ChallengeDeck::new(vec![Challenge::new(
        "cuchara",
        vec!["spoon".to_string(), "tablespoon".to_string()],
    )])
}

pub fn create_session(mode: GameMode, seconds: u32) -> Session {
    Session::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), mode, seconds)
}

/// Creates a session that already holds a challenge and awaits a photo
pub fn create_ready_session(mode: GameMode, seconds: u32) -> Session {
    let mut session = create_session(mode, seconds);
    session
        .draw_challenge(&spoon_deck(), &mut test_rng())
        .unwrap()
        .expect("deck is not empty");
    session
}

/// Submit a photo and resolve it with the given detector labels
pub fn play_round(session: &mut Session, labels: &[&str]) -> Option<findit_types::Verdict> {
    assert!(session.submit("imagenes/test.jpg"), "submission was not accepted");
    session.resolve(&LabelSet::new(labels))
}

pub fn redraw(session: &mut Session) {
    session
        .draw_challenge(&spoon_deck(), &mut test_rng())
        .unwrap();
}

/// Event collector for testing event emissions
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_matching(&self, check_fn: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| check_fn(e)).count()
    }
}

impl SessionEventHandler for EventCollector {
    fn handle_event(&mut self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
