use std::time::{Duration, Instant};

use findit_types::{
    Challenge, EndReason, GameMode, RoundOutcome, SessionId, SessionPhase, SessionView, UserId,
    Verdict,
};
use rand::Rng;

use crate::{ChallengeDeck, LabelSet, SessionEvent};

/// Countdown budget for one challenge: five minutes
pub const DEFAULT_ROUND_SECONDS: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Action not allowed while session is {phase:?}")]
    InvalidPhase { phase: SessionPhase },
    #[error("Action not available in {mode:?} mode")]
    WrongMode { mode: GameMode },
}

/// The challenge a session is currently playing, with its variants already normalized
#[derive(Debug, Clone)]
struct ActiveChallenge {
    challenge: Challenge,
    variants: LabelSet,
}

/// One game session: a countdown, a streak and the round state machine.
///
/// All transitions are synchronous. Callers that reach out to collaborators
/// (upload, label detection) do so between `submit` and `resolve`, and must
/// accept that `resolve` becomes a no-op if the countdown expired meanwhile.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub mode: GameMode,
    phase: SessionPhase,
    challenge: Option<ActiveChallenge>,
    pending_image: Option<String>,
    streak: i32,
    failures: i32,
    round_seconds: u32,
    remaining_seconds: u32,
    elapsed_seconds: u32,
    outcome: Option<RoundOutcome>,
    last_activity: Instant,
    ended_at: Option<Instant>,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(id: SessionId, user_id: UserId, mode: GameMode, round_seconds: u32) -> Self {
        let mut session = Self {
            id,
            user_id,
            mode,
            phase: SessionPhase::AwaitingChallenge,
            challenge: None,
            pending_image: None,
            streak: 0,
            failures: 0,
            round_seconds,
            remaining_seconds: round_seconds,
            elapsed_seconds: 0,
            outcome: None,
            last_activity: Instant::now(),
            ended_at: None,
            events: Vec::new(),
        };

        session.events.push(SessionEvent::SessionStarted {
            session_id: id,
            user_id,
            mode,
        });
        session
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn streak(&self) -> i32 {
        self.streak
    }

    pub fn failures(&self) -> i32 {
        self.failures
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref().map(|active| &active.challenge)
    }

    pub fn pending_image(&self) -> Option<&str> {
        self.pending_image.as_deref()
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, SessionPhase::Ended { .. })
    }

    /// Draw the next challenge from `deck`.
    ///
    /// An empty deck leaves the challenge unset and the session waiting, so a
    /// later draw can still succeed once challenges are activated.
    pub fn draw_challenge<R: Rng + ?Sized>(
        &mut self,
        deck: &ChallengeDeck,
        rng: &mut R,
    ) -> Result<Option<&Challenge>, SessionError> {
        if self.phase != SessionPhase::AwaitingChallenge {
            return Err(SessionError::InvalidPhase { phase: self.phase });
        }
        self.touch();

        match deck.draw(rng) {
            Some(challenge) => {
                self.events.push(SessionEvent::ChallengeDrawn {
                    session_id: self.id,
                    word: challenge.word.clone(),
                });
                self.challenge = Some(ActiveChallenge {
                    variants: LabelSet::variants_of(challenge),
                    challenge: challenge.clone(),
                });
                self.phase = SessionPhase::AwaitingSubmission;
                Ok(self.challenge())
            }
            None => {
                self.challenge = None;
                self.events.push(SessionEvent::ChallengeUnavailable {
                    session_id: self.id,
                });
                Ok(None)
            }
        }
    }

    /// Hand in a candidate photo. Ignored unless a challenge is waiting and
    /// `image_ref` is non-empty.
    pub fn submit(&mut self, image_ref: &str) -> bool {
        if self.phase != SessionPhase::AwaitingSubmission || image_ref.trim().is_empty() {
            return false;
        }
        self.touch();

        self.pending_image = Some(image_ref.to_string());
        self.phase = SessionPhase::Evaluating;
        self.events.push(SessionEvent::SubmissionReceived {
            session_id: self.id,
            image_ref: image_ref.to_string(),
        });
        true
    }

    /// Decide the pending submission from the labels detected in the photo.
    ///
    /// Returns `None` if nothing is being evaluated, e.g. the countdown ran out
    /// while the detector was still working.
    pub fn resolve(&mut self, labels: &LabelSet) -> Option<Verdict> {
        if self.phase != SessionPhase::Evaluating {
            return None;
        }
        self.touch();

        let verdict = match &self.challenge {
            Some(active) if labels.matches_any(&active.variants) => Verdict::Correct,
            _ => Verdict::Incorrect,
        };

        match verdict {
            Verdict::Correct => self.streak += 1,
            Verdict::Incorrect if self.mode == GameMode::TimeTrial => self.failures += 1,
            Verdict::Incorrect => {}
        }

        self.events.push(SessionEvent::RoundEvaluated {
            session_id: self.id,
            verdict,
            streak: self.streak,
            failures: self.failures,
        });

        self.phase = match (self.mode, verdict) {
            (GameMode::Normal, Verdict::Correct) => SessionPhase::Correct,
            (GameMode::Normal, Verdict::Incorrect) => SessionPhase::Incorrect,
            (GameMode::TimeTrial, _) => {
                self.clear_round();
                SessionPhase::AwaitingChallenge
            }
        };

        Some(verdict)
    }

    /// Acknowledge a correct photo in normal mode and restart the countdown
    /// for the next challenge.
    pub fn next_challenge(&mut self) -> Result<(), SessionError> {
        if self.mode != GameMode::Normal {
            return Err(SessionError::WrongMode { mode: self.mode });
        }
        if self.phase != SessionPhase::Correct {
            return Err(SessionError::InvalidPhase { phase: self.phase });
        }
        self.touch();

        self.clear_round();
        self.remaining_seconds = self.round_seconds;
        self.phase = SessionPhase::AwaitingChallenge;
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Returns true on the tick that hits zero; that tick moves the session
    /// to `TimedOut` whatever it was doing. Later ticks do nothing.
    pub fn tick(&mut self) -> bool {
        if self.phase.is_terminal() {
            return false;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.elapsed_seconds += 1;

        if self.remaining_seconds == 0 {
            self.phase = SessionPhase::TimedOut;
            self.pending_image = None;
            self.events.push(SessionEvent::TimedOut {
                session_id: self.id,
            });
            return true;
        }
        false
    }

    /// Close a session that lost (normal mode) or ran out of time.
    ///
    /// Produces the outcome to fold into the profile exactly once.
    pub fn finish(&mut self) -> Option<RoundOutcome> {
        let end_reason = match self.phase {
            SessionPhase::Incorrect => EndReason::IncorrectGuess,
            SessionPhase::TimedOut => EndReason::TimedOut,
            _ => return None,
        };

        let outcome = RoundOutcome {
            mode: self.mode,
            streak: self.streak,
            failures: self.failures,
            elapsed_seconds: self.elapsed_seconds,
            remaining_seconds: self.remaining_seconds,
            end_reason,
        };

        self.end(end_reason, Some(outcome.clone()));
        Some(outcome)
    }

    /// Leave mid-game. Progress is discarded and nothing is produced to persist.
    pub fn abandon(&mut self) -> bool {
        if self.is_ended() {
            return false;
        }
        self.end(EndReason::Abandoned, None);
        true
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            mode: self.mode,
            phase: self.phase,
            challenge: self.challenge().map(|challenge| challenge.word.clone()),
            streak: self.streak,
            failures: self.failures,
            remaining_seconds: self.remaining_seconds,
            outcome: self.outcome.clone(),
        }
    }

    /// Drain events recorded since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn ended_for(&self) -> Option<Duration> {
        self.ended_at.map(|ended_at| ended_at.elapsed())
    }

    fn end(&mut self, reason: EndReason, outcome: Option<RoundOutcome>) {
        self.phase = SessionPhase::Ended { reason };
        self.pending_image = None;
        self.outcome = outcome.clone();
        self.ended_at = Some(Instant::now());
        self.events.push(SessionEvent::SessionEnded {
            session_id: self.id,
            reason,
            outcome,
        });
    }

    fn clear_round(&mut self) {
        self.pending_image = None;
        self.challenge = None;
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
