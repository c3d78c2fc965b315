use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GameMode {
    /// One wrong photo ends the session
    Normal,
    /// Only the countdown ends the session
    TimeTrial,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::TimeTrial => "time_trial",
        }
    }
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(GameMode::Normal),
            "time_trial" => Ok(GameMode::TimeTrial),
            other => Err(format!("Unknown game mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum EndReason {
    IncorrectGuess,
    TimedOut,
    Abandoned,
}

/// Where a session currently sits. Exactly one of these holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SessionPhase {
    AwaitingChallenge,
    AwaitingSubmission,
    Evaluating,
    Correct,
    Incorrect,
    TimedOut,
    Ended { reason: EndReason },
}

impl SessionPhase {
    /// No further submissions or ticks are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Incorrect | SessionPhase::TimedOut | SessionPhase::Ended { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Verdict {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundOutcome {
    pub mode: GameMode,
    pub streak: i32,
    pub failures: i32,
    pub elapsed_seconds: u32,
    pub remaining_seconds: u32,
    pub end_reason: EndReason,
}

/// Immutable per-session entry in a user's match history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchRecord {
    pub mode: GameMode,
    pub points: i32,
    pub played_at: String, // ISO 8601 string
    pub correct: i32,
    /// Only tracked in time-trial sessions
    pub failures: Option<i32>,
    pub accuracy: i32,
    pub objects_played: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BestMatchEntry {
    pub rank: u32,
    pub played_at: String,
    pub points: i32,
}

/// Client view of a live session. Never exposes the accepted variants.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionView {
    pub id: SessionId,
    pub mode: GameMode,
    pub phase: SessionPhase,
    pub challenge: Option<String>,
    pub streak: i32,
    pub failures: i32,
    pub remaining_seconds: u32,
    pub outcome: Option<RoundOutcome>,
}
