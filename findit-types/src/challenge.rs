use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Challenge {
    pub id: Uuid,
    pub word: String,
    /// Labels accepted as a match for `word`, compared case-insensitively
    pub variants: Vec<String>,
    pub active: bool,
}

impl Challenge {
    pub fn new(word: impl Into<String>, variants: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            word: word.into(),
            variants,
            active: true,
        }
    }
}
