use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub points: i32,
    pub objects_found: i32,
    /// `None` on documents written before objects played were tracked.
    pub objects_played: Option<i32>,
    pub accuracy: i32,
    pub total_matches: i32,
    pub preferences: Preferences,
    pub created_at: String, // ISO 8601 string
}

impl UserProfile {
    /// Profile document for a freshly registered account
    pub fn new(id: UserId, name: String, phone: String, email: String, created_at: String) -> Self {
        Self {
            id,
            name,
            phone,
            email,
            points: 0,
            objects_found: 0,
            objects_played: Some(0),
            accuracy: 0,
            total_matches: 0,
            preferences: Preferences::default(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Preferences {
    pub notifications: bool,
    pub sounds: bool,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            sounds: true,
            dark_mode: false,
        }
    }
}

/// Aggregated numbers shown on the home screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfileSummary {
    pub name: String,
    pub points: i32,
    pub level: u8,
    pub objects_found: i32,
    pub accuracy: i32,
    pub total_matches: i32,
}

/// Contact fields a user may edit from the settings screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactUpdate {
    pub name: String,
    pub phone: String,
}
