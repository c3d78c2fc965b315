//! Narrow interfaces to the managed services the game depends on.
//!
//! Implementations live in `findit-persistence` (documents) and
//! `findit-server` (blobs, label detection). Their contracts are assumed
//! correct; callers log failures and degrade to empty results.

use anyhow::Result;
use async_trait::async_trait;
use findit_types::{
    BestMatchEntry, Challenge, ContactUpdate, GameMode, MatchRecord, Preferences, UserId,
    UserProfile,
};

use crate::StatsUpdate;

/// Per-user profile documents
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile>;

    async fn load_profile(&self, user_id: UserId) -> Result<Option<UserProfile>>;

    /// Overwrite the cumulative statistics with freshly folded values
    async fn apply_stats(&self, user_id: UserId, update: &StatsUpdate) -> Result<()>;

    async fn update_contact(&self, user_id: UserId, contact: &ContactUpdate) -> Result<()>;

    async fn update_preferences(&self, user_id: UserId, preferences: Preferences) -> Result<()>;
}

/// Append-only history of finished sessions, kept separately per mode
#[async_trait]
pub trait MatchHistory: Send + Sync {
    async fn append(&self, user_id: UserId, record: &MatchRecord) -> Result<()>;

    /// Highest scoring sessions first
    async fn best_matches(
        &self,
        user_id: UserId,
        mode: GameMode,
        limit: u64,
    ) -> Result<Vec<BestMatchEntry>>;
}

#[async_trait]
pub trait ChallengeSource: Send + Sync {
    /// Challenges currently flagged active
    async fn active_challenges(&self) -> Result<Vec<Challenge>>;
}

/// A stored photo and where the label detector can fetch it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub locator: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store under a freshly generated key
    async fn upload(&self, bytes: Vec<u8>) -> Result<StoredBlob>;

    async fn delete(&self, blob: &StoredBlob) -> Result<()>;
}

#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Descriptive labels for the photo at `locator`
    async fn detect_labels(&self, locator: &str) -> Result<Vec<String>>;
}
