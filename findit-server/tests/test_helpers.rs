#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use findit_core::{
    BlobStore, ChallengeSource, LabelDetector, MatchHistory, ProfileStore, SessionCleanup,
    StatsUpdate, StoredBlob,
};
use findit_server::session_manager::{Collaborators, SessionManager};
use findit_types::{
    BestMatchEntry, Challenge, ContactUpdate, GameMode, MatchRecord, Preferences, SessionView,
    UserId, UserProfile,
};

/// Creates a test profile with given name
pub fn create_test_profile(name: &str) -> UserProfile {
    UserProfile::new(
        Uuid::new_v4(),
        name.to_string(),
        "600111222".to_string(),
        format!("{}@test.com", name.to_lowercase()),
        chrono::Utc::now().to_rfc3339(),
    )
}

pub fn spoon_challenge() -> Challenge {
    Challenge::new("Cuchara", vec!["spoon".to_string(), "tablespoon".to_string()])
}

#[derive(Default)]
pub struct InMemoryProfiles {
    pub profiles: Mutex<HashMap<UserId, UserProfile>>,
    pub fail_writes: AtomicBool,
    /// Loads never complete, like a document store that stopped answering
    pub hang_loads: AtomicBool,
}

impl InMemoryProfiles {
    pub fn insert(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }

    pub fn get(&self, user_id: UserId) -> UserProfile {
        self.profiles.lock().unwrap()[&user_id].clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("profile store unavailable"));
        }
        Ok(())
    }

    fn modify(&self, user_id: UserId, f: impl FnOnce(&mut UserProfile)) -> Result<()> {
        self.check_writable()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("User not found"))?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        self.check_writable()?;
        self.insert(profile.clone());
        Ok(profile)
    }

    async fn load_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        if self.hang_loads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn apply_stats(&self, user_id: UserId, update: &StatsUpdate) -> Result<()> {
        self.modify(user_id, |profile| update.apply_to(profile))
    }

    async fn update_contact(&self, user_id: UserId, contact: &ContactUpdate) -> Result<()> {
        self.modify(user_id, |profile| {
            profile.name = contact.name.clone();
            profile.phone = contact.phone.clone();
        })
    }

    async fn update_preferences(&self, user_id: UserId, preferences: Preferences) -> Result<()> {
        self.modify(user_id, |profile| profile.preferences = preferences)
    }
}

#[derive(Default)]
pub struct InMemoryHistory {
    pub records: Mutex<Vec<(UserId, MatchRecord)>>,
}

impl InMemoryHistory {
    pub fn records_for(&self, user_id: UserId) -> Vec<MatchRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait]
impl MatchHistory for InMemoryHistory {
    async fn append(&self, user_id: UserId, record: &MatchRecord) -> Result<()> {
        self.records.lock().unwrap().push((user_id, record.clone()));
        Ok(())
    }

    async fn best_matches(
        &self,
        user_id: UserId,
        mode: GameMode,
        limit: u64,
    ) -> Result<Vec<BestMatchEntry>> {
        let mut records: Vec<_> = self
            .records_for(user_id)
            .into_iter()
            .filter(|record| record.mode == mode)
            .collect();
        records.sort_by(|a, b| b.points.cmp(&a.points));

        Ok(records
            .into_iter()
            .take(limit as usize)
            .enumerate()
            .map(|(index, record)| BestMatchEntry {
                rank: index as u32 + 1,
                played_at: record.played_at,
                points: record.points,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryChallenges {
    pub challenges: Mutex<Vec<Challenge>>,
}

#[async_trait]
impl ChallengeSource for InMemoryChallenges {
    async fn active_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self.challenges.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct InMemoryBlobs {
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_uploads: AtomicBool,
    pub uploads: AtomicUsize,
}

impl InMemoryBlobs {
    pub fn stored_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobs {
    async fn upload(&self, bytes: Vec<u8>) -> Result<StoredBlob> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("blob store unavailable"));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);

        let key = format!("imagenes/{}.jpg", Uuid::new_v4());
        self.blobs.lock().unwrap().insert(key.clone(), bytes);
        Ok(StoredBlob {
            locator: format!("memory://{}", key),
            key,
        })
    }

    async fn delete(&self, blob: &StoredBlob) -> Result<()> {
        self.blobs.lock().unwrap().remove(&blob.key);
        Ok(())
    }
}

/// Returns whatever labels the test sets, optionally pausing until released
#[derive(Default)]
pub struct ScriptedDetector {
    pub labels: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub hold: AtomicBool,
    pub started: Notify,
    pub release: Notify,
}

impl ScriptedDetector {
    pub fn set_labels(&self, labels: &[&str]) {
        *self.labels.lock().unwrap() = labels.iter().map(|label| label.to_string()).collect();
    }
}

#[async_trait]
impl LabelDetector for ScriptedDetector {
    async fn detect_labels(&self, _locator: &str) -> Result<Vec<String>> {
        if self.hold.load(Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("label detection unavailable"));
        }
        Ok(self.labels.lock().unwrap().clone())
    }
}

/// Test setup that provides a session manager wired to in-memory collaborators
pub struct TestSessionSetup {
    pub manager: Arc<SessionManager>,
    pub profiles: Arc<InMemoryProfiles>,
    pub history: Arc<InMemoryHistory>,
    pub challenges: Arc<InMemoryChallenges>,
    pub blobs: Arc<InMemoryBlobs>,
    pub detector: Arc<ScriptedDetector>,
    pub player: UserProfile,
}

impl TestSessionSetup {
    pub fn new(round_seconds: u32) -> Self {
        Self::with_cleanup(round_seconds, SessionCleanup::default())
    }

    pub fn with_cleanup(round_seconds: u32, cleanup: SessionCleanup) -> Self {
        let profiles = Arc::new(InMemoryProfiles::default());
        let history = Arc::new(InMemoryHistory::default());
        let challenges = Arc::new(InMemoryChallenges::default());
        let blobs = Arc::new(InMemoryBlobs::default());
        let detector = Arc::new(ScriptedDetector::default());

        challenges.challenges.lock().unwrap().push(spoon_challenge());
        let player = create_test_profile("Lucia");
        profiles.insert(player.clone());

        let manager = Arc::new(SessionManager::new(
            Collaborators {
                profiles: profiles.clone(),
                history: history.clone(),
                challenges: challenges.clone(),
                blobs: blobs.clone(),
                detector: detector.clone(),
            },
            round_seconds,
            cleanup,
        ));

        Self {
            manager,
            profiles,
            history,
            challenges,
            blobs,
            detector,
            player,
        }
    }

    pub async fn start(&self, mode: GameMode) -> SessionView {
        self.manager
            .start_session(self.player.id, mode)
            .await
            .unwrap()
    }

    /// Submit a photo that the detector will label with `labels`
    pub async fn submit_with_labels(
        &self,
        session: &SessionView,
        labels: &[&str],
    ) -> findit_types::SubmitImageResponse {
        self.detector.set_labels(labels);
        self.manager
            .submit_image(session.id, self.player.id, vec![0xFF, 0xD8, 0xFF])
            .await
            .unwrap()
    }

    /// Match records are written in the background; wait until `expected` have landed
    pub async fn wait_for_records(&self, expected: usize) -> Vec<MatchRecord> {
        for _ in 0..200 {
            let records = self.history.records_for(self.player.id);
            if records.len() >= expected {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} match records for {}", expected, self.player.id);
    }

    /// Give background writes a chance to run
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    pub async fn tick(&self, seconds: u32) {
        for _ in 0..seconds {
            self.manager.tick_all().await;
        }
    }
}
