use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entities::{matches, prelude::*};
use findit_core::MatchHistory;
use findit_types::{BestMatchEntry, GameMode, MatchRecord, UserId};

pub struct MatchRepository {
    db: DatabaseConnection,
}

impl MatchRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn count_for_user(&self, user_id: Uuid, mode: GameMode) -> Result<usize> {
        let rows = Matches::find()
            .filter(matches::Column::UserId.eq(user_id))
            .filter(matches::Column::Mode.eq(mode.as_str()))
            .all(&self.db)
            .await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl MatchHistory for MatchRepository {
    async fn append(&self, user_id: UserId, record: &MatchRecord) -> Result<()> {
        let played_at = chrono::DateTime::parse_from_rfc3339(&record.played_at)
            .map_err(|e| anyhow::anyhow!("Invalid played_at timestamp: {}", e))?;

        let model = matches::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            mode: Set(record.mode.as_str().to_string()),
            points: Set(record.points),
            correct: Set(record.correct),
            failures: Set(record.failures),
            accuracy: Set(record.accuracy),
            objects_played: Set(record.objects_played),
            played_at: Set(played_at),
        };

        Matches::insert(model).exec(&self.db).await?;
        Ok(())
    }

    async fn best_matches(
        &self,
        user_id: UserId,
        mode: GameMode,
        limit: u64,
    ) -> Result<Vec<BestMatchEntry>> {
        let rows = Matches::find()
            .filter(matches::Column::UserId.eq(user_id))
            .filter(matches::Column::Mode.eq(mode.as_str()))
            .order_by_desc(matches::Column::Points)
            .order_by_desc(matches::Column::PlayedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| BestMatchEntry {
                rank: index as u32 + 1,
                played_at: row.played_at.to_rfc3339(),
                points: row.points,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::repositories::UserRepository;
    use findit_core::ProfileStore;
    use findit_types::UserProfile;
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> (MatchRepository, Uuid) {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let user_id = Uuid::new_v4();
        UserRepository::new(db.clone())
            .create_profile(UserProfile::new(
                user_id,
                "Mateo".to_string(),
                "600123123".to_string(),
                "mateo@example.com".to_string(),
                "2024-03-01T10:00:00+00:00".to_string(),
            ))
            .await
            .unwrap();

        (MatchRepository::new(db), user_id)
    }

    fn record(mode: GameMode, points: i32, day: u32) -> MatchRecord {
        MatchRecord {
            mode,
            points,
            played_at: format!("2024-03-{day:02}T12:00:00+00:00"),
            correct: points,
            failures: matches!(mode, GameMode::TimeTrial).then_some(1),
            accuracy: 50,
            objects_played: points + 1,
        }
    }

    #[tokio::test]
    async fn test_best_matches_top_five_by_points() {
        let (repo, user_id) = setup_test_db().await;
        for (day, points) in [(1, 30), (2, 80), (3, 10), (4, 50), (5, 70), (6, 20), (7, 60)] {
            repo.append(user_id, &record(GameMode::Normal, points, day))
                .await
                .unwrap();
        }

        let best = repo.best_matches(user_id, GameMode::Normal, 5).await.unwrap();
        let points: Vec<i32> = best.iter().map(|entry| entry.points).collect();
        assert_eq!(points, vec![80, 70, 60, 50, 30]);
        assert_eq!(best[0].rank, 1);
        assert_eq!(best[4].rank, 5);
        assert!(best[0].played_at.starts_with("2024-03-02"));
    }

    #[tokio::test]
    async fn test_modes_have_separate_histories() {
        let (repo, user_id) = setup_test_db().await;
        repo.append(user_id, &record(GameMode::Normal, 40, 1)).await.unwrap();
        repo.append(user_id, &record(GameMode::TimeTrial, 7, 2)).await.unwrap();
        repo.append(user_id, &record(GameMode::TimeTrial, 9, 3)).await.unwrap();

        assert_eq!(repo.count_for_user(user_id, GameMode::Normal).await.unwrap(), 1);
        assert_eq!(repo.count_for_user(user_id, GameMode::TimeTrial).await.unwrap(), 2);

        let trial = repo.best_matches(user_id, GameMode::TimeTrial, 5).await.unwrap();
        assert_eq!(trial.len(), 2);
        assert_eq!(trial[0].points, 9);
    }

    #[tokio::test]
    async fn test_no_history_is_empty() {
        let (repo, user_id) = setup_test_db().await;
        let best = repo.best_matches(user_id, GameMode::Normal, 5).await.unwrap();
        assert!(best.is_empty());
    }
}
