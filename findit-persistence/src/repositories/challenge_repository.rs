use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use crate::entities::{challenges, prelude::*};
use findit_core::ChallengeSource;
use findit_types::Challenge;

pub struct ChallengeRepository {
    db: DatabaseConnection,
}

impl ChallengeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_challenge(model: challenges::Model) -> Result<Challenge> {
        let variants: Vec<String> = serde_json::from_value(model.variants)?;
        Ok(Challenge {
            id: model.id,
            word: model.word,
            variants,
            active: model.active,
        })
    }

    pub async fn create_challenge(&self, challenge: &Challenge) -> Result<()> {
        let model = challenges::ActiveModel {
            id: Set(challenge.id),
            word: Set(challenge.word.clone()),
            variants: Set(serde_json::to_value(&challenge.variants)?),
            active: Set(challenge.active),
        };

        Challenges::insert(model).exec(&self.db).await?;
        Ok(())
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        let mut challenge: challenges::ActiveModel = Challenges::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Challenge not found"))?
            .into();

        challenge.active = Set(active);
        challenge.update(&self.db).await?;
        Ok(())
    }

    /// Insert the given challenges only when the table is still empty.
    /// Returns how many were inserted.
    pub async fn seed_if_empty(&self, seed: &[Challenge]) -> Result<usize> {
        let existing = Challenges::find().count(&self.db).await?;
        if existing > 0 {
            tracing::debug!("Challenge table already has {} rows, skipping seed", existing);
            return Ok(0);
        }

        for challenge in seed {
            self.create_challenge(challenge).await?;
        }
        tracing::info!("Seeded {} challenges", seed.len());
        Ok(seed.len())
    }
}

#[async_trait]
impl ChallengeSource for ChallengeRepository {
    async fn active_challenges(&self) -> Result<Vec<Challenge>> {
        let rows = Challenges::find()
            .filter(challenges::Column::Active.eq(true))
            .all(&self.db)
            .await?;

        rows.into_iter().map(Self::model_to_challenge).collect()
    }
}
