use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{prelude::*, users};
use findit_core::{ProfileStore, StatsUpdate};
use findit_types::{ContactUpdate, Preferences, UserId, UserProfile};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_profile(model: users::Model) -> UserProfile {
        UserProfile {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            points: model.points,
            objects_found: model.objects_found,
            objects_played: model.objects_played,
            accuracy: model.accuracy,
            total_matches: model.total_matches,
            preferences: Preferences {
                notifications: model.notifications,
                sounds: model.sounds,
                dark_mode: model.dark_mode,
            },
            created_at: model.created_at.to_rfc3339(),
        }
    }

    async fn find_model(&self, id: Uuid) -> Result<users::Model> {
        Users::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found"))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let user_model = Users::find_by_id(id).one(&self.db).await?;
        Ok(user_model.map(Self::model_to_profile))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let user_model = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        Ok(user_model.map(Self::model_to_profile))
    }
}

#[async_trait]
impl ProfileStore for UserRepository {
    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        let now = chrono::Utc::now().into();
        let created_at = chrono::DateTime::parse_from_rfc3339(&profile.created_at)
            .unwrap_or_else(|_| chrono::Utc::now().into());

        let user_model = users::ActiveModel {
            id: Set(profile.id),
            name: Set(profile.name),
            phone: Set(profile.phone),
            email: Set(profile.email),
            points: Set(profile.points),
            objects_found: Set(profile.objects_found),
            objects_played: Set(profile.objects_played),
            accuracy: Set(profile.accuracy),
            total_matches: Set(profile.total_matches),
            notifications: Set(profile.preferences.notifications),
            sounds: Set(profile.preferences.sounds),
            dark_mode: Set(profile.preferences.dark_mode),
            created_at: Set(created_at),
            updated_at: Set(now),
        };

        let saved_model = Users::insert(user_model).exec(&self.db).await?;

        // Fetch the created profile
        let created = self.find_model(saved_model.last_insert_id).await?;
        Ok(Self::model_to_profile(created))
    }

    async fn load_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        self.find_by_id(user_id).await
    }

    async fn apply_stats(&self, user_id: UserId, update: &StatsUpdate) -> Result<()> {
        let mut user: users::ActiveModel = self.find_model(user_id).await?.into();

        user.objects_found = Set(update.objects_found);
        user.total_matches = Set(update.total_matches);
        user.objects_played = Set(Some(update.objects_played));
        user.accuracy = Set(update.accuracy);
        if let Some(points) = update.points {
            user.points = Set(points);
        }
        user.updated_at = Set(chrono::Utc::now().into());

        user.update(&self.db).await?;
        Ok(())
    }

    async fn update_contact(&self, user_id: UserId, contact: &ContactUpdate) -> Result<()> {
        let mut user: users::ActiveModel = self.find_model(user_id).await?.into();

        user.name = Set(contact.name.clone());
        user.phone = Set(contact.phone.clone());
        user.updated_at = Set(chrono::Utc::now().into());

        user.update(&self.db).await?;
        Ok(())
    }

    async fn update_preferences(&self, user_id: UserId, preferences: Preferences) -> Result<()> {
        let mut user: users::ActiveModel = self.find_model(user_id).await?.into();

        user.notifications = Set(preferences.notifications);
        user.sounds = Set(preferences.sounds);
        user.dark_mode = Set(preferences.dark_mode);
        user.updated_at = Set(chrono::Utc::now().into());

        user.update(&self.db).await?;
        Ok(())
    }
}
