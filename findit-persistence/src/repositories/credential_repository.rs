use anyhow::Result;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, SqlErr,
};
use uuid::Uuid;

use crate::entities::{credentials, prelude::*};

/// Password hash for one account, in PHC string format (salt and parameters included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

impl From<credentials::Model> for StoredCredential {
    fn from(model: credentials::Model) -> Self {
        Self {
            user_id: model.user_id,
            email: model.email,
            password_hash: model.password_hash,
        }
    }
}

pub struct CredentialRepository {
    db: DatabaseConnection,
}

impl CredentialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns false, writing nothing, when the email is already registered
    pub async fn create(&self, credential: &StoredCredential) -> Result<bool> {
        let model = credentials::ActiveModel {
            user_id: Set(credential.user_id),
            email: Set(credential.email.clone()),
            password_hash: Set(credential.password_hash.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };

        match Credentials::insert(model).exec(&self.db).await {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<StoredCredential>> {
        let model = Credentials::find()
            .filter(credentials::Column::Email.eq(email))
            .one(&self.db)
            .await?;

        Ok(model.map(StoredCredential::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};

    async fn setup_test_db() -> CredentialRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        CredentialRepository::new(db)
    }

    fn credential(email: &str) -> StoredCredential {
        StoredCredential {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_email() {
        let repo = setup_test_db().await;
        let stored = credential("ana@example.com");
        assert!(repo.create(&stored).await.unwrap());

        let found = repo.find_by_email("ana@example.com").await.unwrap();
        assert_eq!(found, Some(stored));
        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_reported_not_failed() {
        let repo = setup_test_db().await;
        let first = credential("dup@example.com");
        assert!(repo.create(&first).await.unwrap());
        assert!(!repo.create(&credential("dup@example.com")).await.unwrap());

        let kept = repo.find_by_email("dup@example.com").await.unwrap().unwrap();
        assert_eq!(kept.user_id, first.user_id);
    }
}
