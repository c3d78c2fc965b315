use sea_orm_migration::prelude::*;

use crate::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Matches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Matches::UserId).uuid().not_null())
                    .col(ColumnDef::new(Matches::Mode).string().not_null())
                    .col(ColumnDef::new(Matches::Points).integer().not_null())
                    .col(ColumnDef::new(Matches::Correct).integer().not_null())
                    .col(ColumnDef::new(Matches::Failures).integer().null())
                    .col(ColumnDef::new(Matches::Accuracy).integer().not_null())
                    .col(ColumnDef::new(Matches::ObjectsPlayed).integer().not_null())
                    .col(
                        ColumnDef::new(Matches::PlayedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_matches_user_id")
                            .from(Matches::Table, Matches::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Best-matches lookups filter on user and mode, then sort by points
        manager
            .create_index(
                Index::create()
                    .name("idx_matches_user_mode_points")
                    .table(Matches::Table)
                    .col(Matches::UserId)
                    .col(Matches::Mode)
                    .col(Matches::Points)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Matches {
    Table,
    Id,
    UserId,
    Mode,
    Points,
    Correct,
    Failures,
    Accuracy,
    ObjectsPlayed,
    PlayedAt,
}
