use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_cats_table(manager).await?;
        self.create_media_table(manager).await?;
        self.create_logs_table(manager).await?;
        self.create_settings_table(manager).await?;

        self.create_indexes(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Logs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cats::Table).to_owned())
            .await?;

        Ok(())
    }
}

impl Migration {
    // Helper functions for database-specific types
    fn create_id_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.uuid().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_nullable_uuid_column(
        &self,
        manager: &SchemaManager,
        column: impl IntoIden,
    ) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.uuid(),
            _ => col.string(),
        };
        col
    }

    fn create_timestamp_column(&self, manager: &SchemaManager, column: impl IntoIden) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone().not_null(),
            _ => col.string().not_null(),
        };
        col
    }

    fn create_nullable_timestamp_column(
        &self,
        manager: &SchemaManager,
        column: impl IntoIden,
    ) -> ColumnDef {
        let mut col = ColumnDef::new(column);
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => col.timestamp_with_time_zone(),
            _ => col.string(),
        };
        col
    }

    async fn create_cats_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cats::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Cats::Id).primary_key())
                    .col(ColumnDef::new(Cats::Name).string().not_null())
                    .col(ColumnDef::new(Cats::Description).text())
                    .col(ColumnDef::new(Cats::MainImage).string())
                    .col(ColumnDef::new(Cats::Images).text().not_null().default("[]"))
                    .col(ColumnDef::new(Cats::Videos).text().not_null().default("[]"))
                    .col(ColumnDef::new(Cats::Color).string())
                    .col(ColumnDef::new(Cats::Gender).string().not_null())
                    .col(ColumnDef::new(Cats::YearOfBirth).integer())
                    .col(ColumnDef::new(Cats::Breed).string())
                    .col(ColumnDef::new(Cats::Category).string())
                    .col(
                        ColumnDef::new(Cats::Vaccinated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Cats::Microchipped)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Cats::Castrated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(self.create_nullable_uuid_column(manager, Cats::MotherId))
                    .col(self.create_nullable_uuid_column(manager, Cats::FatherId))
                    .col(
                        ColumnDef::new(Cats::Availability)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(Cats::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(self.create_nullable_timestamp_column(manager, Cats::DeletedAt))
                    .col(
                        ColumnDef::new(Cats::Views)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(self.create_timestamp_column(manager, Cats::CreatedAt))
                    .col(self.create_timestamp_column(manager, Cats::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_media_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Media::Id).primary_key())
                    .col(ColumnDef::new(Media::Name).string().not_null())
                    .col(ColumnDef::new(Media::Url).string().not_null())
                    .col(ColumnDef::new(Media::Path).string())
                    .col(ColumnDef::new(Media::MediaType).string().not_null())
                    .col(self.create_nullable_uuid_column(manager, Media::CatId))
                    .col(
                        ColumnDef::new(Media::Size)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Media::MimeType).string())
                    .col(ColumnDef::new(Media::FileHash).string())
                    .col(ColumnDef::new(Media::Width).integer())
                    .col(ColumnDef::new(Media::Height).integer())
                    .col(
                        ColumnDef::new(Media::Locked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Media::LockReason).string())
                    .col(
                        ColumnDef::new(Media::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(self.create_nullable_timestamp_column(manager, Media::DeletedAt))
                    .col(ColumnDef::new(Media::DeletedBy).string())
                    .col(self.create_timestamp_column(manager, Media::CreatedAt))
                    .col(self.create_timestamp_column(manager, Media::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_media_cat_id")
                            .from(Media::Table, Media::CatId)
                            .to(Cats::Table, Cats::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_logs_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Logs::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, Logs::Id).primary_key())
                    .col(self.create_timestamp_column(manager, Logs::Timestamp))
                    .col(ColumnDef::new(Logs::Level).string().not_null())
                    .col(ColumnDef::new(Logs::Message).text().not_null())
                    .col(ColumnDef::new(Logs::ActionType).string().not_null())
                    .col(self.create_nullable_uuid_column(manager, Logs::CatId))
                    .col(ColumnDef::new(Logs::UserId).string())
                    .col(ColumnDef::new(Logs::UserEmail).string())
                    .col(
                        ColumnDef::new(Logs::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(self.create_nullable_timestamp_column(manager, Logs::ArchivedAt))
                    .col(ColumnDef::new(Logs::Details).text())
                    .to_owned(),
            )
            .await
    }

    async fn create_settings_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Settings::Key).string().not_null().primary_key())
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(self.create_timestamp_column(manager, Settings::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_cats_deleted")
                    .table(Cats::Table)
                    .col(Cats::Deleted)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_cats_availability")
                    .table(Cats::Table)
                    .col(Cats::Availability)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_cat_id")
                    .table(Media::Table)
                    .col(Media::CatId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_media_deleted")
                    .table(Media::Table)
                    .col(Media::Deleted)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_logs_timestamp")
                    .table(Logs::Table)
                    .col(Logs::Timestamp)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_logs_archived")
                    .table(Logs::Table)
                    .col(Logs::Archived)
                    .col(Logs::ArchivedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Cats {
    Table,
    Id,
    Name,
    Description,
    MainImage,
    Images,
    Videos,
    Color,
    Gender,
    YearOfBirth,
    Breed,
    Category,
    Vaccinated,
    Microchipped,
    Castrated,
    MotherId,
    FatherId,
    Availability,
    Deleted,
    DeletedAt,
    Views,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Media {
    Table,
    Id,
    Name,
    Url,
    Path,
    MediaType,
    CatId,
    Size,
    MimeType,
    FileHash,
    Width,
    Height,
    Locked,
    LockReason,
    Deleted,
    DeletedAt,
    DeletedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Logs {
    Table,
    Id,
    Timestamp,
    Level,
    Message,
    ActionType,
    CatId,
    UserId,
    UserEmail,
    Archived,
    ArchivedAt,
    Details,
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
    UpdatedAt,
}
