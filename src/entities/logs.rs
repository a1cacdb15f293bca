use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub timestamp: DateTimeUtc,
    pub level: String,
    pub message: String,
    pub action_type: String,
    pub cat_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub archived: bool,
    pub archived_at: Option<DateTimeUtc>,
    /// Optional JSON encoded details payload
    pub details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
