//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_memories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub pending_action: String, // "none", "awaiting_chart", "awaiting_prompt"
    #[sea_orm(nullable)]
    pub pending_category: Option<String>,
    #[sea_orm(nullable)]
    pub pending_symbol: Option<String>,
    #[sea_orm(nullable)]
    pub last_category: Option<String>,
    #[sea_orm(nullable)]
    pub last_symbol: Option<String>,
    #[sea_orm(nullable)]
    pub last_timeframe: Option<String>,
    #[sea_orm(nullable)]
    pub last_style: Option<String>,
    #[sea_orm(nullable)]
    pub last_risk: Option<String>,
    /// JSON array of strings, oldest first.
    #[sea_orm(column_type = "Text")]
    pub recent_notes: String,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user_profiles::Entity",
        from = "Column::UserId",
        to = "super::user_profiles::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UserProfiles,
}

impl Related<super::user_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProfiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
