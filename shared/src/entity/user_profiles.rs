//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub username: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub first_name: Option<String>,
    #[sea_orm(nullable)]
    pub language: Option<String>,
    pub created_at: DateTimeUtc,
    pub free_uses_remaining: u32,
    pub bonus_uses_remaining: u32,
    pub wallet_balance: u64,
    #[sea_orm(unique)]
    pub referral_code: String,
    #[sea_orm(nullable)]
    pub referred_by: Option<String>,
    pub referrals: u32,
    pub plan: String, // "free", "referral", "wallet"
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_memories::Entity")]
    UserMemories,
}

impl Related<super::user_memories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserMemories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
