//! Durable Profile and Memory storage.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::entity::{user_memories, user_profiles};
use crate::error::StoreError;
use crate::models::{AssetCategory, Memory, NoteLog, PendingAction, PendingSlot, Profile, Quota, UserState};

const NO_PENDING_ACTION: &str = "none";

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, user_id: i64) -> Result<Option<UserState>, StoreError>;
    async fn save(&self, state: &UserState) -> Result<(), StoreError>;
}

pub struct DbSessionStore {
    db: Arc<DatabaseConnection>,
}

impl DbSessionStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn load(&self, user_id: i64) -> Result<Option<UserState>, StoreError> {
        let Some(profile) = user_profiles::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
        else {
            return Ok(None);
        };
        let memory = user_memories::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?;

        Ok(Some(UserState {
            profile: profile_from_model(profile)?,
            memory: match memory {
                Some(model) => memory_from_model(model)?,
                None => Memory::default(),
            },
        }))
    }

    async fn save(&self, state: &UserState) -> Result<(), StoreError> {
        let profile = profile_to_active(&state.profile);
        let memory = memory_to_active(state.user_id(), &state.memory)?;

        let txn = self.db.begin().await?;
        user_profiles::Entity::insert(profile)
            .on_conflict(
                OnConflict::column(user_profiles::Column::Id)
                    .update_columns([
                        user_profiles::Column::Username,
                        user_profiles::Column::FirstName,
                        user_profiles::Column::Language,
                        user_profiles::Column::FreeUsesRemaining,
                        user_profiles::Column::BonusUsesRemaining,
                        user_profiles::Column::WalletBalance,
                        user_profiles::Column::ReferredBy,
                        user_profiles::Column::Referrals,
                        user_profiles::Column::Plan,
                        user_profiles::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        user_memories::Entity::insert(memory)
            .on_conflict(
                OnConflict::column(user_memories::Column::UserId)
                    .update_columns([
                        user_memories::Column::PendingAction,
                        user_memories::Column::PendingCategory,
                        user_memories::Column::PendingSymbol,
                        user_memories::Column::LastCategory,
                        user_memories::Column::LastSymbol,
                        user_memories::Column::LastTimeframe,
                        user_memories::Column::LastStyle,
                        user_memories::Column::LastRisk,
                        user_memories::Column::RecentNotes,
                        user_memories::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Process-local store used with `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct InMemorySessionStore {
    states: RwLock<HashMap<i64, UserState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user_id: i64) -> Result<Option<UserState>, StoreError> {
        Ok(self.states.read().await.get(&user_id).cloned())
    }

    async fn save(&self, state: &UserState) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(state.user_id(), state.clone());
        Ok(())
    }
}

fn corrupt(user_id: i64, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        user_id,
        reason: reason.to_string(),
    }
}

fn profile_from_model(model: user_profiles::Model) -> Result<Profile, StoreError> {
    Ok(Profile {
        id: model.id,
        username: model.username,
        first_name: model.first_name,
        language: model.language,
        created_at: model.created_at,
        quota: Quota::new(
            model.free_uses_remaining,
            model.bonus_uses_remaining,
            model.wallet_balance,
        ),
        referral_code: model.referral_code,
        referred_by: model.referred_by,
        referrals: model.referrals,
        plan: model.plan.parse().map_err(|e| corrupt(model.id, e))?,
    })
}

fn profile_to_active(profile: &Profile) -> user_profiles::ActiveModel {
    user_profiles::ActiveModel {
        id: Set(profile.id),
        username: Set(profile.username.clone()),
        first_name: Set(profile.first_name.clone()),
        language: Set(profile.language.clone()),
        created_at: Set(profile.created_at),
        free_uses_remaining: Set(profile.quota.free_uses()),
        bonus_uses_remaining: Set(profile.quota.bonus_uses()),
        wallet_balance: Set(profile.quota.wallet_balance()),
        referral_code: Set(profile.referral_code.clone()),
        referred_by: Set(profile.referred_by.clone()),
        referrals: Set(profile.referrals),
        plan: Set(profile.plan.as_str().to_string()),
        updated_at: Set(Some(Utc::now())),
    }
}

fn memory_from_model(model: user_memories::Model) -> Result<Memory, StoreError> {
    let user_id = model.user_id;
    let notes: Vec<String> = serde_json::from_str(&model.recent_notes)?;
    Ok(Memory {
        pending: pending_from_columns(
            user_id,
            &model.pending_action,
            model.pending_category.as_deref(),
            model.pending_symbol,
        )?,
        last_category: model
            .last_category
            .as_deref()
            .map(str::parse::<AssetCategory>)
            .transpose()
            .map_err(|e| corrupt(user_id, e))?,
        last_symbol: model.last_symbol,
        last_timeframe: model.last_timeframe,
        last_style: model.last_style,
        last_risk: model.last_risk,
        recent_notes: NoteLog::from_notes(notes),
    })
}

/// A row that claims an action but lacks its asset loads as "nothing pending".
fn pending_from_columns(
    user_id: i64,
    action: &str,
    category: Option<&str>,
    symbol: Option<String>,
) -> Result<Option<PendingSlot>, StoreError> {
    if action == NO_PENDING_ACTION {
        return Ok(None);
    }
    let action: PendingAction = action.parse().map_err(|e| corrupt(user_id, e))?;
    match (category, symbol) {
        (Some(category), Some(symbol)) => Ok(Some(PendingSlot {
            action,
            category: category.parse().map_err(|e| corrupt(user_id, e))?,
            symbol,
        })),
        _ => {
            warn!("User {} has {} pending without an asset, clearing it", user_id, action);
            Ok(None)
        }
    }
}

fn memory_to_active(user_id: i64, memory: &Memory) -> Result<user_memories::ActiveModel, StoreError> {
    let pending = memory.pending.as_ref();
    Ok(user_memories::ActiveModel {
        user_id: Set(user_id),
        pending_action: Set(pending
            .map(|slot| slot.action.as_str())
            .unwrap_or(NO_PENDING_ACTION)
            .to_string()),
        pending_category: Set(pending.map(|slot| slot.category.as_str().to_string())),
        pending_symbol: Set(pending.map(|slot| slot.symbol.clone())),
        last_category: Set(memory.last_category.map(|c| c.as_str().to_string())),
        last_symbol: Set(memory.last_symbol.clone()),
        last_timeframe: Set(memory.last_timeframe.clone()),
        last_style: Set(memory.last_style.clone()),
        last_risk: Set(memory.last_risk.clone()),
        recent_notes: Set(serde_json::to_string(&memory.recent_notes)?),
        updated_at: Set(Some(Utc::now())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Plan};
    use sea_orm::ActiveValue;

    fn memory_model(action: &str, category: Option<&str>, symbol: Option<&str>) -> user_memories::Model {
        user_memories::Model {
            user_id: 7,
            pending_action: action.to_string(),
            pending_category: category.map(str::to_string),
            pending_symbol: symbol.map(str::to_string),
            last_category: Some("crypto".to_string()),
            last_symbol: Some("ETHUSDT".to_string()),
            last_timeframe: Some("H4".to_string()),
            last_style: None,
            last_risk: None,
            recent_notes: r#"["first","second"]"#.to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_memory_row_with_pending_slot() {
        let memory = memory_from_model(memory_model("awaiting_chart", Some("metals"), Some("XAUUSD"))).unwrap();
        let slot = memory.pending.unwrap();
        assert_eq!(slot.action, PendingAction::AwaitingChart);
        assert_eq!(slot.category, AssetCategory::Metals);
        assert_eq!(slot.symbol, "XAUUSD");
        assert_eq!(memory.last_category, Some(AssetCategory::Crypto));
        assert_eq!(memory.recent_notes.to_vec(), vec!["first", "second"]);
    }

    #[test]
    fn test_memory_row_without_asset_clears_pending() {
        let memory = memory_from_model(memory_model("awaiting_prompt", None, Some("XAUUSD"))).unwrap();
        assert!(memory.pending.is_none());
    }

    #[test]
    fn test_memory_row_with_unknown_action_is_corrupt() {
        let err = memory_from_model(memory_model("awaiting_news", Some("metals"), Some("XAUUSD"))).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { user_id: 7, .. }));
    }

    #[test]
    fn test_idle_memory_writes_none_action() {
        let active = memory_to_active(7, &Memory::default()).unwrap();
        assert_eq!(active.pending_action, ActiveValue::Set("none".to_string()));
        assert_eq!(active.pending_symbol, ActiveValue::Set(None));
        assert_eq!(active.recent_notes, ActiveValue::Set("[]".to_string()));
    }

    #[test]
    fn test_profile_columns_follow_quota() {
        let mut profile = Profile::new(&Identity::bare(7), 3, "fa");
        profile.add_wallet_balance(20);
        let active = profile_to_active(&profile);
        assert_eq!(active.free_uses_remaining, ActiveValue::Set(3));
        assert_eq!(active.wallet_balance, ActiveValue::Set(20));
        assert_eq!(active.plan, ActiveValue::Set("wallet".to_string()));
        assert_eq!(profile.plan, Plan::Wallet);
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemorySessionStore::new();
        assert!(store.load(7).await.unwrap().is_none());
        let state = UserState::new(Profile::new(&Identity::bare(7), 3, "fa"));
        store.save(&state).await.unwrap();
        assert_eq!(store.load(7).await.unwrap(), Some(state));
    }
}
