use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::quota::{FundingSource, Quota};
use crate::referral::make_referral_code;

/// Most recent funding source a user relied on. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Referral,
    Wallet,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Referral => "referral",
            Plan::Wallet => "wallet",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "referral" => Ok(Plan::Referral),
            "wallet" => Ok(Plan::Wallet),
            other => Err(anyhow::anyhow!("Unknown plan: {}", other)),
        }
    }
}

/// Who sent an inbound event, as reported by the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl Identity {
    pub fn bare(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub quota: Quota,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub referrals: u32,
    pub plan: Plan,
}

impl Profile {
    pub fn new(identity: &Identity, free_uses: u32, language: &str) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username.clone(),
            first_name: identity.first_name.clone(),
            language: Some(language.to_string()),
            created_at: Utc::now(),
            quota: Quota::new(free_uses, 0, 0),
            referral_code: make_referral_code(identity.user_id),
            referred_by: None,
            referrals: 0,
            plan: Plan::Free,
        }
    }

    /// Copy display metadata that is present and changed. Returns whether
    /// anything was updated.
    pub fn refresh_identity(&mut self, identity: &Identity) -> bool {
        let mut changed = false;
        if let Some(username) = &identity.username {
            if self.username.as_ref() != Some(username) {
                self.username = Some(username.clone());
                changed = true;
            }
        }
        if let Some(first_name) = &identity.first_name {
            if self.first_name.as_ref() != Some(first_name) {
                self.first_name = Some(first_name.clone());
                changed = true;
            }
        }
        changed
    }

    /// Spend one use. Only a wallet debit changes the plan.
    pub fn consume_use(&mut self) -> Option<FundingSource> {
        let source = self.quota.consume()?;
        if source == FundingSource::Wallet {
            self.plan = Plan::Wallet;
        }
        Some(source)
    }

    /// Count one more referee. Grants `bonus_uses` each time the counter
    /// reaches a positive multiple of `threshold`; returns whether it did.
    pub fn record_referral(&mut self, threshold: u32, bonus_uses: u32) -> bool {
        self.referrals = self.referrals.saturating_add(1);
        if threshold > 0 && self.referrals % threshold == 0 {
            self.quota.grant_bonus(bonus_uses);
            self.plan = Plan::Referral;
            true
        } else {
            false
        }
    }

    pub fn add_wallet_balance(&mut self, amount: u64) {
        self.quota.add_wallet(amount);
        self.plan = Plan::Wallet;
    }

    pub fn grant_bonus_uses(&mut self, uses: u32) {
        self.quota.grant_bonus(uses);
        self.plan = Plan::Referral;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile::new(&Identity::bare(42), 3, "en")
    }

    #[test]
    fn test_new_profile_defaults() {
        let p = profile();
        assert_eq!(p.quota, Quota::new(3, 0, 0));
        assert_eq!(p.plan, Plan::Free);
        assert_eq!(p.referral_code, make_referral_code(42));
        assert!(p.referred_by.is_none());
    }

    #[test]
    fn test_refresh_identity_ignores_missing_fields() {
        let mut p = profile();
        let identity = Identity {
            user_id: 42,
            username: Some("trader".to_string()),
            first_name: None,
        };
        assert!(p.refresh_identity(&identity));
        assert!(!p.refresh_identity(&identity));
        assert!(!p.refresh_identity(&Identity::bare(42)));
        assert_eq!(p.username.as_deref(), Some("trader"));
    }

    #[test]
    fn test_only_wallet_debit_sets_wallet_plan() {
        let mut p = profile();
        p.quota = Quota::new(1, 1, 1);
        assert_eq!(p.consume_use(), Some(FundingSource::Free));
        assert_eq!(p.consume_use(), Some(FundingSource::Bonus));
        assert_eq!(p.plan, Plan::Free);
        assert_eq!(p.consume_use(), Some(FundingSource::Wallet));
        assert_eq!(p.plan, Plan::Wallet);
        assert_eq!(p.consume_use(), None);
    }

    #[test]
    fn test_referral_bonus_every_threshold() {
        let mut p = profile();
        let grants = (0..12).filter(|_| p.record_referral(5, 3)).count();
        assert_eq!(p.referrals, 12);
        assert_eq!(grants, 2);
        assert_eq!(p.quota.bonus_uses(), 6);
        assert_eq!(p.plan, Plan::Referral);
    }

    #[test]
    fn test_zero_threshold_never_grants() {
        let mut p = profile();
        assert!(!p.record_referral(0, 3));
        assert_eq!(p.referrals, 1);
        assert_eq!(p.quota.bonus_uses(), 0);
    }
}
