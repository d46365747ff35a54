//! Usage quota drawn down in a fixed priority order.

use serde::{Deserialize, Serialize};

/// The bucket a single use was paid from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingSource {
    Free,
    Bonus,
    Wallet,
}

/// Three counters that authorize signal requests.
///
/// Fields are private: `consume` is the only way to spend, so the
/// free → bonus → wallet order cannot be bypassed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    free_uses: u32,
    bonus_uses: u32,
    wallet_balance: u64,
}

impl Quota {
    pub fn new(free_uses: u32, bonus_uses: u32, wallet_balance: u64) -> Self {
        Self {
            free_uses,
            bonus_uses,
            wallet_balance,
        }
    }

    pub fn free_uses(&self) -> u32 {
        self.free_uses
    }

    pub fn bonus_uses(&self) -> u32 {
        self.bonus_uses
    }

    pub fn wallet_balance(&self) -> u64 {
        self.wallet_balance
    }

    /// Sum of all three buckets.
    pub fn total(&self) -> u64 {
        self.free_uses as u64 + self.bonus_uses as u64 + self.wallet_balance
    }

    pub fn can_consume(&self) -> bool {
        self.free_uses > 0 || self.bonus_uses > 0 || self.wallet_balance > 0
    }

    /// Debit exactly one unit from the first non-empty bucket.
    /// Returns `None` without mutation when every bucket is empty.
    pub fn consume(&mut self) -> Option<FundingSource> {
        if self.free_uses > 0 {
            self.free_uses -= 1;
            Some(FundingSource::Free)
        } else if self.bonus_uses > 0 {
            self.bonus_uses -= 1;
            Some(FundingSource::Bonus)
        } else if self.wallet_balance > 0 {
            self.wallet_balance -= 1;
            Some(FundingSource::Wallet)
        } else {
            None
        }
    }

    pub fn grant_bonus(&mut self, uses: u32) {
        self.bonus_uses = self.bonus_uses.saturating_add(uses);
    }

    pub fn add_wallet(&mut self, amount: u64) {
        self.wallet_balance = self.wallet_balance.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_priority_order() {
        let mut quota = Quota::new(1, 2, 1);
        let drawn: Vec<_> = std::iter::from_fn(|| quota.consume()).collect();
        assert_eq!(
            drawn,
            vec![
                FundingSource::Free,
                FundingSource::Bonus,
                FundingSource::Bonus,
                FundingSource::Wallet
            ]
        );
        assert_eq!(quota, Quota::default());
    }

    #[test]
    fn test_consume_never_exceeds_starting_total() {
        for (free, bonus, wallet) in [(0, 0, 0), (3, 0, 0), (0, 4, 2), (2, 1, 5)] {
            let mut quota = Quota::new(free, bonus, wallet);
            let start = quota.total();
            let mut debited = 0;
            for _ in 0..20 {
                if quota.consume().is_some() {
                    debited += 1;
                }
            }
            assert_eq!(debited, start);
            assert!(!quota.can_consume());
        }
    }

    #[test]
    fn test_empty_quota_is_not_mutated() {
        let mut quota = Quota::default();
        assert!(!quota.can_consume());
        assert_eq!(quota.consume(), None);
        assert_eq!(quota, Quota::default());
    }

    #[test]
    fn test_grants_saturate() {
        let mut quota = Quota::new(0, u32::MAX - 1, u64::MAX);
        quota.grant_bonus(5);
        quota.add_wallet(1);
        assert_eq!(quota.bonus_uses(), u32::MAX);
        assert_eq!(quota.wallet_balance(), u64::MAX);
    }
}
