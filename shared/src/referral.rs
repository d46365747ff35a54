//! Referral codes and the registry that maps them back to their owners.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Deterministic code for a user: base36 id, a dash, and four hex digits of
/// an FNV-1a checksum over the base36 text, upper-cased.
pub fn make_referral_code(user_id: i64) -> String {
    let core = to_base36(user_id);
    let checksum = format!("{:08x}", fnv1a32(&core));
    format!("{}-{}", core, &checksum[..4]).to_uppercase()
}

/// Canonical form of a code typed or deep-linked by a user.
pub fn normalize_code(payload: &str) -> Option<String> {
    let code = payload.trim().to_uppercase();
    (!code.is_empty()).then_some(code)
}

fn to_base36(value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = value < 0;
    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn fnv1a32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ unit as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Shared mapping from referral code to owning user id. Entries are
/// written once and never reassigned.
#[async_trait]
pub trait ReferralRegistry: Send + Sync {
    async fn put(&self, code: &str, user_id: i64) -> Result<(), StoreError>;
    async fn get(&self, code: &str) -> Result<Option<i64>, StoreError>;
}

fn registry_key(code: &str) -> String {
    format!("ref:{}", code)
}

pub struct RedisReferralRegistry {
    conn: MultiplexedConnection,
}

impl RedisReferralRegistry {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ReferralRegistry for RedisReferralRegistry {
    async fn put(&self, code: &str, user_id: i64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let created: bool = conn.set_nx(registry_key(code), user_id).await?;
        if !created {
            debug!("Referral code {} already registered, keeping existing owner", code);
        }
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.conn.clone();
        let owner: Option<i64> = conn.get(registry_key(code)).await?;
        Ok(owner)
    }
}

#[derive(Default)]
pub struct InMemoryReferralRegistry {
    codes: RwLock<HashMap<String, i64>>,
}

impl InMemoryReferralRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralRegistry for InMemoryReferralRegistry {
    async fn put(&self, code: &str, user_id: i64) -> Result<(), StoreError> {
        let mut codes = self.codes.write().await;
        let owner = *codes.entry(code.to_string()).or_insert(user_id);
        if owner != user_id {
            warn!("Referral code {} belongs to {}, not reassigning to {}", code, owner, user_id);
        }
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.codes.read().await.get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(123456789), "21i3v9");
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a32(""), 0x811c9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c292c);
    }

    #[test]
    fn test_referral_code_shape() {
        let code = make_referral_code(123456789);
        assert!(code.starts_with("21I3V9-"));
        assert_eq!(code.len(), "21I3V9-".len() + 4);
        assert_eq!(code, code.to_uppercase());
        assert_eq!(code, make_referral_code(123456789));
        assert_ne!(code, make_referral_code(123456790));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12-c3d4 ").as_deref(), Some("AB12-C3D4"));
        assert_eq!(normalize_code("   "), None);
    }

    #[tokio::test]
    async fn test_in_memory_registry_is_write_once() {
        let registry = InMemoryReferralRegistry::new();
        registry.put("CODE-1", 1).await.unwrap();
        registry.put("CODE-1", 2).await.unwrap();
        assert_eq!(registry.get("CODE-1").await.unwrap(), Some(1));
        assert_eq!(registry.get("MISSING").await.unwrap(), None);
    }
}
