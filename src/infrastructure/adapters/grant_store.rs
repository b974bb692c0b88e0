//! Purchase grant store (Redis-backed with in-process fallback)
//!
//! Owns verified transactions and the buyer/purchase sets. One-time use of a
//! transaction identifier is enforced here: every identifier a transaction
//! reserves lives in a single `{prefix}:txn:{ID}` namespace and all of them are
//! claimed in one atomic write together with the user index entry, a Lua script
//! on Redis or a single write-locked insert in memory.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use redis::{aio::ConnectionManager, AsyncCommands, Script};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::payments::Transaction;
use crate::shared::error::{AppError, AppResult};

/// KEYS: reserved transaction keys then the user index.
/// ARGV: serialized transaction, index score, index member.
const RESERVE_LUA: &str = r"
local index = KEYS[#KEYS]
for i = 1, #KEYS - 1 do
  if redis.call('EXISTS', KEYS[i]) == 1 then return 0 end
end
for i = 1, #KEYS - 1 do
  redis.call('SET', KEYS[i], ARGV[1])
end
redis.call('ZADD', index, ARGV[2], ARGV[3])
return 1
";

/// Compare-and-set over every reserved key. KEYS[1] is the key the caller read.
/// ARGV: the value read, the replacement. Returns whatever is stored afterwards.
const SET_DOWNLOAD_URL_LUA: &str = r"
local current = redis.call('GET', KEYS[1])
if current ~= ARGV[1] then return current end
for i = 1, #KEYS do
  redis.call('SET', KEYS[i], ARGV[2], 'XX')
end
return ARGV[2]
";

/// Rounds of the download URL compare-and-set before giving up
const DOWNLOAD_URL_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Default)]
struct MemoryGrants {
    /// Canonical identifier -> transaction, one entry per reserved key
    transactions: HashMap<String, Transaction>,
    /// User -> canonical claimed ids, in commit order
    user_transactions: HashMap<String, Vec<String>>,
    buyers: HashMap<String, BTreeSet<String>>,
    purchases: HashMap<String, BTreeSet<String>>,
}

#[derive(Clone)]
pub struct PurchaseGrantStore {
    redis: Option<Arc<ConnectionManager>>, // optional; in-memory only if None
    key_prefix: String,
    memory: Arc<RwLock<MemoryGrants>>,
}

impl PurchaseGrantStore {
    pub fn new(redis: Option<Arc<ConnectionManager>>, key_prefix: impl Into<String>) -> Self {
        Self {
            redis,
            key_prefix: key_prefix.into(),
            memory: Arc::new(RwLock::new(MemoryGrants::default())),
        }
    }

    /// In-process store, used when no Redis URL is configured
    pub fn in_memory() -> Self {
        Self::new(None, "walletpay")
    }

    /// Whether grants survive a restart
    pub fn is_persistent(&self) -> bool {
        self.redis.is_some()
    }

    fn txn_key(&self, canonical: &str) -> String {
        format!("{}:txn:{}", self.key_prefix, canonical)
    }

    fn user_transactions_key(&self, user_id: &str) -> String {
        format!("{}:user:{}:transactions", self.key_prefix, user_id)
    }

    fn purchases_key(&self, user_id: &str) -> String {
        format!("{}:user:{}:purchases", self.key_prefix, user_id)
    }

    fn buyers_key(&self, product_id: &str) -> String {
        format!("{}:product:{}:buyers", self.key_prefix, product_id)
    }

    /// Persist a verified transaction, reserving every identifier it consumes.
    ///
    /// Returns `AppError::Conflict` when any of those identifiers is already taken.
    pub async fn create_verified_transaction(&self, tx: &Transaction) -> AppResult<Transaction> {
        let keys = tx.reserved_keys();

        if let Some(redis) = &self.redis {
            let serialized = serde_json::to_string(tx)
                .map_err(|e| AppError::Internal(format!("serialize transaction: {}", e)))?;

            let script = Script::new(RESERVE_LUA);
            let mut invocation = script.prepare_invoke();
            for key in &keys {
                invocation.key(self.txn_key(key));
            }
            invocation
                .key(self.user_transactions_key(&tx.user))
                .arg(serialized)
                .arg(tx.verified_at.timestamp_millis())
                .arg(Transaction::canonical_key(&tx.txn_id));

            let mut conn = (**redis).clone();
            let reserved: i64 = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(|e| AppError::Storage(format!("redis reserve transaction: {}", e)))?;
            if reserved == 0 {
                return Err(AppError::Conflict(format!("transaction id {} already used", tx.txn_id)));
            }
        } else {
            let mut memory = self.memory.write().await;
            if keys.iter().any(|k| memory.transactions.contains_key(k)) {
                return Err(AppError::Conflict(format!("transaction id {} already used", tx.txn_id)));
            }
            for key in &keys {
                memory.transactions.insert(key.clone(), tx.clone());
            }
            memory
                .user_transactions
                .entry(tx.user.clone())
                .or_default()
                .push(Transaction::canonical_key(&tx.txn_id));
        }

        debug!(txn_id = %tx.txn_id, reserved = keys.len(), "Verified transaction stored");
        Ok(tx.clone())
    }

    /// Look up a transaction by any identifier it reserved
    pub async fn find_by_txn_id(&self, txn_id: &str) -> AppResult<Option<Transaction>> {
        let canonical = Transaction::canonical_key(txn_id);
        if canonical.is_empty() {
            return Ok(None);
        }

        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let data: Option<String> = conn
                .get(self.txn_key(&canonical))
                .await
                .map_err(|e| AppError::Storage(format!("redis get: {}", e)))?;
            return data.as_deref().map(parse_transaction).transpose();
        }

        Ok(self.memory.read().await.transactions.get(&canonical).cloned())
    }

    /// Add a user to a product's buyer set; repeated calls are no-ops
    pub async fn add_buyer(&self, product_id: &str, user_id: &str) -> AppResult<()> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let _: () = conn
                .sadd(self.buyers_key(product_id), user_id)
                .await
                .map_err(|e| AppError::Storage(format!("redis sadd: {}", e)))?;
            return Ok(());
        }

        self.memory
            .write()
            .await
            .buyers
            .entry(product_id.to_string())
            .or_default()
            .insert(user_id.to_string());
        Ok(())
    }

    /// Record a transaction in a user's purchases; repeated calls are no-ops
    pub async fn add_purchase(&self, user_id: &str, transaction_id: Uuid) -> AppResult<()> {
        let member = transaction_id.to_string();
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let _: () = conn
                .sadd(self.purchases_key(user_id), member)
                .await
                .map_err(|e| AppError::Storage(format!("redis sadd: {}", e)))?;
            return Ok(());
        }

        self.memory
            .write()
            .await
            .purchases
            .entry(user_id.to_string())
            .or_default()
            .insert(member);
        Ok(())
    }

    /// Backfill the download URL. An existing URL is kept and returned.
    pub async fn set_download_url(&self, txn_id: &str, url: &str) -> AppResult<Transaction> {
        let canonical = Transaction::canonical_key(txn_id);

        if let Some(redis) = &self.redis {
            let script = Script::new(SET_DOWNLOAD_URL_LUA);
            let mut conn = (**redis).clone();
            for _ in 0..DOWNLOAD_URL_CAS_ATTEMPTS {
                let current: Option<String> = conn
                    .get(self.txn_key(&canonical))
                    .await
                    .map_err(|e| AppError::Storage(format!("redis get: {}", e)))?;
                let current = current.ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", txn_id)))?;
                let mut tx = parse_transaction(&current)?;
                if tx.download_url.is_some() {
                    return Ok(tx);
                }

                tx.download_url = Some(url.to_string());
                let replacement = serde_json::to_string(&tx)
                    .map_err(|e| AppError::Internal(format!("serialize transaction: {}", e)))?;
                let mut invocation = script.prepare_invoke();
                for key in self.download_url_keys(&canonical, &tx) {
                    invocation.key(key);
                }
                invocation.arg(current).arg(replacement);

                let stored: Option<String> = invocation
                    .invoke_async(&mut conn)
                    .await
                    .map_err(|e| AppError::Storage(format!("redis set download url: {}", e)))?;
                let stored = stored.ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", txn_id)))?;
                let stored = parse_transaction(&stored)?;
                if stored.download_url.is_some() {
                    return Ok(stored);
                }
                debug!(txn_id = %txn_id, "Transaction changed during download URL assignment, retrying");
            }
            return Err(AppError::Storage(format!("download URL for {} kept changing", txn_id)));
        }

        let mut memory = self.memory.write().await;
        let mut tx = memory
            .transactions
            .get(&canonical)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", txn_id)))?;
        if tx.download_url.is_some() {
            return Ok(tx);
        }
        tx.download_url = Some(url.to_string());
        for key in tx.reserved_keys() {
            memory.transactions.insert(key, tx.clone());
        }
        Ok(tx)
    }

    /// Every reserved key of `tx`, starting with the one looked up by `canonical`
    fn download_url_keys(&self, canonical: &str, tx: &Transaction) -> Vec<String> {
        let mut keys = vec![self.txn_key(canonical)];
        keys.extend(
            tx.reserved_keys()
                .into_iter()
                .filter(|key| key != canonical)
                .map(|key| self.txn_key(&key)),
        );
        keys
    }

    /// A user's verified transactions, newest first
    pub async fn transactions_for_user(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        let ids: Vec<String> = if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            conn.zrevrange(self.user_transactions_key(user_id), 0, -1)
                .await
                .map_err(|e| AppError::Storage(format!("redis zrevrange: {}", e)))?
        } else {
            let memory = self.memory.read().await;
            memory
                .user_transactions
                .get(user_id)
                .map(|ids| ids.iter().rev().cloned().collect())
                .unwrap_or_default()
        };

        let mut transactions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.find_by_txn_id(&id).await? {
                Some(tx) => transactions.push(tx),
                None => warn!(txn_id = %id, user_id = %user_id, "User index references a missing transaction"),
            }
        }
        transactions.sort_by(|a, b| b.verified_at.cmp(&a.verified_at));
        Ok(transactions)
    }

    /// User ids that bought a product
    pub async fn buyers(&self, product_id: &str) -> AppResult<Vec<String>> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let mut members: Vec<String> = conn
                .smembers(self.buyers_key(product_id))
                .await
                .map_err(|e| AppError::Storage(format!("redis smembers: {}", e)))?;
            members.sort();
            return Ok(members);
        }
        let memory = self.memory.read().await;
        Ok(memory.buyers.get(product_id).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    /// Transaction ids a user has been granted
    pub async fn purchases(&self, user_id: &str) -> AppResult<Vec<String>> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let mut members: Vec<String> = conn
                .smembers(self.purchases_key(user_id))
                .await
                .map_err(|e| AppError::Storage(format!("redis smembers: {}", e)))?;
            members.sort();
            return Ok(members);
        }
        let memory = self.memory.read().await;
        Ok(memory.purchases.get(user_id).map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }

    /// Round-trip to the backing store
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(redis) = &self.redis {
            let mut conn = (**redis).clone();
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| AppError::Storage(format!("redis ping: {}", e)))?;
        }
        Ok(())
    }
}

fn parse_transaction(json: &str) -> AppResult<Transaction> {
    serde_json::from_str(json).map_err(|e| AppError::Internal(format!("deserialize transaction: {}", e)))
}
