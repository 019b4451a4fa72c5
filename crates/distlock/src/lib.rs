//! Redis-backed hierarchical distributed locks with owner-checked release.
//!
//! Every lock is `SET key token NX PX ttl` — acquired only if absent, sealed
//! with a random owner token so a slow holder can't have its lock stolen out
//! from under it by a later acquirer, and can't accidentally release a lock
//! it no longer holds. Release and renew run as single Redis `EVAL` scripts
//! so the check-then-act is atomic across the network hop.
use rand::Rng;
use rand::SeedableRng;
use rbp_core::TableId;
use rbp_core::TournamentId;
use rbp_core::UserId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Script;
use std::time::Duration;
use tokio::time::sleep;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const RENEW_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("timed out acquiring lock {0}")]
    LockTimeout(String),
    #[error("lock {0} is not held by this owner")]
    LockNotHeld(String),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

/// A key in the `lock:` hierarchy. Ordering is by the rendered key string,
/// which is what makes sorted multi-lock acquisition deadlock-free.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockKey(String);

impl LockKey {
    pub fn tournament(id: TournamentId) -> Self {
        Self(format!("lock:tournament:{id}"))
    }
    pub fn tables(tournament: TournamentId) -> Self {
        Self(format!("lock:tournament:{tournament}:tables"))
    }
    pub fn table(id: TableId) -> Self {
        Self(format!("lock:table:{id}"))
    }
    pub fn player(id: UserId) -> Self {
        Self(format!("lock:player:{id}"))
    }
    pub fn ranking(tournament: TournamentId) -> Self {
        Self(format!("lock:tournament:{tournament}:ranking"))
    }
    pub fn blind(tournament: TournamentId) -> Self {
        Self(format!("lock:tournament:{tournament}:blind"))
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A held lock. Dropping this without calling `release` leaves the key to
/// expire naturally at its TTL — never panics or blocks in `Drop`.
pub struct Lock {
    key: LockKey,
    token: String,
    ttl: Duration,
}

impl Lock {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LockConfig {
    pub retry_interval: Duration,
    pub acquire_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(50),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

fn random_token() -> String {
    let mut rng = rand::rngs::SmallRng::from_os_rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Clone)]
pub struct DistLockManager {
    conn: ConnectionManager,
    config: LockConfig,
}

impl DistLockManager {
    pub fn new(conn: ConnectionManager) -> Self {
        Self::with_config(conn, LockConfig::default())
    }

    pub fn with_config(conn: ConnectionManager, config: LockConfig) -> Self {
        Self { conn, config }
    }

    /// Spins at `retry_interval` until the key is free or `acquire_timeout`
    /// elapses.
    pub async fn acquire(&mut self, key: LockKey, ttl: Duration) -> Result<Lock, LockError> {
        let token = random_token();
        let deadline = tokio::time::Instant::now() + self.config.acquire_timeout;
        loop {
            let acquired: Option<String> = self
                .conn
                .set_options(
                    key.as_str(),
                    token.as_str(),
                    redis::SetOptions::default()
                        .conditional_set(redis::ExistenceCheck::NX)
                        .with_expiration(redis::SetExpiry::PX(ttl.as_millis() as u64)),
                )
                .await?;
            if acquired.is_some() {
                return Ok(Lock { key, token, ttl });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LockError::LockTimeout(key.0));
            }
            sleep(self.config.retry_interval).await;
        }
    }

    /// Releases the lock if — and only if — this manager's token still owns
    /// it. A lock lost to expiry or stolen by another process is a no-op.
    pub async fn release(&mut self, lock: Lock) -> Result<(), LockError> {
        let released: i64 = Script::new(RELEASE_SCRIPT)
            .key(lock.key.as_str())
            .arg(&lock.token)
            .invoke_async(&mut self.conn)
            .await?;
        if released == 0 {
            return Err(LockError::LockNotHeld(lock.key.0));
        }
        Ok(())
    }

    /// Extends a held lock's TTL. Should be called at roughly TTL/3
    /// intervals for operations that outlive a single lock lifetime.
    pub async fn renew(&mut self, lock: &Lock) -> Result<(), LockError> {
        let renewed: i64 = Script::new(RENEW_SCRIPT)
            .key(lock.key.as_str())
            .arg(&lock.token)
            .arg(lock.ttl.as_millis() as u64)
            .invoke_async(&mut self.conn)
            .await?;
        if renewed == 0 {
            return Err(LockError::LockNotHeld(lock.key.0.clone()));
        }
        Ok(())
    }

    /// Acquires several locks in sorted key order and releases them in
    /// reverse — a fixed global order across all callers rules out
    /// circular-wait deadlocks between processes locking overlapping sets.
    pub async fn acquire_many(
        &mut self,
        mut keys: Vec<LockKey>,
        ttl: Duration,
    ) -> Result<Vec<Lock>, LockError> {
        keys.sort();
        let mut held = Vec::with_capacity(keys.len());
        for key in keys {
            match self.acquire(key, ttl).await {
                Ok(lock) => held.push(lock),
                Err(err) => {
                    for lock in held.into_iter().rev() {
                        let _ = self.release(lock).await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(held)
    }

    pub async fn release_many(&mut self, locks: Vec<Lock>) -> Result<(), LockError> {
        for lock in locks.into_iter().rev() {
            self.release(lock).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_keys_follow_the_hierarchy_convention() {
        let id = TournamentId::default();
        assert_eq!(LockKey::tournament(id).as_str(), format!("lock:tournament:{id}"));
        assert_eq!(
            LockKey::ranking(id).as_str(),
            format!("lock:tournament:{id}:ranking")
        );
    }

    #[test]
    fn sorting_lock_keys_gives_a_total_order() {
        let a = LockKey::tournament(TournamentId::default());
        let b = LockKey::tournament(TournamentId::default());
        let mut keys = vec![b.clone(), a.clone()];
        keys.sort();
        assert!(keys[0].as_str() <= keys[1].as_str());
    }
}
