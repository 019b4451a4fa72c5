//! Core type aliases, traits, and constants for the poker platform.
//!
//! This crate provides the foundational types shared by every other crate
//! in the workspace: chip/position/identifier types, the `ID<T>` and
//! `Unique` traits used to give domain entities type-safe identity, and the
//! process-wide runtime helpers (`log`, `kys`, `brb`) used by the server
//! binary.
#![allow(dead_code)]

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Chip amounts. Negative values never occur but the signed width avoids
/// overflow surprises when computing differences (e.g. refunds, discrepancies).
pub type Chips = i64;
/// Seat index around a table (0-based, clockwise from the adapter's
/// positional origin — see `rbp_engine`'s seat-to-index mapping).
pub type Position = usize;
/// Monotonic hand counter within a table's lifetime.
pub type HandNumber = u64;
/// Monotonic per-channel event version, used by the gateway's recovery protocol.
pub type Version = u64;

/// Marker type for [`ID<User>`] — a registered player, human or bot.
pub struct User;
/// A player's identity, stable across tables, hands, and tournaments.
pub type UserId = ID<User>;

/// Marker type for [`ID<Table>`] — a cash table or a tournament's table.
pub struct Table;
/// A table's identity, referenced by the game loop, gateway channels, and
/// the chip integrity service.
pub type TableId = ID<Table>;

/// Marker type for [`ID<Tournament>`].
pub struct Tournament;
pub type TournamentId = ID<Tournament>;

// ============================================================================
// TRAITS
// ============================================================================
/// Random instance generation, used by tests and bot strategies that need a
/// quick arbitrary value (e.g. a random table size or a shuffled seat order).
pub trait Arbitrary {
    fn random() -> Self;
}

/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over `uuid::Uuid`.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Casts `ID<T>` to `ID<U>` while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> std::str::FromStr for ID<T> {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            inner: s.parse()?,
            marker: PhantomData,
        })
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self {
            inner: uuid::Uuid::deserialize(deserializer)?,
            marker: PhantomData,
        })
    }
}

// ============================================================================
// TABLE PARAMETERS
// ============================================================================
/// Supported table sizes (§4.B clockwise ordering is only defined for these).
pub const TABLE_SIZES: [usize; 2] = [6, 9];
/// Default starting stack, in chips, for a freshly-seated cash-table player.
pub const DEFAULT_STACK: Chips = 100 * 100;
/// Timeout for voluntary card reveal at showdown (seconds).
pub const SHOWDOWN_TIMEOUT: u64 = 5;
/// Minutes a table may sit empty before the game manager evicts it.
pub const TABLE_EVICTION_MINUTES: u64 = 30;
/// How many recent hands of action-log history a table retains in memory.
pub const HAND_HISTORY_LIMIT: usize = 10;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initializes dual logging (terminal + file) with a timestamped log file.
/// Creates a `logs/` directory and writes DEBUG level to file, INFO to terminal.
#[cfg(feature = "server")]
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Registers a Ctrl+C handler for immediate (non-graceful) termination.
#[cfg(feature = "server")]
pub fn kys() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("violent interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

/// Global interrupt flag for graceful shutdown coordination.
#[cfg(feature = "server")]
static INTERRUPTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Checks whether graceful shutdown was requested.
#[cfg(feature = "server")]
pub fn interrupted() -> bool {
    INTERRUPTED.load(std::sync::atomic::Ordering::Relaxed)
}
#[cfg(not(feature = "server"))]
pub fn interrupted() -> bool {
    false
}

/// Registers a graceful interrupt handler: a second Ctrl+C (beyond `kys`'s
/// hard-exit path) flips the flag every long-lived task polls between
/// iterations, so tables can save state and locks can be released before
/// the process exits.
#[cfg(feature = "server")]
pub fn brb() {
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("graceful interrupt requested, finishing current batch...");
                INTERRUPTED.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    struct Foo;
    struct Bar;
    #[test]
    fn id_cast_preserves_uuid() {
        let id: ID<Foo> = ID::default();
        let uuid = id.inner();
        let cast: ID<Bar> = id.cast();
        assert_eq!(cast.inner(), uuid);
    }
    #[test]
    fn id_default_is_unique() {
        let a: ID<Foo> = ID::default();
        let b: ID<Foo> = ID::default();
        assert_ne!(a, b);
    }
    #[test]
    fn id_ordering_matches_uuid_ordering() {
        let a: ID<Foo> = ID::default();
        let b: ID<Foo> = ID::default();
        assert_eq!(a.cmp(&b), a.inner().cmp(&b.inner()));
    }
}
