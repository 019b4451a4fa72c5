//! Fraud event consumer: chip-dumping, bot-behavior, and session-anomaly
//! detectors fed by Redis Pub/Sub, gated behind an auto-ban decision layer.
//!
//! Every detector here is a defense-in-depth signal, not a game-integrity
//! gate — flags feed [`auto_ban::AutoBanService`], which decides whether a
//! pattern of detections crosses into a temporary ban. The actual ban
//! enforcement and admin notification are delegated to the
//! [`auto_ban::BanService`]/[`auto_ban::Notifier`] traits the caller
//! supplies, so this crate never talks to a database or a bans table
//! directly.
pub mod auto_ban;
pub mod bot_detector;
pub mod chip_dumping;
pub mod consumer;
pub mod events;
pub mod session;

pub use auto_ban::AutoBanConfig;
pub use auto_ban::AutoBanService;
pub use auto_ban::BanService;
pub use auto_ban::DetectionType;
pub use auto_ban::Notifier;
pub use bot_detector::BotDetector;
pub use chip_dumping::ChipDumpingDetector;
pub use consumer::FraudEventConsumer;
pub use events::HandCompletedEvent;
pub use events::PlayerActionEvent;
pub use events::PlayerStatsEvent;
