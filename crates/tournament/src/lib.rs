//! Tournament lifecycle: immutable state model, table balancing, ranking,
//! blind scheduling, snapshotting, and settlement — built around a single
//! [`models::TournamentState`] value per tournament, mutated under a
//! distributed lock and replaced atomically on every transition.
pub mod balancer;
pub mod blinds;
pub mod engine;
pub mod models;
pub mod ranking;
pub mod settlement;
pub mod snapshot;

pub use balancer::BalancingPlan;
pub use balancer::BalancingPriority;
pub use balancer::PlayerMove;
pub use balancer::TableBalancer;
pub use blinds::BlindScheduler;
pub use engine::TournamentEngine;
pub use models::TournamentConfig;
pub use models::TournamentPlayer;
pub use models::TournamentState;
pub use models::TournamentStatus;
pub use models::TournamentTable;
pub use ranking::RankingEngine;
pub use settlement::SettlementEngine;
pub use snapshot::SnapshotManager;
