//! Unified Poker Platform Server Binary
//!
//! Boots every long-lived supervised task the core depends on: the
//! cash-table game loop and its bot orchestrator, the WebSocket gateway,
//! the fraud event consumer, and the tournament engine's blind/balancing
//! ticks. Runs on BIND_ADDR (e.g. 0.0.0.0:8888).
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::web;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use rbp_core::Chips;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::TournamentId;
use rbp_distlock::DistLockManager;
use rbp_engine::Table;
use rbp_fraud::auto_ban::AutoBanConfig;
use rbp_fraud::auto_ban::AutoBanService;
use rbp_fraud::auto_ban::BanService;
use rbp_fraud::auto_ban::LoggingAuditLogger;
use rbp_fraud::auto_ban::LoggingNotifier;
use rbp_fraud::FraudEventConsumer;
use rbp_gameroom::BotOrchestrator;
use rbp_gameroom::BotTableOps;
use rbp_gameroom::GameLoop;
use rbp_gameroom::GameLoopConfig;
use rbp_gameroom::OrchestratorConfig;
use rbp_gameroom::Strategy;
use rbp_gameroom::TableMatcher;
use rbp_gateway::Casino;
use rbp_gateway::GatewayBroadcaster;
use rbp_gateway::HeartbeatConfig;
use rbp_gateway::Registry;
use rbp_tournament::engine::HandLifecycle;
use rbp_tournament::engine::TournamentEventPublisher;
use rbp_tournament::models::TournamentEvent;
use rbp_tournament::RankingEngine;
use rbp_tournament::SnapshotManager;
use rbp_tournament::TournamentEngine;
use std::sync::Arc;
use std::time::Duration;

async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// Logs every ban and notification rather than calling out to the admin
/// REST layer or Telegram — both explicit non-goals of this core. A real
/// deployment swaps these for adapters into those services.
struct LoggingBanService;
impl BanService for LoggingBanService {
    fn apply_temporary_ban(&self, user_id: rbp_core::UserId, reason: &str, duration: Duration) {
        log::warn!("[auto-ban] temp-banning {user_id} for {duration:?}: {reason}");
    }
}

/// Publishes tournament lifecycle events as structured log lines. A real
/// deployment fans these into the gateway's `tournament:{id}` channel;
/// that wiring needs the gateway's `Registry`, which this crate
/// deliberately doesn't depend on to keep the dependency graph acyclic.
struct LoggingEventPublisher;
#[async_trait::async_trait]
impl TournamentEventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: TournamentEvent) {
        log::info!("[tournament] {event:?}");
    }
}

/// Bridges a tournament's per-table hand scheduling back into the cash
/// game loop: starting a tournament table's hand is the same
/// `GameLoop::try_start_game` call a cash table uses.
struct GameLoopHandLifecycle {
    game_loop: Arc<GameLoop<GatewayBroadcaster>>,
}
#[async_trait::async_trait]
impl HandLifecycle for GameLoopHandLifecycle {
    async fn start_hand(&self, tournament_id: TournamentId, table_id: TableId) {
        log::debug!("[tournament {tournament_id}] starting hand at table {table_id}");
        self.game_loop.try_start_game(table_id).await;
    }
}

/// A single always-open demo cash table the bot orchestrator keeps
/// populated. Lobby-driven table/seat selection across many concurrent
/// tables is explicitly out of scope for the orchestrator (§4.E) — a real
/// deployment's matcher looks at live occupancy and stakes instead.
struct DemoTableMatcher {
    table_id: TableId,
    max_seats: usize,
    buy_in: Chips,
    game_loop: Arc<GameLoop<GatewayBroadcaster>>,
}
#[async_trait::async_trait]
impl TableMatcher for DemoTableMatcher {
    async fn find_seat(&self) -> Option<(TableId, Position, Chips)> {
        let occupied = self.game_loop.occupied_seats(self.table_id).await?;
        (0..self.max_seats).find(|s| !occupied.contains(s)).map(|seat| (self.table_id, seat, self.buy_in))
    }
}

struct GameLoopBotOps {
    game_loop: Arc<GameLoop<GatewayBroadcaster>>,
}
#[async_trait::async_trait]
impl BotTableOps for GameLoopBotOps {
    async fn seat_bot(
        &self,
        table_id: TableId,
        seat: Position,
        user_id: rbp_core::UserId,
        stack: Chips,
        strategy: Box<dyn Strategy>,
    ) -> bool {
        self.game_loop.seat_bot(table_id, seat, user_id, stack, strategy).await.is_ok()
    }
    async fn remove_bot(&self, table_id: TableId, seat: Position) {
        self.game_loop.remove_bot(table_id, seat).await;
    }
    async fn try_start_game(&self, table_id: TableId) {
        self.game_loop.try_start_game(table_id).await;
    }
    async fn is_table_idle(&self, table_id: TableId) -> bool {
        self.game_loop.is_table_idle(table_id).await
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    rbp_core::log();
    rbp_core::kys();
    rbp_core::brb();

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let redis_client = redis::Client::open(redis_url.clone())?;
    let conn = redis_client.get_connection_manager().await?;
    let hmac_key = std::env::var("CHIP_INTEGRITY_KEY").unwrap_or_else(|_| "dev-only-insecure-key".into());

    let registry = Arc::new(Registry::new());
    let broadcaster = GatewayBroadcaster::new(registry.clone());
    let game_loop = Arc::new(GameLoop::new(broadcaster, GameLoopConfig::default(), hmac_key.clone()));

    let demo_table_id = TableId::default();
    game_loop.register_table(demo_table_id, Table::new(9, 10, 20, 0)).await;

    let casino = Arc::new(Casino::new(registry.clone(), game_loop.clone()));

    // Heartbeat + turn-timeout tickers (§4.F, §4.D).
    {
        let registry = registry.clone();
        tokio::spawn(async move {
            let config = HeartbeatConfig::default();
            loop {
                tokio::time::sleep(config.interval).await;
                rbp_gateway::run_once(&registry, &config).await;
                if rbp_core::interrupted() {
                    break;
                }
            }
        });
    }
    {
        let game_loop = game_loop.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                game_loop.expire_timed_out_turns().await;
                if rbp_core::interrupted() {
                    break;
                }
            }
        });
    }

    // Bot orchestrator control loop (§4.E).
    {
        let matcher = DemoTableMatcher {
            table_id: demo_table_id,
            max_seats: 9,
            buy_in: 1_000,
            game_loop: game_loop.clone(),
        };
        let ops = GameLoopBotOps { game_loop: game_loop.clone() };
        let target = std::env::var("LIVEBOT_TARGET_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(0);
        let orchestrator = Arc::new(tokio::sync::Mutex::new(BotOrchestrator::new(
            matcher,
            ops,
            OrchestratorConfig { target_bot_count: target, ..OrchestratorConfig::default() },
        )));
        tokio::spawn(async move {
            loop {
                orchestrator.lock().await.tick().await;
                tokio::time::sleep(Duration::from_secs(3)).await;
                if rbp_core::interrupted() {
                    break;
                }
            }
        });
    }

    // Fraud event consumer (§4.G).
    {
        let redis_client = redis_client.clone();
        tokio::spawn(async move {
            let auto_ban = AutoBanService::new(AutoBanConfig::default(), LoggingBanService, LoggingNotifier, LoggingAuditLogger);
            let mut consumer = FraudEventConsumer::new(auto_ban);
            consumer.run(&redis_client).await;
        });
    }

    // Tournament engine background ticks (§4.I).
    {
        let locks = DistLockManager::new(conn.clone());
        let ranking = RankingEngine::new(conn.clone());
        let snapshot = SnapshotManager::new(conn.clone(), hmac_key.clone());
        let hand_lifecycle = GameLoopHandLifecycle { game_loop: game_loop.clone() };
        let engine = Arc::new(TournamentEngine::new(locks, LoggingEventPublisher, hand_lifecycle, ranking, snapshot));
        tokio::spawn(engine.clone().run_blind_level_loop());
        tokio::spawn(engine.clone().run_balancing_loop());
    }

    log::info!("starting poker platform server");
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8888".into());
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
            .app_data(web::Data::new(casino.clone()))
            .route("/health", web::get().to(health))
            .service(web::scope("/ws").route("/table/{table_id}", web::get().to(rbp_gateway::table_ws)))
    })
    .bind(bind_addr)?
    .run()
    .await?;
    Ok(())
}
