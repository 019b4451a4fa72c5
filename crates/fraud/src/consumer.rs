use crate::auto_ban::AuditLogger;
use crate::auto_ban::AutoBanService;
use crate::auto_ban::BanService;
use crate::auto_ban::DetectionType;
use crate::auto_ban::Notifier;
use crate::auto_ban::Severity as BanSeverity;
use crate::bot_detector::BotDetector;
use crate::bot_detector::Severity as BotSeverity;
use crate::chip_dumping::ChipDumpingDetector;
use crate::events::HandCompletedEvent;
use crate::events::PlayerActionEvent;
use crate::events::PlayerStatsEvent;
use crate::session;
use futures_util::StreamExt;

pub const CHANNEL_HAND_COMPLETED: &str = "fraud:hand_completed";
pub const CHANNEL_PLAYER_ACTION: &str = "fraud:player_action";
pub const CHANNEL_PLAYER_STATS: &str = "fraud:player_stats";

fn bot_to_ban_severity(severity: BotSeverity) -> BanSeverity {
    match severity {
        BotSeverity::Low => BanSeverity::Low,
        BotSeverity::Medium => BanSeverity::Medium,
        BotSeverity::High => BanSeverity::High,
    }
}

/// Subscribes to the three fraud channels and routes each message to the
/// detector that owns it. A failure processing one message is logged and
/// the loop keeps going — one malformed event must never stop the pipeline.
pub struct FraudEventConsumer<B: BanService, N: Notifier, A: AuditLogger> {
    chip_dumping: ChipDumpingDetector,
    bot_detector: BotDetector,
    auto_ban: AutoBanService<B, N, A>,
}

impl<B: BanService, N: Notifier, A: AuditLogger> FraudEventConsumer<B, N, A> {
    pub fn new(auto_ban: AutoBanService<B, N, A>) -> Self {
        Self {
            chip_dumping: ChipDumpingDetector::new(),
            bot_detector: BotDetector::new(),
            auto_ban,
        }
    }

    /// Subscribes and processes messages forever (or until the connection
    /// drops). Intended to run as a background task; callers wrap it in
    /// `tokio::spawn` and decide their own restart policy.
    pub async fn run(&mut self, client: &redis::Client) {
        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(err) => {
                log::error!("fraud consumer failed to open pubsub connection: {err}");
                return;
            }
        };
        if let Err(err) = pubsub
            .subscribe(&[CHANNEL_HAND_COMPLETED, CHANNEL_PLAYER_ACTION, CHANNEL_PLAYER_STATS])
            .await
        {
            log::error!("fraud consumer failed to subscribe: {err}");
            return;
        }
        log::info!("fraud consumer subscribed to {CHANNEL_HAND_COMPLETED}, {CHANNEL_PLAYER_ACTION}, {CHANNEL_PLAYER_STATS}");

        let mut stream = pubsub.on_message();
        loop {
            let Some(msg) = stream.next().await else {
                log::warn!("fraud consumer pubsub stream ended");
                return;
            };
            let channel = msg.get_channel_name().to_string();
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(err) => {
                    log::error!("fraud consumer failed to read payload on {channel}: {err}");
                    continue;
                }
            };
            self.handle_message(&channel, &payload);
        }
    }

    fn handle_message(&mut self, channel: &str, payload: &str) {
        match channel {
            CHANNEL_HAND_COMPLETED => match serde_json::from_str::<HandCompletedEvent>(payload) {
                Ok(event) => self.handle_hand_completed(event),
                Err(err) => log::error!("failed to parse hand_completed event: {err}"),
            },
            CHANNEL_PLAYER_ACTION => match serde_json::from_str::<PlayerActionEvent>(payload) {
                Ok(event) => self.handle_player_action(event),
                Err(err) => log::error!("failed to parse player_action event: {err}"),
            },
            CHANNEL_PLAYER_STATS => match serde_json::from_str::<PlayerStatsEvent>(payload) {
                Ok(event) => self.handle_player_stats(event),
                Err(err) => log::error!("failed to parse player_stats event: {err}"),
            },
            other => log::warn!("fraud consumer received unknown channel: {other}"),
        }
    }

    fn handle_hand_completed(&mut self, event: HandCompletedEvent) {
        if event.participants.len() < 2 {
            return;
        }
        for pair in event.participants.windows(2) {
            let (a, b) = (pair[0].user_id, pair[1].user_id);
            let winner = if pair[0].net >= pair[1].net { a } else { b };
            if let Some(suspicion) = self.chip_dumping.record_result(a, b, winner) {
                log::warn!(
                    "chip dumping suspected: winner={} loser={} win_rate={:.2} hands={}",
                    suspicion.winner,
                    suspicion.loser,
                    suspicion.win_rate,
                    suspicion.hands
                );
                let severity = if suspicion.win_rate >= 0.95 {
                    BanSeverity::High
                } else {
                    BanSeverity::Medium
                };
                self.auto_ban.process_detection(
                    suspicion.winner,
                    DetectionType::ChipDumping,
                    severity,
                    vec![format!("one_way_chip_flow ({:.0}%)", suspicion.win_rate * 100.0)],
                );
            }
        }
    }

    fn handle_player_action(&mut self, event: PlayerActionEvent) {
        let user_id = event.user_id;
        if let Some(suspicion) = self.bot_detector.record_action(event) {
            log::warn!(
                "bot behavior suspected: user={user_id} score={} reasons={:?}",
                suspicion.suspicion_score,
                suspicion.reasons
            );
            self.auto_ban.process_detection(
                user_id,
                DetectionType::BotDetection,
                bot_to_ban_severity(suspicion.severity),
                suspicion.reasons.into_iter().map(str::to_string).collect(),
            );
        }
    }

    fn handle_player_stats(&mut self, event: PlayerStatsEvent) {
        let user_id = event.user_id;
        if let Some(anomaly) = session::analyze_session(&event) {
            log::warn!("session anomaly suspected: user={user_id} reasons={:?}", anomaly.reasons);
            let severity = if anomaly.reasons.len() >= 2 {
                BanSeverity::High
            } else {
                BanSeverity::Medium
            };
            self.auto_ban.process_detection(
                user_id,
                DetectionType::AnomalyDetection,
                severity,
                anomaly.reasons.into_iter().map(str::to_string).collect(),
            );
        }
    }
}
