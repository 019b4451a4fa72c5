//! Prize settlement: final ranking, ITM cutoff, payout-structure percentages,
//! and automatic payout through a caller-supplied wallet transfer seam —
//! this crate never talks to a ledger directly.
use crate::models::TournamentPlayer;
use crate::models::TournamentState;
use rbp_core::Chips;
use rbp_core::UserId;

#[derive(Debug, Clone)]
pub struct PayoutResult {
    pub user_id: UserId,
    pub nickname: String,
    pub rank: usize,
    pub prize_amount: Chips,
    pub prize_percentage: f64,
    pub transaction_id: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SettlementSummary {
    pub tournament_name: String,
    pub total_prize_pool: Chips,
    pub total_paid: Chips,
    pub successful_payouts: usize,
    pub failed_payouts: usize,
    pub payouts: Vec<PayoutResult>,
}

#[derive(Debug)]
pub struct WalletError(pub String);

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for WalletError {}

#[async_trait::async_trait]
pub trait WalletTransfer: Send + Sync {
    async fn transfer_prize(&self, user_id: UserId, amount: Chips, description: &str) -> Result<String, WalletError>;
}

pub struct SettlementEngine<W: WalletTransfer> {
    wallet: W,
}

impl<W: WalletTransfer> SettlementEngine<W> {
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }

    pub fn calculate_itm_players(&self, state: &TournamentState) -> usize {
        let total_players = state.players.len();
        let itm_count = ((total_players as f64 * state.config.itm_percentage / 100.0).round() as usize).max(1);
        itm_count.min(state.config.payout_structure.len())
    }

    /// Rank 1 is the last surviving active player (highest chip count);
    /// everyone else ranks by reverse elimination order.
    pub fn final_ranking(&self, state: &TournamentState) -> Vec<TournamentPlayer> {
        let mut active: Vec<_> = state.players.values().filter(|p| p.is_active).cloned().collect();
        active.sort_by(|a, b| b.chip_count.cmp(&a.chip_count));

        let mut eliminated: Vec<_> = state.players.values().filter(|p| !p.is_active).cloned().collect();
        eliminated.sort_by_key(|p| p.elimination_rank.unwrap_or(usize::MAX));

        active.into_iter().chain(eliminated).collect()
    }

    pub fn calculate_payouts(&self, state: &TournamentState) -> Vec<(UserId, usize, Chips, f64)> {
        let prize_pool = state.total_prize_pool;
        let payout_structure = &state.config.payout_structure;
        let final_ranking = self.final_ranking(state);
        let itm_count = self.calculate_itm_players(state);

        final_ranking
            .into_iter()
            .enumerate()
            .filter_map(|(idx, player)| {
                let rank = idx + 1;
                if rank <= itm_count && rank <= payout_structure.len() {
                    let percentage = payout_structure[rank - 1];
                    let amount = (prize_pool as f64 * percentage) as Chips;
                    Some((player.user_id, rank, amount, percentage))
                } else {
                    None
                }
            })
            .collect()
    }

    pub async fn settle_tournament(&self, state: &TournamentState) -> SettlementSummary {
        log::info!("starting tournament settlement for {}", state.tournament_id);
        let mut summary = SettlementSummary {
            tournament_name: state.config.name.clone(),
            total_prize_pool: state.total_prize_pool,
            ..Default::default()
        };

        let payouts = self.calculate_payouts(state);
        if payouts.is_empty() {
            log::warn!("no payouts calculated for tournament {}", state.tournament_id);
            return summary;
        }

        let nicknames: std::collections::HashMap<UserId, String> =
            state.players.values().map(|p| (p.user_id, p.nickname.clone())).collect();

        for (user_id, rank, amount, percentage) in payouts {
            let nickname = nicknames.get(&user_id).cloned().unwrap_or_else(|| "Unknown".to_string());
            let mut result = PayoutResult {
                user_id,
                nickname,
                rank,
                prize_amount: amount,
                prize_percentage: percentage * 100.0,
                transaction_id: None,
                success: false,
                error_message: None,
            };

            if amount > 0 {
                let description = format!(
                    "Tournament Prize: {} - Rank #{rank} ({:.1}%)",
                    state.config.name,
                    percentage * 100.0
                );
                match self.wallet.transfer_prize(user_id, amount, &description).await {
                    Ok(tx_id) => {
                        result.transaction_id = Some(tx_id);
                        result.success = true;
                        summary.successful_payouts += 1;
                        summary.total_paid += amount;
                        log::info!("tournament prize paid: {user_id} rank={rank} amount={amount}");
                    }
                    Err(err) => {
                        result.error_message = Some(err.to_string());
                        summary.failed_payouts += 1;
                        log::error!("failed to pay tournament prize: {user_id} amount={amount} error={err}");
                    }
                }
            }
            summary.payouts.push(result);
        }

        log::info!(
            "tournament settlement complete for {}: total_paid={} successful={} failed={}",
            state.tournament_id,
            summary.total_paid,
            summary.successful_payouts,
            summary.failed_payouts
        );
        summary
    }

    pub async fn retry_failed_payouts(&self, summary: &mut SettlementSummary) {
        let failed: Vec<usize> = summary
            .payouts
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.success)
            .map(|(i, _)| i)
            .collect();
        if failed.is_empty() {
            return;
        }
        log::info!("retrying {} failed payouts", failed.len());

        for idx in failed {
            let (user_id, amount, rank) = {
                let p = &summary.payouts[idx];
                (p.user_id, p.prize_amount, p.rank)
            };
            if amount <= 0 {
                continue;
            }
            let description = format!("Tournament Prize (Retry): Rank #{rank}");
            match self.wallet.transfer_prize(user_id, amount, &description).await {
                Ok(tx_id) => {
                    let p = &mut summary.payouts[idx];
                    p.transaction_id = Some(tx_id);
                    p.success = true;
                    p.error_message = None;
                    summary.successful_payouts += 1;
                    summary.failed_payouts -= 1;
                    summary.total_paid += amount;
                    log::info!("retry successful: {user_id}");
                }
                Err(err) => {
                    summary.payouts[idx].error_message = Some(format!("retry failed: {err}"));
                    log::error!("retry failed for {user_id}: {err}");
                }
            }
        }
    }

    pub fn estimate_payouts(
        &self,
        config: &crate::models::TournamentConfig,
        player_count: usize,
    ) -> Vec<(usize, f64, Chips)> {
        let prize_pool = config.buy_in * player_count as Chips;
        let itm_count = ((player_count as f64 * config.itm_percentage / 100.0).round() as usize)
            .max(1)
            .min(config.payout_structure.len());

        (1..=itm_count)
            .filter_map(|rank| {
                config.payout_structure.get(rank - 1).map(|&percentage| {
                    let amount = (prize_pool as f64 * percentage) as Chips;
                    (rank, percentage * 100.0, amount)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TournamentConfig;
    use rbp_core::TournamentId;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingWallet {
        transfers: Mutex<Vec<(UserId, Chips)>>,
        fail_for: Option<UserId>,
    }

    #[async_trait::async_trait]
    impl WalletTransfer for RecordingWallet {
        async fn transfer_prize(&self, user_id: UserId, amount: Chips, _description: &str) -> Result<String, WalletError> {
            if self.fail_for == Some(user_id) {
                return Err(WalletError("insufficient ledger balance".into()));
            }
            self.transfers.lock().unwrap().push((user_id, amount));
            Ok(format!("tx-{user_id}"))
        }
    }

    fn config() -> TournamentConfig {
        TournamentConfig {
            name: "Sunday Major".into(),
            min_players: 2,
            max_players: 300,
            players_per_table: 9,
            buy_in: 100,
            starting_chips: 10_000,
            blind_levels: vec![],
            payout_structure: vec![0.5, 0.3, 0.2],
            itm_percentage: 50.0,
            shotgun_countdown: Duration::from_secs(10),
            final_table_size: 6,
        }
    }

    fn state_with_players(active: &[(UserId, Chips)], eliminated: &[(UserId, usize)]) -> TournamentState {
        let mut state = TournamentState::new(TournamentId::default(), config());
        state.total_prize_pool = 1000;
        for (uid, chips) in active {
            let mut p = TournamentPlayer::new(*uid, "p".into(), 10_000);
            p.chip_count = *chips;
            state.players.insert(*uid, p);
        }
        for (uid, rank) in eliminated {
            let mut p = TournamentPlayer::new(*uid, "p".into(), 10_000);
            p.is_active = false;
            p.elimination_rank = Some(*rank);
            state.players.insert(*uid, p);
        }
        state
    }

    #[test]
    fn winner_ranks_first_by_chip_count() {
        let winner = UserId::default();
        let runner_up = UserId::default();
        let state = state_with_players(&[(winner, 20_000), (runner_up, 5_000)], &[]);
        let engine = SettlementEngine::new(RecordingWallet { transfers: Mutex::new(vec![]), fail_for: None });
        let ranking = engine.final_ranking(&state);
        assert_eq!(ranking[0].user_id, winner);
    }

    #[tokio::test]
    async fn settlement_pays_itm_players_by_percentage() {
        let winner = UserId::default();
        let state = state_with_players(&[(winner, 20_000)], &[]);
        let engine = SettlementEngine::new(RecordingWallet { transfers: Mutex::new(vec![]), fail_for: None });
        let summary = engine.settle_tournament(&state).await;
        assert_eq!(summary.successful_payouts, 1);
        assert_eq!(summary.total_paid, 500);
    }

    #[tokio::test]
    async fn failed_payout_can_be_retried() {
        let winner = UserId::default();
        let state = state_with_players(&[(winner, 20_000)], &[]);
        let engine = SettlementEngine::new(RecordingWallet { transfers: Mutex::new(vec![]), fail_for: Some(winner) });
        let mut summary = engine.settle_tournament(&state).await;
        assert_eq!(summary.failed_payouts, 1);

        let engine = SettlementEngine::new(RecordingWallet { transfers: Mutex::new(vec![]), fail_for: None });
        engine.retry_failed_payouts(&mut summary).await;
        assert_eq!(summary.failed_payouts, 0);
        assert_eq!(summary.successful_payouts, 1);
    }
}
