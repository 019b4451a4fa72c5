//! Table balancing: keep per-table population within ±1, break
//! low-population tables, and assemble a final table once few enough
//! players remain.
use crate::models::TournamentState;
use rbp_core::Position;
use rbp_core::TableId;
use rbp_core::UserId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BalancingPriority {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMove {
    pub user_id: UserId,
    pub from_table: TableId,
    pub from_seat: Position,
    pub to_table: TableId,
    pub to_seat: Position,
    pub priority: BalancingPriority,
    pub execute_after_hand: bool,
}

#[derive(Debug, Clone)]
pub struct BalancingPlan {
    pub moves: Vec<PlayerMove>,
    pub tables_to_break: Vec<TableId>,
    pub priority: BalancingPriority,
}

impl BalancingPlan {
    fn empty() -> Self {
        Self {
            moves: Vec::new(),
            tables_to_break: Vec::new(),
            priority: BalancingPriority::None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableBalancer {
    pub min_players: usize,
    pub max_players: usize,
    pub final_table_size: usize,
}

impl TableBalancer {
    pub fn new(min_players: usize, max_players: usize, final_table_size: usize) -> Self {
        Self {
            min_players,
            max_players,
            final_table_size,
        }
    }

    pub fn compute_plan(&self, state: &TournamentState) -> BalancingPlan {
        let tables: Vec<_> = state.tables.values().collect();
        if tables.is_empty() {
            return BalancingPlan::empty();
        }
        let counts: HashMap<TableId, usize> = tables.iter().map(|t| (t.table_id, t.player_count())).collect();
        let total: usize = counts.values().sum();
        if total == 0 {
            return BalancingPlan::empty();
        }

        if total <= self.final_table_size && tables.len() > 1 {
            return self.plan_final_table(state);
        }

        let tables_to_break: Vec<TableId> = tables
            .iter()
            .filter(|t| counts[&t.table_id] < self.min_players && tables.len() > 1)
            .map(|t| t.table_id)
            .collect();
        if !tables_to_break.is_empty() {
            return self.plan_table_break(state, tables_to_break);
        }

        let max_count = *counts.values().max().unwrap();
        let min_count = *counts.values().min().unwrap();
        let imbalance = max_count - min_count;
        if imbalance <= 1 {
            return BalancingPlan::empty();
        }
        let priority = if imbalance >= 3 {
            BalancingPriority::High
        } else if imbalance >= 2 {
            BalancingPriority::Medium
        } else {
            BalancingPriority::Low
        };

        let num_tables = tables.len();
        let ideal_per_table = total / num_tables;
        let remainder = total % num_tables;
        let ideal_counts: HashMap<TableId, usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.table_id, ideal_per_table + usize::from(i < remainder)))
            .collect();

        let moves = self.minimum_moves(state, counts, ideal_counts);
        BalancingPlan {
            moves,
            tables_to_break: Vec::new(),
            priority,
        }
    }

    fn minimum_moves(
        &self,
        state: &TournamentState,
        mut counts: HashMap<TableId, usize>,
        ideal_counts: HashMap<TableId, usize>,
    ) -> Vec<PlayerMove> {
        let mut moves = Vec::new();
        let mut surplus: Vec<TableId> = counts
            .iter()
            .filter(|(t, &c)| c > ideal_counts[t])
            .map(|(t, _)| *t)
            .collect();
        let mut deficit: Vec<TableId> = counts
            .iter()
            .filter(|(t, &c)| c < ideal_counts[t])
            .map(|(t, _)| *t)
            .collect();

        while !surplus.is_empty() && !deficit.is_empty() {
            surplus.sort_by_key(|t| std::cmp::Reverse(counts[t]));
            deficit.sort_by_key(|t| counts[t]);
            let from_table = surplus[0];
            let to_table = deficit[0];

            let Some(from) = state.tables.get(&from_table) else { break };
            let Some(to) = state.tables.get(&to_table) else { break };

            let Some(player) = self.select_player_to_move(state, from) else {
                surplus.remove(0);
                continue;
            };
            let Some(dest_seat) = Self::select_destination_seat(to) else {
                deficit.remove(0);
                continue;
            };

            moves.push(PlayerMove {
                user_id: player.user_id,
                from_table,
                from_seat: player.seat_position.unwrap_or(0),
                to_table,
                to_seat: dest_seat,
                priority: BalancingPriority::Medium,
                execute_after_hand: from.hand_in_progress,
            });

            *counts.get_mut(&from_table).unwrap() -= 1;
            *counts.get_mut(&to_table).unwrap() += 1;
            if counts[&from_table] <= ideal_counts[&from_table] {
                surplus.retain(|t| *t != from_table);
            }
            if counts[&to_table] >= ideal_counts[&to_table] {
                deficit.retain(|t| *t != to_table);
            }
        }
        moves
    }

    /// Picks the player seated just past the button — the one who'd lose
    /// the least positional value by moving tables before it's their blind.
    fn select_player_to_move<'s>(
        &self,
        state: &'s TournamentState,
        table: &crate::models::TournamentTable,
    ) -> Option<&'s crate::models::TournamentPlayer> {
        table
            .seats
            .iter()
            .flatten()
            .filter_map(|uid| state.players.get(uid))
            .filter(|p| p.is_active)
            .max_by_key(|p| p.seat_position.unwrap_or(0))
    }

    fn select_destination_seat(table: &crate::models::TournamentTable) -> Option<Position> {
        table.empty_seats().into_iter().min()
    }

    fn plan_table_break(&self, state: &TournamentState, tables_to_break: Vec<TableId>) -> BalancingPlan {
        let mut moves = Vec::new();
        let mut players_to_move: Vec<(TableId, UserId, Position)> = Vec::new();
        for table_id in &tables_to_break {
            if let Some(table) = state.tables.get(table_id) {
                for (seat, uid) in table.seats.iter().enumerate() {
                    if let Some(uid) = uid {
                        if state.players.get(uid).is_some_and(|p| p.is_active) {
                            players_to_move.push((*table_id, *uid, seat));
                        }
                    }
                }
            }
        }

        let mut available: Vec<_> = state
            .tables
            .values()
            .filter(|t| !tables_to_break.contains(&t.table_id))
            .collect();
        available.sort_by_key(|t| t.player_count());

        let mut fill_counts: HashMap<TableId, usize> =
            available.iter().map(|t| (t.table_id, t.player_count())).collect();
        let mut table_idx = 0usize;
        for (source_table, user_id, from_seat) in players_to_move {
            if available.is_empty() {
                break;
            }
            let mut attempts = 0;
            while attempts < available.len() {
                let target = available[table_idx % available.len()];
                let empty_seats = target.empty_seats();
                if !empty_seats.is_empty() && fill_counts[&target.table_id] < self.max_players {
                    let dest_seat = *empty_seats.iter().min().unwrap();
                    moves.push(PlayerMove {
                        user_id,
                        from_table: source_table,
                        from_seat,
                        to_table: target.table_id,
                        to_seat: dest_seat,
                        priority: BalancingPriority::High,
                        execute_after_hand: state.tables[&source_table].hand_in_progress,
                    });
                    *fill_counts.get_mut(&target.table_id).unwrap() += 1;
                    table_idx += 1;
                    break;
                }
                table_idx += 1;
                attempts += 1;
            }
        }

        BalancingPlan {
            moves,
            tables_to_break,
            priority: BalancingPriority::High,
        }
    }

    fn plan_final_table(&self, state: &TournamentState) -> BalancingPlan {
        let mut tables: Vec<_> = state.tables.values().collect();
        if tables.len() <= 1 {
            return BalancingPlan::empty();
        }
        tables.sort_by_key(|t| std::cmp::Reverse(t.player_count()));
        let final_table = tables[0];
        let other_tables = &tables[1..];

        let mut final_seats = final_table.seats.clone();
        let mut moves = Vec::new();
        for table in other_tables {
            for (seat, uid) in table.seats.iter().enumerate() {
                let Some(uid) = uid else { continue };
                if !state.players.get(uid).is_some_and(|p| p.is_active) {
                    continue;
                }
                let Some(dest_seat) = final_seats.iter().position(|s| s.is_none()) else {
                    continue;
                };
                final_seats[dest_seat] = Some(*uid);
                moves.push(PlayerMove {
                    user_id: *uid,
                    from_table: table.table_id,
                    from_seat: seat,
                    to_table: final_table.table_id,
                    to_seat: dest_seat,
                    priority: BalancingPriority::Critical,
                    execute_after_hand: table.hand_in_progress,
                });
            }
        }

        BalancingPlan {
            moves,
            tables_to_break: other_tables.iter().map(|t| t.table_id).collect(),
            priority: BalancingPriority::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TournamentConfig;
    use crate::models::TournamentPlayer;
    use crate::models::TournamentTable;
    use rbp_core::TableId;
    use rbp_core::TournamentId;
    use std::time::Duration;

    fn config() -> TournamentConfig {
        TournamentConfig {
            name: "t".into(),
            min_players: 2,
            max_players: 300,
            players_per_table: 6,
            buy_in: 100,
            starting_chips: 1000,
            blind_levels: vec![],
            payout_structure: vec![1.0],
            itm_percentage: 15.0,
            shotgun_countdown: Duration::from_secs(10),
            final_table_size: 6,
        }
    }

    fn seated_state(counts: &[usize]) -> TournamentState {
        let mut state = TournamentState::new(TournamentId::default(), config());
        for (i, &count) in counts.iter().enumerate() {
            let table_id = TableId::default();
            let mut table = TournamentTable::new(table_id, i as u32, 9);
            for seat in 0..count {
                let user = UserId::default();
                table.seat_player(user, seat);
                state
                    .players
                    .insert(user, TournamentPlayer::new(user, "p".into(), 1000));
            }
            state.tables.insert(table_id, table);
        }
        state
    }

    #[test]
    fn balanced_tables_produce_no_plan() {
        let state = seated_state(&[5, 5]);
        let balancer = TableBalancer::new(2, 9, 6);
        let plan = balancer.compute_plan(&state);
        assert!(plan.moves.is_empty());
        assert_eq!(plan.priority, BalancingPriority::None);
    }

    #[test]
    fn imbalanced_tables_produce_moves() {
        let state = seated_state(&[8, 2]);
        let balancer = TableBalancer::new(2, 9, 6);
        let plan = balancer.compute_plan(&state);
        assert!(!plan.moves.is_empty());
    }

    #[test]
    fn low_population_table_triggers_break() {
        let state = seated_state(&[8, 1]);
        let balancer = TableBalancer::new(2, 9, 6);
        let plan = balancer.compute_plan(&state);
        assert_eq!(plan.tables_to_break.len(), 1);
    }

    #[test]
    fn total_under_final_table_size_consolidates() {
        let state = seated_state(&[4, 2]);
        let balancer = TableBalancer::new(2, 9, 6);
        let plan = balancer.compute_plan(&state);
        assert_eq!(plan.priority, BalancingPriority::Critical);
        assert_eq!(plan.tables_to_break.len(), 1);
    }
}
