//! Chip integrity service: HMAC-sealed snapshots and conservation checks.
//!
//! Chips are never authoritatively gated by this crate — it's
//! defense-in-depth. `CaptureHandStart` seals the stack distribution before
//! a hand begins; `ValidateHandCompletion` reopens the seal once the hand
//! settles and flags any drift between what went in and what came out. A
//! discrepancy is logged and surfaced for alerting, not used to unwind the
//! hand.
use hmac::Hmac;
use hmac::Mac;
use rbp_core::Chips;
use rbp_core::HandNumber;
use rbp_core::TableId;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// A sealed record of a table's chip distribution at the start of a hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipSnapshot {
    table: TableId,
    hand_number: HandNumber,
    stacks: Vec<Chips>,
    total: Chips,
    integrity_hash: Vec<u8>,
}

impl ChipSnapshot {
    pub fn total_before(&self) -> Chips {
        self.total
    }
}

/// Outcome of reconciling a hand's final stacks against its captured start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConservationReport {
    pub success: bool,
    pub total_before: Chips,
    pub total_after: Chips,
    pub discrepancy: Chips,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("no chip snapshot captured for this table")]
    NoSnapshot,
    #[error("snapshot integrity hash does not match recomputed hash")]
    HashMismatch,
}

/// Keyed HMAC sealing, one outstanding snapshot per table.
///
/// Capturing a new hand's start overwrites any prior snapshot for that
/// table — only the most recently started hand can be validated.
pub struct ChipIntegrityService {
    key: Vec<u8>,
    snapshots: HashMap<TableId, ChipSnapshot>,
}

impl ChipIntegrityService {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            snapshots: HashMap::new(),
        }
    }

    fn sign(&self, table: TableId, hand_number: HandNumber, stacks: &[Chips], total: Chips) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(table.to_string().as_bytes());
        mac.update(b":");
        mac.update(hand_number.to_string().as_bytes());
        mac.update(b":");
        for stack in stacks {
            mac.update(stack.to_string().as_bytes());
            mac.update(b",");
        }
        mac.update(b":");
        mac.update(total.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Seals the table's starting stacks for `hand_number`, replacing any
    /// snapshot already held for this table.
    pub fn capture_hand_start(
        &mut self,
        table: TableId,
        hand_number: HandNumber,
        stacks_by_seat: Vec<Chips>,
    ) -> ChipSnapshot {
        let total = stacks_by_seat.iter().sum();
        let integrity_hash = self.sign(table, hand_number, &stacks_by_seat, total);
        let snapshot = ChipSnapshot {
            table,
            hand_number,
            stacks: stacks_by_seat,
            total,
            integrity_hash,
        };
        self.snapshots.insert(table, snapshot.clone());
        snapshot
    }

    /// Verifies the seal, checks chip conservation, and removes the
    /// snapshot regardless of outcome — each hand gets exactly one check.
    pub fn validate_hand_completion(
        &mut self,
        table: TableId,
        final_stacks: &[Chips],
        rake_collected: Chips,
    ) -> Result<ConservationReport, IntegrityError> {
        let snapshot = self.snapshots.remove(&table).ok_or(IntegrityError::NoSnapshot)?;
        let recomputed = self.sign(
            snapshot.table,
            snapshot.hand_number,
            &snapshot.stacks,
            snapshot.total,
        );
        if recomputed != snapshot.integrity_hash {
            log::warn!("chip snapshot hash mismatch for table {table}");
            return Err(IntegrityError::HashMismatch);
        }
        let total_before = snapshot.total;
        let total_after: Chips = final_stacks.iter().sum();
        let expected = total_before - rake_collected;
        let discrepancy = (expected - total_after).abs();
        let valid = discrepancy == 0;
        if !valid {
            log::error!(
                "chip conservation violation on table {table}: expected {expected}, got {total_after} (discrepancy {discrepancy})"
            );
        }
        Ok(ConservationReport {
            success: valid,
            total_before,
            total_after,
            discrepancy,
            valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conserved_hand_reports_no_discrepancy() {
        let mut service = ChipIntegrityService::new(b"test-key".to_vec());
        let table = TableId::default();
        service.capture_hand_start(table, 1, vec![1000, 1000]);
        let report = service.validate_hand_completion(table, &[900, 1090], 10).unwrap();
        assert!(report.valid);
        assert_eq!(report.discrepancy, 0);
    }

    #[test]
    fn missing_snapshot_is_rejected() {
        let mut service = ChipIntegrityService::new(b"test-key".to_vec());
        let table = TableId::default();
        assert_eq!(
            service.validate_hand_completion(table, &[1000], 0),
            Err(IntegrityError::NoSnapshot)
        );
    }

    #[test]
    fn leaked_chips_are_flagged_but_still_reported() {
        let mut service = ChipIntegrityService::new(b"test-key".to_vec());
        let table = TableId::default();
        service.capture_hand_start(table, 1, vec![1000, 1000]);
        let report = service.validate_hand_completion(table, &[900, 1000], 10).unwrap();
        assert!(!report.valid);
        assert_eq!(report.discrepancy, 90);
    }

    #[test]
    fn new_hand_start_overwrites_previous_snapshot() {
        let mut service = ChipIntegrityService::new(b"test-key".to_vec());
        let table = TableId::default();
        service.capture_hand_start(table, 1, vec![1000, 1000]);
        service.capture_hand_start(table, 2, vec![2000, 0]);
        let report = service.validate_hand_completion(table, &[1900, 100], 0).unwrap();
        assert!(report.valid);
    }

    #[test]
    fn tampered_snapshot_fails_hash_check() {
        let mut service = ChipIntegrityService::new(b"test-key".to_vec());
        let table = TableId::default();
        let mut snapshot = service.capture_hand_start(table, 1, vec![1000, 1000]);
        snapshot.stacks[0] = 999_999;
        service.snapshots.insert(table, snapshot);
        assert_eq!(
            service.validate_hand_completion(table, &[1000, 1000], 0),
            Err(IntegrityError::HashMismatch)
        );
    }
}
