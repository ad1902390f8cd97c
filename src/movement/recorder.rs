/// Movement recorder
///
/// Collapses a host change event's waypoint list into one net displacement and
/// stamps it with the next move order. Only the authority stamps; other
/// participants forward unstamped candidates.

use glam::DVec2;
use std::collections::BTreeSet;

use crate::host::TokenSnapshot;
use crate::movement::record::{Ledger, MoveCounter, MoveRecord};

/// What to do with one token change
#[derive(Debug, Clone, PartialEq)]
pub enum RecordDecision {
    /// No waypoints, nothing happened
    Ignore,
    /// Movement outside combat; drop the waypoints unrecorded
    Discard,
    /// Unstamped candidate record
    Record(MoveRecord),
}

/// Intermediate waypoints are dropped, only net displacement is kept
pub fn plan_record(token: &TokenSnapshot, waypoints: &[DVec2], combat_active: bool) -> RecordDecision {
    let (Some(&from), Some(&to)) = (waypoints.first(), waypoints.last()) else {
        return RecordDecision::Ignore;
    };

    if !combat_active {
        return RecordDecision::Discard;
    }

    RecordDecision::Record(MoveRecord::unstamped(token, from, to))
}

/// Change ids remembered exactly; older ones fall below the floor
const DEDUP_WINDOW: usize = 256;

/// Authority-side stamping state
#[derive(Debug, Default)]
pub struct MovementRecorder {
    counter: MoveCounter,

    /// Most recent host change ids recorded since the last clear
    seen_changes: BTreeSet<u64>,

    /// Ids below this were evicted from the window and count as seen
    floor: u64,
}

impl MovementRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> MoveCounter {
        self.counter
    }

    /// Reseed from the persisted ledger at startup
    pub fn reseed(&mut self, ledger: &Ledger) {
        self.counter.reseed(ledger);
    }

    /// Assign the next move order.
    ///
    /// Returns `None` when `change_id` was already recorded, which happens when
    /// the authority sees a change both from its own hook and as a forwarded
    /// request.
    pub fn stamp(&mut self, mut record: MoveRecord, change_id: Option<u64>) -> Option<MoveRecord> {
        if let Some(id) = change_id {
            if id < self.floor || !self.seen_changes.insert(id) {
                return None;
            }
            while self.seen_changes.len() > DEDUP_WINDOW {
                if let Some(oldest) = self.seen_changes.pop_first() {
                    self.floor = oldest + 1;
                }
            }
        }
        record.move_order = self.counter.next();
        Some(record)
    }

    #[cfg(test)]
    fn has_seen(&self, change_id: u64) -> bool {
        change_id < self.floor || self.seen_changes.contains(&change_id)
    }

    /// Ledger was cleared: orders restart at 1
    pub fn reset(&mut self) {
        self.counter.reset();
        self.seen_changes.clear();
        self.floor = 0;
    }
}
