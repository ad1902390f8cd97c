/// Undo of the most recent movement group
///
/// The last group is rebuilt by scanning the sorted ledger backward from the
/// final record while the token id matches. The token is put back at the
/// group's origin and exactly those records are removed.

use glam::DVec2;
use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::info;

use crate::error::MoveError;
use crate::host::{Host, TokenRef};
use crate::ledger::store::{LedgerStore, Mutation};
use crate::movement::record::Ledger;

/// Records to remove and where to put the token back
#[derive(Debug, Clone, PartialEq)]
pub struct UndoPlan {
    pub token: TokenRef,
    pub token_name: String,
    /// Origin of the group's first record
    pub restore_to: DVec2,
    pub orders: BTreeSet<u64>,
}

impl UndoPlan {
    /// Ledger with the group's records removed
    pub fn remaining(&self, ledger: &Ledger) -> Ledger {
        ledger.without_orders(&self.orders)
    }
}

/// Plan an undo; `None` when the ledger is empty
pub fn plan_undo(ledger: &Ledger) -> Option<UndoPlan> {
    let sorted = ledger.sorted();
    let last = *sorted.last()?;

    let group: Vec<_> = sorted
        .iter()
        .rev()
        .take_while(|record| record.token_id == last.token_id)
        .collect();
    // take_while stops at the first foreign token, so the group is never empty
    let first = group.last().copied().unwrap_or(&last);

    Some(UndoPlan {
        token: TokenRef::new(first.scene_id.clone(), first.token_id.clone()),
        token_name: first.token_name.clone(),
        restore_to: first.from,
        orders: group.iter().map(|record| record.move_order).collect(),
    })
}

/// Outcome of an undo request
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    NothingToUndo,
    Undone {
        token: TokenRef,
        removed: usize,
        mutation: Mutation,
    },
}

/// Re-entrancy flag shared between the undo path and the recorder.
///
/// While engaged, token change notifications are not recorded: the
/// reposition performed by an undo must not become a new movement.
#[derive(Debug, Clone, Default)]
pub struct UndoLatch {
    engaged: Rc<Cell<bool>>,
}

impl UndoLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.get()
    }

    /// Engage until the guard drops
    pub fn engage(&self) -> UndoGuard {
        self.engaged.set(true);
        UndoGuard {
            engaged: Rc::clone(&self.engaged),
        }
    }
}

/// Releases the latch on drop, including early returns and errors
#[derive(Debug)]
pub struct UndoGuard {
    engaged: Rc<Cell<bool>>,
}

impl Drop for UndoGuard {
    fn drop(&mut self) {
        self.engaged.set(false);
    }
}

/// Revert the most recent group: reposition, clear waypoints, prune, persist.
///
/// A vanished token aborts before any mutation.
pub fn undo_last_group<H>(
    host: &mut H,
    store: &LedgerStore,
    latch: &UndoLatch,
) -> Result<UndoOutcome, MoveError>
where
    H: Host + ?Sized,
{
    let ledger = store.read(host);
    let Some(plan) = plan_undo(&ledger) else {
        return Ok(UndoOutcome::NothingToUndo);
    };

    let _guard = latch.engage();

    let scene_id = plan.token.scene_id.as_str();
    let token_id = plan.token.token_id.as_str();
    if host.token(scene_id, token_id).is_none() {
        return Err(MoveError::token_not_found(scene_id, token_id));
    }

    host.reposition_token(scene_id, token_id, plan.restore_to, false)?;
    host.clear_waypoints(scene_id, token_id)?;

    let remaining = plan.remaining(&ledger);
    let mutation = store.replace(host, remaining)?;

    info!(
        token_id,
        removed = plan.orders.len(),
        ?mutation,
        "movement group undone"
    );

    Ok(UndoOutcome::Undone {
        token: plan.token.clone(),
        removed: plan.orders.len(),
        mutation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Role;
    use crate::testing::{record, MockHost};

    fn interleaved() -> Ledger {
        Ledger::from_records(vec![
            record("a", 1, (0.0, 0.0), (100.0, 0.0)),
            record("a", 2, (100.0, 0.0), (200.0, 0.0)),
            record("b", 3, (500.0, 0.0), (600.0, 0.0)),
            record("a", 4, (200.0, 0.0), (300.0, 0.0)),
            record("a", 5, (300.0, 0.0), (400.0, 0.0)),
        ])
    }

    #[test]
    fn test_plan_takes_only_trailing_run() {
        let plan = plan_undo(&interleaved()).unwrap();
        assert_eq!(plan.token.token_id, "a");
        assert_eq!(plan.orders.iter().copied().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(plan.restore_to, DVec2::new(200.0, 0.0));
    }

    #[test]
    fn test_remaining_is_exact_set_difference() {
        let ledger = interleaved();
        let plan = plan_undo(&ledger).unwrap();
        let remaining = plan.remaining(&ledger);

        let orders: Vec<u64> = remaining.sorted().iter().map(|r| r.move_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_empty_ledger() {
        assert!(plan_undo(&Ledger::new()).is_none());
    }

    #[test]
    fn test_latch_released_on_drop() {
        let latch = UndoLatch::new();
        {
            let _guard = latch.engage();
            assert!(latch.is_engaged());
            assert!(latch.clone().is_engaged());
        }
        assert!(!latch.is_engaged());
    }

    #[test]
    fn test_undo_repositions_without_animation() {
        let mut gm = MockHost::new(Role::Authority);
        gm.ledger = interleaved();
        gm.add_token("a", (400.0, 0.0));
        gm.add_token("b", (600.0, 0.0));
        gm.waypoints.insert("a".to_string(), vec![DVec2::new(400.0, 0.0)]);
        let store = LedgerStore::new("ns");
        let latch = UndoLatch::new();

        let outcome = undo_last_group(&mut gm, &store, &latch).unwrap();

        assert_eq!(
            outcome,
            UndoOutcome::Undone {
                token: TokenRef::new("scene-1", "a"),
                removed: 2,
                mutation: Mutation::Applied,
            }
        );
        assert_eq!(gm.repositions, vec![("a".to_string(), DVec2::new(200.0, 0.0), false)]);
        assert!(gm.waypoints.get("a").map_or(true, |w| w.is_empty()));
        assert_eq!(gm.ledger.max_move_order(), 3);
        assert!(!latch.is_engaged());
    }

    #[test]
    fn test_missing_token_aborts_without_mutation() {
        let mut gm = MockHost::new(Role::Authority);
        gm.ledger = interleaved();
        let store = LedgerStore::new("ns");
        let latch = UndoLatch::new();

        let err = undo_last_group(&mut gm, &store, &latch).unwrap_err();

        assert!(err.is_missing_entity());
        assert_eq!(gm.ledger, interleaved());
        assert_eq!(gm.writes, 0);
        assert!(gm.repositions.is_empty());
        assert!(!latch.is_engaged());
    }

    #[test]
    fn test_failed_reposition_releases_latch() {
        let mut gm = MockHost::new(Role::Authority);
        gm.ledger = interleaved();
        gm.add_token("a", (400.0, 0.0));
        gm.fail_reposition = true;
        let store = LedgerStore::new("ns");
        let latch = UndoLatch::new();

        assert!(undo_last_group(&mut gm, &store, &latch).is_err());
        assert!(!latch.is_engaged());
        assert_eq!(gm.writes, 0);
    }

    #[test]
    fn test_player_undo_forwards_replacement() {
        let mut player = MockHost::new(Role::Player);
        player.ledger = interleaved();
        player.add_token("a", (400.0, 0.0));
        let store = LedgerStore::new("ns");
        let latch = UndoLatch::new();

        let outcome = undo_last_group(&mut player, &store, &latch).unwrap();
        assert!(matches!(
            outcome,
            UndoOutcome::Undone {
                mutation: Mutation::Forwarded,
                ..
            }
        ));
        assert_eq!(player.ledger, interleaved());
        assert_eq!(player.emitted.len(), 1);
    }
}
