/// Grouping of ledger records into per-token movement runs
///
/// A group is a maximal run of consecutive records (by `move_order`) for the
/// same token. A, B, A yields three groups, never two.

use glam::DVec2;

use crate::host::{Participant, Table};
use crate::movement::record::{Ledger, MoveRecord};

/// Contiguous run of one token's moves, derived and never persisted
#[derive(Debug, Clone, PartialEq)]
pub struct MoveGroup {
    pub token_id: String,
    pub token_name: String,
    pub scene_id: String,
    pub scene_name: String,
    pub first_move_order: u64,
    pub last_move_order: u64,
    /// Origin of the first record in the run
    pub from: DVec2,
    /// Destination of the last record in the run
    pub to: DVec2,
    pub move_count: usize,
}

impl MoveGroup {
    fn start(record: &MoveRecord) -> Self {
        Self {
            token_id: record.token_id.clone(),
            token_name: record.token_name.clone(),
            scene_id: record.scene_id.clone(),
            scene_name: record.scene_name.clone(),
            first_move_order: record.move_order,
            last_move_order: record.move_order,
            from: record.from,
            to: record.to,
            move_count: 1,
        }
    }

    fn extend(&mut self, record: &MoveRecord) {
        self.last_move_order = record.move_order;
        self.to = record.to;
        self.move_count += 1;
    }

    /// One-line summary for the history window
    pub fn describe(&self) -> String {
        let orders = if self.first_move_order == self.last_move_order {
            format!("#{}", self.first_move_order)
        } else {
            format!("#{}-#{}", self.first_move_order, self.last_move_order)
        };
        format!(
            "{} {} x{} ({}, {}) -> ({}, {}) [{}]",
            orders,
            self.token_name,
            self.move_count,
            self.from.x,
            self.from.y,
            self.to.x,
            self.to.y,
            self.scene_name
        )
    }
}

/// Group already-sorted records in a single pass
pub fn group_sorted<'a, I>(sorted: I) -> Vec<MoveGroup>
where
    I: IntoIterator<Item = &'a MoveRecord>,
{
    let mut groups: Vec<MoveGroup> = Vec::new();

    for record in sorted {
        match groups.last_mut() {
            Some(current) if current.token_id == record.token_id => current.extend(record),
            _ => groups.push(MoveGroup::start(record)),
        }
    }

    groups
}

/// Sort the ledger by `move_order` and group it
pub fn group_moves(ledger: &Ledger) -> Vec<MoveGroup> {
    group_sorted(ledger.sorted())
}

/// Presentation model for the history window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    pub groups: Vec<MoveGroup>,
    pub has_history: bool,
    /// Only the authority may wipe the ledger from the window
    pub can_clear_history: bool,
    /// Viewer may update the token owning the most recent group
    pub can_undo_move: bool,
}

impl HistoryView {
    pub fn prepare<H>(ledger: &Ledger, host: &H) -> Self
    where
        H: Participant + Table + ?Sized,
    {
        let groups = group_moves(ledger);

        let can_undo_move = groups
            .last()
            .filter(|last| host.token(&last.scene_id, &last.token_id).is_some())
            .map(|last| host.can_modify(&last.scene_id, &last.token_id))
            .unwrap_or(false);

        Self {
            has_history: !groups.is_empty(),
            can_clear_history: host.is_authority(),
            can_undo_move,
            groups,
        }
    }

    pub fn last_group(&self) -> Option<&MoveGroup> {
        self.groups.last()
    }

    /// Rendered lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        if !self.has_history {
            return vec!["No movement recorded".to_string()];
        }
        self.groups.iter().map(MoveGroup::describe).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Role;
    use crate::testing::{record, MockHost};

    fn token_sequence(groups: &[MoveGroup]) -> Vec<(String, usize)> {
        groups
            .iter()
            .map(|g| (g.token_id.clone(), g.move_count))
            .collect()
    }

    #[test]
    fn test_alternating_tokens_never_merge() {
        let ledger = Ledger::from_records(vec![
            record("a", 1, (0.0, 0.0), (100.0, 0.0)),
            record("b", 2, (0.0, 0.0), (100.0, 0.0)),
            record("a", 3, (100.0, 0.0), (200.0, 0.0)),
            record("b", 4, (100.0, 0.0), (200.0, 0.0)),
        ]);

        let groups = group_moves(&ledger);
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.move_count == 1));
    }

    #[test]
    fn test_groups_run_length_encode_sorted_tokens() {
        // Inserted out of order on purpose
        let ledger = Ledger::from_records(vec![
            record("b", 3, (0.0, 0.0), (100.0, 0.0)),
            record("a", 1, (0.0, 0.0), (100.0, 0.0)),
            record("a", 2, (100.0, 0.0), (200.0, 0.0)),
            record("a", 5, (200.0, 0.0), (300.0, 0.0)),
            record("b", 4, (100.0, 0.0), (200.0, 0.0)),
        ]);

        let groups = group_moves(&ledger);
        assert_eq!(
            token_sequence(&groups),
            vec![
                ("a".to_string(), 2),
                ("b".to_string(), 2),
                ("a".to_string(), 1)
            ]
        );

        let first = &groups[0];
        assert_eq!(first.first_move_order, 1);
        assert_eq!(first.last_move_order, 2);
        assert_eq!(first.from, DVec2::new(0.0, 0.0));
        assert_eq!(first.to, DVec2::new(200.0, 0.0));

        let total: usize = groups.iter().map(|g| g.move_count).sum();
        assert_eq!(total, ledger.len());
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let ledger = Ledger::from_records(vec![
            record("a", 2, (0.0, 0.0), (100.0, 0.0)),
            record("a", 1, (0.0, 0.0), (100.0, 0.0)),
            record("c", 3, (0.0, 0.0), (100.0, 0.0)),
        ]);

        let once = group_moves(&ledger);
        let flattened = Ledger::from_records(ledger.sorted().into_iter().cloned().collect());
        let twice = group_moves(&flattened);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_ledger_has_no_groups() {
        assert!(group_moves(&Ledger::new()).is_empty());
    }

    #[test]
    fn test_view_permissions_follow_role_and_token_rights() {
        let ledger = Ledger::from_records(vec![record("a", 1, (0.0, 0.0), (100.0, 0.0))]);

        let mut player = MockHost::new(Role::Player);
        player.add_token("a", (100.0, 0.0));
        player.modifiable.insert("a".to_string());
        let view = HistoryView::prepare(&ledger, &player);
        assert!(view.has_history);
        assert!(!view.can_clear_history);
        assert!(view.can_undo_move);

        player.modifiable.clear();
        let view = HistoryView::prepare(&ledger, &player);
        assert!(!view.can_undo_move);

        let gm = MockHost::new(Role::Authority);
        let view = HistoryView::prepare(&ledger, &gm);
        assert!(view.can_clear_history);
        // token not present on this table
        assert!(!view.can_undo_move);
    }

    #[test]
    fn test_describe_group() {
        let ledger = Ledger::from_records(vec![
            record("a", 1, (0.0, 0.0), (100.0, 0.0)),
            record("a", 2, (100.0, 0.0), (300.0, 0.0)),
        ]);
        let groups = group_moves(&ledger);
        assert_eq!(groups[0].describe(), "#1-#2 A x2 (0, 0) -> (300, 0) [Arena]");
    }
}
