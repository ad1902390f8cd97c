/// Movement history: records, recording, grouping and undo
///
/// Token drags during combat become ordered `MoveRecord`s in a shared ledger,
/// shown grouped by consecutive token and undoable one group at a time.

pub mod events;
pub mod grouping;
pub mod record;
pub mod recorder;
pub mod undo;

pub use events::{clear_reason, ClearReason, HostEvent};
pub use grouping::{group_moves, HistoryView, MoveGroup};
pub use record::{Ledger, MoveCounter, MoveRecord};
pub use recorder::{plan_record, MovementRecorder, RecordDecision};
pub use undo::{plan_undo, undo_last_group, UndoLatch, UndoOutcome, UndoPlan};
