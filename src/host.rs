/// Host collaborator contracts
///
/// The tabletop host owns scenes, tokens, combat, permissions, settings
/// persistence, the socket and the canvas. The module only talks to it through
/// these traits; `sim` provides an in-process implementation.

use glam::DVec2;

use crate::error::MoveError;
use crate::movement::grouping::HistoryView;
use crate::movement::record::Ledger;
use crate::overlay::path::PathOverlay;
use crate::overlay::slots::OverlayHandle;

/// Participant role; only the authority mutates the persisted ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Player,
}

/// Stable reference to a token inside a scene
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenRef {
    pub scene_id: String,
    pub token_id: String,
}

impl TokenRef {
    pub fn new(scene_id: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            token_id: token_id.into(),
        }
    }
}

/// Actor-derived movement allowances in grid units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveStats {
    /// Distance allowed while still able to act ("battle move")
    pub battle: f64,
    /// Distance allowed when spending the whole action on movement
    pub full: f64,
}

/// Read-only view of a token document
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSnapshot {
    pub id: String,
    pub name: String,
    pub scene_id: String,
    pub scene_name: String,
    /// Top-left corner in scene pixels
    pub position: DVec2,
    /// Footprint in grid cells
    pub width: f64,
    pub height: f64,
    /// None when the token has no actor or the actor has no movement attributes
    pub move_stats: Option<MoveStats>,
}

impl TokenSnapshot {
    pub fn token_ref(&self) -> TokenRef {
        TokenRef::new(self.scene_id.clone(), self.id.clone())
    }

    /// Movement allowances, zero when absent
    pub fn move_stats(&self) -> MoveStats {
        self.move_stats.unwrap_or_default()
    }

    /// Footprint in scene pixels for the given grid cell size
    pub fn footprint_px(&self, grid_size: f64) -> DVec2 {
        DVec2::new(self.width * grid_size, self.height * grid_size)
    }
}

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Who is running this copy of the module
pub trait Participant {
    fn user_id(&self) -> &str;

    fn role(&self) -> Role;

    fn is_authority(&self) -> bool {
        self.role() == Role::Authority
    }
}

/// World-scoped persisted settings slot holding the ledger.
///
/// Writes are only issued by the authority. Every successful write must be
/// followed by a change notification to all participants.
pub trait LedgerSlot {
    fn read_ledger(&self) -> Ledger;

    fn write_ledger(&mut self, ledger: Ledger) -> Result<(), MoveError>;
}

/// Unordered, at-most-once broadcast to every other participant
pub trait Broadcast {
    /// Fire and forget; delivery failures are not reported
    fn emit(&mut self, namespace: &str, payload: Vec<u8>);
}

/// Scene, token, combat and permission accessors
pub trait Table {
    fn combat_active(&self) -> bool;

    fn token(&self, scene_id: &str, token_id: &str) -> Option<TokenSnapshot>;

    /// Pixels per grid cell
    fn grid_size(&self, scene_id: &str) -> Option<f64>;

    /// Host's transient waypoint buffer for the token's latest change
    fn waypoints(&self, scene_id: &str, token_id: &str) -> Vec<DVec2>;

    fn clear_waypoints(&mut self, scene_id: &str, token_id: &str) -> Result<(), MoveError>;

    fn reposition_token(
        &mut self,
        scene_id: &str,
        token_id: &str,
        position: DVec2,
        animate: bool,
    ) -> Result<(), MoveError>;

    /// Whether the local participant may update the token
    fn can_modify(&self, scene_id: &str, token_id: &str) -> bool;

    /// Token currently selected by the local participant
    fn controlled_token(&self) -> Option<TokenRef>;
}

/// Scene render layer that path overlays attach to
pub trait Canvas {
    fn canvas_ready(&self) -> bool {
        true
    }

    fn attach_overlay(&mut self, overlay: PathOverlay) -> OverlayHandle;

    /// Detach and release; unknown handles are ignored
    fn detach_overlay(&mut self, handle: OverlayHandle);
}

/// Notifications and the history window
pub trait Ui {
    fn notify(&mut self, level: NoticeLevel, message: &str);

    fn render_history(&mut self, view: &HistoryView);
}

/// Everything the module needs from its host
pub trait Host: Participant + LedgerSlot + Broadcast + Table + Canvas + Ui {}

impl<T> Host for T where T: Participant + LedgerSlot + Broadcast + Table + Canvas + Ui {}
