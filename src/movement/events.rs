/// Host events the module subscribes to
///
/// Every lifecycle trigger, token hook, UI click and replicated message arrives
/// as one `HostEvent`. Deciding whether an event wipes the ledger is a pure
/// function of the event so it can be tested without a host.

use crate::host::TokenRef;
use crate::movement::record::Ledger;

#[derive(Clone, Debug)]
pub enum HostEvent {
    /// Host finished loading world data
    Ready,

    /// Token position changed; `change_id` is identical on every participant
    TokenMoved { token: TokenRef, change_id: u64 },

    /// Local participant selected or released a token
    TokenControlled { token: TokenRef, controlled: bool },

    /// Pointer entered or left a token
    TokenHovered { token: TokenRef, hovered: bool },

    CombatDeleted { combat_id: String },

    /// Combat document changed; `round` is set only when the round changed
    CombatUpdated { combat_id: String, round: Option<u32> },

    ChatMessageCreated { content: String },

    /// Persisted ledger changed (any participant, any path)
    LedgerChanged(Ledger),

    /// Raw payload from the broadcast channel
    SocketMessage { namespace: String, payload: Vec<u8> },

    /// History command button pressed
    OpenHistory,

    CloseHistory,

    /// Undo button in the history window
    UndoRequested,

    /// Clear button in the history window
    ClearRequested,

    /// Module is being torn down
    Unload,
}

impl HostEvent {
    /// Hook-style name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Ready => "ready",
            HostEvent::TokenMoved { .. } => "updateToken",
            HostEvent::TokenControlled { .. } => "controlToken",
            HostEvent::TokenHovered { .. } => "hoverToken",
            HostEvent::CombatDeleted { .. } => "deleteCombat",
            HostEvent::CombatUpdated { .. } => "updateCombat",
            HostEvent::ChatMessageCreated { .. } => "createChatMessage",
            HostEvent::LedgerChanged(_) => "settingChanged",
            HostEvent::SocketMessage { .. } => "socket",
            HostEvent::OpenHistory => "openHistory",
            HostEvent::CloseHistory => "closeHistory",
            HostEvent::UndoRequested => "undoMove",
            HostEvent::ClearRequested => "clearHistory",
            HostEvent::Unload => "unload",
        }
    }

    /// Token the event concerns, if any
    pub fn token(&self) -> Option<&TokenRef> {
        match self {
            HostEvent::TokenMoved { token, .. } => Some(token),
            HostEvent::TokenControlled { token, .. } => Some(token),
            HostEvent::TokenHovered { token, .. } => Some(token),
            _ => None,
        }
    }
}

/// Why the ledger is being wiped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearReason {
    CombatEnded,
    RoundChanged(u32),
    /// Chat message carried the localized initiative-process marker
    InitiativeProcess,
    UserRequest,
}

/// Decide whether an event clears the ledger.
///
/// The initiative check is a substring match on localized chat text; an empty
/// marker disables it.
pub fn clear_reason(event: &HostEvent, initiative_marker: &str) -> Option<ClearReason> {
    match event {
        HostEvent::CombatDeleted { .. } => Some(ClearReason::CombatEnded),
        HostEvent::CombatUpdated {
            round: Some(round), ..
        } => Some(ClearReason::RoundChanged(*round)),
        HostEvent::ChatMessageCreated { content } => {
            if !initiative_marker.is_empty() && content.contains(initiative_marker) {
                Some(ClearReason::InitiativeProcess)
            } else {
                None
            }
        }
        HostEvent::ClearRequested => Some(ClearReason::UserRequest),
        _ => None,
    }
}
