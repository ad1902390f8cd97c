/// Shared table session with one host per participant
///
/// The session plays the hosting platform: it owns the table, the persisted
/// settings slot and the broadcast fan-out. Each participant gets a `SimHost`
/// with its own inbox; events are delivered over crossbeam channels and only
/// handled when the participant's `Client` pumps its inbox.

use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::DVec2;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::config::ModuleConfig;
use crate::context::ModuleContext;
use crate::error::MoveError;
use crate::host::{
    Broadcast, Canvas, LedgerSlot, NoticeLevel, Participant, Role, Table, TokenRef, TokenSnapshot, Ui,
};
use crate::ledger::file_slot::FileLedgerSlot;
use crate::movement::events::HostEvent;
use crate::movement::grouping::HistoryView;
use crate::movement::record::Ledger;
use crate::overlay::path::PathOverlay;
use crate::overlay::slots::{OverlayChannel, OverlayHandle};
use crate::sim::table::TableWorld;

/// Where the world setting lives
pub enum SettingsSlot {
    Memory(Ledger),
    File(FileLedgerSlot),
}

impl SettingsSlot {
    fn get(&self) -> Ledger {
        match self {
            SettingsSlot::Memory(ledger) => ledger.clone(),
            SettingsSlot::File(slot) => slot.get().clone(),
        }
    }

    fn set(&mut self, ledger: Ledger) -> Result<(), MoveError> {
        match self {
            SettingsSlot::Memory(current) => {
                *current = ledger;
                Ok(())
            }
            SettingsSlot::File(slot) => slot.set(ledger),
        }
    }
}

struct Peer {
    user_id: String,
    inbox: Sender<HostEvent>,
}

struct Shared {
    table: TableWorld,
    settings: SettingsSlot,
    peers: Vec<Peer>,
}

impl Shared {
    /// Deliver to every peer, optionally skipping one
    fn deliver(&mut self, event: HostEvent, skip: Option<&str>) {
        self.peers.retain(|peer| {
            if skip == Some(peer.user_id.as_str()) {
                return true;
            }
            let delivered = peer.inbox.send(event.clone()).is_ok();
            if !delivered {
                debug!(user_id = %peer.user_id, "peer left, dropping");
            }
            delivered
        });
    }
}

#[derive(Clone)]
pub struct Session {
    shared: Arc<Mutex<Shared>>,
}

impl Session {
    pub fn new(table: TableWorld) -> Self {
        Self::with_settings(table, SettingsSlot::Memory(Ledger::new()))
    }

    /// Session whose ledger persists to a JSON file
    pub fn with_ledger_file(table: TableWorld, path: impl Into<PathBuf>) -> Result<Self, MoveError> {
        let slot = FileLedgerSlot::open(path)?;
        Ok(Self::with_settings(table, SettingsSlot::File(slot)))
    }

    pub fn with_settings(table: TableWorld, settings: SettingsSlot) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                table,
                settings,
                peers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("session mutex poisoned")
    }

    /// Connect a participant
    pub fn join(&self, user_id: impl Into<String>, role: Role) -> SimHost {
        let user_id = user_id.into();
        let (sender, receiver) = unbounded();
        self.lock().peers.push(Peer {
            user_id: user_id.clone(),
            inbox: sender,
        });
        SimHost {
            user_id,
            role,
            session: self.clone(),
            inbox: receiver,
            controlled: None,
            overlays: BTreeMap::new(),
            next_handle: 0,
            notices: Vec::new(),
            history: None,
        }
    }

    pub fn ledger(&self) -> Ledger {
        self.lock().settings.get()
    }

    /// Run `f` against the table
    pub fn with_table<T>(&self, f: impl FnOnce(&mut TableWorld) -> T) -> T {
        f(&mut self.lock().table)
    }

    pub fn broadcast(&self, event: HostEvent) {
        self.lock().deliver(event, None);
    }

    /// A participant drags a token through `path`
    pub fn drag_token(&self, scene_id: &str, token_id: &str, path: &[(f64, f64)]) -> Result<u64, MoveError> {
        let path: Vec<DVec2> = path.iter().map(|&(x, y)| DVec2::new(x, y)).collect();
        let mut shared = self.lock();
        let change_id = shared.table.drag_token(scene_id, token_id, &path)?;
        shared.deliver(
            HostEvent::TokenMoved {
                token: TokenRef::new(scene_id, token_id),
                change_id,
            },
            None,
        );
        Ok(change_id)
    }

    pub fn start_combat(&self, combat_id: &str) {
        self.lock().table.start_combat(combat_id);
    }

    pub fn advance_round(&self) -> Option<u32> {
        let mut shared = self.lock();
        let combat = shared.table.advance_round()?;
        shared.deliver(
            HostEvent::CombatUpdated {
                combat_id: combat.id,
                round: Some(combat.round),
            },
            None,
        );
        Some(combat.round)
    }

    pub fn end_combat(&self) {
        let mut shared = self.lock();
        if let Some(combat) = shared.table.end_combat() {
            shared.deliver(HostEvent::CombatDeleted { combat_id: combat.id }, None);
        }
    }

    pub fn post_chat(&self, content: impl Into<String>) {
        self.broadcast(HostEvent::ChatMessageCreated {
            content: content.into(),
        });
    }
}

/// Overlay plus the line vertex buffer uploaded for it
struct AttachedOverlay {
    overlay: PathOverlay,
    vertex_bytes: Vec<u8>,
}

/// One participant's view of the session
pub struct SimHost {
    user_id: String,
    role: Role,
    session: Session,
    inbox: Receiver<HostEvent>,
    controlled: Option<TokenRef>,
    overlays: BTreeMap<OverlayHandle, AttachedOverlay>,
    next_handle: u64,
    notices: Vec<(NoticeLevel, String)>,
    history: Option<HistoryView>,
}

impl SimHost {
    pub fn overlays(&self) -> impl Iterator<Item = &PathOverlay> {
        self.overlays.values().map(|attached| &attached.overlay)
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&PathOverlay> {
        self.overlays.get(&handle).map(|attached| &attached.overlay)
    }

    /// Raw `LineVertex` buffer uploaded when the overlay was attached
    pub fn vertex_bytes(&self, handle: OverlayHandle) -> Option<&[u8]> {
        self.overlays
            .get(&handle)
            .map(|attached| attached.vertex_bytes.as_slice())
    }

    pub fn notices(&self) -> &[(NoticeLevel, String)] {
        &self.notices
    }

    /// Last history window contents rendered
    pub fn history(&self) -> Option<&HistoryView> {
        self.history.as_ref()
    }
}

impl Participant for SimHost {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn role(&self) -> Role {
        self.role
    }
}

impl LedgerSlot for SimHost {
    fn read_ledger(&self) -> Ledger {
        self.session.ledger()
    }

    fn write_ledger(&mut self, ledger: Ledger) -> Result<(), MoveError> {
        let mut shared = self.session.lock();
        shared.settings.set(ledger.clone())?;
        shared.deliver(HostEvent::LedgerChanged(ledger), None);
        Ok(())
    }
}

impl Broadcast for SimHost {
    fn emit(&mut self, namespace: &str, payload: Vec<u8>) {
        let event = HostEvent::SocketMessage {
            namespace: namespace.to_string(),
            payload,
        };
        self.session.lock().deliver(event, Some(self.user_id.as_str()));
    }
}

impl Table for SimHost {
    fn combat_active(&self) -> bool {
        self.session.lock().table.combat().is_some()
    }

    fn token(&self, scene_id: &str, token_id: &str) -> Option<TokenSnapshot> {
        self.session.lock().table.snapshot(scene_id, token_id)
    }

    fn grid_size(&self, scene_id: &str) -> Option<f64> {
        self.session.lock().table.grid_size(scene_id)
    }

    fn waypoints(&self, scene_id: &str, token_id: &str) -> Vec<DVec2> {
        self.session.lock().table.waypoints(scene_id, token_id)
    }

    fn clear_waypoints(&mut self, scene_id: &str, token_id: &str) -> Result<(), MoveError> {
        self.session.lock().table.clear_waypoints(scene_id, token_id)
    }

    fn reposition_token(
        &mut self,
        scene_id: &str,
        token_id: &str,
        position: DVec2,
        _animate: bool,
    ) -> Result<(), MoveError> {
        let mut shared = self.session.lock();
        let change_id = shared.table.reposition(scene_id, token_id, position)?;
        shared.deliver(
            HostEvent::TokenMoved {
                token: TokenRef::new(scene_id, token_id),
                change_id,
            },
            None,
        );
        Ok(())
    }

    fn can_modify(&self, scene_id: &str, token_id: &str) -> bool {
        self.role == Role::Authority
            || self.session.lock().table.is_owner(scene_id, token_id, &self.user_id)
    }

    fn controlled_token(&self) -> Option<TokenRef> {
        self.controlled.clone()
    }
}

impl Canvas for SimHost {
    fn attach_overlay(&mut self, overlay: PathOverlay) -> OverlayHandle {
        self.next_handle += 1;
        let handle = OverlayHandle(self.next_handle);
        let vertex_bytes = overlay.vertex_bytes();
        debug!(?handle, bytes = vertex_bytes.len(), "overlay uploaded");
        self.overlays.insert(
            handle,
            AttachedOverlay {
                overlay,
                vertex_bytes,
            },
        );
        handle
    }

    fn detach_overlay(&mut self, handle: OverlayHandle) {
        self.overlays.remove(&handle);
    }
}

impl Ui for SimHost {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        debug!(user_id = %self.user_id, ?level, text = message, "notice");
        self.notices.push((level, message.to_string()));
    }

    fn render_history(&mut self, view: &HistoryView) {
        self.history = Some(view.clone());
    }
}

/// A participant running the module against its host
pub struct Client {
    pub host: SimHost,
    pub module: ModuleContext,
}

impl Client {
    /// Init and ready in one step
    pub fn connect(session: &Session, user_id: &str, role: Role, config: ModuleConfig) -> Result<Self, MoveError> {
        let mut client = Self {
            host: session.join(user_id, role),
            module: ModuleContext::init(config),
        };
        client.act(HostEvent::Ready)?;
        Ok(client)
    }

    pub fn user_id(&self) -> &str {
        self.host.user_id()
    }

    /// Handle a locally originated event
    pub fn act(&mut self, event: HostEvent) -> Result<(), MoveError> {
        self.module.handle(&mut self.host, event)
    }

    /// Handle everything delivered so far; returns how many events ran
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.host.inbox.try_recv() {
            let name = event.name();
            if let Err(err) = self.module.handle(&mut self.host, event) {
                warn!(user_id = %self.host.user_id, event = name, %err, "event handling failed");
            }
            handled += 1;
        }
        handled
    }

    pub fn select(&mut self, token: Option<TokenRef>) -> Result<(), MoveError> {
        if let Some(previous) = self.host.controlled.take() {
            self.act(HostEvent::TokenControlled {
                token: previous,
                controlled: false,
            })?;
        }
        self.host.controlled = token.clone();
        match token {
            Some(token) => self.act(HostEvent::TokenControlled {
                token,
                controlled: true,
            }),
            None => Ok(()),
        }
    }

    pub fn hover(&mut self, token: TokenRef, hovered: bool) -> Result<(), MoveError> {
        self.act(HostEvent::TokenHovered { token, hovered })
    }

    /// Overlay currently drawn in a channel
    pub fn path(&self, channel: OverlayChannel) -> Option<&PathOverlay> {
        self.module
            .overlay(channel)
            .and_then(|handle| self.host.overlay(handle))
    }

    /// Vertex buffer behind the overlay in a channel
    pub fn path_vertices(&self, channel: OverlayChannel) -> Option<&[u8]> {
        self.module
            .overlay(channel)
            .and_then(|handle| self.host.vertex_bytes(handle))
    }
}

/// Pump every client until no inbox has anything left
pub fn settle(clients: &mut [&mut Client]) {
    loop {
        let handled: usize = clients.iter_mut().map(|client| client.pump()).sum();
        if handled == 0 {
            break;
        }
    }
}
