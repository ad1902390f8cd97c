/// Module lifecycle context and host event dispatch
///
/// One `ModuleContext` exists per participant between init and unload. It owns
/// everything the module keeps between events (order counter, undo latch,
/// overlay slots, history window state) and maps each `HostEvent` onto the
/// recorder, store, undo and overlay logic. Host I/O goes through `Host`.

use tracing::{debug, error, info, warn};

use crate::config::ModuleConfig;
use crate::error::MoveError;
use crate::host::{Host, NoticeLevel, TokenRef};
use crate::ledger::command::{Command, RequestEnvelope};
use crate::ledger::store::{LedgerStore, Mutation};
use crate::movement::events::{clear_reason, ClearReason, HostEvent};
use crate::movement::grouping::HistoryView;
use crate::movement::record::{Ledger, MoveCounter, MoveRecord};
use crate::movement::recorder::{plan_record, MovementRecorder, RecordDecision};
use crate::movement::undo::{undo_last_group, UndoLatch, UndoOutcome};
use crate::overlay::path::build_path;
use crate::overlay::slots::{OverlayChannel, OverlayHandle, OverlaySlots};

pub struct ModuleContext {
    config: ModuleConfig,
    store: LedgerStore,
    recorder: MovementRecorder,
    latch: UndoLatch,
    overlays: OverlaySlots,
    history_open: bool,
}

impl ModuleContext {
    /// Module init: register against the configured namespace
    pub fn init(config: ModuleConfig) -> Self {
        let store = LedgerStore::new(config.socket_namespace());
        info!(module = %config.module_id, "move ledger initializing");
        Self {
            config,
            store,
            recorder: MovementRecorder::new(),
            latch: UndoLatch::new(),
            overlays: OverlaySlots::new(),
            history_open: false,
        }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn counter(&self) -> MoveCounter {
        self.recorder.counter()
    }

    /// Shared handle to the undo re-entrancy flag
    pub fn undo_latch(&self) -> UndoLatch {
        self.latch.clone()
    }

    pub fn overlay(&self, channel: OverlayChannel) -> Option<OverlayHandle> {
        self.overlays.handle(channel)
    }

    pub fn history_open(&self) -> bool {
        self.history_open
    }

    /// Dispatch one host event
    pub fn handle<H>(&mut self, host: &mut H, event: HostEvent) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        debug!(
            event = event.name(),
            token_id = event.token().map(|token| token.token_id.as_str()),
            "host event"
        );

        if let Some(reason) = clear_reason(&event, &self.config.initiative_marker) {
            return match reason {
                ClearReason::UserRequest => self.clear_history(host),
                reason => self.on_lifecycle_clear(host, reason),
            };
        }

        match event {
            HostEvent::Ready => {
                self.on_ready(host);
                Ok(())
            }
            HostEvent::TokenMoved { token, change_id } => self.on_token_moved(host, &token, change_id),
            HostEvent::TokenControlled { token, controlled } => {
                if controlled {
                    self.draw_path(host, &token, OverlayChannel::Selection);
                } else {
                    self.overlays.clear(host, OverlayChannel::Selection);
                }
                Ok(())
            }
            HostEvent::TokenHovered { token, hovered } => {
                if hovered {
                    self.draw_path(host, &token, OverlayChannel::Hover);
                } else {
                    self.overlays.clear(host, OverlayChannel::Hover);
                }
                Ok(())
            }
            HostEvent::LedgerChanged(ledger) => {
                self.on_ledger_changed(host, &ledger);
                Ok(())
            }
            HostEvent::SocketMessage { namespace, payload } => {
                self.on_socket_message(host, &namespace, &payload);
                Ok(())
            }
            HostEvent::OpenHistory => {
                self.history_open = true;
                self.refresh_history(host);
                Ok(())
            }
            HostEvent::CloseHistory => {
                self.history_open = false;
                Ok(())
            }
            HostEvent::UndoRequested => self.undo(host).map(|_| ()),
            HostEvent::Unload => {
                self.unload(host);
                Ok(())
            }
            // lifecycle clears were handled above
            HostEvent::CombatDeleted { .. }
            | HostEvent::CombatUpdated { .. }
            | HostEvent::ChatMessageCreated { .. }
            | HostEvent::ClearRequested => Ok(()),
        }
    }

    fn on_ready<H>(&mut self, host: &mut H)
    where
        H: Host + ?Sized,
    {
        let ledger = self.store.read(host);
        self.recorder.reseed(&ledger);
        info!(
            move_order = self.recorder.counter().current(),
            records = ledger.len(),
            "move counter seeded"
        );
    }

    /// Record a token change reported by the host
    pub fn on_token_moved<H>(
        &mut self,
        host: &mut H,
        token: &TokenRef,
        change_id: u64,
    ) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        if self.latch.is_engaged() {
            debug!(token_id = %token.token_id, "undo in progress, change not recorded");
            return Ok(());
        }

        let waypoints = host.waypoints(&token.scene_id, &token.token_id);
        if waypoints.is_empty() {
            return Ok(());
        }

        let Some(snapshot) = host.token(&token.scene_id, &token.token_id) else {
            warn!(token_id = %token.token_id, "moved token vanished before recording");
            return Ok(());
        };

        match plan_record(&snapshot, &waypoints, host.combat_active()) {
            RecordDecision::Ignore => return Ok(()),
            RecordDecision::Discard => {
                debug!(token_id = %token.token_id, "not in combat, movement not recorded");
                if host.is_authority() || host.can_modify(&token.scene_id, &token.token_id) {
                    host.clear_waypoints(&token.scene_id, &token.token_id)?;
                }
                return Ok(());
            }
            RecordDecision::Record(record) => {
                if host.is_authority() {
                    self.append_stamped(host, record, Some(change_id))?;
                } else {
                    self.store.append(host, record, Some(change_id))?;
                }
            }
        }

        self.refresh_history(host);
        if host.controlled_token().as_ref() == Some(token) {
            self.draw_path(host, token, OverlayChannel::Selection);
        }
        Ok(())
    }

    /// Stamp and persist on the authority, then drop the host's waypoints
    fn append_stamped<H>(
        &mut self,
        host: &mut H,
        record: MoveRecord,
        change_id: Option<u64>,
    ) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        let scene_id = record.scene_id.clone();
        let token_id = record.token_id.clone();

        match self.recorder.stamp(record, change_id) {
            Some(stamped) => {
                self.store.append(host, stamped, change_id)?;
            }
            None => debug!(%token_id, ?change_id, "change already recorded"),
        }

        if host.token(&scene_id, &token_id).is_some() {
            host.clear_waypoints(&scene_id, &token_id)?;
        }
        Ok(())
    }

    /// Persisted ledger changed somewhere
    pub fn on_ledger_changed<H>(&mut self, host: &mut H, ledger: &Ledger)
    where
        H: Host + ?Sized,
    {
        // counter moves only on ready, stamp and clear
        debug!(records = ledger.len(), "ledger changed");
        self.refresh_history(host);
        self.redraw_selection(host);
    }

    /// Authority-side handler for forwarded ledger requests.
    ///
    /// Malformed payloads are logged and dropped so one bad message never
    /// breaks the event loop.
    pub fn on_socket_message<H>(&mut self, host: &mut H, namespace: &str, payload: &[u8])
    where
        H: Host + ?Sized,
    {
        if namespace != self.store.namespace() || !host.is_authority() {
            return;
        }

        let envelope = match RequestEnvelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(%err, "dropping malformed ledger request");
                return;
            }
        };

        let action = envelope.command.action();
        debug!(sender = %envelope.sender, action, "ledger request received");

        if let Err(err) = self.dispatch(host, envelope.command) {
            error!(sender = %envelope.sender, action, %err, "ledger request failed");
        }
    }

    fn dispatch<H>(&mut self, host: &mut H, command: Command) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        match command {
            Command::Append { record, change_id } => self.append_stamped(host, record, change_id),
            Command::Replace { history } => self.store.replace(host, history).map(|_| ()),
            Command::Clear => {
                self.store.clear(host)?;
                self.recorder.reset();
                Ok(())
            }
        }
    }

    /// Undo button: revert the most recent group and report to the user
    pub fn undo<H>(&mut self, host: &mut H) -> Result<UndoOutcome, MoveError>
    where
        H: Host + ?Sized,
    {
        let result = undo_last_group(host, &self.store, &self.latch);

        match &result {
            Ok(UndoOutcome::NothingToUndo) => {
                host.notify(NoticeLevel::Warning, &self.config.messages.nothing_to_undo);
            }
            Ok(UndoOutcome::Undone { .. }) => {
                host.notify(NoticeLevel::Info, &self.config.messages.undo_done);
            }
            Err(err) if err.is_missing_entity() => {
                host.notify(NoticeLevel::Error, &self.config.messages.token_missing);
            }
            Err(err) => {
                host.notify(NoticeLevel::Error, &err.to_string());
            }
        }

        self.refresh_history(host);
        match host.controlled_token() {
            Some(token) => self.draw_path(host, &token, OverlayChannel::Selection),
            None => self.overlays.clear(host, OverlayChannel::Selection),
        }

        result
    }

    /// Clear button: wipe the ledger (directly or via the authority)
    pub fn clear_history<H>(&mut self, host: &mut H) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        if self.store.clear(host)? == Mutation::Applied {
            self.recorder.reset();
        }
        host.notify(NoticeLevel::Info, &self.config.messages.history_cleared);
        self.refresh_history(host);
        Ok(())
    }

    /// Combat end, round change or initiative marker; authority only
    fn on_lifecycle_clear<H>(&mut self, host: &mut H, reason: ClearReason) -> Result<(), MoveError>
    where
        H: Host + ?Sized,
    {
        if !host.is_authority() {
            return Ok(());
        }

        self.store.clear(host)?;
        self.recorder.reset();
        self.overlays.clear_all(host);
        info!(?reason, "movement history cleared");

        match reason {
            ClearReason::CombatEnded => {
                host.notify(NoticeLevel::Info, &self.config.messages.combat_ended);
            }
            ClearReason::RoundChanged(round) => {
                host.notify(NoticeLevel::Info, &self.config.messages.round_reset(round));
            }
            ClearReason::InitiativeProcess | ClearReason::UserRequest => {}
        }
        Ok(())
    }

    /// Module teardown: drop overlays and close the window
    pub fn unload<H>(&mut self, host: &mut H)
    where
        H: Host + ?Sized,
    {
        self.overlays.clear_all(host);
        self.history_open = false;
        info!("move ledger unloaded");
    }

    fn refresh_history<H>(&self, host: &mut H)
    where
        H: Host + ?Sized,
    {
        if !self.history_open {
            return;
        }
        let ledger = self.store.read(host);
        let view = HistoryView::prepare(&ledger, host);
        host.render_history(&view);
    }

    fn redraw_selection<H>(&mut self, host: &mut H)
    where
        H: Host + ?Sized,
    {
        if let Some(token) = host.controlled_token() {
            self.draw_path(host, &token, OverlayChannel::Selection);
        }
    }

    /// Render a token's path into one channel, replacing what was there
    pub fn draw_path<H>(&mut self, host: &mut H, token: &TokenRef, channel: OverlayChannel)
    where
        H: Host + ?Sized,
    {
        if !host.canvas_ready() {
            return;
        }

        let overlay = host.token(&token.scene_id, &token.token_id).and_then(|snapshot| {
            let grid_size = host.grid_size(&snapshot.scene_id)?;
            let ledger = self.store.read(host);
            build_path(&ledger, &snapshot, grid_size, &self.config.path)
        });

        if let Some(overlay) = &overlay {
            debug!(
                token_id = %token.token_id,
                ?channel,
                segments = overlay.segments.len(),
                total = overlay.total_distance(),
                "drawing movement path"
            );
        }
        self.overlays.replace(host, channel, overlay);
    }
}
