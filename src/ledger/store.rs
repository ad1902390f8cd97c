/// Role-gated access to the persisted ledger
///
/// Reads always come from the host's settings slot. Writes happen directly
/// when the local participant is the authority; otherwise they are encoded
/// as a `Command` and broadcast for the authority to apply. Change
/// notifications are the host's job: every successful slot write must reach
/// all participants as `HostEvent::LedgerChanged`.

use tracing::{debug, info};

use crate::error::MoveError;
use crate::host::{Broadcast, LedgerSlot, Participant};
use crate::ledger::command::{Command, RequestEnvelope};
use crate::movement::record::{Ledger, MoveRecord};

/// Result of a mutation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Written to the slot by this participant
    Applied,
    /// Sent to the authority, nothing changed locally
    Forwarded,
}

#[derive(Debug, Clone)]
pub struct LedgerStore {
    namespace: String,
}

impl LedgerStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Socket namespace requests travel on
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn read<H>(&self, host: &H) -> Ledger
    where
        H: LedgerSlot + ?Sized,
    {
        host.read_ledger()
    }

    /// Append a record. The authority expects `record` to be stamped already;
    /// a player sends it unstamped along with the host change id.
    pub fn append<H>(
        &self,
        host: &mut H,
        record: MoveRecord,
        change_id: Option<u64>,
    ) -> Result<Mutation, MoveError>
    where
        H: Participant + LedgerSlot + Broadcast + ?Sized,
    {
        if !host.is_authority() {
            self.forward(host, Command::Append { record, change_id })?;
            return Ok(Mutation::Forwarded);
        }

        let mut ledger = host.read_ledger();
        let move_order = record.move_order;
        let token_id = record.token_id.clone();
        ledger.push(record);
        let total = ledger.len();
        host.write_ledger(ledger)?;
        info!(%token_id, move_order, total, "movement recorded");
        Ok(Mutation::Applied)
    }

    pub fn replace<H>(&self, host: &mut H, ledger: Ledger) -> Result<Mutation, MoveError>
    where
        H: Participant + LedgerSlot + Broadcast + ?Sized,
    {
        if !host.is_authority() {
            self.forward(host, Command::Replace { history: ledger })?;
            return Ok(Mutation::Forwarded);
        }

        let remaining = ledger.len();
        host.write_ledger(ledger)?;
        info!(remaining, "ledger replaced");
        Ok(Mutation::Applied)
    }

    pub fn clear<H>(&self, host: &mut H) -> Result<Mutation, MoveError>
    where
        H: Participant + LedgerSlot + Broadcast + ?Sized,
    {
        if !host.is_authority() {
            self.forward(host, Command::Clear)?;
            return Ok(Mutation::Forwarded);
        }

        host.write_ledger(Ledger::new())?;
        info!("ledger cleared");
        Ok(Mutation::Applied)
    }

    fn forward<H>(&self, host: &mut H, command: Command) -> Result<(), MoveError>
    where
        H: Participant + Broadcast + ?Sized,
    {
        let action = command.action();
        let envelope = RequestEnvelope::new(host.user_id(), command);
        let payload = envelope.encode()?;
        debug!(action, namespace = %self.namespace, "forwarding ledger request to authority");
        host.emit(&self.namespace, payload);
        Ok(())
    }
}
