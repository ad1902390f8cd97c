/// Shared ledger persistence and the authority request protocol

pub mod command;
pub mod file_slot;
pub mod store;

pub use command::{Command, RequestEnvelope};
pub use file_slot::FileLedgerSlot;
pub use store::{LedgerStore, Mutation};
