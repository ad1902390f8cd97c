/// Reference host: an in-process table session for demos and tests

pub mod session;
pub mod table;

pub use session::{settle, Client, Session, SettingsSlot, SimHost};
pub use table::{TableWorld, TokenSpec};
