/// Combat movement history for a tabletop host
///
/// Records token movement during combat into a shared, authority-owned ledger,
/// groups it for display, undoes the latest group and draws distance-banded
/// paths for the selected and hovered tokens.

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod ledger;
pub mod movement;
pub mod overlay;
pub mod sim;

#[cfg(test)]
mod testing;

pub use config::ModuleConfig;
pub use context::ModuleContext;
pub use error::MoveError;
pub use host::{Host, Role, TokenRef, TokenSnapshot};
pub use movement::{HostEvent, Ledger, MoveRecord};
