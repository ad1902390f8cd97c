/// Ledger mutation requests sent from players to the authority
///
/// Requests ride the best-effort broadcast channel as JSON objects tagged by
/// `action`. There is no acknowledgment: if no authority is connected the
/// request is lost.

use serde::{Deserialize, Serialize};

use crate::error::MoveError;
use crate::movement::record::{Ledger, MoveRecord};

/// Mutation a non-authority participant asks the authority to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    /// Append one unstamped record; the authority assigns `move_order`
    #[serde(rename = "saveMoveHistory")]
    Append {
        #[serde(rename = "moveData")]
        record: MoveRecord,
        /// Host change id, lets the authority drop duplicates
        #[serde(rename = "changeId", default, skip_serializing_if = "Option::is_none")]
        change_id: Option<u64>,
    },

    /// Overwrite the whole ledger (undo from a player)
    #[serde(rename = "setMoveHistory")]
    Replace { history: Ledger },

    #[serde(rename = "clearMoveHistory")]
    Clear,
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::Append { .. } => "saveMoveHistory",
            Command::Replace { .. } => "setMoveHistory",
            Command::Clear => "clearMoveHistory",
        }
    }
}

/// Command plus the participant that sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Empty when the sending build does not tag its requests
    #[serde(default)]
    pub sender: String,

    #[serde(flatten)]
    pub command: Command,
}

impl RequestEnvelope {
    pub fn new(sender: impl Into<String>, command: Command) -> Self {
        Self {
            sender: sender.into(),
            command,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, MoveError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MoveError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
