/// Error type shared by the ledger, recorder, undo and overlay paths

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("token {token_id} not found in scene {scene_id}")]
    TokenNotFound { scene_id: String, token_id: String },

    #[error("scene {0} not found")]
    SceneNotFound(String),

    /// The host refused or failed an update (reposition, waypoint clear, settings write)
    #[error("host operation failed: {0}")]
    Host(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MoveError {
    pub fn token_not_found(scene_id: &str, token_id: &str) -> Self {
        Self::TokenNotFound {
            scene_id: scene_id.to_string(),
            token_id: token_id.to_string(),
        }
    }

    /// Missing-entity errors abort an operation before any mutation
    pub fn is_missing_entity(&self) -> bool {
        matches!(self, Self::TokenNotFound { .. } | Self::SceneNotFound(_))
    }
}
