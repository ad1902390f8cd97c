/// JSON file backing for the world-scoped ledger slot

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::MoveError;
use crate::movement::record::Ledger;

/// Ledger persisted as a JSON array on disk, cached in memory
#[derive(Debug)]
pub struct FileLedgerSlot {
    path: PathBuf,
    cached: Ledger,
}

impl FileLedgerSlot {
    /// Open the slot; a missing file is an empty ledger
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MoveError> {
        let path = path.into();
        let cached = if path.exists() {
            let json = fs::read_to_string(&path)?;
            Ledger::from_json(&json)?
        } else {
            Ledger::new()
        };
        Ok(Self { path, cached })
    }

    /// Like `open`, but a corrupt file starts an empty ledger instead of failing
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::open(path.clone()).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "ledger file unreadable, starting empty");
            Self {
                path,
                cached: Ledger::new(),
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &Ledger {
        &self.cached
    }

    pub fn set(&mut self, ledger: Ledger) -> Result<(), MoveError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, ledger.to_json()?)?;
        self.cached = ledger;
        Ok(())
    }
}
