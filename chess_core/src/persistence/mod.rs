//! Saved games: the record format, the store that keeps them on disk, and
//! the background queue that writes auto-saves.

use crate::logic::game::GameSession;
use crate::logic::position::PositionError;
use crate::settings::{Difficulty, GameMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod queue;
pub mod store;

pub const DEFAULT_SAVE_NAME: &str = "Saved Game";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("save data is not valid: {0}")]
    Format(#[from] serde_json::Error),
    #[error("save {} has no position", path.display())]
    MissingPosition { path: PathBuf },
    #[error("failed to start the save writer")]
    Spawn(#[source] io::Error),
}

impl PersistError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One saved game. `file` is where the record was read from or written to
/// and is never stored inside the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSave {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub fen: String,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl GameSave {
    /// Captures the session as it stands now.
    #[must_use]
    pub fn snapshot(
        session: &GameSession,
        id: &str,
        name: &str,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            saved_at: Utc::now(),
            fen: session.current_fen(),
            mode: session.game_mode(),
            difficulty,
            history: session.move_history().to_vec(),
            file: None,
        }
    }

    #[must_use]
    pub fn fresh_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Loads the record into `session`. The session is untouched on error.
    pub fn restore_into(&self, session: &mut GameSession) -> Result<(), PositionError> {
        session.restore_from(&self.fen, self.history.clone())?;
        session.set_game_mode(self.mode);
        Ok(())
    }
}

/// Where saved games live.
pub trait SaveStore {
    /// Persists `save` and returns the record as stored, with its id, name,
    /// timestamp and file filled in.
    fn write(&self, save: &GameSave) -> Result<GameSave, PersistError>;

    /// Every readable save, newest first.
    fn list(&self) -> Result<Vec<GameSave>, PersistError>;

    fn load(&self, path: &Path) -> Result<GameSave, PersistError>;

    /// Returns whether anything was removed.
    fn delete(&self, save: &GameSave) -> Result<bool, PersistError>;
}

/// The sink a [`queue::CoalescingQueue`] drains into.
pub trait SnapshotWriter: Send + 'static {
    type Snapshot: Send + 'static;
    type Record: Send + 'static;

    fn write_snapshot(&mut self, snapshot: Self::Snapshot) -> Result<Self::Record, PersistError>;
}
