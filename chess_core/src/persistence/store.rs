use crate::persistence::{GameSave, PersistError, SaveStore, SnapshotWriter, DEFAULT_SAVE_NAME};
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SAVE_SUFFIX: &str = ".save.json";

/// Saves as pretty-printed JSON files, one per game, in a single directory.
#[derive(Debug, Clone)]
pub struct JsonSaveStore {
    dir: PathBuf,
}

impl JsonSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|err| PersistError::io(&self.dir, err))
    }

    fn target(&self, save: &GameSave, id: &str) -> PathBuf {
        save.file
            .clone()
            .unwrap_or_else(|| self.dir.join(format!("{id}{SAVE_SUFFIX}")))
    }
}

impl SaveStore for JsonSaveStore {
    fn write(&self, save: &GameSave) -> Result<GameSave, PersistError> {
        self.ensure_dir()?;

        let mut stored = save.clone();
        if stored.id.trim().is_empty() {
            stored.id = GameSave::fresh_id();
        }
        if stored.name.trim().is_empty() {
            stored.name = DEFAULT_SAVE_NAME.to_string();
        }
        stored.saved_at = Utc::now();
        let path = self.target(save, &stored.id);

        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&path, json).map_err(|err| PersistError::io(&path, err))?;
        log::debug!("saved game {} to {}", stored.id, path.display());

        stored.file = Some(path);
        Ok(stored)
    }

    fn list(&self) -> Result<Vec<GameSave>, PersistError> {
        self.ensure_dir()?;
        let entries = fs::read_dir(&self.dir).map_err(|err| PersistError::io(&self.dir, err))?;

        let mut saves: Vec<GameSave> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with(SAVE_SUFFIX))
            })
            .filter_map(|path| match self.load(&path) {
                Ok(save) => Some(save),
                Err(err) => {
                    log::warn!("skipping unreadable save: {err}");
                    None
                }
            })
            .collect();
        saves.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saves)
    }

    fn load(&self, path: &Path) -> Result<GameSave, PersistError> {
        let contents = fs::read_to_string(path).map_err(|err| PersistError::io(path, err))?;
        let mut save: GameSave = serde_json::from_str(&contents)?;
        if save.fen.trim().is_empty() {
            return Err(PersistError::MissingPosition {
                path: path.to_path_buf(),
            });
        }
        if save.id.trim().is_empty() {
            save.id = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.trim_end_matches(SAVE_SUFFIX).to_string())
                .unwrap_or_default();
        }
        if save.name.trim().is_empty() {
            save.name = DEFAULT_SAVE_NAME.to_string();
        }
        save.file = Some(path.to_path_buf());
        Ok(save)
    }

    fn delete(&self, save: &GameSave) -> Result<bool, PersistError> {
        let Some(path) = &save.file else {
            return Ok(false);
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(PersistError::io(path, err)),
        }
    }
}

impl SnapshotWriter for JsonSaveStore {
    type Snapshot = GameSave;
    type Record = GameSave;

    fn write_snapshot(&mut self, snapshot: GameSave) -> Result<GameSave, PersistError> {
        self.write(&snapshot)
    }
}
