use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = ".chess-studio";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    SinglePlayer,
    TwoPlayer,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SinglePlayer => "Single Player",
            Self::TwoPlayer => "Two Player",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Plies searched by the computer. Easy plays random legal moves.
    #[must_use]
    pub const fn search_depth(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 4,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeControl {
    #[default]
    None,
    Sec30,
    Sec60,
    Sec120,
    Sec300,
}

impl TimeControl {
    #[must_use]
    pub const fn seconds_per_turn(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Sec30 => 30,
            Self::Sec60 => 60,
            Self::Sec120 => 120,
            Self::Sec300 => 300,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub game_mode: GameMode,
    pub difficulty: Difficulty,
    pub time_control: TimeControl,
    /// Floor on how fast the computer appears to answer.
    pub min_thinking_ms: u64,
    pub save_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            game_mode: GameMode::SinglePlayer,
            difficulty: Difficulty::Medium,
            time_control: TimeControl::None,
            min_thinking_ms: 2_000,
            save_dir: default_save_dir(),
        }
    }
}

impl AppSettings {
    #[must_use]
    pub const fn min_thinking_time(&self) -> Duration {
        Duration::from_millis(self.min_thinking_ms)
    }

    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(io_err)
    }
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[must_use]
pub fn default_save_dir() -> PathBuf {
    app_dir().join("saves")
}

#[must_use]
pub fn default_settings_path() -> PathBuf {
    app_dir().join("settings.json")
}
