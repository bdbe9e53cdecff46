//! Combatant storage: the store port and a JSON file adapter.
//!
//! The engine reads and writes player records through
//! [`CombatantStore`]; where those records actually live is the bot's
//! business. [`JsonFileStore`] keeps one pretty-printed JSON file per
//! player under a directory, which is plenty for a single-process bot.

use crate::combatant::{Combatant, PlayerId};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Error type for combatant storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Source of truth for player records.
///
/// `load` resolves unknown players to `Ok(None)`. Implementations must
/// tolerate concurrent calls for different players; the engine already
/// serializes actions per player.
#[async_trait]
pub trait CombatantStore: Send + Sync {
    async fn load(&self, player: PlayerId) -> Result<Option<Combatant>, StoreError>;
    async fn save(&self, player: PlayerId, combatant: &Combatant) -> Result<(), StoreError>;
}

/// File-backed store, one `<player id>.json` per record.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, player: PlayerId) -> PathBuf {
        self.dir.join(format!("{}.json", player))
    }

    /// List every player id with a record on disk.
    pub async fn list_players(&self) -> Result<Vec<PlayerId>, StoreError> {
        let mut players = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(players),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<u64>().ok())
                {
                    players.push(PlayerId(id));
                }
            }
        }

        players.sort();
        Ok(players)
    }
}

#[async_trait]
impl CombatantStore for JsonFileStore {
    async fn load(&self, player: PlayerId) -> Result<Option<Combatant>, StoreError> {
        let content = match fs::read_to_string(self.record_path(player)).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let combatant: Combatant = serde_json::from_str(&content)?;
        Ok(Some(combatant))
    }

    async fn save(&self, player: PlayerId, combatant: &Combatant) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(combatant)?;
        fs::write(self.record_path(player), content).await?;
        tracing::debug!(player = %player, "saved combatant record");
        Ok(())
    }
}
