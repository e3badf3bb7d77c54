//! Score persistence
//!
//! Scores are keyed by lowercased chat name. The file-backed store rewrites the
//! whole JSON document on every change; score tables for a single channel stay small.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::chat::UserId;
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Score table, ordered by user for stable chat output
pub type ScoreTable = BTreeMap<UserId, UserScore>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScore {
    pub score: u64,
    #[serde(default)]
    pub last_correct_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Add one point for `user` and return the new score
    async fn increment(&self, user: &str) -> StoreResult<u64>;

    /// Current score for `user` (0 if unknown)
    async fn read_one(&self, user: &str) -> StoreResult<u64>;

    async fn read_all(&self) -> StoreResult<ScoreTable>;

    /// Clear all scores and return the table as it was before the reset
    async fn reset_all(&self) -> StoreResult<ScoreTable>;
}

fn bump(table: &mut ScoreTable, user: &str) -> u64 {
    let entry = table.entry(user.to_string()).or_default();
    entry.score += 1;
    entry.last_correct_at = Some(Utc::now());
    entry.score
}

/// In-memory store, used when no scores file is configured
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    table: Mutex<ScoreTable>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn increment(&self, user: &str) -> StoreResult<u64> {
        Ok(bump(&mut *self.table.lock().await, user))
    }

    async fn read_one(&self, user: &str) -> StoreResult<u64> {
        Ok(self
            .table
            .lock()
            .await
            .get(user)
            .map(|s| s.score)
            .unwrap_or(0))
    }

    async fn read_all(&self) -> StoreResult<ScoreTable> {
        Ok(self.table.lock().await.clone())
    }

    async fn reset_all(&self) -> StoreResult<ScoreTable> {
        Ok(std::mem::take(&mut *self.table.lock().await))
    }
}

/// JSON file store. A missing file reads as an empty table.
#[derive(Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFileScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StoreResult<ScoreTable> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) if json.trim().is_empty() => Ok(ScoreTable::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ScoreTable::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, table: &ScoreTable) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(table)?;
        // Write to a sibling file first so a crash never leaves a truncated table
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for JsonFileScoreStore {
    async fn increment(&self, user: &str) -> StoreResult<u64> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        let score = bump(&mut table, user);
        self.save(&table).await?;
        tracing::debug!("Stored score {} for {}", score, user);
        Ok(score)
    }

    async fn read_one(&self, user: &str) -> StoreResult<u64> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(user).map(|s| s.score).unwrap_or(0))
    }

    async fn read_all(&self) -> StoreResult<ScoreTable> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn reset_all(&self) -> StoreResult<ScoreTable> {
        let _guard = self.lock.lock().await;
        let previous = self.load().await?;
        self.save(&ScoreTable::new()).await?;
        tracing::info!("Reset scores of {} users", previous.len());
        Ok(previous)
    }
}
