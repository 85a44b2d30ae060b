//! Best-effort local state: the last completed result, the profile that
//! produced it, and the api token. Each key is one JSON file in a directory.

use crate::domain::{TaskId, UserProfile};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const LAST_RESULT_KEY: &str = "investment_recommendations";
pub const PROFILE_KEY: &str = "user_profile";
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub task_id: TaskId,
    pub saved_at: DateTime<Utc>,
    pub result: Value,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache dir {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(value).context("failed to encode cache entry")?;
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Missing entries are `None`. Corrupt entries are logged and also `None`.
    fn read<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => Ok(Some(v)),
            Err(err) => {
                tracing::warn!(key, path = %path.display(), error = %err, "ignoring corrupt cache entry");
                Ok(None)
            }
        }
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    pub fn save_last_result(&self, task_id: &TaskId, result: &Value) -> anyhow::Result<CachedResult> {
        let entry = CachedResult {
            task_id: task_id.clone(),
            saved_at: Utc::now(),
            result: result.clone(),
        };
        self.write(LAST_RESULT_KEY, &entry)?;
        Ok(entry)
    }

    pub fn load_last_result(&self) -> anyhow::Result<Option<CachedResult>> {
        self.read(LAST_RESULT_KEY)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        self.write(PROFILE_KEY, profile)
    }

    pub fn load_profile(&self) -> anyhow::Result<Option<UserProfile>> {
        self.read(PROFILE_KEY)
    }

    pub fn save_token(&self, token: &str) -> anyhow::Result<()> {
        self.write(TOKEN_KEY, &token.trim())
    }

    pub fn load_token(&self) -> anyhow::Result<Option<String>> {
        Ok(self
            .read::<String>(TOKEN_KEY)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Drop the cached result and profile. The token is kept.
    pub fn clear(&self) -> anyhow::Result<()> {
        self.remove(LAST_RESULT_KEY)?;
        self.remove(PROFILE_KEY)?;
        Ok(())
    }
}
