//! On-disk JSON snapshot of the last served articles and overall sentiment.
//!
//! Durability fallback only: the periodic refresh task overwrites it, readers
//! use it to serve something meaningful right after a restart. It is not part
//! of the cache core and snapshot failures are never fatal.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::article::{Article, OverallSentiment};
use crate::cache::now_ms;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at_ms: u64,
    pub articles: Vec<Article>,
    pub overall: OverallSentiment,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// None when the file is missing or unreadable; a corrupt snapshot is
    /// treated as absent, not as an error.
    pub fn load(&self) -> Option<Snapshot> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding corrupt snapshot");
                None
            }
        }
    }

    /// Atomic write: tmp file in the same directory, then rename.
    pub fn save(&self, articles: &[Article], overall: &OverallSentiment) -> Result<()> {
        let snapshot = Snapshot {
            saved_at_ms: now_ms(),
            articles: articles.to_vec(),
            overall: overall.clone(),
        };

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&snapshot)?;
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
