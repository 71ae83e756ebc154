//! Policy checkpoint persistence.
//!
//! Stores opaque policy state blobs, one file per checkpoint, named
//! deterministically from the episode index and the best reward achieved
//! so far. The checkpoint directory is created on first use. Old
//! checkpoints beyond a retention count are cleaned up; the file whose
//! name carries the best reward is never deleted.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Configuration for the checkpointer.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// Directory to store checkpoints.
    pub checkpoint_dir: PathBuf,
    /// Number of recent checkpoints to keep (0 = keep all).
    pub keep_last_n: usize,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("./checkpoints"),
            keep_last_n: 5,
        }
    }
}

impl CheckpointerConfig {
    /// Create a config with the given checkpoint directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set the number of checkpoints to keep.
    pub fn with_keep_last_n(mut self, n: usize) -> Self {
        self.keep_last_n = n;
        self
    }
}

/// Error type for checkpointing operations.
#[derive(Debug)]
pub enum CheckpointError {
    /// IO error during save/load.
    Io(io::Error),
    /// No checkpoints found.
    NoCheckpoints,
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(e) => write!(f, "IO error: {}", e),
            CheckpointError::NoCheckpoints => write!(f, "no checkpoints found"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Checkpoint metadata.
#[derive(Debug, Clone)]
pub struct CheckpointInfo {
    /// Path to the checkpoint file.
    pub path: PathBuf,
    /// Episode at which the checkpoint was saved.
    pub episode: u64,
}

/// Persists opaque policy blobs with best-reward naming and cleanup.
pub struct Checkpointer {
    config: CheckpointerConfig,
    history: Vec<CheckpointInfo>,
    best_path: Option<PathBuf>,
}

impl Checkpointer {
    /// Create a checkpointer, creating the directory if needed.
    pub fn new(config: CheckpointerConfig) -> Result<Self, CheckpointError> {
        fs::create_dir_all(&config.checkpoint_dir)?;
        Ok(Self {
            config,
            history: Vec::new(),
            best_path: None,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CheckpointerConfig {
        &self.config
    }

    /// Save a policy blob for `episode` with the best reward so far.
    pub fn save(
        &mut self,
        blob: &[u8],
        episode: u64,
        best_reward: f64,
    ) -> Result<PathBuf, CheckpointError> {
        let filename = format!("episode_{:06}_reward_{:.3}.bin", episode, best_reward);
        let path = self.config.checkpoint_dir.join(&filename);
        fs::write(&path, blob)?;

        self.best_path = Some(path.clone());
        self.history.push(CheckpointInfo {
            path: path.clone(),
            episode,
        });
        self.cleanup_old_checkpoints();

        Ok(path)
    }

    /// Load a checkpoint blob from a file.
    pub fn load(&self, path: &Path) -> Result<Vec<u8>, CheckpointError> {
        Ok(fs::read(path)?)
    }

    /// Load the most recently saved checkpoint of this run.
    pub fn load_latest(&self) -> Result<Vec<u8>, CheckpointError> {
        let latest = self.history.last().ok_or(CheckpointError::NoCheckpoints)?;
        self.load(&latest.path)
    }

    /// List checkpoint files present in the directory, episode-ordered.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.config.checkpoint_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let filename = path.file_name()?.to_str()?;
                if !filename.starts_with("episode_") || !filename.ends_with(".bin") {
                    return None;
                }
                let episode = filename
                    .strip_prefix("episode_")?
                    .split('_')
                    .next()?
                    .parse()
                    .ok()?;
                Some(CheckpointInfo { path, episode })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.episode);
        Ok(checkpoints)
    }

    /// Remove checkpoints beyond the retention count, preserving the one
    /// that carries the best reward.
    fn cleanup_old_checkpoints(&mut self) {
        if self.config.keep_last_n == 0 {
            return;
        }
        while self.history.len() > self.config.keep_last_n {
            let old = self.history.remove(0);
            if Some(&old.path) != self.best_path.as_ref() {
                let _ = fs::remove_file(&old.path);
            }
        }
    }
}
