//! On-disk persistence for the training loop.
//!
//! A checkpoint directory holds the champion model and the replay buffer as
//! MessagePack blobs plus a small JSON metadata file.
//!
//! The three files change together. New blobs are written under a `.next`
//! name, then the staged metadata is written, which commits the set, and
//! finally each staged file is renamed into place. [`CheckpointDir::recover`]
//! finishes a committed set or discards an uncommitted one, so the files on
//! disk always describe the same iteration.

use crate::coach::IterationSummary;
use alphazero_core::{Result, ZeroError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CHAMPION_FILE: &str = "champion.msgpack";
pub const REPLAY_FILE: &str = "replay.msgpack";
pub const META_FILE: &str = "meta.json";

const STAGED_SUFFIX: &str = ".next";

/// Loop progress stored next to the blobs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Iterations completed so far.
    pub iteration: usize,

    /// Number of promotions so far.
    pub generation: usize,

    pub seed: u64,

    pub history: Vec<IterationSummary>,
}

/// Paths inside a checkpoint directory.
#[derive(Clone, Debug)]
pub struct CheckpointDir {
    root: PathBuf,
}

impl CheckpointDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| ZeroError::checkpoint(&self.root, e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn champion_path(&self) -> PathBuf {
        self.root.join(CHAMPION_FILE)
    }

    pub fn replay_path(&self) -> PathBuf {
        self.root.join(REPLAY_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.root.join(META_FILE)
    }

    /// Where the next champion is written before commit.
    pub fn staged_champion_path(&self) -> PathBuf {
        staged(&self.champion_path())
    }

    /// Where the next replay buffer is written before commit.
    pub fn staged_replay_path(&self) -> PathBuf {
        staged(&self.replay_path())
    }

    fn staged_meta_path(&self) -> PathBuf {
        staged(&self.meta_path())
    }

    /// Whether a complete checkpoint is present.
    pub fn exists(&self) -> bool {
        self.meta_path().is_file() && self.champion_path().is_file() && self.replay_path().is_file()
    }

    /// Commit the staged blobs together with `meta` and move them into place.
    pub fn commit(&self, meta: &CheckpointMeta) -> Result<()> {
        let path = self.staged_meta_path();
        let json = serde_json::to_vec_pretty(meta).map_err(|e| ZeroError::checkpoint(&path, e))?;
        write_atomic(&path, |writer| {
            writer.write_all(&json).map_err(|e| ZeroError::checkpoint(&path, e))
        })?;
        self.recover()
    }

    /// Bring the directory back to one consistent set after an interrupted
    /// save. Staged metadata marks a committed set whose remaining renames
    /// are replayed; without it, staged blobs are stale and removed.
    pub fn recover(&self) -> Result<()> {
        let staged_meta = self.staged_meta_path();
        let blobs = [
            (self.staged_champion_path(), self.champion_path()),
            (self.staged_replay_path(), self.replay_path()),
        ];

        if staged_meta.is_file() {
            for (from, to) in &blobs {
                if from.is_file() {
                    fs::rename(from, to).map_err(|e| ZeroError::checkpoint(to, e))?;
                }
            }
            let meta = self.meta_path();
            fs::rename(&staged_meta, &meta).map_err(|e| ZeroError::checkpoint(&meta, e))?;
        } else {
            for (from, _) in &blobs {
                if from.is_file() {
                    warn!(path = %from.display(), "discarding uncommitted checkpoint file");
                    fs::remove_file(from).map_err(|e| ZeroError::checkpoint(from, e))?;
                }
            }
        }
        Ok(())
    }

    pub fn read_meta(&self) -> Result<CheckpointMeta> {
        let path = self.meta_path();
        let file = File::open(&path).map_err(|e| ZeroError::checkpoint(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| ZeroError::checkpoint(&path, e))
    }
}

fn staged(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(STAGED_SUFFIX);
    PathBuf::from(name)
}

/// Serialize `value` as MessagePack with named fields.
pub fn write_msgpack<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |writer| {
        rmp_serde::encode::write_named(writer, value).map_err(|e| ZeroError::checkpoint(path, e))
    })
}

/// Deserialize a MessagePack blob written by [`write_msgpack`].
pub fn read_msgpack<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| ZeroError::checkpoint(path, e))?;
    rmp_serde::decode::from_read(BufReader::new(file)).map_err(|e| ZeroError::checkpoint(path, e))
}

fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = path.with_extension("tmp");
    let file = File::create(&tmp).map_err(|e| ZeroError::checkpoint(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| ZeroError::checkpoint(&tmp, e))?;
    drop(writer);
    fs::rename(&tmp, path).map_err(|e| ZeroError::checkpoint(path, e))
}
