//! Temporary resource management
//!
//! Every piece of content a script supplies inline (scripts, docker
//! configs, kubeconfigs) is materialized into its own uniquely-named
//! scratch directory. The manager records everything it creates and is
//! drained exactly once at teardown; removal is best-effort and never
//! aborts part-way because one directory failed to go away.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use capstan_core::Result;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const TEMP_PREFIX: &str = "capstan-";

/// Tracked scratch directories for one pipeline run
///
/// The manager exclusively owns the directories it creates; no other
/// component removes them.
#[derive(Default)]
pub struct TempResources {
    dirs: Mutex<Vec<TempDir>>,
}

impl TempResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh scratch directory under the platform temp root
    pub fn create_dir(&self) -> Result<PathBuf> {
        let dir = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
        let path = dir.path().to_path_buf();
        self.dirs.lock().unwrap().push(dir);
        debug!("created temporary directory: {}", path.display());
        Ok(path)
    }

    /// Write `content` to `name` inside a fresh scratch directory
    pub fn create_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let dir = self.create_dir()?;
        let file = dir.join(name);
        fs::write(&file, content)?;
        Ok(file)
    }

    /// Paths of every directory currently tracked
    pub fn paths(&self) -> Vec<PathBuf> {
        self.dirs
            .lock()
            .unwrap()
            .iter()
            .map(|dir| dir.path().to_path_buf())
            .collect()
    }

    /// Remove every tracked directory, best-effort
    ///
    /// Individual failures are logged and skipped so every remaining
    /// directory still gets a removal attempt.
    pub fn release_all(&self) {
        let dirs: Vec<TempDir> = self.dirs.lock().unwrap().drain(..).collect();
        for dir in dirs {
            let path = dir.path().to_path_buf();
            info!("remove temporary directory: {}", path.display());
            if let Err(e) = dir.close() {
                warn!("failed to remove {}: {}", path.display(), e);
            }
        }
    }

    /// Keep every tracked directory on disk and stop tracking it
    ///
    /// Used when a run retains its resources for inspection; the paths are
    /// logged so the operator can find them.
    pub fn detach_all(&self) {
        let dirs: Vec<TempDir> = self.dirs.lock().unwrap().drain(..).collect();
        for dir in dirs {
            let path = dir.keep();
            info!("retaining temporary directory: {}", path.display());
        }
    }
}
