//! Durable per-user state for credentials and session context.
//!
//! Every value lives in its own flat file under `~/.forefront` so partial
//! state is always representable: losing the org id never invalidates the
//! project id. Callers must treat the empty string as "not configured".

use crate::errors::{ForefrontError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CREDENTIALS_FILE: &str = "credentials";
const PROJECT_FILE: &str = "project";
const ORG_FILE: &str = "org";
const DATASET_FILE: &str = "dataset";

const UPLOAD_DIR: &str = "upload";
const DATA_DIR: &str = "data";
const TAR_DIR: &str = "tar";

/// Durable key/value store rooted at the per-user configuration directory.
///
/// Reads never fail: a missing, unreadable, or empty file reads as `""` so
/// first-run state cannot crash the caller. Writes trim, create the
/// directory tree on demand, and go through a temp file + rename.
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Store rooted at the default location, `~/.forefront`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            ForefrontError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(home.join(".forefront")))
    }

    /// Store rooted at an explicit directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root of the per-user state tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get_token(&self) -> String {
        self.read_key(CREDENTIALS_FILE)
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.write_key(CREDENTIALS_FILE, token)
    }

    pub fn get_project_id(&self) -> String {
        self.read_key(PROJECT_FILE)
    }

    pub fn set_project_id(&self, project_id: &str) -> Result<()> {
        self.write_key(PROJECT_FILE, project_id)
    }

    pub fn get_org_id(&self) -> String {
        self.read_key(ORG_FILE)
    }

    pub fn set_org_id(&self, org_id: &str) -> Result<()> {
        self.write_key(ORG_FILE, org_id)
    }

    pub fn get_default_dataset(&self) -> String {
        self.read_key(DATASET_FILE)
    }

    pub fn set_default_dataset(&self, dataset_id: &str) -> Result<()> {
        self.write_key(DATASET_FILE, dataset_id)
    }

    /// Read an arbitrary file under the root; `""` when absent.
    pub fn get_data(&self, name: &str) -> String {
        self.read_key(name)
    }

    /// Write an arbitrary file under the root.
    pub fn set_data(&self, name: &str, value: &str) -> Result<()> {
        self.write_key(name, value)
    }

    /// Staging directory for shard component files and group archives.
    pub fn upload_dir(&self) -> Result<PathBuf> {
        self.ensure_dir(UPLOAD_DIR)
    }

    /// Materialized shards, one numbered subdirectory per shard index.
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.ensure_dir(DATA_DIR)
    }

    /// Downloaded group archives.
    pub fn tar_dir(&self) -> Result<PathBuf> {
        self.ensure_dir(TAR_DIR)
    }

    /// Remove and recreate the shard cache and archive directories.
    ///
    /// Cached shards are keyed only by index, so they must not survive a
    /// change of dataset selection.
    pub fn reset_data_dirs(&self) -> Result<()> {
        for name in [DATA_DIR, TAR_DIR] {
            let dir = self.root.join(name);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Path of the per-project handler script, if the user staged one.
    pub fn handler_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("handler-{}.py", project_id))
    }

    /// Path of the per-project requirements file, if the user staged one.
    pub fn requirements_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("requirements-{}.txt", project_id))
    }

    fn ensure_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn read_key(&self, name: &str) -> String {
        let path = self.root.join(name);
        match fs::read_to_string(&path) {
            Ok(contents) => contents.trim().to_string(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "State read defaulted to empty");
                String::new()
            }
        }
    }

    fn write_key(&self, name: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.root.join(name);

        // Atomic write: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value.trim())?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, StateStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::with_root(temp_dir.path().join(".forefront"));
        (temp_dir, store)
    }

    #[test]
    fn test_set_get_roundtrip_trims() {
        let (_guard, store) = store();

        store.set_token("  tok-123  \n").unwrap();
        assert_eq!(store.get_token(), "tok-123");

        store.set_project_id("proj-1\n").unwrap();
        assert_eq!(store.get_project_id(), "proj-1");

        store.set_org_id(" org-9 ").unwrap();
        assert_eq!(store.get_org_id(), "org-9");

        store.set_default_dataset("ds-4").unwrap();
        assert_eq!(store.get_default_dataset(), "ds-4");
    }

    #[test]
    fn test_unwritten_keys_read_empty() {
        let (_guard, store) = store();

        assert_eq!(store.get_token(), "");
        assert_eq!(store.get_project_id(), "");
        assert_eq!(store.get_org_id(), "");
        assert_eq!(store.get_default_dataset(), "");
    }

    #[test]
    fn test_keys_are_independent_files() {
        let (_guard, store) = store();

        store.set_project_id("proj-1").unwrap();
        store.set_org_id("org-9").unwrap();

        // Losing one file must not touch the others.
        fs::remove_file(store.root().join("org")).unwrap();

        assert_eq!(store.get_org_id(), "");
        assert_eq!(store.get_project_id(), "proj-1");
    }

    #[test]
    fn test_atomic_write() {
        let (_guard, store) = store();

        store.set_token("tok").unwrap();

        let temp_path = store.root().join("credentials").with_extension("tmp");
        assert!(!temp_path.exists(), "Temp file should be cleaned up");
    }

    #[test]
    fn test_write_creates_directory_tree() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::with_root(temp_dir.path().join("nested").join(".forefront"));

        store.set_token("tok").unwrap();
        assert_eq!(store.get_token(), "tok");
    }

    #[test]
    fn test_generic_data_passthrough() {
        let (_guard, store) = store();

        store.set_data("upload_status", "42").unwrap();
        assert_eq!(store.get_data("upload_status"), "42");
        assert_eq!(store.get_data("never_written"), "");
    }

    #[test]
    fn test_reset_data_dirs() {
        let (_guard, store) = store();

        let data_dir = store.data_dir().unwrap();
        fs::write(data_dir.join("stale"), b"x").unwrap();

        store.reset_data_dirs().unwrap();

        assert!(store.root().join("data").exists());
        assert!(store.root().join("tar").exists());
        assert!(!store.root().join("data").join("stale").exists());
    }

    #[test]
    fn test_per_project_artifact_paths() {
        let (_guard, store) = store();

        let handler = store.handler_path("proj-1");
        let requirements = store.requirements_path("proj-1");
        assert!(handler.to_string_lossy().ends_with("handler-proj-1.py"));
        assert!(requirements.to_string_lossy().ends_with("requirements-proj-1.txt"));
    }
}
