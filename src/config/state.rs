// Application state module
// Shared, read-only state handed to every connection task

use std::io;
use std::path::{Path, PathBuf};

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Absolute public asset directory
    pub public_root: PathBuf,
    /// Absolute upload directory
    pub upload_root: PathBuf,
    /// Absolute staging directory for in-flight uploads
    pub staging_root: PathBuf,
}

impl AppState {
    /// Resolve the configured roots and create the upload and staging
    /// directories if they are missing. The public directory is not created;
    /// static requests answer 404 until it exists.
    pub fn bootstrap(config: Config) -> io::Result<Self> {
        let public_root = std::path::absolute(&config.storage.public_dir)?;
        let upload_root = std::path::absolute(&config.storage.upload_dir)?;
        let staging_root = std::path::absolute(&config.storage.staging_dir)?;

        if staging_root == upload_root || staging_root.starts_with(&upload_root) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "storage.staging_dir must not be inside storage.upload_dir",
            ));
        }

        create_dir(&upload_root)?;
        create_dir(&staging_root)?;

        Ok(Self {
            config,
            public_root,
            upload_root,
            staging_root,
        })
    }
}

fn create_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to create directory '{}': {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::defaults();
        config.storage.public_dir = tmp.path().join("public").display().to_string();
        config.storage.upload_dir = tmp.path().join("uploads").display().to_string();
        config.storage.staging_dir = tmp.path().join("staging").display().to_string();

        let state = AppState::bootstrap(config).unwrap();
        assert!(state.upload_root.is_dir());
        assert!(state.staging_root.is_dir());
        assert!(!state.public_root.exists());
        assert!(state.upload_root.is_absolute());
    }

    #[test]
    fn test_bootstrap_rejects_staging_inside_uploads() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::defaults();
        config.storage.upload_dir = tmp.path().join("uploads").display().to_string();
        config.storage.staging_dir = tmp.path().join("uploads/.tmp").display().to_string();

        let err = AppState::bootstrap(config).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
