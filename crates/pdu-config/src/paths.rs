//! Derives the on-disk layout shared by the CLI and the serving process.
//!
//! Both sides must agree on where the liveness marker lives so a second
//! invocation can tell whether a server is already running.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{Config, MARKER_FILE_NAME, SERVICE_DIR_NAME, SETTINGS_FILE_NAME, SUPERVISOR_PROGRAM_NAME};

/// Canonical paths for service state under the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingPaths {
    working_dir: PathBuf,
    service_dir: PathBuf,
    marker_path: PathBuf,
    settings_path: PathBuf,
    supervisor_conf_path: PathBuf,
}

impl WorkingPaths {
    /// Derives the layout from configuration and creates the service folder.
    ///
    /// # Errors
    ///
    /// Returns [`WorkingPathsError::ServiceDirectory`] when the folder cannot
    /// be created.
    pub fn from_config(config: &Config) -> Result<Self, WorkingPathsError> {
        Self::prepare(config.working_dir().as_std_path())
    }

    /// Derives the layout for `working_dir` and creates the service folder.
    ///
    /// # Errors
    ///
    /// Returns [`WorkingPathsError::ServiceDirectory`] when the folder cannot
    /// be created.
    pub fn prepare(working_dir: &Path) -> Result<Self, WorkingPathsError> {
        let paths = Self::new(working_dir);
        fs::create_dir_all(&paths.service_dir).map_err(|source| {
            WorkingPathsError::ServiceDirectory {
                path: paths.service_dir.clone(),
                source,
            }
        })?;
        Ok(paths)
    }

    /// Derives the layout without touching the filesystem.
    #[must_use]
    pub fn new(working_dir: &Path) -> Self {
        let service_dir = working_dir.join(SERVICE_DIR_NAME);
        Self {
            working_dir: working_dir.to_path_buf(),
            marker_path: service_dir.join(MARKER_FILE_NAME),
            settings_path: service_dir.join(SETTINGS_FILE_NAME),
            supervisor_conf_path: service_dir.join(format!("{SUPERVISOR_PROGRAM_NAME}.conf")),
            service_dir,
        }
    }

    /// Working directory root.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Folder holding service state.
    #[must_use]
    pub fn service_dir(&self) -> &Path {
        &self.service_dir
    }

    /// Liveness marker file.
    #[must_use]
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Persisted network settings.
    #[must_use]
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Supervisor program definition written by `service --register`.
    #[must_use]
    pub fn supervisor_conf_path(&self) -> &Path {
        &self.supervisor_conf_path
    }
}

/// Errors raised while preparing the working directory.
#[derive(Debug, Error)]
pub enum WorkingPathsError {
    /// Creating the service folder failed.
    #[error("failed to prepare service directory '{path}': {source}")]
    ServiceDirectory {
        /// Folder that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
