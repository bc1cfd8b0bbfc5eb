//! Supervisor program registration for running the server unattended.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pdu_config::{SUPERVISOR_PROGRAM_NAME, WorkingPaths};
use pdu_types::ErrorCode;
use tempfile::Builder;
use thiserror::Error;
use tracing::info;

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Errors raised while registering or deregistering the program.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The running executable could not be located.
    #[error("failed to locate the current executable: {source}")]
    CurrentExe {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the program definition failed.
    #[error("failed to write supervisor program '{path}': {source}")]
    Write {
        /// Program file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the program definition failed.
    #[error("failed to remove supervisor program '{path}': {source}")]
    Remove {
        /// Program file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ServiceError {
    /// Error code for the exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ServiceRegistration
    }
}

/// supervisord program definition for `pdu-library start`.
#[derive(Debug, Clone)]
pub struct SupervisorService {
    conf_path: PathBuf,
    working_dir: PathBuf,
    executable: PathBuf,
}

impl SupervisorService {
    /// Definition running `executable` from the layout's working directory.
    #[must_use]
    pub fn new(paths: &WorkingPaths, executable: impl Into<PathBuf>) -> Self {
        Self {
            conf_path: paths.supervisor_conf_path().to_path_buf(),
            working_dir: paths.working_dir().to_path_buf(),
            executable: executable.into(),
        }
    }

    /// Definition running the current executable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::CurrentExe`] when the executable path is
    /// unavailable.
    pub fn for_current_exe(paths: &WorkingPaths) -> Result<Self, ServiceError> {
        let executable =
            std::env::current_exe().map_err(|source| ServiceError::CurrentExe { source })?;
        Ok(Self::new(paths, executable))
    }

    /// Program file location.
    #[must_use]
    pub fn conf_path(&self) -> &Path {
        &self.conf_path
    }

    /// Rendered program definition.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[program:{SUPERVISOR_PROGRAM_NAME}]\n\
             command={exe} --working-dir {dir} start\n\
             directory={dir}\n\
             autostart=true\n\
             autorestart=true\n\
             stopsignal=TERM\n\
             stopwaitsecs=90\n\
             redirect_stderr=true\n",
            exe = self.executable.display(),
            dir = self.working_dir.display(),
        )
    }

    /// Writes the program definition atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Write`] on IO failure.
    pub fn register(&self) -> Result<(), ServiceError> {
        write_atomically(&self.conf_path, self.render().as_bytes()).map_err(|source| {
            ServiceError::Write {
                path: self.conf_path.clone(),
                source,
            }
        })?;
        info!(target: SERVICE_TARGET, path = %self.conf_path.display(), "registered supervisor program");
        Ok(())
    }

    /// Removes the program definition. Absence is success.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Remove`] for any failure other than absence.
    pub fn deregister(&self) -> Result<(), ServiceError> {
        match fs::remove_file(&self.conf_path) {
            Ok(()) => {
                info!(target: SERVICE_TARGET, path = %self.conf_path.display(), "deregistered supervisor program");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ServiceError::Remove {
                path: self.conf_path.clone(),
                source,
            }),
        }
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "program path has no parent directory")
    })?;
    fs::create_dir_all(directory)?;
    let mut file = Builder::new().prefix(".supervisor").tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
