//! Filesystem flag recording that a server is believed to be serving.
//!
//! Existence of the file is the liveness signal. A serving process also
//! writes the base URL it answers on, so later invocations reach it even
//! after the persisted network settings change. The file is written after
//! the listener binds and removed when serving ends; a process that dies
//! without cleanup leaves a stale marker behind, which a forced start
//! tolerates.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pdu_config::WorkingPaths;
use pdu_types::ErrorCode;
use thiserror::Error;
use tracing::warn;
use url::Url;

const MARKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::marker");

/// Errors raised while changing the marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The marker could not be created.
    #[error("failed to create liveness marker '{path}': {source}")]
    Create {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The marker could not be removed.
    #[error("failed to remove liveness marker '{path}': {source}")]
    Remove {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl MarkerError {
    /// Error code for the envelope and exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::Storage
    }
}

/// Liveness marker, optionally naming the server's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessMarker {
    path: PathBuf,
}

impl LivenessMarker {
    /// Marker stored at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker at the canonical location under the working directory.
    #[must_use]
    pub fn from_paths(paths: &WorkingPaths) -> Self {
        Self::new(paths.marker_path())
    }

    /// Marker file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty marker, and its parent folder, if missing.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Create`] when the file cannot be written; no
    /// partial marker is left behind.
    pub fn mark_present(&self) -> Result<(), MarkerError> {
        self.write(b"")
    }

    /// Creates the marker recording the base URL the server answers on.
    ///
    /// # Errors
    ///
    /// As for [`LivenessMarker::mark_present`].
    pub fn mark_serving(&self, base_url: &Url) -> Result<(), MarkerError> {
        self.write(base_url.as_str().as_bytes())
    }

    /// Base URL recorded by the serving process, if the marker holds one.
    #[must_use]
    pub fn serving_url(&self) -> Option<Url> {
        let contents = fs::read_to_string(&self.path).ok()?;
        Url::parse(contents.trim()).ok()
    }

    fn write(&self, contents: &[u8]) -> Result<(), MarkerError> {
        self.write_with(|file| {
            file.write_all(contents)?;
            file.sync_all()
        })
    }

    fn write_with<F>(&self, fill: F) -> Result<(), MarkerError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.create_error(source))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| self.create_error(source))?;
        if let Err(source) = fill(&mut file) {
            drop(file);
            self.discard_partial();
            return Err(self.create_error(source));
        }
        Ok(())
    }

    fn discard_partial(&self) {
        if let Err(error) = self.clear() {
            warn!(target: MARKER_TARGET, %error, "failed to remove partially written marker");
        }
    }

    fn create_error(&self, source: io::Error) -> MarkerError {
        MarkerError::Create {
            path: self.path.clone(),
            source,
        }
    }

    /// Whether the marker exists.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.path.is_file()
    }

    /// Removes the marker. Absence is success.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Remove`] for any failure other than absence.
    pub fn clear(&self) -> Result<(), MarkerError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MarkerError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn working_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    #[rstest]
    fn mark_then_clear_round_trip(working_dir: TempDir) {
        let marker = LivenessMarker::from_paths(&WorkingPaths::new(working_dir.path()));
        assert!(!marker.is_present());

        marker.mark_present().expect("mark");
        assert!(marker.is_present());
        assert!(marker.path().ends_with("RestServer/.restserverstate"));

        marker.mark_present().expect("marking twice is idempotent");
        marker.clear().expect("clear");
        assert!(!marker.is_present());
    }

    #[rstest]
    fn serving_marker_records_base_url(working_dir: TempDir) {
        let marker = LivenessMarker::from_paths(&WorkingPaths::new(working_dir.path()));
        let base = Url::parse("http://127.0.0.1:3586/pdu").expect("base url");
        marker.mark_serving(&base).expect("mark");
        assert!(marker.is_present());
        assert_eq!(marker.serving_url(), Some(base));

        marker.mark_present().expect("rewrite as empty");
        assert_eq!(marker.serving_url(), None);
    }

    #[rstest]
    fn failed_sync_leaves_no_marker(working_dir: TempDir) {
        let marker = LivenessMarker::from_paths(&WorkingPaths::new(working_dir.path()));
        let error = marker
            .write_with(|_| Err(io::Error::other("sync failed")))
            .expect_err("fill step fails");
        assert!(matches!(error, MarkerError::Create { .. }));
        assert!(!marker.is_present());
    }

    #[rstest]
    fn clearing_absent_marker_succeeds(working_dir: TempDir) {
        let marker = LivenessMarker::new(working_dir.path().join("missing").join(".state"));
        marker.clear().expect("absent marker clears");
        assert!(!marker.is_present());
    }

    #[rstest]
    fn unwritable_location_maps_to_storage_error(working_dir: TempDir) {
        let blocker = working_dir.path().join("blocker");
        fs::write(&blocker, b"file").expect("write blocker");
        let marker = LivenessMarker::new(blocker.join(".restserverstate"));
        let error = marker.mark_present().expect_err("parent is a file");
        assert_eq!(error.code(), ErrorCode::Storage);
    }
}
