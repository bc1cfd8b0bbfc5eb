//! Network settings persisted by `setnwcfg` and `seturlprefix`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::{ConfigError, DEFAULT_HOST, DEFAULT_PORT, UrlPrefix};

/// Host, port and URL prefix the server binds with on its next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Optional route prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_prefix: Option<UrlPrefix>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            url_prefix: None,
        }
    }
}

impl NetworkSettings {
    /// Builds validated settings from operator input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] or [`ConfigError::InvalidPort`].
    pub fn parse(host: &str, port: &str) -> Result<Self, ConfigError> {
        let settings = Self {
            host: host.trim().to_owned(),
            port: parse_port(port)?,
            url_prefix: None,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] for an empty or whitespace host and
    /// [`ConfigError::InvalidPort`] for port zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() || self.host.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidHost {
                host: self.host.clone(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort {
                port: self.port.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| ConfigError::InvalidPort {
            port: raw.to_owned(),
        })
}

/// Reads and writes [`NetworkSettings`] as TOML.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads stored settings, falling back to defaults when none were saved.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsRead`] on IO failure and
    /// [`ConfigError::SettingsParse`] or a validation error for bad content.
    pub fn load(&self) -> Result<NetworkSettings, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(NetworkSettings::default());
            }
            Err(source) => {
                return Err(ConfigError::SettingsRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let settings: NetworkSettings =
            toml::from_str(&text).map_err(|source| ConfigError::SettingsParse {
                path: self.path.clone(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Persists `settings` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsEncode`] or [`ConfigError::SettingsWrite`].
    pub fn save(&self, settings: &NetworkSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        let text = toml::to_string_pretty(settings)?;
        atomic_write(&self.path, text.as_bytes()).map_err(|source| ConfigError::SettingsWrite {
            path: self.path.clone(),
            source,
        })
    }
}

/// Flushes to a sibling temporary file and renames it into place, so readers
/// never observe a partial document.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "settings path did not have a parent directory",
        )
    })?;
    fs::create_dir_all(directory)?;

    let mut file = Builder::new()
        .prefix(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("settings"),
        )
        .tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn store_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    #[rstest]
    fn missing_file_yields_defaults(store_dir: TempDir) {
        let store = SettingsStore::new(store_dir.path().join("server.toml"));
        let settings = store.load().expect("load defaults");
        assert_eq!(settings, NetworkSettings::default());
        assert_eq!(settings.port, 3586);
    }

    #[rstest]
    fn saved_settings_are_read_back(store_dir: TempDir) {
        let store = SettingsStore::new(store_dir.path().join("nested").join("server.toml"));
        let mut settings = NetworkSettings::parse("127.0.0.1", "4000").expect("parse settings");
        settings.url_prefix = UrlPrefix::parse("/pdu/").expect("valid prefix");
        store.save(&settings).expect("save settings");

        let loaded = store.load().expect("load settings");
        assert_eq!(loaded, settings);
        assert_eq!(loaded.url_prefix.as_ref().map(UrlPrefix::as_str), Some("/pdu"));
    }

    #[rstest]
    fn corrupt_file_reports_parse_error(store_dir: TempDir) {
        let path = store_dir.path().join("server.toml");
        fs::write(&path, "host = ").expect("write corrupt settings");
        let error = SettingsStore::new(path).load().expect_err("load should fail");
        assert!(matches!(error, ConfigError::SettingsParse { .. }));
    }

    #[rstest]
    #[case("localhost", "0")]
    #[case("localhost", "65536")]
    #[case("localhost", "http")]
    #[case("", "80")]
    #[case("bad host", "80")]
    fn rejects_invalid_network_input(#[case] host: &str, #[case] port: &str) {
        assert!(NetworkSettings::parse(host, port).is_err());
    }
}
