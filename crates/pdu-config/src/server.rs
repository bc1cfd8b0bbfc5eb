use std::time::Duration;

use url::Url;

use crate::{ConfigError, NetworkSettings, UrlPrefix};

const WILDCARD_HOST: &str = "0.0.0.0";
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Everything the lifecycle coordinator needs to bind and reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    host: String,
    port: u16,
    url_prefix: Option<UrlPrefix>,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the host, port or timeout is invalid.
    pub fn new(
        settings: NetworkSettings,
        shutdown_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        if shutdown_timeout.is_zero() {
            return Err(ConfigError::InvalidShutdownTimeout);
        }
        let NetworkSettings {
            host,
            port,
            url_prefix,
        } = settings;
        Ok(Self {
            host,
            port,
            url_prefix,
            shutdown_timeout,
        })
    }

    /// Bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bind port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Route prefix, if any.
    #[must_use]
    pub const fn url_prefix(&self) -> Option<&UrlPrefix> {
        self.url_prefix.as_ref()
    }

    /// How long `stop` waits for a remote server.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Base URL a local client uses to reach the server, prefix included.
    ///
    /// A wildcard bind address is reached through the loopback interface.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] when the host cannot form a URL.
    pub fn local_url(&self) -> Result<Url, ConfigError> {
        let host = if self.host == WILDCARD_HOST {
            LOOPBACK_HOST
        } else {
            self.host.as_str()
        };
        let prefix = self.url_prefix.as_ref().map_or("", UrlPrefix::as_str);
        let raw = if host.contains(':') && !host.starts_with('[') {
            format!("http://[{host}]:{}{prefix}", self.port)
        } else {
            format!("http://{host}:{}{prefix}", self.port)
        };
        Url::parse(&raw).map_err(|_| ConfigError::InvalidHost {
            host: self.host.clone(),
        })
    }

    /// Absolute URL for a `/v1/...` route.
    ///
    /// # Errors
    ///
    /// Propagates [`ServerConfig::local_url`] failures.
    pub fn endpoint(&self, route: &str) -> Result<Url, ConfigError> {
        Ok(route_url(&self.local_url()?, route))
    }
}

/// Appends a `/v1/...` route to a base URL that may carry a prefix.
#[must_use]
pub fn route_url(base: &Url, route: &str) -> Url {
    let mut url = base.clone();
    let path = format!("{}{route}", base.path().trim_end_matches('/'));
    url.set_path(&path);
    url
}
