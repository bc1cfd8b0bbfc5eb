//! Delivery of the shutdown request to a server owned by another process.

use std::time::Duration;

use thiserror::Error;
use url::Url;

#[cfg(test)]
use mockall::automock;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while posting the shutdown request.
#[derive(Debug, Error)]
pub enum RemoteShutdownError {
    /// The HTTP exchange failed.
    #[error("shutdown request to {url} failed: {source}")]
    Transport {
        /// Shutdown endpoint.
        url: Url,
        /// Client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("shutdown request to {url} was answered with HTTP {status}")]
    Rejected {
        /// Shutdown endpoint.
        url: Url,
        /// Response status code.
        status: u16,
    },
}

/// Posts a shutdown request to a running server.
#[cfg_attr(test, automock)]
pub trait RemoteShutdown: Send + Sync {
    /// Sends the request and returns once the server acknowledged it.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteShutdownError`] when the request is not acknowledged.
    fn request_shutdown(&self, url: &Url) -> Result<(), RemoteShutdownError>;
}

/// Blocking HTTP implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpRemoteShutdown;

impl RemoteShutdown for HttpRemoteShutdown {
    fn request_shutdown(&self, url: &Url) -> Result<(), RemoteShutdownError> {
        let transport = |source| RemoteShutdownError::Transport {
            url: url.clone(),
            source,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        let response = client.post(url.clone()).send().map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RemoteShutdownError::Rejected {
                url: url.clone(),
                status: status.as_u16(),
            })
        }
    }
}
