//! TCP transport for the control channel

use std::time::Duration;

use comfoconnect_core::{ComfoError, ComfoResult};
use tokio::net::TcpStream;

/// TCP connection settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings with the default 5 second connect timeout
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Create TCP settings with an explicit connect timeout
    pub fn with_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Some(timeout),
        }
    }
}

/// Open a TCP connection to the bridge.
///
/// Both a refused/failed connect and an expired connect deadline surface as
/// `NotReachable`; the caller cannot do anything different for the two.
pub async fn connect(settings: &TcpSettings) -> ComfoResult<TcpStream> {
    let target = (settings.host.as_str(), settings.port);
    let stream = if let Some(timeout) = settings.timeout {
        tokio::time::timeout(timeout, TcpStream::connect(target))
            .await
            .map_err(|_| {
                ComfoError::NotReachable(format!(
                    "timed out connecting to {}:{}",
                    settings.host, settings.port
                ))
            })?
    } else {
        TcpStream::connect(target).await
    }
    .map_err(|e| {
        ComfoError::NotReachable(format!(
            "connect to {}:{} failed: {e}",
            settings.host, settings.port
        ))
    })?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
