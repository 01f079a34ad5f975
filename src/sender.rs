use std::io::{self, Write};

use tracing::{debug, info, warn};

use crate::config::SenderConfig;
use crate::error::{Result, TransportError};
use crate::port::Transport;

/// Opens the port, waits for it to settle and writes the payload once.
pub struct Sender<T> {
    transport: T,
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the number of bytes that left the device.
    ///
    /// Write and drain run on the blocking pool so the write timeout covers
    /// both even when the driver blocks in the kernel. The port is dropped as
    /// soon as that job finishes; after a timeout the job may still hold it, so
    /// the caller must not wait on the blocking pool at shutdown.
    pub async fn send(&self, config: &SenderConfig) -> Result<usize> {
        let port = self.transport.open(&config.port)?;
        info!(path = %config.port.path, "port open");

        debug!(delay = ?config.settle_delay, "settling");
        tokio::time::sleep(config.settle_delay).await;

        let bytes = config.payload.as_bytes().to_vec();
        if bytes.is_empty() {
            warn!("payload is empty, nothing to write");
        }

        let path = config.port.path.clone();
        let job = tokio::task::spawn_blocking(move || write_and_drain(port, &bytes, &path));

        let settings = &config.port;
        match tokio::time::timeout(settings.write_timeout, job).await {
            Ok(Ok(Ok(written))) => Ok(written),
            Ok(Ok(Err(source))) => Err(TransportError::Write {
                path: settings.path.clone(),
                source,
            }
            .into()),
            Ok(Err(join)) => Err(TransportError::Write {
                path: settings.path.clone(),
                source: join.into(),
            }
            .into()),
            Err(_) => Err(TransportError::WriteTimeout {
                path: settings.path.clone(),
                timeout: settings.write_timeout,
            }
            .into()),
        }
    }
}

fn write_and_drain<P: Write>(mut port: P, bytes: &[u8], path: &str) -> io::Result<usize> {
    port.write_all(bytes)?;
    port.flush()?;
    debug!(bytes = bytes.len(), "payload written");
    drop(port);
    debug!(%path, "port closed");
    Ok(bytes.len())
}
