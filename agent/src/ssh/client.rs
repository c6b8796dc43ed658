//! SSH client implementation (russh)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tracing::{debug, info};

use crate::errors::BackupError;
use crate::models::backup::CommandOutcome;
use crate::ssh::session::{RemoteSession, SessionConnector};
use crate::storage::registry::Device;

/// Extended data stream id for stderr
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Host key handler that accepts any key the first time it is seen.
///
/// No known-hosts store is consulted, so a spoofed appliance would be
/// accepted. A verified host key store belongs in a separate handler that
/// callers opt into.
pub struct TrustOnFirstUse {
    host: String,
}

#[async_trait]
impl client::Handler for TrustOnFirstUse {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        info!(
            host = %self.host,
            fingerprint = %server_public_key.fingerprint(),
            "Accepting SSH host key without verification"
        );
        Ok(true)
    }
}

/// Opens password-authenticated SSH sessions
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl SshConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionConnector for SshConnector {
    async fn open(
        &self,
        device: &Device,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, BackupError> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        });
        let handler = TrustOnFirstUse {
            host: device.host.clone(),
        };

        debug!("Connecting to {}:{}", device.host, device.port);
        let connect = client::connect(config, (device.host.as_str(), device.port), handler);
        let mut handle = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| {
                BackupError::ConnectionError(format!(
                    "Timed out connecting to {}:{} after {}s",
                    device.host,
                    device.port,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                BackupError::ConnectionError(format!(
                    "Failed to connect to {}:{}: {}",
                    device.host, device.port, e
                ))
            })?;

        let auth = handle.authenticate_password(device.username.as_str(), device.password());
        let authenticated = tokio::time::timeout(timeout, auth)
            .await
            .map_err(|_| {
                BackupError::ConnectionError(format!(
                    "Timed out authenticating to {} after {}s",
                    device.host,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                BackupError::ConnectionError(format!(
                    "Authentication to {} failed: {}",
                    device.host, e
                ))
            })?;

        let mut session = SshSession {
            host: device.host.clone(),
            handle: Some(handle),
            pending: None,
        };

        if !authenticated {
            session.close().await;
            return Err(BackupError::ConnectionError(format!(
                "Authentication to {} rejected for user '{}'",
                device.host, device.username
            )));
        }

        info!("SSH connection established with {} ({})", device.name, device.host);
        Ok(Box::new(session))
    }
}

/// One SSH connection, executing one command per channel
pub struct SshSession {
    host: String,
    handle: Option<Handle<TrustOnFirstUse>>,
    pending: Option<Channel<Msg>>,
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn issue(&mut self, command: &str) -> Result<(), BackupError> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            BackupError::ExecutionError(format!("Session to {} is closed", self.host))
        })?;

        let channel = handle.channel_open_session().await?;
        channel.exec(true, command).await?;
        self.pending = Some(channel);
        Ok(())
    }

    /// Reads until the channel closes. `timeout` bounds the wait for each
    /// message, not the whole transfer, so large configurations can stream.
    async fn collect(&mut self, timeout: Duration) -> Result<CommandOutcome, BackupError> {
        let mut channel = self.pending.take().ok_or_else(|| {
            BackupError::ExecutionError("No command was issued on this session".to_string())
        })?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        loop {
            let msg = tokio::time::timeout(timeout, channel.wait())
                .await
                .map_err(|_| {
                    BackupError::ExecutionError(format!(
                        "No output from {} for {}s",
                        self.host,
                        timeout.as_secs()
                    ))
                })?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => stdout.extend_from_slice(data),
                Some(ChannelMsg::ExtendedData { ref data, ext }) if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                Some(ChannelMsg::ExitStatus { exit_status: status }) => exit_status = Some(status),
                Some(_) => {}
                None => break,
            }
        }

        Ok(CommandOutcome {
            exit_status,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn close(&mut self) {
        self.pending = None;
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
            {
                debug!("Error while disconnecting from {}: {}", self.host, e);
            }
        }
    }
}
