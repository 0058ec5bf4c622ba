use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use openssh::{KnownHosts, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[async_trait]
pub trait RemoteShellClient: Send + Sync {
    async fn run(&self, node: &str, command: &str, timeout: Duration) -> Result<ShellResult>;
}

/// Per-node SSH sessions are pooled and reused (§5 "External resource
/// pools"); each is scoped-acquired through a per-node `Mutex` so a command
/// in flight on one node never blocks another.
pub struct SshRemoteShellClient {
    user: String,
    sessions: Arc<DashMap<String, Arc<Mutex<Option<Session>>>>>,
}

impl SshRemoteShellClient {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            sessions: Arc::new(DashMap::new()),
        }
    }

    async fn session_for(&self, node: &str) -> Result<Arc<Mutex<Option<Session>>>> {
        let slot = self
            .sessions
            .entry(node.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        Ok(slot)
    }
}

#[async_trait]
impl RemoteShellClient for SshRemoteShellClient {
    async fn run(&self, node: &str, command: &str, timeout: Duration) -> Result<ShellResult> {
        let slot = self.session_for(node).await?;
        let mut guard = slot.lock().await;

        if guard.is_none() {
            let dest = format!("{}@{}", self.user, node);
            let session = Session::connect(&dest, KnownHosts::Add)
                .await
                .map_err(|e| DispatchError::External(format!("ssh connect to {node} failed: {e}")))?;
            *guard = Some(session);
        }

        let session = guard.as_ref().expect("just populated above");
        let output = tokio::time::timeout(timeout, session.command("sh").arg("-c").arg(command).output())
            .await
            .map_err(|_| DispatchError::Timeout { ms: timeout.as_millis() as u64 })?
            .map_err(|e| {
                // The connection died mid-command; drop it so the next call
                // reconnects instead of repeatedly failing against a dead mux.
                *guard = None;
                DispatchError::External(format!("ssh command on {node} failed: {e}"))
            })?;

        Ok(ShellResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

