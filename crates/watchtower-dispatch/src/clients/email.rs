use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::remote_shell::RemoteShellClient;
use crate::error::Result;

/// Email (§6) — "a delegate host that accepts a subject + HTML body via a
/// remote shell invocation." There is no SMTP client here by design; sending
/// mail is just another command dispatched through the same pooled SSH
/// client the lifecycle tools use.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()>;
}

pub struct ShellEmailClient {
    shell: Arc<dyn RemoteShellClient>,
    relay_node: String,
    from_address: String,
}

impl ShellEmailClient {
    pub fn new(shell: Arc<dyn RemoteShellClient>, relay_node: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            shell,
            relay_node: relay_node.into(),
            from_address: from_address.into(),
        }
    }
}

#[async_trait]
impl EmailClient for ShellEmailClient {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        let escaped_subject = subject.replace('\'', "'\\''");
        let escaped_body = html_body.replace('\'', "'\\''");
        let command = format!(
            "send-mail --from '{}' --subject '{escaped_subject}' --html '{escaped_body}'",
            self.from_address
        );
        self.shell.run(&self.relay_node, &command, Duration::from_secs(15)).await?;
        Ok(())
    }
}
