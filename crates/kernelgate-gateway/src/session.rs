//! Channel session state for one WebSocket connection.

use kernelgate_core::{
    ChannelKind, KernelChannels, KernelId, KernelManager, KernelRecord, KernelResult, SessionId,
};
use tracing::{debug, warn};

/// Lifecycle of a channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Kernel resolved, session id negotiated.
    Bound,
    /// Relay open, frames flowing.
    Streaming,
    /// Connection finished; the relay has been released.
    Closed,
}

/// Per-connection context built once when a client upgrades.
#[derive(Debug)]
pub struct ChannelSession {
    /// Kernel this connection is bound to.
    pub kernel_id: KernelId,

    /// Negotiated session id.
    pub session_id: SessionId,

    /// Channels opened for this connection.
    pub channels: Vec<ChannelKind>,

    /// Created timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last activity timestamp.
    pub last_activity: chrono::DateTime<chrono::Utc>,

    state: SessionState,
    relay: Option<KernelChannels>,
}

impl ChannelSession {
    /// Bind a session to a resolved kernel.
    ///
    /// A non-empty `requested` session id is adopted; otherwise the manager's
    /// default is kept.
    pub fn bind(
        kernel: &KernelRecord,
        manager: &dyn KernelManager,
        requested: Option<&str>,
    ) -> Self {
        let session_id = match requested.filter(|s| !s.is_empty()) {
            Some(id) => SessionId::new(id),
            None => {
                warn!(kernel_id = %kernel.id, "No session ID specified");
                manager.default_session_id()
            }
        };

        let now = chrono::Utc::now();
        Self {
            kernel_id: kernel.id.clone(),
            session_id,
            channels: manager.list_channels(&kernel.id),
            created_at: now,
            last_activity: now,
            state: SessionState::Bound,
            relay: None,
        }
    }

    /// Open the kernel's channels for this connection.
    pub async fn prepare(
        &mut self,
        manager: &dyn KernelManager,
        kernel: &KernelRecord,
    ) -> KernelResult<()> {
        let relay = manager.open_channels(kernel, &self.session_id).await?;
        debug!(
            kernel_id = %self.kernel_id,
            session_id = %self.session_id,
            channels = relay.channels.len(),
            "Kernel channels opened"
        );
        self.channels = relay.channels.clone();
        self.relay = Some(relay);
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Take the relay handle for the streaming loop.
    pub fn take_relay(&mut self) -> Option<KernelChannels> {
        self.relay.take()
    }

    /// Update last activity time.
    pub fn touch(&mut self) {
        self.last_activity = chrono::Utc::now();
    }

    /// Release the relay and mark the session closed.
    pub fn close(&mut self) {
        self.relay = None;
        self.state = SessionState::Closed;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }
}
