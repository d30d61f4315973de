//! Kernel manager contract.
//!
//! The gateway never owns kernel state. It resolves kernels through a
//! [`KernelManager`] on every request and only keeps ids between calls.

use crate::error::KernelError;
use crate::types::{
    ChannelFrame, ChannelKind, KernelAliasPayload, KernelId, KernelRecord, SessionId,
};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Result type for kernel manager operations.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Lifecycle backend the gateway drives.
///
/// Implementations serialize conflicting operations themselves; the gateway
/// issues calls concurrently without coordination.
#[async_trait]
pub trait KernelManager: Send + Sync {
    /// Start a kernel from a normalized payload.
    ///
    /// Fails with `AlreadyExists`, `QuotaExceeded` or `CreationFailed`.
    async fn start_kernel(&self, payload: KernelAliasPayload) -> KernelResult<KernelRecord>;

    /// List running kernels in manager order.
    ///
    /// Fails with `RetrieveFailed`.
    async fn list_kernels(&self) -> KernelResult<Vec<KernelRecord>>;

    /// Fetch one kernel.
    ///
    /// With `serialize` set the manager refreshes the record's execution
    /// state before returning it. `Ok(None)` means the same as `NotFound`.
    async fn get_kernel(&self, id: &KernelId, serialize: bool) -> KernelResult<Option<KernelRecord>>;

    /// Remove a kernel and close every channel session bound to it.
    ///
    /// Removing an unknown id succeeds.
    async fn remove_kernel(&self, id: &KernelId) -> KernelResult<()>;

    /// Non-suspending lookup used before a socket upgrade.
    ///
    /// Returns `Ok(None)` for a kernel that exists but is not ready to serve
    /// channel connections.
    fn get_kernel_sync(&self, id: &KernelId) -> KernelResult<Option<KernelRecord>>;

    /// Channels the kernel exposes.
    fn list_channels(&self, _id: &KernelId) -> Vec<ChannelKind> {
        ChannelKind::all().to_vec()
    }

    /// Session id used when a client does not supply one.
    fn default_session_id(&self) -> SessionId {
        SessionId::generate()
    }

    /// Open a relay to the kernel's channels for one client connection.
    ///
    /// Fails with `NotFound` or `ChannelFailed`.
    async fn open_channels(
        &self,
        kernel: &KernelRecord,
        session: &SessionId,
    ) -> KernelResult<KernelChannels>;
}

/// Relay handle for one client connection to a kernel's channels.
///
/// Dropping the handle releases the connection: the kernel side observes
/// `to_kernel` closing and any release guard runs.
pub struct KernelChannels {
    /// Channels carried by this connection.
    pub channels: Vec<ChannelKind>,

    /// Client to kernel frames.
    pub to_kernel: mpsc::Sender<ChannelFrame>,

    /// Kernel to client frames.
    pub from_kernel: mpsc::Receiver<ChannelFrame>,

    /// Cancelled when the kernel is removed.
    pub kernel_removed: CancellationToken,

    release: Option<Box<dyn Send + Sync>>,
}

impl KernelChannels {
    pub fn new(
        channels: Vec<ChannelKind>,
        to_kernel: mpsc::Sender<ChannelFrame>,
        from_kernel: mpsc::Receiver<ChannelFrame>,
        kernel_removed: CancellationToken,
    ) -> Self {
        Self {
            channels,
            to_kernel,
            from_kernel,
            kernel_removed,
            release: None,
        }
    }

    /// Attach a guard dropped together with this handle.
    pub fn with_release_guard(mut self, guard: impl Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(guard));
        self
    }

    /// Whether the kernel behind this handle has been removed.
    pub fn is_kernel_removed(&self) -> bool {
        self.kernel_removed.is_cancelled()
    }
}

impl fmt::Debug for KernelChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelChannels")
            .field("channels", &self.channels)
            .field("kernel_removed", &self.kernel_removed.is_cancelled())
            .finish()
    }
}
