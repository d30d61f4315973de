//! In-process kernel manager backed by loopback kernels.
//!
//! Development and test backend for the gateway. Kernels are registry
//! entries; each channel connection gets a task that sends every client frame
//! straight back. No code is executed.

use crate::config::KernelsConfig;
use crate::error::KernelError;
use crate::manager::{KernelChannels, KernelManager, KernelResult};
use crate::secret::SecretString;
use crate::types::{
    ChannelFrame, ConditionType, ConnectionInfo, KernelAliasPayload, KernelCondition, KernelId,
    KernelRecord, KernelState, SessionId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const FIRST_PORT: u16 = 50000;
const PORTS_PER_KERNEL: u16 = 5;

struct KernelEntry {
    id: KernelId,
    name: String,
    created_at: DateTime<Utc>,
    started: Instant,
    env: BTreeMap<String, String>,
    connection: ConnectionInfo,
    removed: CancellationToken,
    connections: usize,
}

struct Inner {
    config: KernelsConfig,
    kernels: RwLock<Vec<KernelEntry>>,
    next_port: Mutex<u16>,
}

impl Inner {
    fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.config.startup_delay_ms)
    }

    fn is_ready(&self, entry: &KernelEntry) -> bool {
        entry.started.elapsed() >= self.startup_delay()
    }

    fn snapshot(&self, entry: &KernelEntry) -> KernelRecord {
        let ready = self.is_ready(entry);
        let conditions = vec![
            KernelCondition::new(ConditionType::Scheduled, true).with_reason("Scheduled"),
            if ready {
                KernelCondition::new(ConditionType::Ready, true).with_reason("KernelStarted")
            } else {
                KernelCondition::new(ConditionType::Ready, false)
                    .with_reason("KernelStarting")
                    .with_message("waiting for kernel to accept connections")
            },
        ];

        KernelRecord {
            id: entry.id.clone(),
            name: entry.name.clone(),
            created_at: entry.created_at,
            state: KernelState::from_conditions(&conditions),
            conditions,
            env: entry.env.clone(),
            connection: ready.then(|| entry.connection.clone()),
        }
    }

    fn allocate_ports(&self) -> u16 {
        let mut next = self.next_port.lock();
        let base = *next;
        *next = match next.checked_add(PORTS_PER_KERNEL) {
            Some(port) if port <= u16::MAX - PORTS_PER_KERNEL => port,
            _ => FIRST_PORT,
        };
        base
    }

    /// Called when a channel connection is dropped.
    fn release(&self, id: &KernelId) {
        let mut kernels = self.kernels.write();
        let Some(pos) = kernels.iter().position(|k| &k.id == id) else {
            return;
        };

        let entry = &mut kernels[pos];
        entry.connections = entry.connections.saturating_sub(1);
        debug!("Channel connection released for kernel {} ({} left)", id, entry.connections);

        if entry.connections == 0 && self.config.cull_on_last_disconnect {
            let entry = kernels.remove(pos);
            entry.removed.cancel();
            info!("Culled kernel {} after last channel connection closed", id);
        }
    }
}

/// Decrements a kernel's connection count when dropped.
struct ConnectionGuard {
    inner: Weak<Inner>,
    id: KernelId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.release(&self.id);
        }
    }
}

/// Kernel manager holding loopback kernels in memory.
#[derive(Clone)]
pub struct LocalKernelManager {
    inner: Arc<Inner>,
}

impl Default for LocalKernelManager {
    fn default() -> Self {
        Self::new(KernelsConfig::default())
    }
}

impl LocalKernelManager {
    pub fn new(config: KernelsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                kernels: RwLock::new(Vec::new()),
                next_port: Mutex::new(FIRST_PORT),
            }),
        }
    }

    /// Number of registered kernels.
    pub fn len(&self) -> usize {
        self.inner.kernels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open channel connections for a kernel.
    pub fn connection_count(&self, id: &KernelId) -> usize {
        self.inner
            .kernels
            .read()
            .iter()
            .find(|k| &k.id == id)
            .map(|k| k.connections)
            .unwrap_or(0)
    }
}

#[async_trait]
impl KernelManager for LocalKernelManager {
    async fn start_kernel(&self, payload: KernelAliasPayload) -> KernelResult<KernelRecord> {
        let name = payload.spec_name().to_string();
        let allowed = &self.inner.config.allowed_specs;
        if !allowed.is_empty() && !allowed.iter().any(|s| s == &name) {
            return Err(KernelError::CreationFailed(format!(
                "No such kernel spec: {}",
                name
            )));
        }

        let requested = payload.kernel_id();
        if let Some(id) = &requested {
            if !KernelId::is_routable(id.as_str()) {
                return Err(KernelError::CreationFailed(format!(
                    "Requested kernel id '{}' is not a valid kernel id",
                    id
                )));
            }
        }

        let mut kernels = self.inner.kernels.write();

        if let Some(id) = &requested {
            if kernels.iter().any(|k| &k.id == id) {
                return Err(KernelError::AlreadyExists(format!(
                    "kernel {} already exists",
                    id
                )));
            }
        }

        if let Some(max) = self.inner.config.max_kernels {
            if kernels.len() >= max {
                return Err(KernelError::QuotaExceeded(format!(
                    "Kernel quota exceeded: {} of {} kernels running",
                    kernels.len(),
                    max
                )));
            }
        }

        let id = requested.unwrap_or_else(KernelId::generate);
        let entry = KernelEntry {
            id: id.clone(),
            name: name.clone(),
            created_at: Utc::now(),
            started: Instant::now(),
            env: payload.into_env(),
            connection: ConnectionInfo::with_port_block(
                "127.0.0.1",
                self.inner.allocate_ports(),
                SecretString::random_hex(32),
            ),
            removed: CancellationToken::new(),
            connections: 0,
        };
        let record = self.inner.snapshot(&entry);
        kernels.push(entry);

        info!("Started kernel {} (spec: {})", id, name);
        Ok(record)
    }

    async fn list_kernels(&self) -> KernelResult<Vec<KernelRecord>> {
        let kernels = self.inner.kernels.read();
        Ok(kernels.iter().map(|k| self.inner.snapshot(k)).collect())
    }

    async fn get_kernel(&self, id: &KernelId, _serialize: bool) -> KernelResult<Option<KernelRecord>> {
        // Records are always built from live state here.
        let kernels = self.inner.kernels.read();
        Ok(kernels
            .iter()
            .find(|k| &k.id == id)
            .map(|k| self.inner.snapshot(k)))
    }

    async fn remove_kernel(&self, id: &KernelId) -> KernelResult<()> {
        let removed = {
            let mut kernels = self.inner.kernels.write();
            kernels
                .iter()
                .position(|k| &k.id == id)
                .map(|pos| kernels.remove(pos))
        };

        match removed {
            Some(entry) => {
                entry.removed.cancel();
                info!("Removed kernel {}", id);
            }
            None => debug!("Remove requested for unknown kernel {}", id),
        }
        Ok(())
    }

    fn get_kernel_sync(&self, id: &KernelId) -> KernelResult<Option<KernelRecord>> {
        let kernels = self.inner.kernels.read();
        let Some(entry) = kernels.iter().find(|k| &k.id == id) else {
            return Err(KernelError::NotFound(format!("Kernel not found: {}", id)));
        };

        if !self.inner.is_ready(entry) {
            return Ok(None);
        }
        Ok(Some(self.inner.snapshot(entry)))
    }

    async fn open_channels(
        &self,
        kernel: &KernelRecord,
        session: &SessionId,
    ) -> KernelResult<KernelChannels> {
        let removed = {
            let mut kernels = self.inner.kernels.write();
            let entry = kernels
                .iter_mut()
                .find(|k| k.id == kernel.id)
                .ok_or_else(|| KernelError::NotFound(format!("Kernel not found: {}", kernel.id)))?;

            if entry.started.elapsed() < self.inner.startup_delay() {
                return Err(KernelError::ChannelFailed(format!(
                    "Kernel {} is not ready",
                    kernel.id
                )));
            }
            entry.connections += 1;
            entry.removed.clone()
        };

        let buffer = self.inner.config.channel_buffer.max(1);
        let (to_kernel, mut kernel_rx) = mpsc::channel::<ChannelFrame>(buffer);
        let (kernel_tx, from_kernel) = mpsc::channel::<ChannelFrame>(buffer);

        let token = removed.clone();
        let kernel_id = kernel.id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    frame = kernel_rx.recv() => match frame {
                        Some(frame) => {
                            if kernel_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("Loopback relay for kernel {} stopped", kernel_id);
        });

        debug!("Opened channels for kernel {} (session: {})", kernel.id, session);

        let guard = ConnectionGuard {
            inner: Arc::downgrade(&self.inner),
            id: kernel.id.clone(),
        };
        Ok(
            KernelChannels::new(self.list_channels(&kernel.id), to_kernel, from_kernel, removed)
                .with_release_guard(guard),
        )
    }
}
