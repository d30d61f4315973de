//! Kernel request, record, and response types.

use super::KernelId;
use crate::error::KernelError;
use crate::secret::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Prefix an environment key must carry to be forwarded to a kernel.
pub const KERNEL_ENV_PREFIX: &str = "KERNEL_";

/// Reserved key carrying the requested kernel spec name.
pub const KERNEL_SPEC_NAME: &str = "KERNEL_SPEC_NAME";

/// Reserved key carrying a client-requested kernel id.
pub const KERNEL_ID: &str = "KERNEL_ID";

/// Body of `POST /api/kernels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelCreateRequest {
    /// Kernel spec name.
    pub name: String,

    /// Client environment; only `KERNEL_`-prefixed keys are forwarded.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl KernelCreateRequest {
    /// Parse and validate a raw request body.
    pub fn from_json(body: &[u8]) -> Result<Self, KernelError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| KernelError::ValidationFailed(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Check field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.name.trim().is_empty() {
            return Err(KernelError::ValidationFailed(
                "name: kernel spec name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Normalized environment handed to a kernel manager for creation.
///
/// Holds only `KERNEL_`-prefixed entries and always contains
/// [`KERNEL_SPEC_NAME`]. Built once per creation request and not mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KernelAliasPayload {
    values: BTreeMap<String, String>,
}

impl KernelAliasPayload {
    /// Filter the client environment and inject the spec name.
    pub fn from_request(request: &KernelCreateRequest) -> Result<Self, KernelError> {
        request.validate()?;

        let mut values: BTreeMap<String, String> = request
            .env
            .iter()
            .filter(|(k, _)| k.starts_with(KERNEL_ENV_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        values.insert(KERNEL_SPEC_NAME.to_string(), request.name.clone());

        let payload = Self { values };
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> Result<(), KernelError> {
        if let Some(id) = self.values.get(KERNEL_ID) {
            if id.trim().is_empty() {
                return Err(KernelError::ValidationFailed(format!(
                    "{}: must not be empty",
                    KERNEL_ID
                )));
            }
        }
        Ok(())
    }

    /// The requested kernel spec name.
    pub fn spec_name(&self) -> &str {
        self.values
            .get(KERNEL_SPEC_NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// The kernel id requested by the client, if any.
    pub fn kernel_id(&self) -> Option<KernelId> {
        self.values.get(KERNEL_ID).map(|id| KernelId::new(id.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the payload into the environment map passed to the kernel.
    pub fn into_env(self) -> BTreeMap<String, String> {
        self.values
    }
}

/// Execution state of a kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelState {
    #[default]
    Starting,
    Idle,
    Busy,
    Terminating,
    Dead,
}

impl KernelState {
    /// Derive a state from a record's conditions.
    pub fn from_conditions(conditions: &[KernelCondition]) -> Self {
        let holds = |kind: ConditionType| {
            conditions
                .iter()
                .any(|c| c.condition_type == kind && c.status)
        };

        if holds(ConditionType::Terminating) {
            Self::Terminating
        } else if holds(ConditionType::Ready) {
            Self::Idle
        } else {
            Self::Starting
        }
    }
}

/// Kind of a kernel condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    /// The kernel process has been placed.
    Scheduled,
    /// The kernel accepts channel connections.
    Ready,
    /// Removal has been requested.
    Terminating,
}

/// Observed condition of a kernel, as reported by its manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    pub status: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub last_probe_time: DateTime<Utc>,

    pub last_transition_time: DateTime<Utc>,
}

impl KernelCondition {
    /// A condition observed now.
    pub fn new(condition_type: ConditionType, status: bool) -> Self {
        let now = Utc::now();
        Self {
            condition_type,
            status,
            reason: None,
            message: None,
            last_probe_time: now,
            last_transition_time: now,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// How to reach a running kernel's channels.
///
/// Contains the signing key; it is deliberately not serializable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub transport: String,
    pub ip: String,
    pub shell_port: u16,
    pub iopub_port: u16,
    pub stdin_port: u16,
    pub control_port: u16,
    pub hb_port: u16,
    pub signature_scheme: String,
    pub key: SecretString,
}

impl ConnectionInfo {
    /// Connection info for a block of five consecutive ports.
    pub fn with_port_block(ip: impl Into<String>, base_port: u16, key: SecretString) -> Self {
        Self {
            transport: "tcp".to_string(),
            ip: ip.into(),
            shell_port: base_port,
            iopub_port: base_port.saturating_add(1),
            stdin_port: base_port.saturating_add(2),
            control_port: base_port.saturating_add(3),
            hb_port: base_port.saturating_add(4),
            signature_scheme: "hmac-sha256".to_string(),
            key,
        }
    }
}

/// Server-side view of a kernel, owned by its kernel manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRecord {
    pub id: KernelId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub state: KernelState,
    pub conditions: Vec<KernelCondition>,
    pub env: BTreeMap<String, String>,
    pub connection: Option<ConnectionInfo>,
}

impl KernelRecord {
    /// Whether the kernel can accept channel connections.
    pub fn is_ready(&self) -> bool {
        self.connection.is_some()
            && self
                .conditions
                .iter()
                .any(|c| c.condition_type == ConditionType::Ready && c.status)
    }

    /// Public projection used in every response.
    pub fn to_response(&self) -> KernelResponse {
        KernelResponse::from(self)
    }
}

/// Client-visible kernel representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelResponse {
    pub id: KernelId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub state: KernelState,
}

impl From<&KernelRecord> for KernelResponse {
    fn from(record: &KernelRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            created_at: record.created_at,
            state: record.state,
        }
    }
}
