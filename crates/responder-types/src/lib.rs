use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A response feature that a remote endpoint declares support for.
///
/// The string form (see [`CapabilityTag::as_str`]) is what endpoints
/// advertise in their metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTag {
    /// Network isolation and release of the host.
    Isolation,
    KillProcess,
    SuspendProcess,
    /// Listing the processes currently running on the host.
    RunningProcesses,
    /// Retrieving a file from the host.
    GetFile,
    /// Running a shell command on the host.
    Execute,
    /// Pushing a file to the host.
    UploadFile,
    /// On-demand malware scan of a path.
    Scan,
}

impl CapabilityTag {
    /// Every tag, in declaration order.
    pub const ALL: [CapabilityTag; 8] = [
        CapabilityTag::Isolation,
        CapabilityTag::KillProcess,
        CapabilityTag::SuspendProcess,
        CapabilityTag::RunningProcesses,
        CapabilityTag::GetFile,
        CapabilityTag::Execute,
        CapabilityTag::UploadFile,
        CapabilityTag::Scan,
    ];

    /// Return the wire name of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityTag::Isolation => "isolation",
            CapabilityTag::KillProcess => "kill_process",
            CapabilityTag::SuspendProcess => "suspend_process",
            CapabilityTag::RunningProcesses => "running_processes",
            CapabilityTag::GetFile => "get_file",
            CapabilityTag::Execute => "execute",
            CapabilityTag::UploadFile => "upload_file",
            CapabilityTag::Scan => "scan",
        }
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityTag {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        CapabilityTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == name)
            .ok_or_else(|| UnknownCapability(name.to_string()))
    }
}

/// Returned when a string does not name any [`CapabilityTag`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Unknown capability tag: {0}")]
pub struct UnknownCapability(pub String);

/// The set of capabilities one endpoint supports.
///
/// Built once per session from the endpoint's advertised tags. Only
/// [`CapabilityTag`] members can be stored, so unknown strings are dropped
/// on construction.
///
/// # Example
///
/// ```
/// use responder_types::{CapabilitySet, CapabilityTag};
///
/// let caps = CapabilitySet::from_strings(["isolation", "kill_process", "teleport"]);
/// assert!(caps.supports(CapabilityTag::KillProcess));
/// assert!(!caps.supports(CapabilityTag::Scan));
/// assert_eq!(caps.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    tags: BTreeSet<CapabilityTag>,
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding every known tag.
    pub fn all() -> Self {
        CapabilityTag::ALL.into_iter().collect()
    }

    /// Build a set from raw advertised names, dropping unknown ones.
    pub fn from_strings<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| name.as_ref().parse::<CapabilityTag>().ok())
            .collect()
    }

    pub fn supports(&self, tag: CapabilityTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityTag> + '_ {
        self.tags.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<CapabilityTag> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = CapabilityTag>>(iter: T) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

/// A single grant the acting operator may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    IsolateHost,
    ReleaseHost,
    KillProcess,
    SuspendProcess,
    GetRunningProcesses,
    WriteFileOperations,
    WriteExecuteOperations,
    WriteScanOperations,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::IsolateHost,
        Permission::ReleaseHost,
        Permission::KillProcess,
        Permission::SuspendProcess,
        Permission::GetRunningProcesses,
        Permission::WriteFileOperations,
        Permission::WriteExecuteOperations,
        Permission::WriteScanOperations,
    ];

    /// Name of the matching [`PermissionSet`] flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::IsolateHost => "can_isolate_host",
            Permission::ReleaseHost => "can_release_host",
            Permission::KillProcess => "can_kill_process",
            Permission::SuspendProcess => "can_suspend_process",
            Permission::GetRunningProcesses => "can_get_running_processes",
            Permission::WriteFileOperations => "can_write_file_operations",
            Permission::WriteExecuteOperations => "can_write_execute_operations",
            Permission::WriteScanOperations => "can_write_scan_operations",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named boolean grants held by the acting operator.
///
/// Every flag defaults to `false`: a grant that is not listed is denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    pub can_isolate_host: bool,
    pub can_release_host: bool,
    pub can_kill_process: bool,
    pub can_suspend_process: bool,
    pub can_get_running_processes: bool,
    pub can_write_file_operations: bool,
    pub can_write_execute_operations: bool,
    pub can_write_scan_operations: bool,
}

impl PermissionSet {
    /// A set with every grant denied.
    pub fn none() -> Self {
        Self::default()
    }

    /// A set with every grant allowed.
    pub fn all() -> Self {
        Self {
            can_isolate_host: true,
            can_release_host: true,
            can_kill_process: true,
            can_suspend_process: true,
            can_get_running_processes: true,
            can_write_file_operations: true,
            can_write_execute_operations: true,
            can_write_scan_operations: true,
        }
    }

    /// Return `true` when the operator holds `permission`.
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::IsolateHost => self.can_isolate_host,
            Permission::ReleaseHost => self.can_release_host,
            Permission::KillProcess => self.can_kill_process,
            Permission::SuspendProcess => self.can_suspend_process,
            Permission::GetRunningProcesses => self.can_get_running_processes,
            Permission::WriteFileOperations => self.can_write_file_operations,
            Permission::WriteExecuteOperations => self.can_write_execute_operations,
            Permission::WriteScanOperations => self.can_write_scan_operations,
        }
    }

    /// Grant `permission`.  Granting twice is a no-op.
    pub fn grant(&mut self, permission: Permission) {
        *self.flag_mut(permission) = true;
    }

    /// Revoke `permission`.  Revoking an absent grant is a no-op.
    pub fn revoke(&mut self, permission: Permission) {
        *self.flag_mut(permission) = false;
    }

    fn flag_mut(&mut self, permission: Permission) -> &mut bool {
        match permission {
            Permission::IsolateHost => &mut self.can_isolate_host,
            Permission::ReleaseHost => &mut self.can_release_host,
            Permission::KillProcess => &mut self.can_kill_process,
            Permission::SuspendProcess => &mut self.can_suspend_process,
            Permission::GetRunningProcesses => &mut self.can_get_running_processes,
            Permission::WriteFileOperations => &mut self.can_write_file_operations,
            Permission::WriteExecuteOperations => &mut self.can_write_execute_operations,
            Permission::WriteScanOperations => &mut self.can_write_scan_operations,
        }
    }
}

/// Feature switches that enable optional console commands.
///
/// Passed explicitly into registry construction; nothing reads them from a
/// global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub upload_enabled: bool,
    pub execute_enabled: bool,
    pub scan_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            upload_enabled: true,
            execute_enabled: true,
            scan_enabled: false,
        }
    }
}

/// Named feature switch a command template may be gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Upload,
    Execute,
    Scan,
}

impl FeatureFlags {
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Upload => self.upload_enabled,
            Feature::Execute => self.execute_enabled,
            Feature::Scan => self.scan_enabled,
        }
    }
}

/// A typed parameter of an [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Flag(bool),
    Number(u64),
    Text(String),
    List(Vec<String>),
}

/// A validated, authorized response action ready to be dispatched to an
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub endpoint_id: String,
    /// Console command the operator typed, e.g. `release`.
    pub command: String,
    /// Action name the endpoint API expects, e.g. `unisolate`.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

impl ActionRequest {
    /// Start a request with a fresh id and the current timestamp.
    pub fn new(
        endpoint_id: impl Into<String>,
        command: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            endpoint_id: endpoint_id.into(),
            command: command.into(),
            action: action.into(),
            comment: None,
            parameters: BTreeMap::new(),
        }
    }
}

/// What a rendering layer needs to show one console command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandDescriptor {
    pub name: String,
    pub about: String,
    /// Usage line, e.g. `kill-process --pid <value> | --entityId <value> [--comment <value>]`.
    pub usage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub hidden: bool,
    pub disabled: bool,
    /// The disabled reason when `disabled`, otherwise `about`.
    pub help_text: String,
}

/// Why a command was refused before its arguments were looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The endpoint does not advertise the capability the command needs.
    UpgradeRequired,
    /// The operator lacks the permission the command needs.
    InsufficientPrivileges,
}

impl DenialReason {
    /// User-facing text for `command`.
    pub fn message(&self, command: &str) -> String {
        match self {
            DenialReason::UpgradeRequired => format!(
                "The current version of the endpoint agent does not support `{command}`. \
                 Upgrade the agent to use this command."
            ),
            DenialReason::InsufficientPrivileges => {
                format!("Insufficient privileges to run `{command}`.")
            }
        }
    }
}

fn render_denial(command: &str, reasons: &[DenialReason]) -> String {
    reasons
        .iter()
        .map(|reason| reason.message(command))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A capability or permission denial.  Blocks execution, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", render_denial(.command, .reasons))]
pub struct AuthorizationError {
    pub command: String,
    /// Upgrade-required first, then insufficient-privileges.
    pub reasons: Vec<DenialReason>,
}

impl AuthorizationError {
    pub fn has(&self, reason: DenialReason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// A malformed console line or argument.  Blocks submission, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    pub command: Option<String>,
    pub argument: Option<String>,
    pub message: String,
}

impl ValidationError {
    /// An error not tied to any command, e.g. an unparseable line.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            command: None,
            argument: None,
            message: message.into(),
        }
    }

    pub fn for_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            argument: None,
            message: message.into(),
        }
    }

    pub fn for_argument(
        command: impl Into<String>,
        argument: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            command: Some(command.into()),
            argument: Some(argument.into()),
            message: message.into(),
        }
    }
}

/// Everything a console submission can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleError {
    #[error("Unsupported command: {0}")]
    UnknownCommand(String),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
