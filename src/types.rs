use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Which page of the console a workflow belongs to. Source backs up, the
/// destination migrates; everything else about the workflow is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    /// Session-store namespace and `calledFrom` query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Destination => "destination",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Side::Source => "Source",
            Side::Destination => "Destination",
        }
    }

    pub fn operation_label(&self) -> &'static str {
        match self {
            Side::Source => "Backup",
            Side::Destination => "Migrate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetEnvironment {
    #[default]
    Vm,
    HostSystems,
    Cloud,
}

impl TargetEnvironment {
    pub const ALL: [TargetEnvironment; 3] = [
        TargetEnvironment::Vm,
        TargetEnvironment::HostSystems,
        TargetEnvironment::Cloud,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TargetEnvironment::Vm => "VM",
            TargetEnvironment::HostSystems => "Host Systems",
            TargetEnvironment::Cloud => "Cloud",
        }
    }

    pub fn platform_options(&self) -> &'static [&'static str] {
        match self {
            TargetEnvironment::Vm => &["Linux", "Windows"],
            TargetEnvironment::HostSystems => &["Mainframe", "AS/400", "Windows", "Linux"],
            TargetEnvironment::Cloud => &["Azure", "AWS", "GCP", "IBM Cloud"],
        }
    }
}

pub const COMPUTE_OPTIONS: [&str; 2] = ["VM", "Container"];

pub fn deployment_options(compute_model: &str) -> &'static [&'static str] {
    match compute_model {
        "VM" => &["RDQM", "Multiinstance", "Standalone"],
        "Container" => &["Native HA", "Multiinstance", "Standalone"],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferMode {
    #[default]
    Local,
    SharedSftp,
    SharedScp,
}

impl TransferMode {
    pub const ALL: [TransferMode; 3] = [
        TransferMode::Local,
        TransferMode::SharedSftp,
        TransferMode::SharedScp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransferMode::Local => "Local",
            TransferMode::SharedSftp => "Shared SFTP",
            TransferMode::SharedScp => "Shared SCP",
        }
    }

    /// `transferType` value for the backup payload. Local sends null.
    pub fn backup_wire_name(&self) -> Option<&'static str> {
        match self {
            TransferMode::Local => None,
            TransferMode::SharedSftp => Some("SFTP"),
            TransferMode::SharedScp => Some("SCP"),
        }
    }

    pub fn is_shared(&self) -> bool {
        !matches!(self, TransferMode::Local)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
    pub backup_dir: String,
}

impl ServerCredentials {
    pub fn is_complete(&self) -> bool {
        !self.server.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.trim().is_empty()
            && !self.backup_dir.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub cluster_name: String,
    pub namespace: String,
}

impl CloudCredentials {
    pub fn is_complete(&self) -> bool {
        [
            &self.client_id,
            &self.client_secret,
            &self.tenant_id,
            &self.subscription_id,
            &self.resource_group,
            &self.cluster_name,
            &self.namespace,
        ]
        .iter()
        .all(|f| !f.trim().is_empty())
    }
}

/// One editable field of a connection profile. Selector fields cycle through
/// a fixed option list instead of taking free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Environment,
    Platform,
    ComputeModel,
    DeploymentMode,
    Server,
    Username,
    Password,
    BackupDir,
    TransferMode,
    SftpServer,
    SftpUsername,
    SftpPassword,
    SftpBackupDir,
    ScpServer,
    ScpUsername,
    ScpPassword,
    ScpBackupDir,
    ClientId,
    ClientSecret,
    TenantId,
    SubscriptionId,
    ResourceGroup,
    ClusterName,
    CloudNamespace,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Environment => "Target Environment",
            FormField::Platform => "Target Platform",
            FormField::ComputeModel => "Compute Model",
            FormField::DeploymentMode => "Deployment Mode",
            FormField::Server => "MQ Server",
            FormField::Username => "Username",
            FormField::Password => "Password",
            FormField::BackupDir => "Backup Directory",
            FormField::TransferMode => "Transfer Mode",
            FormField::SftpServer => "SFTP Server",
            FormField::SftpUsername => "SFTP Username",
            FormField::SftpPassword => "SFTP Password",
            FormField::SftpBackupDir => "SFTP Remote Directory",
            FormField::ScpServer => "SCP Server",
            FormField::ScpUsername => "SCP Username",
            FormField::ScpPassword => "SCP Password",
            FormField::ScpBackupDir => "SCP Remote Directory",
            FormField::ClientId => "Client ID",
            FormField::ClientSecret => "Client Secret",
            FormField::TenantId => "Tenant ID",
            FormField::SubscriptionId => "Subscription ID",
            FormField::ResourceGroup => "Resource Group",
            FormField::ClusterName => "Cluster Name",
            FormField::CloudNamespace => "Namespace",
        }
    }

    pub fn is_selector(&self) -> bool {
        matches!(
            self,
            FormField::Environment
                | FormField::Platform
                | FormField::ComputeModel
                | FormField::DeploymentMode
                | FormField::TransferMode
        )
    }

    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            FormField::Password
                | FormField::SftpPassword
                | FormField::ScpPassword
                | FormField::ClientSecret
        )
    }
}

/// One side's connection form. Completeness is a pure function of the fields;
/// changing one field never mutates another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub environment: TargetEnvironment,
    pub platform: String,
    pub compute_model: String,
    pub deployment_mode: String,
    pub server: ServerCredentials,
    pub transfer_mode: TransferMode,
    pub sftp: ServerCredentials,
    pub scp: ServerCredentials,
    pub cloud: CloudCredentials,
}

impl ConnectionProfile {
    /// True iff every field required by the current environment and transfer
    /// mode is non-empty after trimming.
    pub fn is_complete(&self, side: Side) -> bool {
        if side == Side::Destination {
            if self.platform.trim().is_empty() {
                return false;
            }
            if self.environment == TargetEnvironment::Cloud {
                return !self.compute_model.trim().is_empty()
                    && !self.deployment_mode.trim().is_empty()
                    && self.cloud.is_complete();
            }
        }
        self.server.is_complete()
            && match self.transfer_mode {
                TransferMode::Local => true,
                TransferMode::SharedSftp => self.sftp.is_complete(),
                TransferMode::SharedScp => self.scp.is_complete(),
            }
    }

    /// Fields shown (and required) for this side in their display order.
    pub fn visible_fields(&self, side: Side) -> Vec<FormField> {
        let mut fields = Vec::new();
        if side == Side::Destination {
            fields.push(FormField::Environment);
            fields.push(FormField::Platform);
            if self.environment == TargetEnvironment::Cloud {
                fields.push(FormField::ComputeModel);
                fields.push(FormField::DeploymentMode);
                fields.extend([
                    FormField::ClientId,
                    FormField::ClientSecret,
                    FormField::TenantId,
                    FormField::SubscriptionId,
                    FormField::ResourceGroup,
                    FormField::ClusterName,
                    FormField::CloudNamespace,
                ]);
                return fields;
            }
        }
        fields.extend([
            FormField::Server,
            FormField::Username,
            FormField::Password,
            FormField::BackupDir,
            FormField::TransferMode,
        ]);
        match self.transfer_mode {
            TransferMode::SharedSftp => fields.extend([
                FormField::SftpServer,
                FormField::SftpUsername,
                FormField::SftpPassword,
                FormField::SftpBackupDir,
            ]),
            TransferMode::SharedScp => fields.extend([
                FormField::ScpServer,
                FormField::ScpUsername,
                FormField::ScpPassword,
                FormField::ScpBackupDir,
            ]),
            TransferMode::Local => {}
        }
        fields
    }

    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Environment => self.environment.label().to_string(),
            FormField::Platform => self.platform.clone(),
            FormField::ComputeModel => self.compute_model.clone(),
            FormField::DeploymentMode => self.deployment_mode.clone(),
            FormField::Server => self.server.server.clone(),
            FormField::Username => self.server.username.clone(),
            FormField::Password => self.server.password.clone(),
            FormField::BackupDir => self.server.backup_dir.clone(),
            FormField::TransferMode => self.transfer_mode.label().to_string(),
            FormField::SftpServer => self.sftp.server.clone(),
            FormField::SftpUsername => self.sftp.username.clone(),
            FormField::SftpPassword => self.sftp.password.clone(),
            FormField::SftpBackupDir => self.sftp.backup_dir.clone(),
            FormField::ScpServer => self.scp.server.clone(),
            FormField::ScpUsername => self.scp.username.clone(),
            FormField::ScpPassword => self.scp.password.clone(),
            FormField::ScpBackupDir => self.scp.backup_dir.clone(),
            FormField::ClientId => self.cloud.client_id.clone(),
            FormField::ClientSecret => self.cloud.client_secret.clone(),
            FormField::TenantId => self.cloud.tenant_id.clone(),
            FormField::SubscriptionId => self.cloud.subscription_id.clone(),
            FormField::ResourceGroup => self.cloud.resource_group.clone(),
            FormField::ClusterName => self.cloud.cluster_name.clone(),
            FormField::CloudNamespace => self.cloud.namespace.clone(),
        }
    }

    /// Write a free-text field. Selector fields are changed via `cycle`.
    pub fn set_value(&mut self, field: FormField, value: String) {
        match field {
            FormField::Platform => self.platform = value,
            FormField::Server => self.server.server = value,
            FormField::Username => self.server.username = value,
            FormField::Password => self.server.password = value,
            FormField::BackupDir => self.server.backup_dir = value,
            FormField::SftpServer => self.sftp.server = value,
            FormField::SftpUsername => self.sftp.username = value,
            FormField::SftpPassword => self.sftp.password = value,
            FormField::SftpBackupDir => self.sftp.backup_dir = value,
            FormField::ScpServer => self.scp.server = value,
            FormField::ScpUsername => self.scp.username = value,
            FormField::ScpPassword => self.scp.password = value,
            FormField::ScpBackupDir => self.scp.backup_dir = value,
            FormField::ClientId => self.cloud.client_id = value,
            FormField::ClientSecret => self.cloud.client_secret = value,
            FormField::TenantId => self.cloud.tenant_id = value,
            FormField::SubscriptionId => self.cloud.subscription_id = value,
            FormField::ResourceGroup => self.cloud.resource_group = value,
            FormField::ClusterName => self.cloud.cluster_name = value,
            FormField::CloudNamespace => self.cloud.namespace = value,
            FormField::Environment | FormField::ComputeModel | FormField::DeploymentMode
            | FormField::TransferMode => {}
        }
    }

    /// Advance a selector field to its next option. Changing a parent
    /// selector resets the dependent ones, as the original dropdowns did.
    pub fn cycle(&mut self, field: FormField) {
        match field {
            FormField::Environment => {
                let idx = TargetEnvironment::ALL
                    .iter()
                    .position(|e| *e == self.environment)
                    .unwrap_or(0);
                self.environment = TargetEnvironment::ALL[(idx + 1) % TargetEnvironment::ALL.len()];
                self.platform.clear();
                self.compute_model.clear();
                self.deployment_mode.clear();
            }
            FormField::Platform => {
                let options = self.environment.platform_options();
                self.platform = next_option(options, &self.platform);
                self.compute_model.clear();
                self.deployment_mode.clear();
            }
            FormField::ComputeModel => {
                self.compute_model = next_option(&COMPUTE_OPTIONS, &self.compute_model);
                self.deployment_mode.clear();
            }
            FormField::DeploymentMode => {
                let options = deployment_options(&self.compute_model);
                if !options.is_empty() {
                    self.deployment_mode = next_option(options, &self.deployment_mode);
                }
            }
            FormField::TransferMode => {
                let idx = TransferMode::ALL
                    .iter()
                    .position(|m| *m == self.transfer_mode)
                    .unwrap_or(0);
                self.transfer_mode = TransferMode::ALL[(idx + 1) % TransferMode::ALL.len()];
            }
            _ => {}
        }
    }
}

fn next_option(options: &[&str], current: &str) -> String {
    if options.is_empty() {
        return String::new();
    }
    match options.iter().position(|o| *o == current) {
        Some(idx) => options[(idx + 1) % options.len()].to_string(),
        None => options[0].to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Untested,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueManagerSummary {
    pub name: String,
    #[serde(default = "unknown_state")]
    pub state: String,
    /// Exported artifact path, present on destination listings in the cloud
    /// flow.
    #[serde(default)]
    pub path: Option<String>,
}

fn unknown_state() -> String {
    "Unknown".to_string()
}

/// The four ordered step booleans. A later step can never be true while an
/// earlier one is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkflowProgress {
    pub credentials_provided: bool,
    pub connection_tested: bool,
    pub queues_selected: bool,
    pub operation_completed: bool,
}

impl WorkflowProgress {
    pub fn steps(&self) -> [bool; 4] {
        [
            self.credentials_provided,
            self.connection_tested,
            self.queues_selected,
            self.operation_completed,
        ]
    }

    /// Index of the first incomplete step; None when the workflow is done.
    pub fn current_step(&self) -> Option<usize> {
        self.steps().iter().position(|done| !done)
    }

    pub fn step_labels(side: Side) -> [&'static str; 4] {
        match side {
            Side::Source => [
                "Provide MQ Server details",
                "Test connection",
                "Select Queue managers for backup",
                "Backup",
            ],
            Side::Destination => [
                "Provide destination details",
                "Test connection",
                "Select Queue managers to migrate",
                "Migrate",
            ],
        }
    }
}

/// Normalized backend response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOutcome {
    pub success: bool,
    pub message: String,
}

impl ApiOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: Option<String>,
}

/// `/aks/get-credentials` response. The kubeconfig path is mandatory for the
/// saga to continue.
#[derive(Debug, Clone)]
pub struct ClusterAccess {
    pub outcome: ApiOutcome,
    pub kubeconfig_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFrom {
    Local,
    Shared,
}

impl BackupFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupFrom::Local => "local",
            BackupFrom::Shared => "shared",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MqReportEntry {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MqReportSection {
    #[serde(default, rename = "listOfObjects")]
    pub list_of_objects: Vec<MqReportEntry>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl MqReportSection {
    pub fn count(&self) -> u64 {
        self.count.unwrap_or(self.list_of_objects.len() as u64)
    }
}

/// Per-queue-manager object report, eight fixed sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MqReport {
    #[serde(default)]
    pub queue: MqReportSection,
    #[serde(default)]
    pub subscription: MqReportSection,
    #[serde(default)]
    pub channel: MqReportSection,
    #[serde(default)]
    pub topic: MqReportSection,
    #[serde(default)]
    pub service: MqReportSection,
    #[serde(default, rename = "channelAuth")]
    pub channel_auth: MqReportSection,
    #[serde(default)]
    pub listener: MqReportSection,
    #[serde(default, rename = "nameList")]
    pub name_list: MqReportSection,
}

impl MqReport {
    pub fn sections(&self) -> [(&'static str, &MqReportSection); 8] {
        [
            ("queue", &self.queue),
            ("subscription", &self.subscription),
            ("channel", &self.channel),
            ("topic", &self.topic),
            ("service", &self.service),
            ("channelAuth", &self.channel_auth),
            ("listener", &self.listener),
            ("nameList", &self.name_list),
        ]
    }

    /// Deterministic plain-text rendering used for export.
    pub fn report_lines(&self, queue_name: &str, generated: DateTime<Utc>) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push("MQ Report".to_string());
        if !queue_name.is_empty() {
            lines.push(format!("Queue Manager: {queue_name}"));
        }
        lines.push(format!(
            "Generated: {} UTC",
            generated.format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(String::new());
        for (label, section) in self.sections() {
            lines.push(format!("{label} ({})", section.count()));
            if section.list_of_objects.is_empty() {
                lines.push("  (No entries)".to_string());
            } else {
                for entry in &section.list_of_objects {
                    match &entry.kind {
                        Some(kind) => lines.push(format!("  - {} [{}]", entry.name, kind)),
                        None => lines.push(format!("  - {}", entry.name)),
                    }
                }
            }
            lines.push(String::new());
        }
        lines
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub tone: ToastTone,
    pub shown_at: Instant,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: ToastTone::Success,
            shown_at: Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone: ToastTone::Error,
            shown_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}
