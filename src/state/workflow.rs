use tracing::{error, info};

use crate::api::ApiClientTrait;
use crate::error::ApiError;
use crate::logs::{LogStream, LogSubscription};
use crate::session::{SessionKey, SessionRepository};
use crate::state::saga;
use crate::types::{
    BackupFrom, ConnectionProfile, ConnectionState, FormField, QueueManagerSummary, Side,
    TargetEnvironment, Toast, WorkflowProgress,
};

/// Per-side migration workflow: a monotonic four-step checklist driving which
/// actions are permitted. Booleans can regress (disconnect clears the later
/// steps) but never complete out of order.
pub struct Workflow {
    pub side: Side,
    pub profile: ConnectionProfile,
    pub connection_state: ConnectionState,
    pub queue_managers: Vec<QueueManagerSummary>,
    pub selected_queues: Vec<String>,
    pub queue_cursor: usize,
    pub operation_completed: bool,
    pub is_running: bool,
    pub logs: LogStream,
}

impl Workflow {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            profile: ConnectionProfile::default(),
            connection_state: ConnectionState::Untested,
            queue_managers: Vec::new(),
            selected_queues: Vec::new(),
            queue_cursor: 0,
            operation_completed: false,
            is_running: false,
            logs: LogStream::default(),
        }
    }

    /// Rebuild in-memory state from the session store, once, at startup.
    /// Afterwards the in-memory state is authoritative.
    pub fn rehydrate(&mut self, session: &SessionRepository) {
        let side = Some(self.side);
        if let Some(profile) = session.get::<ConnectionProfile>(SessionKey::ConnectionForm, side) {
            self.profile = profile;
        }
        if let Some(selected) = session.get::<Vec<String>>(SessionKey::SelectedQueues, side) {
            self.selected_queues = selected;
        }
        if session.get_bool(SessionKey::Connected, side) {
            self.connection_state = ConnectionState::Connected;
        }
        self.operation_completed = session.get_bool(SessionKey::OperationDone, side);
    }

    pub fn credentials_provided(&self) -> bool {
        self.profile.is_complete(self.side)
    }

    pub fn is_cloud(&self) -> bool {
        self.side == Side::Destination && self.profile.environment == TargetEnvironment::Cloud
    }

    /// Derive the step booleans. Each step is gated on the one before it, so
    /// a later step can never show complete while an earlier one regressed.
    pub fn progress(&self) -> WorkflowProgress {
        let credentials_provided = self.credentials_provided();
        let connection_tested =
            credentials_provided && self.connection_state == ConnectionState::Connected;
        let queues_selected = connection_tested && !self.selected_queues.is_empty();
        let operation_completed = queues_selected && self.operation_completed;
        WorkflowProgress {
            credentials_provided,
            connection_tested,
            queues_selected,
            operation_completed,
        }
    }

    /// Free-text field edit. Recomputes completeness implicitly (it is a
    /// pure function of the profile) and mirrors the form to the store.
    pub fn update_field(
        &mut self,
        field: FormField,
        value: String,
        session: &mut SessionRepository,
    ) {
        self.profile.set_value(field, value);
        session.set(SessionKey::ConnectionForm, Some(self.side), &self.profile);
    }

    /// Advance a selector field (environment, platform, transfer mode, ...).
    pub fn cycle_field(&mut self, field: FormField, session: &mut SessionRepository) {
        self.profile.cycle(field);
        session.set(SessionKey::ConnectionForm, Some(self.side), &self.profile);
    }

    /// Test-connection action with toggle semantics: when already connected
    /// it disconnects instead. Entered credentials are preserved across a
    /// disconnect; only the progress flags and selection leave the store.
    pub async fn test_connection(
        &mut self,
        api: &dyn ApiClientTrait,
        session: &mut SessionRepository,
    ) -> Toast {
        if self.connection_state == ConnectionState::Connected {
            self.disconnect(session);
            return Toast::success("Disconnected.");
        }

        if !self.credentials_provided() {
            return Toast::error("Fill in all required connection fields first.");
        }

        if self.is_cloud() {
            match api.azure_login(&self.profile.cloud).await {
                Ok(outcome) if !outcome.success => return Toast::error(outcome.message),
                Ok(outcome) => self.logs.push(format!("$ {}", outcome.message)),
                Err(err) => return self.connection_failure(err, session),
            }
        }

        match api.store_server_credentials(self.side, &self.profile).await {
            Ok(outcome) if outcome.success => {
                self.connection_state = ConnectionState::Connected;
                let side = Some(self.side);
                session.set(SessionKey::Connected, side, &true);
                session.set(SessionKey::TestDone, side, &true);
                session.set(SessionKey::ConnectionForm, side, &self.profile);
                self.logs.push(format!(
                    "$ Connected to {} {}",
                    self.side.title().to_lowercase(),
                    self.connection_target()
                ));
                self.refresh_queue_managers(api, session).await;
                Toast::success(outcome.message)
            }
            Ok(outcome) => {
                self.connection_state = ConnectionState::Untested;
                session.remove(SessionKey::Connected, Some(self.side));
                Toast::error(outcome.message)
            }
            Err(err) => self.connection_failure(err, session),
        }
    }

    fn connection_failure(&mut self, err: ApiError, session: &mut SessionRepository) -> Toast {
        self.connection_state = ConnectionState::Untested;
        session.remove(SessionKey::Connected, Some(self.side));
        match err {
            ApiError::MissingToken => Toast::error(err.to_string()),
            other => {
                error!(side = self.side.as_str(), %other, "connection test failed");
                Toast::error("Connection not successful")
            }
        }
    }

    fn connection_target(&self) -> String {
        if self.is_cloud() {
            self.profile.cloud.cluster_name.trim().to_string()
        } else {
            self.profile.server.server.trim().to_string()
        }
    }

    /// Explicit disconnect: reset connection state, drop the listing and
    /// selection, clear the completion flag.
    pub fn disconnect(&mut self, session: &mut SessionRepository) {
        self.connection_state = ConnectionState::Untested;
        self.queue_managers.clear();
        self.selected_queues.clear();
        self.queue_cursor = 0;
        self.operation_completed = false;
        let side = Some(self.side);
        session.remove(SessionKey::Connected, side);
        session.remove(SessionKey::TestDone, side);
        session.remove(SessionKey::OperationDone, side);
        session.remove(SessionKey::SelectedQueues, side);
        self.logs.push("$ Disconnected.");
    }

    /// Full reset of persisted progress for this side.
    pub fn reset_progress(&mut self, session: &mut SessionRepository) {
        self.disconnect(session);
        self.logs.clear();
    }

    /// Fetch the queue-manager listing and replace the list wholesale. The
    /// result is discarded if the side is no longer connected by the time it
    /// arrives; on error the list is left untouched.
    pub async fn refresh_queue_managers(
        &mut self,
        api: &dyn ApiClientTrait,
        session: &mut SessionRepository,
    ) {
        let result = match self.side {
            Side::Source => api.list_source_queue_managers().await,
            Side::Destination => {
                let backup_from = if self.profile.transfer_mode.is_shared() {
                    BackupFrom::Shared
                } else {
                    BackupFrom::Local
                };
                api.list_destination_queue_managers(backup_from).await
            }
        };
        match result {
            Ok(list) => {
                if self.connection_state != ConnectionState::Connected {
                    return;
                }
                info!(side = self.side.as_str(), count = list.len(), "queue listing refreshed");
                self.queue_managers = list;
                self.queue_cursor = 0;
                self.prune_selection(session);
            }
            Err(err) => {
                error!(side = self.side.as_str(), %err, "queue listing fetch failed");
            }
        }
    }

    /// Drop selected names no longer present in the listing.
    pub fn prune_selection(&mut self, session: &mut SessionRepository) {
        let before = self.selected_queues.len();
        self.selected_queues
            .retain(|name| self.queue_managers.iter().any(|qm| &qm.name == name));
        if self.selected_queues.len() != before {
            self.mirror_selection(session);
        }
    }

    /// Add/remove one queue manager from the pending selection. Emptying
    /// the selection surfaces a validation message without blocking further
    /// toggles.
    pub fn toggle_queue_selection(
        &mut self,
        name: &str,
        session: &mut SessionRepository,
    ) -> Option<Toast> {
        if self.connection_state != ConnectionState::Connected {
            return None;
        }
        match self.selected_queues.iter().position(|n| n == name) {
            Some(idx) => {
                self.selected_queues.remove(idx);
            }
            None => self.selected_queues.push(name.to_string()),
        }
        self.mirror_selection(session);
        if self.selected_queues.is_empty() {
            Some(Toast::error(self.empty_selection_message()))
        } else {
            None
        }
    }

    fn mirror_selection(&self, session: &mut SessionRepository) {
        let side = Some(self.side);
        if self.selected_queues.is_empty() {
            session.remove(SessionKey::SelectedQueues, side);
        } else {
            session.set(SessionKey::SelectedQueues, side, &self.selected_queues);
        }
    }

    fn empty_selection_message(&self) -> String {
        format!(
            "Select at least one queue manager for {}.",
            match self.side {
                Side::Source => "backup",
                Side::Destination => "migration",
            }
        )
    }

    fn generic_failure_message(&self) -> &'static str {
        match self.side {
            Side::Source => "Backup failed.",
            Side::Destination => "Migration failed.",
        }
    }

    /// Artifact path for the cloud saga, keyed by the first selected queue
    /// manager's listing entry.
    fn first_selected_artifact(&self) -> Option<String> {
        let first = self.selected_queues.first()?;
        self.queue_managers
            .iter()
            .find(|qm| &qm.name == first)?
            .path
            .clone()
    }

    /// Run the side's long operation: Backup (source) or Migrate
    /// (destination). The log subscription is opened and awaited before the
    /// POST so no streamed line is lost; it is closed on every exit path
    /// after the POST resolves.
    pub async fn run_operation(
        &mut self,
        api: &dyn ApiClientTrait,
        session: &mut SessionRepository,
        ws_url: &str,
    ) -> Toast {
        if self.is_running {
            return Toast::error("An operation is already running.");
        }
        if self.connection_state != ConnectionState::Connected {
            return Toast::error("Test the connection first.");
        }
        if self.selected_queues.is_empty() {
            return Toast::error(self.empty_selection_message());
        }

        // A fresh attempt clears the previous completion before any await.
        self.operation_completed = false;
        session.remove(SessionKey::OperationDone, Some(self.side));
        self.is_running = true;

        let logs_url = format!("{}/logs", ws_url.trim_end_matches('/'));
        let mut subscription = match LogSubscription::connect(&logs_url).await {
            Ok(subscription) => subscription,
            Err(err) => {
                self.is_running = false;
                error!(%err, "aborting operation: log stream unavailable");
                return Toast::error(err.to_string());
            }
        };

        let transfer_type = self.profile.transfer_mode.backup_wire_name();
        let result = match self.side {
            Side::Source => api.run_backup(&self.selected_queues, transfer_type).await,
            Side::Destination if self.is_cloud() => {
                let artifact = self.first_selected_artifact();
                saga::run_cloud_migration(
                    api,
                    &self.profile.cloud,
                    artifact.as_deref(),
                    &mut self.logs,
                )
                .await
                .map(|report| report.verdict)
            }
            Side::Destination => api.run_migrate(&self.selected_queues).await,
        };

        subscription.drain_into(&mut self.logs);
        drop(subscription);
        self.is_running = false;

        match result {
            Ok(outcome) if outcome.success => {
                self.operation_completed = true;
                let side = Some(self.side);
                session.set(SessionKey::OperationDone, side, &true);
                session.set(SessionKey::SelectedQueues, side, &self.selected_queues);
                self.logs.push(format!(
                    "$ {} started for: {}",
                    self.side.operation_label(),
                    self.selected_queues.join(", ")
                ));
                self.logs.push(format!(
                    "$ Transfer type: {}",
                    transfer_type.unwrap_or("Local")
                ));
                self.logs.push(format!("$ {}", outcome.message));
                Toast::success(outcome.message)
            }
            Ok(outcome) => {
                session.remove(SessionKey::OperationDone, Some(self.side));
                self.logs.push(format!("$ {}", outcome.message));
                Toast::error(outcome.message)
            }
            Err(ApiError::MissingToken) => Toast::error(ApiError::MissingToken.to_string()),
            Err(err) => {
                error!(side = self.side.as_str(), %err, "operation failed");
                session.remove(SessionKey::OperationDone, Some(self.side));
                Toast::error(self.generic_failure_message())
            }
        }
    }
}
