use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use crate::api::ApiClientTrait;
use crate::session::{SessionKey, SessionRepository};
use crate::state::workflow::Workflow;
use crate::types::{FormField, InputMode, MqReport, Side, Toast};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Form,
    Queues,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub cursor: usize,
}

#[derive(Debug, Default)]
pub struct GuideState {
    pub open: bool,
    pub step: usize,
}

#[derive(Debug)]
pub struct ReportView {
    pub queue_name: String,
    pub loading: bool,
    pub error: Option<String>,
    pub report: Option<MqReport>,
}

/// Guided-tour steps for one side. Purely illustrative; never gates an
/// action.
pub fn guide_steps(side: Side) -> [(&'static str, &'static str); 4] {
    match side {
        Side::Source => [
            (
                "Requirement 1: Provide MQ Server details",
                "Fill in the source MQ server, credentials, and backup directory. Choose transfer mode if needed.",
            ),
            (
                "Requirement 2: Test connection",
                "Press c to validate credentials. Press c again to disconnect if you need to edit fields.",
            ),
            (
                "Requirement 3: Select queue managers for backup",
                "Pick at least one queue manager to include in the backup.",
            ),
            (
                "Requirement 4: Backup",
                "Start the backup with b and track progress in the Event Logs.",
            ),
        ],
        Side::Destination => [
            (
                "Requirement 1: Provide destination details",
                "Choose the target environment and platform, then fill in the credentials it requires.",
            ),
            (
                "Requirement 2: Test connection",
                "Press c to validate credentials. Cloud targets also perform a provider login.",
            ),
            (
                "Requirement 3: Select queue managers to migrate",
                "Pick at least one queue manager from the backed-up list.",
            ),
            (
                "Requirement 4: Migrate",
                "Start the migration with b and track progress in the Event Logs.",
            ),
        ],
    }
}

pub struct App {
    pub api: Box<dyn ApiClientTrait>,
    pub session: SessionRepository,
    pub ws_url: String,
    pub export_dir: PathBuf,
    pub screen: Screen,
    pub active_side: Side,
    pub source: Workflow,
    pub destination: Workflow,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub form_cursor: usize,
    pub input_buffer: String,
    pub login: LoginForm,
    pub is_submitting: bool,
    pub toast: Option<Toast>,
    pub guide: GuideState,
    pub guide_seen: [bool; 2],
    pub show_help: bool,
    pub show_completion_modal: bool,
    pub report: Option<ReportView>,
    pub should_quit: bool,
}

impl App {
    pub fn new(api: Box<dyn ApiClientTrait>, session: SessionRepository, ws_url: String) -> Self {
        let mut app = Self {
            api,
            session,
            ws_url,
            export_dir: PathBuf::from("."),
            screen: Screen::Login,
            active_side: Side::Source,
            source: Workflow::new(Side::Source),
            destination: Workflow::new(Side::Destination),
            input_mode: InputMode::Normal,
            focus: Focus::Form,
            form_cursor: 0,
            input_buffer: String::new(),
            login: LoginForm::default(),
            is_submitting: false,
            toast: None,
            guide: GuideState::default(),
            guide_seen: [false, false],
            show_help: false,
            show_completion_modal: false,
            report: None,
            should_quit: false,
        };

        app.source.rehydrate(&app.session);
        app.destination.rehydrate(&app.session);
        if let Some(token) = app.session.get::<String>(SessionKey::AccessToken, None) {
            app.api.set_token(Some(token));
            app.screen = Screen::Workspace;
            app.enter_workspace();
        }
        app
    }

    pub fn active(&self) -> &Workflow {
        match self.active_side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    pub fn active_mut(&mut self) -> &mut Workflow {
        match self.active_side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        }
    }

    pub fn show_toast(&mut self, toast: Toast) {
        self.toast = Some(toast);
    }

    /// Tick housekeeping: expire the toast after three seconds.
    pub fn on_tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.shown_at.elapsed().as_millis() >= 3000 {
                self.toast = None;
            }
        }
    }

    fn enter_workspace(&mut self) {
        if let Some(message) = self.session.take::<String>(SessionKey::LoginToast, None) {
            self.show_toast(Toast::success(message));
        }
        self.maybe_open_guide();
    }

    fn maybe_open_guide(&mut self) {
        let idx = match self.active_side {
            Side::Source => 0,
            Side::Destination => 1,
        };
        if !self.guide_seen[idx] {
            self.guide_seen[idx] = true;
            self.guide = GuideState { open: true, step: 0 };
        }
    }

    pub fn open_guide(&mut self) {
        self.guide = GuideState { open: true, step: 0 };
    }

    pub fn guide_next(&mut self) {
        if !self.guide.open {
            return;
        }
        if self.guide.step + 1 >= guide_steps(self.active_side).len() {
            self.guide.open = false;
        } else {
            self.guide.step += 1;
        }
    }

    pub fn guide_skip(&mut self) {
        self.guide.open = false;
    }

    pub fn switch_side(&mut self, side: Side) {
        if self.active_side != side {
            self.active_side = side;
            self.focus = Focus::Form;
            self.form_cursor = 0;
            self.show_completion_modal = false;
            self.maybe_open_guide();
        }
    }

    pub async fn submit_login(&mut self) {
        if self.is_submitting {
            return;
        }
        self.is_submitting = true;
        let result = self
            .api
            .login(self.login.username.trim(), &self.login.password)
            .await;
        self.is_submitting = false;

        match result {
            Ok(response) if response.success => {
                let token = match response.access_token {
                    Some(token) => token,
                    None => {
                        self.show_toast(Toast::error("Invalid Credentials"));
                        return;
                    }
                };
                info!("login succeeded");
                self.session.set(SessionKey::AccessToken, None, &token);
                self.session
                    .set(SessionKey::LoginToast, None, &"Log in Success".to_string());
                self.api.set_token(Some(token));
                self.login.password.clear();
                self.screen = Screen::Workspace;
                self.active_side = Side::Source;
                self.enter_workspace();
            }
            Ok(_) => self.show_toast(Toast::error("Invalid Credentials")),
            Err(err) => {
                error!(%err, "login request failed");
                self.show_toast(Toast::error("Invalid Credentials"));
            }
        }
    }

    /// Clear every persisted key and return to the login screen.
    pub fn logout(&mut self) {
        self.session.clear_all();
        self.api.set_token(None);
        self.source = Workflow::new(Side::Source);
        self.destination = Workflow::new(Side::Destination);
        self.login = LoginForm::default();
        self.screen = Screen::Login;
        self.active_side = Side::Source;
        self.focus = Focus::Form;
        self.form_cursor = 0;
        self.report = None;
        self.show_completion_modal = false;
        self.toast = None;
    }

    pub async fn connect_toggle(&mut self) {
        let workflow = match self.active_side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        };
        let toast = workflow
            .test_connection(self.api.as_ref(), &mut self.session)
            .await;
        self.show_toast(toast);
    }

    pub async fn run_active_operation(&mut self) {
        let side = self.active_side;
        let workflow = match side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        };
        let toast = workflow
            .run_operation(self.api.as_ref(), &mut self.session, &self.ws_url)
            .await;
        let completed = workflow.operation_completed;
        self.show_toast(toast);
        if side == Side::Source && completed {
            self.show_completion_modal = true;
        }
    }

    pub async fn view_report(&mut self, queue_name: String) {
        self.report = Some(ReportView {
            queue_name: queue_name.clone(),
            loading: true,
            error: None,
            report: None,
        });
        let cloud = self.active().is_cloud();
        let result = self
            .api
            .queue_manager_report(self.active_side, &queue_name, cloud)
            .await;
        if let Some(view) = &mut self.report {
            view.loading = false;
            match result {
                Ok(report) => view.report = Some(report),
                Err(err) => {
                    error!(%err, "report fetch failed");
                    view.error = Some(err.to_string());
                }
            }
        }
    }

    pub fn close_report(&mut self) {
        self.report = None;
    }

    /// Write the open report as plain text next to the state directory.
    pub fn export_report(&mut self) -> Result<()> {
        let (queue_name, report) = match &self.report {
            Some(view) => (view.queue_name.clone(), view.report.clone()),
            None => return Ok(()),
        };
        let Some(report) = report else {
            self.show_toast(Toast::error("No report data to download."));
            return Ok(());
        };
        let safe_name: String = queue_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "_.-".contains(c) { c } else { '_' })
            .collect();
        let name = if safe_name.is_empty() {
            "mq_report".to_string()
        } else {
            safe_name
        };
        let path = self.export_dir.join(format!("{name}_report.txt"));
        let lines = report.report_lines(&queue_name, Utc::now());
        std::fs::write(&path, lines.join("\n"))?;
        self.show_toast(Toast::success(format!("Report saved to {}", path.display())));
        Ok(())
    }

    // ----- form editing -----

    pub fn visible_fields(&self) -> Vec<FormField> {
        self.active().profile.visible_fields(self.active_side)
    }

    pub fn current_field(&self) -> Option<FormField> {
        self.visible_fields().get(self.form_cursor).copied()
    }

    pub fn move_form_cursor_up(&mut self) {
        if self.form_cursor > 0 {
            self.form_cursor -= 1;
        }
    }

    pub fn move_form_cursor_down(&mut self) {
        let max = self.visible_fields().len().saturating_sub(1);
        if self.form_cursor < max {
            self.form_cursor += 1;
        }
    }

    /// Enter on a form field: selectors cycle in place, text fields open the
    /// edit buffer seeded with the current value.
    pub fn activate_current_field(&mut self) {
        let Some(field) = self.current_field() else {
            return;
        };
        if field.is_selector() {
            let side = self.active_side;
            let workflow = match side {
                Side::Source => &mut self.source,
                Side::Destination => &mut self.destination,
            };
            workflow.cycle_field(field, &mut self.session);
            // Cycling a parent selector can shrink the field list.
            let max = self.visible_fields().len().saturating_sub(1);
            self.form_cursor = self.form_cursor.min(max);
        } else {
            self.input_buffer = self.active().profile.value(field);
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn commit_edit(&mut self) {
        if let Some(field) = self.current_field() {
            let value = std::mem::take(&mut self.input_buffer);
            let workflow = match self.active_side {
                Side::Source => &mut self.source,
                Side::Destination => &mut self.destination,
            };
            workflow.update_field(field, value, &mut self.session);
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_edit(&mut self) {
        self.input_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    // ----- queue list -----

    pub fn move_queue_cursor_up(&mut self) {
        let workflow = self.active_mut();
        if workflow.queue_cursor > 0 {
            workflow.queue_cursor -= 1;
        }
    }

    pub fn move_queue_cursor_down(&mut self) {
        let workflow = self.active_mut();
        if workflow.queue_cursor < workflow.queue_managers.len().saturating_sub(1) {
            workflow.queue_cursor += 1;
        }
    }

    pub fn toggle_queue_at_cursor(&mut self) {
        let workflow = match self.active_side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        };
        let Some(name) = workflow
            .queue_managers
            .get(workflow.queue_cursor)
            .map(|qm| qm.name.clone())
        else {
            return;
        };
        if let Some(toast) = workflow.toggle_queue_selection(&name, &mut self.session) {
            self.show_toast(toast);
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}
