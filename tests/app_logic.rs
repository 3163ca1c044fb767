use futures_util::SinkExt;
use mq_shift::api::MockApiClientTrait;
use mq_shift::app::{App, Screen};
use mq_shift::error::ApiError;
use mq_shift::session::{SessionKey, SessionRepository};
use mq_shift::state::saga::run_cloud_migration;
use mq_shift::state::workflow::Workflow;
use mq_shift::types::{
    ApiOutcome, CloudCredentials, ClusterAccess, ConnectionState, LoginResponse,
    QueueManagerSummary, ServerCredentials, Side, TargetEnvironment, ToastTone,
};

fn filled_server() -> ServerCredentials {
    ServerCredentials {
        server: "mq01.example.com".to_string(),
        username: "mqadmin".to_string(),
        password: "secret".to_string(),
        backup_dir: "/var/mqm/backups".to_string(),
    }
}

fn filled_cloud() -> CloudCredentials {
    CloudCredentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        tenant_id: "tenant".to_string(),
        subscription_id: "sub".to_string(),
        resource_group: "rg-mq".to_string(),
        cluster_name: "aks-mq".to_string(),
        namespace: "mq".to_string(),
    }
}

fn qm(name: &str) -> QueueManagerSummary {
    QueueManagerSummary {
        name: name.to_string(),
        state: "Running".to_string(),
        path: Some(format!("/var/mqm/backups/{name}.mqsc")),
    }
}

fn ok(message: &str) -> ApiOutcome {
    ApiOutcome {
        success: true,
        message: message.to_string(),
    }
}

/// Minimal WebSocket endpoint standing in for the backend's log stream.
async fn spawn_log_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let _ = ws
                    .send(tokio_tungstenite::tungstenite::Message::Text(
                        "worker started".to_string(),
                    ))
                    .await;
            });
        }
    });
    format!("ws://{addr}")
}

#[test]
fn test_app_initialization() {
    let app = App::new(
        Box::new(MockApiClientTrait::new()),
        SessionRepository::in_memory(),
        "ws://localhost:8080".to_string(),
    );

    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.active_side, Side::Source);
    assert!(app.source.queue_managers.is_empty());
    assert!(app.source.selected_queues.is_empty());
    assert_eq!(app.source.connection_state, ConnectionState::Untested);
}

#[test]
fn test_app_restores_persisted_session() {
    let mut session = SessionRepository::in_memory();
    session.set(SessionKey::AccessToken, None, &"jwt-token".to_string());
    session.set(SessionKey::Connected, Some(Side::Source), &true);
    session.set(
        SessionKey::SelectedQueues,
        Some(Side::Source),
        &vec!["QM1".to_string()],
    );

    let mut mock = MockApiClientTrait::new();
    mock.expect_set_token()
        .withf(|t| t.as_deref() == Some("jwt-token"))
        .times(1)
        .returning(|_| ());

    let app = App::new(Box::new(mock), session, "ws://localhost:8080".to_string());

    assert_eq!(app.screen, Screen::Workspace);
    assert_eq!(app.source.connection_state, ConnectionState::Connected);
    assert_eq!(app.source.selected_queues, vec!["QM1".to_string()]);
}

#[tokio::test]
async fn test_login_success_enters_workspace() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_login()
        .withf(|user, pass| user == "admin" && pass == "admin123")
        .times(1)
        .returning(|_, _| {
            Ok(LoginResponse {
                success: true,
                access_token: Some("jwt-token".to_string()),
            })
        });
    mock.expect_set_token().times(1).returning(|_| ());

    let mut app = App::new(
        Box::new(mock),
        SessionRepository::in_memory(),
        "ws://localhost:8080".to_string(),
    );
    app.login.username = "admin".to_string();
    app.login.password = "admin123".to_string();

    app.submit_login().await;

    assert_eq!(app.screen, Screen::Workspace);
    let toast = app.toast.expect("login toast");
    assert_eq!(toast.message, "Log in Success");
    assert_eq!(toast.tone, ToastTone::Success);
    assert!(app.login.password.is_empty());
}

#[tokio::test]
async fn test_login_failure_shows_error() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_login().times(1).returning(|_, _| {
        Ok(LoginResponse {
            success: false,
            access_token: None,
        })
    });

    let mut app = App::new(
        Box::new(mock),
        SessionRepository::in_memory(),
        "ws://localhost:8080".to_string(),
    );
    app.login.username = "admin".to_string();
    app.login.password = "wrong".to_string();

    app.submit_login().await;

    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.toast.unwrap().message, "Invalid Credentials");
}

#[tokio::test]
async fn test_connect_refuses_incomplete_form() {
    let mock = MockApiClientTrait::new();
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);

    let toast = workflow.test_connection(&mock, &mut session).await;

    assert_eq!(toast.message, "Fill in all required connection fields first.");
    assert_eq!(workflow.connection_state, ConnectionState::Untested);
}

#[tokio::test]
async fn test_connect_success_lists_queues() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_store_server_credentials()
        .withf(|side, _| *side == Side::Source)
        .times(1)
        .returning(|_, _| Ok(ok("Server Credentials updated Successfully!")));
    mock.expect_list_source_queue_managers()
        .times(1)
        .returning(|| Ok(vec![qm("QM1"), qm("QM2")]));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.profile.server = filled_server();

    let toast = workflow.test_connection(&mock, &mut session).await;

    assert_eq!(toast.tone, ToastTone::Success);
    assert_eq!(workflow.connection_state, ConnectionState::Connected);
    assert_eq!(workflow.queue_managers.len(), 2);
    assert!(session.get_bool(SessionKey::Connected, Some(Side::Source)));
    assert!(workflow.progress().connection_tested);
    assert!(!workflow.progress().queues_selected);
}

#[tokio::test]
async fn test_connect_toggle_disconnects_and_preserves_credentials() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_store_server_credentials()
        .times(1)
        .returning(|_, _| Ok(ok("Server Credentials updated Successfully!")));
    mock.expect_list_source_queue_managers()
        .times(1)
        .returning(|| Ok(vec![qm("QM1")]));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.profile.server = filled_server();

    workflow.test_connection(&mock, &mut session).await;
    workflow.toggle_queue_selection("QM1", &mut session);
    assert_eq!(workflow.selected_queues.len(), 1);

    // Second press disconnects.
    let toast = workflow.test_connection(&mock, &mut session).await;

    assert_eq!(toast.message, "Disconnected.");
    assert_eq!(workflow.connection_state, ConnectionState::Untested);
    assert!(workflow.queue_managers.is_empty());
    assert!(workflow.selected_queues.is_empty());
    assert!(!session.get_bool(SessionKey::Connected, Some(Side::Source)));
    // The form itself survives the disconnect.
    assert_eq!(workflow.profile.server, filled_server());
    assert!(workflow.credentials_provided());
}

#[tokio::test]
async fn test_connect_failure_keeps_untested_state() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_store_server_credentials()
        .times(1)
        .returning(|_, _| Err(ApiError::Transport("connection refused".to_string())));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.profile.server = filled_server();

    let toast = workflow.test_connection(&mock, &mut session).await;

    assert_eq!(toast.message, "Connection not successful");
    assert_eq!(workflow.connection_state, ConnectionState::Untested);
}

#[tokio::test]
async fn test_missing_token_message_is_verbatim() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_store_server_credentials()
        .times(1)
        .returning(|_, _| Err(ApiError::MissingToken));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.profile.server = filled_server();

    let toast = workflow.test_connection(&mock, &mut session).await;

    assert_eq!(toast.message, "Missing access token. Please log in again.");
}

#[test]
fn test_toggle_requires_connection() {
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.queue_managers = vec![qm("QM1")];

    assert!(workflow.toggle_queue_selection("QM1", &mut session).is_none());
    assert!(workflow.selected_queues.is_empty());
}

#[test]
fn test_emptying_selection_warns() {
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.connection_state = ConnectionState::Connected;
    workflow.queue_managers = vec![qm("QM1")];

    assert!(workflow.toggle_queue_selection("QM1", &mut session).is_none());
    let toast = workflow
        .toggle_queue_selection("QM1", &mut session)
        .expect("empty-selection warning");
    assert_eq!(toast.message, "Select at least one queue manager for backup.");
    // Warning does not block further toggles.
    assert!(workflow.toggle_queue_selection("QM1", &mut session).is_none());
    assert_eq!(workflow.selected_queues, vec!["QM1".to_string()]);
}

#[tokio::test]
async fn test_refresh_prunes_stale_selection() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_list_source_queue_managers()
        .times(1)
        .returning(|| Ok(vec![qm("B"), qm("D")]));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.connection_state = ConnectionState::Connected;
    workflow.queue_managers = vec![qm("A"), qm("B"), qm("C")];
    workflow.selected_queues = vec!["A".to_string(), "B".to_string(), "C".to_string()];

    workflow.refresh_queue_managers(&mock, &mut session).await;

    assert_eq!(workflow.selected_queues, vec!["B".to_string()]);
    assert_eq!(
        session.get::<Vec<String>>(SessionKey::SelectedQueues, Some(Side::Source)),
        Some(vec!["B".to_string()])
    );
}

#[tokio::test]
async fn test_run_operation_requires_connection() {
    let mock = MockApiClientTrait::new();
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);

    let toast = workflow
        .run_operation(&mock, &mut session, "ws://localhost:1")
        .await;

    assert_eq!(toast.message, "Test the connection first.");
}

#[tokio::test]
async fn test_run_operation_requires_selection() {
    let mock = MockApiClientTrait::new();
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.connection_state = ConnectionState::Connected;

    let toast = workflow
        .run_operation(&mock, &mut session, "ws://localhost:1")
        .await;

    assert_eq!(toast.message, "Select at least one queue manager for backup.");
}

#[tokio::test]
async fn test_run_operation_aborts_when_log_stream_unreachable() {
    let mock = MockApiClientTrait::new();
    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.connection_state = ConnectionState::Connected;
    workflow.queue_managers = vec![qm("QM1")];
    workflow.selected_queues = vec!["QM1".to_string()];

    // Nothing is listening on this port; the backup POST must never fire.
    let toast = workflow
        .run_operation(&mock, &mut session, "ws://127.0.0.1:9")
        .await;

    assert_eq!(toast.tone, ToastTone::Error);
    assert!(!workflow.is_running);
    assert!(!workflow.operation_completed);
}

#[tokio::test]
async fn test_backup_success_completes_workflow() {
    let ws_url = spawn_log_server().await;

    let mut mock = MockApiClientTrait::new();
    mock.expect_run_backup()
        .withf(|names, transfer| names.len() == 1 && names[0] == "QM1" && transfer.is_none())
        .times(1)
        .returning(|_, _| Ok(ok("Backup completed successfully")));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.profile.server = filled_server();
    workflow.connection_state = ConnectionState::Connected;
    workflow.queue_managers = vec![qm("QM1")];
    workflow.selected_queues = vec!["QM1".to_string()];

    let toast = workflow.run_operation(&mock, &mut session, &ws_url).await;

    assert_eq!(toast.tone, ToastTone::Success);
    assert!(workflow.operation_completed);
    assert!(!workflow.is_running);
    assert!(session.get_bool(SessionKey::OperationDone, Some(Side::Source)));
    assert!(workflow.progress().operation_completed);
    let log_lines: Vec<&str> = workflow.logs.lines().collect();
    assert!(log_lines.iter().any(|l| l.contains("Backup started for: QM1")));
    assert!(log_lines.iter().any(|l| l.contains("Transfer type: Local")));
}

#[tokio::test]
async fn test_backup_failure_clears_completion() {
    let ws_url = spawn_log_server().await;

    let mut mock = MockApiClientTrait::new();
    mock.expect_run_backup()
        .times(1)
        .returning(|_, _| Err(ApiError::Transport("boom".to_string())));

    let mut session = SessionRepository::in_memory();
    let mut workflow = Workflow::new(Side::Source);
    workflow.connection_state = ConnectionState::Connected;
    workflow.queue_managers = vec![qm("QM1")];
    workflow.selected_queues = vec!["QM1".to_string()];

    let toast = workflow.run_operation(&mock, &mut session, &ws_url).await;

    assert_eq!(toast.message, "Backup failed.");
    assert!(!workflow.operation_completed);
    assert!(!workflow.is_running);
    assert!(!session.get_bool(SessionKey::OperationDone, Some(Side::Source)));
}

#[tokio::test]
async fn test_source_completion_opens_handoff_modal() {
    let ws_url = spawn_log_server().await;

    let mut mock = MockApiClientTrait::new();
    mock.expect_run_backup()
        .times(1)
        .returning(|_, _| Ok(ok("Backup completed successfully")));

    let mut app = App::new(
        Box::new(mock),
        SessionRepository::in_memory(),
        ws_url,
    );
    app.screen = Screen::Workspace;
    app.source.profile.server = filled_server();
    app.source.connection_state = ConnectionState::Connected;
    app.source.queue_managers = vec![qm("QM1")];
    app.source.selected_queues = vec!["QM1".to_string()];

    app.run_active_operation().await;

    assert!(app.show_completion_modal);
}

#[tokio::test]
async fn test_cloud_saga_runs_all_steps_in_order() {
    let mut mock = MockApiClientTrait::new();
    let mut seq = mockall::Sequence::new();
    mock.expect_azure_login()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ok("Azure Login Successful")));
    mock.expect_create_cluster()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ok("Cluster created")));
    mock.expect_fetch_cluster_credentials()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Ok(ClusterAccess {
                outcome: ok("Credentials fetched"),
                kubeconfig_path: Some("/root/.kube/config".to_string()),
            })
        });
    mock.expect_install_mq()
        .withf(|ns| ns == "mq")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ok("MQ installed")));
    mock.expect_load_mqsc()
        .withf(|path| path == "/var/mqm/backups/QM1.mqsc")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(ok("Migration completed successfully")));

    let mut logs = mq_shift::logs::LogStream::default();
    let report = run_cloud_migration(
        &mock,
        &filled_cloud(),
        Some("/var/mqm/backups/QM1.mqsc"),
        &mut logs,
    )
    .await
    .unwrap();

    assert!(report.verdict.success);
    let steps: Vec<&str> = report.ledger.iter().map(|s| s.step).collect();
    assert_eq!(
        steps,
        [
            "azure login",
            "cluster create",
            "cluster credentials",
            "mq install",
            "load mqsc"
        ]
    );
}

#[tokio::test]
async fn test_cloud_saga_stops_without_kubeconfig() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_azure_login()
        .times(1)
        .returning(|_| Ok(ok("Azure Login Successful")));
    mock.expect_create_cluster()
        .times(1)
        .returning(|_| Ok(ok("Cluster created")));
    mock.expect_fetch_cluster_credentials().times(1).returning(|_| {
        Ok(ClusterAccess {
            outcome: ok("Credentials fetched"),
            kubeconfig_path: None,
        })
    });
    // No install/load expectations: reaching them would panic the mock.

    let mut logs = mq_shift::logs::LogStream::default();
    let report = run_cloud_migration(&mock, &filled_cloud(), None, &mut logs)
        .await
        .unwrap();

    assert!(!report.verdict.success);
    assert_eq!(
        report.verdict.message,
        "Cluster credentials did not include a kubeconfig path."
    );
    assert_eq!(report.ledger.len(), 3);
}

#[tokio::test]
async fn test_intermediate_saga_failure_does_not_stop_run() {
    let mut mock = MockApiClientTrait::new();
    mock.expect_azure_login()
        .times(1)
        .returning(|_| Ok(ok("Azure Login Successful")));
    mock.expect_create_cluster().times(1).returning(|_| {
        Ok(ApiOutcome {
            success: false,
            message: "Cluster already exists".to_string(),
        })
    });
    mock.expect_fetch_cluster_credentials().times(1).returning(|_| {
        Ok(ClusterAccess {
            outcome: ok("Credentials fetched"),
            kubeconfig_path: Some("/root/.kube/config".to_string()),
        })
    });
    mock.expect_install_mq()
        .times(1)
        .returning(|_| Ok(ok("MQ installed")));
    mock.expect_load_mqsc()
        .times(1)
        .returning(|_| Ok(ok("Migration completed successfully")));

    let mut logs = mq_shift::logs::LogStream::default();
    let report = run_cloud_migration(
        &mock,
        &filled_cloud(),
        Some("/var/mqm/backups/QM1.mqsc"),
        &mut logs,
    )
    .await
    .unwrap();

    // The verdict is the final step's outcome, not an aggregate.
    assert!(report.verdict.success);
    assert!(!report.ledger[1].outcome.success);
}

#[test]
fn test_logout_clears_everything() {
    let mut session = SessionRepository::in_memory();
    session.set(SessionKey::AccessToken, None, &"jwt-token".to_string());

    let mut mock = MockApiClientTrait::new();
    mock.expect_set_token().times(2).returning(|_| ());

    let mut app = App::new(Box::new(mock), session, "ws://localhost:8080".to_string());
    app.source.connection_state = ConnectionState::Connected;
    app.source.selected_queues = vec!["QM1".to_string()];

    app.logout();

    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.source.connection_state, ConnectionState::Untested);
    assert!(app.source.selected_queues.is_empty());
    assert!(app
        .session
        .get::<String>(SessionKey::AccessToken, None)
        .is_none());
}

#[test]
fn test_destination_cloud_form_requires_cloud_credentials() {
    let mut workflow = Workflow::new(Side::Destination);
    workflow.profile.environment = TargetEnvironment::Cloud;
    workflow.profile.platform = "Azure".to_string();
    workflow.profile.compute_model = "Container".to_string();
    workflow.profile.deployment_mode = "Native HA".to_string();
    assert!(!workflow.credentials_provided());

    workflow.profile.cloud = filled_cloud();
    assert!(workflow.credentials_provided());
    assert!(workflow.is_cloud());
}
