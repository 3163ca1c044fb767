use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::types::{
    ApiOutcome, BackupFrom, CloudCredentials, ClusterAccess, ConnectionProfile, LoginResponse,
    MqReport, QueueManagerSummary, ServerCredentials, Side, TargetEnvironment, TransferMode,
};

/// Fixed backend phrases that mean success even when nothing else in the
/// envelope says so. The backend is inconsistent; see `normalize_response`.
const SUCCESS_PHRASES: [&str; 2] = [
    "azure login successful",
    "server credentials updated successfully!",
];

/// Collapse the backend's inconsistent response envelopes into one
/// success/message pair.
///
/// A body that fails to parse as JSON is treated as no data, not as an
/// error. HTTP status seeds the verdict; any of the backend's known success
/// markers can then force it to true.
pub fn normalize_response(http_ok: bool, body: Option<&Value>) -> ApiOutcome {
    let mut success = http_ok;
    let mut message: Option<String> = None;

    if let Some(body) = body {
        if body.get("success").and_then(Value::as_bool) == Some(true) {
            success = true;
        }
        if body.get("responseCode").and_then(Value::as_str) == Some("00") {
            success = true;
        }
        if let Some(msg) = body.get("responseMsg").and_then(Value::as_str) {
            if msg.eq_ignore_ascii_case("success") {
                success = true;
            }
        }
        if let Some(msg) = body.get("message").and_then(Value::as_str) {
            let lowered = msg.to_lowercase();
            if SUCCESS_PHRASES.contains(&lowered.as_str())
                || lowered.contains("migration completed successfully")
            {
                success = true;
            }
        }
        message = body
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| body.get("responseMsg").and_then(Value::as_str))
            .map(str::to_string);
    }

    let message = message.unwrap_or_else(|| {
        if success {
            "Operation completed successfully.".to_string()
        } else {
            "Operation failed.".to_string()
        }
    });

    ApiOutcome { success, message }
}

#[mockall::automock]
#[async_trait]
pub trait ApiClientTrait: Send + Sync {
    fn set_token(&mut self, token: Option<String>);

    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse>;
    async fn azure_login(&self, creds: &CloudCredentials) -> ApiResult<ApiOutcome>;
    async fn store_server_credentials(
        &self,
        side: Side,
        profile: &ConnectionProfile,
    ) -> ApiResult<ApiOutcome>;
    async fn list_source_queue_managers(&self) -> ApiResult<Vec<QueueManagerSummary>>;
    async fn list_destination_queue_managers(
        &self,
        backup_from: BackupFrom,
    ) -> ApiResult<Vec<QueueManagerSummary>>;
    async fn run_backup(
        &self,
        mq_names: &[String],
        transfer_type: Option<&'static str>,
    ) -> ApiResult<ApiOutcome>;
    async fn run_migrate(&self, mq_names: &[String]) -> ApiResult<ApiOutcome>;
    async fn create_cluster(&self, creds: &CloudCredentials) -> ApiResult<ApiOutcome>;
    async fn fetch_cluster_credentials(
        &self,
        creds: &CloudCredentials,
    ) -> ApiResult<ClusterAccess>;
    async fn install_mq(&self, namespace: &str) -> ApiResult<ApiOutcome>;
    async fn load_mqsc(&self, artifact_path: &str) -> ApiResult<ApiOutcome>;
    async fn queue_manager_report(
        &self,
        side: Side,
        mq_name: &str,
        cloud: bool,
    ) -> ApiResult<MqReport>;
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> ApiResult<&str> {
        self.token.as_deref().ok_or(ApiError::MissingToken)
    }

    /// Issue the request and hand back the HTTP verdict plus the parsed
    /// body. A non-JSON body becomes None, matching the original console's
    /// tolerant parsing.
    async fn send(&self, req: RequestBuilder) -> ApiResult<(bool, Option<Value>)> {
        let response = req.send().await?;
        let http_ok = response.status().is_success();
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(_) if text.is_empty() => None,
            Err(err) => {
                warn!(%status, %err, "response body was not JSON");
                None
            }
        };
        debug!(%status, has_body = body.is_some(), "backend response");
        Ok((http_ok, body))
    }

    async fn post_normalized(&self, path: &str, payload: &Value) -> ApiResult<ApiOutcome> {
        let token = self.bearer()?.to_string();
        let req = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .json(payload);
        let (http_ok, body) = self.send(req).await?;
        Ok(normalize_response(http_ok, body.as_ref()))
    }

    async fn get_queue_list(&self, url: String) -> ApiResult<Vec<QueueManagerSummary>> {
        let token = self.bearer()?.to_string();
        let req = self.http.get(url).bearer_auth(token);
        let (_, body) = self.send(req).await?;
        Ok(parse_queue_list(body))
    }
}

fn server_payload(creds: &ServerCredentials) -> Value {
    json!({
        "server": creds.server.trim(),
        "user": creds.username.trim(),
        "password": creds.password,
        "backupPath": creds.backup_dir.trim(),
    })
}

fn cloud_payload(creds: &CloudCredentials) -> Value {
    json!({
        "clientId": creds.client_id.trim(),
        "clientSecret": creds.client_secret,
        "tenantId": creds.tenant_id.trim(),
        "subscriptionId": creds.subscription_id.trim(),
        "resourceGroup": creds.resource_group.trim(),
        "clusterName": creds.cluster_name.trim(),
        "namespace": creds.namespace.trim(),
    })
}

fn parse_queue_list(body: Option<Value>) -> Vec<QueueManagerSummary> {
    let Some(Value::Array(items)) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let name = obj.get("name")?.as_str()?.to_string();
            if name.is_empty() {
                return None;
            }
            let state = obj
                .get("state")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            let path = obj
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(QueueManagerSummary { name, state, path })
        })
        .collect()
}

#[async_trait]
impl ApiClientTrait for ApiClient {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }));
        let (http_ok, body) = self.send(req).await?;
        let success = http_ok
            && body
                .as_ref()
                .and_then(|b| b.get("success"))
                .and_then(Value::as_bool)
                == Some(true);
        let access_token = body
            .as_ref()
            .and_then(|b| b.get("accessToken"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Ok(LoginResponse {
            success: success && access_token.is_some(),
            access_token,
        })
    }

    async fn azure_login(&self, creds: &CloudCredentials) -> ApiResult<ApiOutcome> {
        self.post_normalized("/azure/login", &cloud_payload(creds))
            .await
    }

    async fn store_server_credentials(
        &self,
        side: Side,
        profile: &ConnectionProfile,
    ) -> ApiResult<ApiOutcome> {
        let payload = if profile.environment == TargetEnvironment::Cloud
            && side == Side::Destination
        {
            cloud_payload(&profile.cloud)
        } else {
            let mut payload = json!({
                "transferType": if profile.transfer_mode.is_shared() { "shared" } else { "LOCAL" },
                "source": server_payload(&profile.server),
            });
            let shared = match profile.transfer_mode {
                TransferMode::SharedSftp => Some(server_payload(&profile.sftp)),
                TransferMode::SharedScp => Some(server_payload(&profile.scp)),
                TransferMode::Local => None,
            };
            if let Some(shared) = shared {
                payload["destination"] = shared;
            }
            payload
        };
        let path = format!("/v1/store-server-cred?calledFrom={}", side.as_str());
        self.post_normalized(&path, &payload).await
    }

    async fn list_source_queue_managers(&self) -> ApiResult<Vec<QueueManagerSummary>> {
        self.get_queue_list(self.url("/v1/get-all-running-mq")).await
    }

    async fn list_destination_queue_managers(
        &self,
        backup_from: BackupFrom,
    ) -> ApiResult<Vec<QueueManagerSummary>> {
        let url = format!(
            "{}?backupFrom={}",
            self.url("/v1/destination/mq/list"),
            backup_from.as_str()
        );
        self.get_queue_list(url).await
    }

    async fn run_backup(
        &self,
        mq_names: &[String],
        transfer_type: Option<&'static str>,
    ) -> ApiResult<ApiOutcome> {
        self.post_normalized(
            "/v1/backup",
            &json!({ "mqNames": mq_names, "transferType": transfer_type }),
        )
        .await
    }

    async fn run_migrate(&self, mq_names: &[String]) -> ApiResult<ApiOutcome> {
        self.post_normalized("/v1/migrate", &json!({ "mqNames": mq_names }))
            .await
    }

    async fn create_cluster(&self, creds: &CloudCredentials) -> ApiResult<ApiOutcome> {
        self.post_normalized("/aks/create", &cloud_payload(creds))
            .await
    }

    async fn fetch_cluster_credentials(
        &self,
        creds: &CloudCredentials,
    ) -> ApiResult<ClusterAccess> {
        let token = self.bearer()?.to_string();
        let req = self
            .http
            .post(self.url("/aks/get-credentials"))
            .bearer_auth(token)
            .json(&cloud_payload(creds));
        let (http_ok, body) = self.send(req).await?;
        let kubeconfig_path = body
            .as_ref()
            .and_then(|b| b.get("kubeconfigPath"))
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        Ok(ClusterAccess {
            outcome: normalize_response(http_ok, body.as_ref()),
            kubeconfig_path,
        })
    }

    async fn install_mq(&self, namespace: &str) -> ApiResult<ApiOutcome> {
        self.post_normalized("/mq/install", &json!({ "namespace": namespace }))
            .await
    }

    async fn load_mqsc(&self, artifact_path: &str) -> ApiResult<ApiOutcome> {
        self.post_normalized("/mq/load-mqsc", &json!({ "path": artifact_path }))
            .await
    }

    async fn queue_manager_report(
        &self,
        side: Side,
        mq_name: &str,
        cloud: bool,
    ) -> ApiResult<MqReport> {
        let token = self.bearer()?.to_string();
        let req = match side {
            Side::Source => self
                .http
                .post(self.url("/v1/get-mq-details"))
                .bearer_auth(token)
                .json(&json!({ "mqName": mq_name })),
            Side::Destination => {
                let mode = if cloud { "cloud" } else { "vm" };
                self.http
                    .get(format!("{}?mode={mode}", self.url("/v1/destination/summary")))
                    .bearer_auth(token)
            }
        };
        let (http_ok, body) = self.send(req).await?;
        if !http_ok {
            return Err(ApiError::Transport("Unable to load MQ report.".to_string()));
        }
        let report = body
            .and_then(|b| serde_json::from_value(b).ok())
            .ok_or_else(|| ApiError::Transport("No report data returned.".to_string()))?;
        Ok(report)
    }
}
