use tracing::info;

use crate::api::ApiClientTrait;
use crate::error::ApiResult;
use crate::logs::LogStream;
use crate::types::{ApiOutcome, CloudCredentials};

/// One executed saga step and what the backend said about it.
#[derive(Debug, Clone)]
pub struct SagaStepResult {
    pub step: &'static str,
    pub outcome: ApiOutcome,
}

/// Result of a full saga run. The verdict is the final step's outcome;
/// intermediate failures are recorded in the ledger but roll nothing back.
#[derive(Debug, Clone)]
pub struct SagaReport {
    pub ledger: Vec<SagaStepResult>,
    pub verdict: ApiOutcome,
}

/// Cloud destination migration: provider login, cluster create, cluster
/// credentials, MQ install, MQSC load. Steps run strictly sequentially and
/// there is no compensation: a half-provisioned cluster is left standing for
/// manual inspection.
///
/// The one fail-fast point is the kubeconfig check — without it the
/// remaining steps cannot address the cluster at all.
pub async fn run_cloud_migration(
    api: &dyn ApiClientTrait,
    creds: &CloudCredentials,
    artifact_path: Option<&str>,
    logs: &mut LogStream,
) -> ApiResult<SagaReport> {
    let mut ledger = Vec::new();

    let login = api.azure_login(creds).await?;
    record(&mut ledger, logs, "azure login", login);

    let create = api.create_cluster(creds).await?;
    record(&mut ledger, logs, "cluster create", create);

    let access = api.fetch_cluster_credentials(creds).await?;
    record(&mut ledger, logs, "cluster credentials", access.outcome);
    if access.kubeconfig_path.is_none() {
        let verdict =
            ApiOutcome::failure("Cluster credentials did not include a kubeconfig path.");
        logs.push(format!("$ {}", verdict.message));
        return Ok(SagaReport { ledger, verdict });
    }

    let install = api.install_mq(&creds.namespace).await?;
    record(&mut ledger, logs, "mq install", install);

    let verdict = match artifact_path {
        Some(path) => {
            let load = api.load_mqsc(path).await?;
            record(&mut ledger, logs, "load mqsc", load.clone());
            load
        }
        None => {
            let verdict =
                ApiOutcome::failure("No exported artifact path for the selected queue manager.");
            logs.push(format!("$ {}", verdict.message));
            verdict
        }
    };

    Ok(SagaReport { ledger, verdict })
}

fn record(
    ledger: &mut Vec<SagaStepResult>,
    logs: &mut LogStream,
    step: &'static str,
    outcome: ApiOutcome,
) {
    info!(step, success = outcome.success, "saga step finished");
    logs.push(format!("$ {step}: {}", outcome.message));
    ledger.push(SagaStepResult { step, outcome });
}
