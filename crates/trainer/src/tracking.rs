//! Experiment tracking collaborator.
//!
//! Training reports run parameters, metrics and the artifact file to an
//! MLflow server. Every call is best effort: the trainer logs failures and
//! carries on, so an unreachable server never fails a training run.

use crate::error::TrackingError;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default tracking endpoint
pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";

/// Default experiment name
pub const DEFAULT_EXPERIMENT: &str = "streaming-recommendations";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a run on the tracking server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(pub String);

/// Terminal state reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Sink for training-run metadata
#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    /// Name of this tracker (for logging)
    fn name(&self) -> &str;

    async fn start_run(&self, run_name: &str) -> Result<RunId, TrackingError>;

    async fn log_param(&self, run: &RunId, key: &str, value: &str) -> Result<(), TrackingError>;

    async fn log_metric(&self, run: &RunId, key: &str, value: f64) -> Result<(), TrackingError>;

    /// Upload a file produced by the run
    async fn log_artifact(&self, run: &RunId, path: &Path) -> Result<(), TrackingError>;

    async fn end_run(&self, run: &RunId, status: RunStatus) -> Result<(), TrackingError>;
}

/// Tracker used when tracking is disabled or the server was unreachable
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

#[async_trait]
impl ExperimentTracker for NoopTracker {
    fn name(&self) -> &str {
        "NoopTracker"
    }

    async fn start_run(&self, run_name: &str) -> Result<RunId, TrackingError> {
        Ok(RunId(run_name.to_string()))
    }

    async fn log_param(&self, _run: &RunId, _key: &str, _value: &str) -> Result<(), TrackingError> {
        Ok(())
    }

    async fn log_metric(&self, _run: &RunId, _key: &str, _value: f64) -> Result<(), TrackingError> {
        Ok(())
    }

    async fn log_artifact(&self, _run: &RunId, _path: &Path) -> Result<(), TrackingError> {
        Ok(())
    }

    async fn end_run(&self, _run: &RunId, _status: RunStatus) -> Result<(), TrackingError> {
        Ok(())
    }
}

// =============================================================================
// MLflow REST client
// =============================================================================

#[derive(Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

/// Client for the MLflow tracking REST API (2.0)
#[derive(Debug, Clone)]
pub struct MlflowTracker {
    client: reqwest::Client,
    base_url: String,
    experiment_id: String,
}

impl MlflowTracker {
    /// Connect to the tracking server and resolve (or create) the experiment.
    ///
    /// Any transport failure here is reported as `Unreachable` so the caller
    /// can fall back to `NoopTracker`.
    pub async fn connect(tracking_uri: &str, experiment_name: &str) -> Result<Self, TrackingError> {
        let base_url = tracking_uri.trim_end_matches('/').to_string();
        info!("Connecting to MLflow at {}", base_url);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let to_unreachable = |e: reqwest::Error| TrackingError::Unreachable {
            uri: base_url.clone(),
            reason: e.to_string(),
        };

        let lookup_url = format!("{}/api/2.0/mlflow/experiments/get-by-name", base_url);
        let response = client
            .get(&lookup_url)
            .query(&[("experiment_name", experiment_name)])
            .send()
            .await
            .map_err(to_unreachable)?;

        let experiment_id = if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Experiment {} not found, creating it", experiment_name);
            let created: CreateExperimentResponse = Self::expect_success(
                "experiments/create",
                client
                    .post(format!("{}/api/2.0/mlflow/experiments/create", base_url))
                    .json(&json!({ "name": experiment_name }))
                    .send()
                    .await
                    .map_err(to_unreachable)?,
            )
            .await?
            .json()
            .await?;
            created.experiment_id
        } else {
            let found: GetExperimentResponse =
                Self::expect_success("experiments/get-by-name", response)
                    .await?
                    .json()
                    .await?;
            found.experiment.experiment_id
        };

        info!(
            "Using MLflow experiment {} (id {})",
            experiment_name, experiment_id
        );
        Ok(Self {
            client,
            base_url,
            experiment_id,
        })
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    async fn expect_success(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TrackingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackingError::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<reqwest::Response, TrackingError> {
        let url = format!("{}/api/2.0/mlflow/{}", self.base_url, endpoint);
        let response = self.client.post(url).json(&body).send().await?;
        Self::expect_success(endpoint, response).await
    }
}

#[async_trait]
impl ExperimentTracker for MlflowTracker {
    fn name(&self) -> &str {
        "MlflowTracker"
    }

    async fn start_run(&self, run_name: &str) -> Result<RunId, TrackingError> {
        let created: CreateRunResponse = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": self.experiment_id,
                    "run_name": run_name,
                    "start_time": Utc::now().timestamp_millis(),
                    "tags": [{ "key": "mlflow.runName", "value": run_name }],
                }),
            )
            .await?
            .json()
            .await?;

        if created.run.info.run_id.is_empty() {
            return Err(TrackingError::InvalidResponse(
                "runs/create returned an empty run id".to_string(),
            ));
        }
        Ok(RunId(created.run.info.run_id))
    }

    async fn log_param(&self, run: &RunId, key: &str, value: &str) -> Result<(), TrackingError> {
        self.post(
            "runs/log-parameter",
            json!({ "run_id": run.0, "key": key, "value": value }),
        )
        .await?;
        Ok(())
    }

    async fn log_metric(&self, run: &RunId, key: &str, value: f64) -> Result<(), TrackingError> {
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run.0,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": 0,
            }),
        )
        .await?;
        Ok(())
    }

    async fn log_artifact(&self, run: &RunId, path: &Path) -> Result<(), TrackingError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TrackingError::InvalidResponse(format!(
                    "artifact path {} has no file name",
                    path.display()
                ))
            })?;
        let bytes = tokio::fs::read(path).await?;

        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/artifacts/{}",
            self.base_url, self.experiment_id, run.0, file_name
        );
        let response = self.client.put(url).body(bytes).send().await?;
        Self::expect_success("mlflow-artifacts/artifacts", response).await?;
        Ok(())
    }

    async fn end_run(&self, run: &RunId, status: RunStatus) -> Result<(), TrackingError> {
        self.post(
            "runs/update",
            json!({
                "run_id": run.0,
                "status": status.as_str(),
                "end_time": Utc::now().timestamp_millis(),
            }),
        )
        .await?;
        Ok(())
    }
}
