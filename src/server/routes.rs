use crate::git::pr::PrRequest;
use crate::server::error::AppError;
use crate::server::AppState;
use crate::terraform::model::{DriftReport, ResourceChange};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /api/drift — run a plan and report drifted resources.
pub async fn get_drift(State(app): State<AppState>) -> Result<Json<DriftReport>, AppError> {
    Ok(Json(app.tfdrift.check_drift().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
    pub action: String,
    #[serde(default)]
    pub drifted_resources: Option<Vec<ResourceChange>>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub pr_title: Option<String>,
    #[serde(default)]
    pub pr_description: Option<String>,
}

impl ApplyBody {
    fn resources(&self) -> &[ResourceChange] {
        self.drifted_resources.as_deref().unwrap_or_default()
    }

    fn pr_request(&self) -> Result<PrRequest, AppError> {
        let required = |value: &Option<String>, field: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::bad_request(format!("{} is required", field)))
        };
        Ok(PrRequest {
            branch_name: required(&self.branch_name, "branchName")?,
            commit_message: required(&self.commit_message, "commitMessage")?,
            pr_title: required(&self.pr_title, "prTitle")?,
            pr_description: self.pr_description.clone().unwrap_or_default(),
        })
    }
}

/// POST /api/drift/apply — analysis and correction actions.
pub async fn apply_drift(
    State(app): State<AppState>,
    body: Result<Json<ApplyBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    tracing::info!(action = %body.action, "drift action requested");
    let tfdrift = &app.tfdrift;

    let response = match body.action.as_str() {
        "detect-drift-type" => Json(json!({
            "success": true,
            "classification": tfdrift.detect_drift_type(body.resources()),
        }))
        .into_response(),
        "analyze" => Json(json!({
            "success": true,
            "recommendations": tfdrift.analyze(body.resources()),
        }))
        .into_response(),
        "apply-terraform" => Json(tfdrift.apply_terraform().await?).into_response(),
        "create-pr" => {
            let outcome = tfdrift.create_pr(&body.pr_request()?).await?;
            (outcome_status(outcome.success), Json(outcome)).into_response()
        }
        "import-manual-changes" => {
            let outcome = tfdrift.import_manual_changes(body.resources()).await?;
            (outcome_status(outcome.success), Json(outcome)).into_response()
        }
        other => {
            return Err(AppError::bad_request(format!("Unknown action: {}", other)));
        }
    };
    Ok(response)
}

fn outcome_status(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_request_requires_fields() {
        let body: ApplyBody = serde_json::from_value(json!({
            "action": "create-pr",
            "branchName": "drift/x",
            "commitMessage": "msg"
        }))
        .unwrap();
        assert!(body.pr_request().is_err());

        let body: ApplyBody = serde_json::from_value(json!({
            "action": "create-pr",
            "branchName": "drift/x",
            "commitMessage": "msg",
            "prTitle": "title"
        }))
        .unwrap();
        let request = body.pr_request().unwrap();
        assert_eq!(request.pr_description, "");
    }

    #[test]
    fn test_missing_resources_is_empty() {
        let body: ApplyBody = serde_json::from_value(json!({ "action": "analyze" })).unwrap();
        assert!(body.resources().is_empty());
    }
}
