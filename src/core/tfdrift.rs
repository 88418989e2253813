use crate::config::Config;
use crate::drift::classifier::{DriftClassification, DriftClassifier, HeuristicClassifier};
use crate::drift::recommendation::{generate_recommendations, RecommendationReport};
use crate::error::{tail_chars, Result};
use crate::git::manual_changes::{ImportOutcome, ManualChangeImporter};
use crate::git::pr::{PrOutcome, PrRequest, PullRequestSaga};
use crate::shared::shell::CommandRunner;
use crate::terraform::model::{DriftReport, PlanRun, PlanStats, ResourceChange};
use crate::terraform::parser::extract_drifted_resources;
use crate::terraform::service::TerraformService;
use crate::terraform::summary::{parse_plan_stats, summarize_with_total};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Plan lines echoed back in the drift report.
const PLAN_OUTPUT_PREVIEW_LINES: usize = 50;

/// Characters of apply output returned to the caller.
const APPLY_OUTPUT_TAIL_CHARS: usize = 1000;

const MONITORING_DISABLED_MESSAGE: &str =
    "Drift monitoring is disabled. Set TERRAFORM_PATH or TERRAGRUNT_PATH to enable it.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub success: bool,
    pub message: String,
    pub output: String,
}

/// Entry point for drift detection and correction. Cheap to share: holds the
/// read-only configuration and the command runner.
pub struct TfDrift {
    config: Config,
    runner: Arc<dyn CommandRunner>,
    classifier: Box<dyn DriftClassifier>,
}

impl TfDrift {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            classifier: Box::new(HeuristicClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn DriftClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn terraform(&self) -> Result<TerraformService> {
        TerraformService::new(self.runner.clone(), &self.config)
    }

    fn pr_saga(&self) -> Result<PullRequestSaga> {
        Ok(PullRequestSaga::new(
            self.runner.clone(),
            self.config.repo_dir()?,
            self.config.git.base_branch.clone(),
            self.config.git_timeout(),
        ))
    }

    /// Run a plan and turn its output into a drift report.
    pub async fn check_drift(&self) -> Result<DriftReport> {
        let last_check = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        if self.config.working_dir().is_none() {
            tracing::warn!("{}", MONITORING_DISABLED_MESSAGE);
            return Ok(DriftReport {
                success: true,
                has_changes: false,
                stats: PlanStats::default(),
                drifted_resources: Vec::new(),
                last_check,
                plan_output: None,
                message: Some(MONITORING_DISABLED_MESSAGE.to_string()),
            });
        }

        let terraform = self.terraform()?;
        let (plan, stats) = if self.config.terraform.count_state_resources {
            let (plan, state) = futures::join!(terraform.plan(), terraform.state_list());
            let plan = plan?;
            let stats = match state {
                Ok(resources) => summarize_with_total(&plan.output, resources.len()),
                Err(e) => {
                    tracing::warn!("state list failed, using placeholder total: {}", e);
                    parse_plan_stats(&plan.output)
                }
            };
            (plan, stats)
        } else {
            let plan = terraform.plan().await?;
            let stats = parse_plan_stats(&plan.output);
            (plan, stats)
        };

        Ok(self.build_report(plan, stats, last_check))
    }

    fn build_report(&self, plan: PlanRun, stats: PlanStats, last_check: String) -> DriftReport {
        let drifted_resources = extract_drifted_resources(&plan.output);
        tracing::info!(
            has_changes = plan.has_changes,
            drifted = drifted_resources.len(),
            "drift check complete"
        );
        let preview = plan
            .output
            .lines()
            .take(PLAN_OUTPUT_PREVIEW_LINES)
            .collect::<Vec<_>>()
            .join("\n");

        DriftReport {
            success: true,
            has_changes: plan.has_changes,
            stats,
            drifted_resources,
            last_check,
            plan_output: Some(preview),
            message: None,
        }
    }

    pub fn detect_drift_type(&self, resources: &[ResourceChange]) -> DriftClassification {
        self.classifier.classify(resources)
    }

    pub fn analyze(&self, resources: &[ResourceChange]) -> RecommendationReport {
        generate_recommendations(resources)
    }

    pub async fn apply_terraform(&self) -> Result<ApplyOutcome> {
        let terraform = self.terraform()?;
        tracing::info!("applying {} changes in {}", terraform.tool(), terraform.working_dir());
        let output = terraform.apply().await?;
        Ok(ApplyOutcome {
            success: true,
            message: format!("{} apply completed", terraform.tool()),
            output: tail_chars(&output.combined(), APPLY_OUTPUT_TAIL_CHARS),
        })
    }

    pub async fn create_pr(&self, request: &PrRequest) -> Result<PrOutcome> {
        self.pr_saga()?.execute(request).await
    }

    pub async fn import_manual_changes(&self, resources: &[ResourceChange]) -> Result<ImportOutcome> {
        let saga = self.pr_saga()?;
        ManualChangeImporter::new(&saga)
            .import(resources, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriftError;
    use crate::shared::shell::{CommandOutput, ScriptedRunner};
    use crate::terraform::summary::PLACEHOLDER_TOTAL_RESOURCES;

    const DRIFT_PLAN: &str = "  # azurerm_resource_group.hub will be updated in-place\n  ~ resource \"azurerm_resource_group\" \"hub\" {\n      ~ tags = {\n          + \"Env\" = \"dev\"\n        }\n    }\n\nPlan: 0 to add, 1 to change, 0 to destroy.\n";

    fn configured() -> Config {
        let mut config = Config::default();
        config.terraform.terraform_path = Some("/infra/hub".to_string());
        config
    }

    fn out(code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[tokio::test]
    async fn test_disabled_monitoring() {
        let runner = Arc::new(ScriptedRunner::new());
        let tfdrift = TfDrift::new(Config::default(), runner.clone());
        let report = tfdrift.check_drift().await.unwrap();
        assert!(report.success);
        assert!(!report.has_changes);
        assert_eq!(report.stats.total_resources, 0);
        assert!(report.message.is_some());
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_check_drift_with_changes() {
        let runner = Arc::new(ScriptedRunner::new().respond("plan", out(2, DRIFT_PLAN)));
        let report = TfDrift::new(configured(), runner)
            .check_drift()
            .await
            .unwrap();
        assert!(report.has_changes);
        assert_eq!(report.stats.to_change, 1);
        assert_eq!(report.stats.total_resources, PLACEHOLDER_TOTAL_RESOURCES);
        assert_eq!(report.drifted_resources.len(), 1);
        assert!(report.plan_output.unwrap().contains("Plan: 0 to add"));
    }

    #[tokio::test]
    async fn test_check_drift_counts_state_when_enabled() {
        let mut config = configured();
        config.terraform.count_state_resources = true;
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("plan", out(2, DRIFT_PLAN))
                .respond("state list", out(0, "a.one\nb.two\nc.three\n")),
        );
        let report = TfDrift::new(config, runner).check_drift().await.unwrap();
        assert_eq!(report.stats.total_resources, 3);
        assert_eq!(report.stats.in_sync, 2);
    }

    #[tokio::test]
    async fn test_plan_error_propagates() {
        let runner = Arc::new(ScriptedRunner::new().respond("plan", out(1, "Error: boom")));
        let result = TfDrift::new(configured(), runner).check_drift().await;
        assert!(matches!(result, Err(DriftError::PlanFailed { .. })));
    }

    #[tokio::test]
    async fn test_plan_preview_is_truncated() {
        let long_plan: String = (0..80).map(|i| format!("line {}\n", i)).collect();
        let runner = Arc::new(ScriptedRunner::new().respond("plan", out(0, &long_plan)));
        let report = TfDrift::new(configured(), runner)
            .check_drift()
            .await
            .unwrap();
        assert_eq!(report.plan_output.unwrap().lines().count(), 50);
    }

    #[tokio::test]
    async fn test_apply_output_tail() {
        let long_output = "x".repeat(3000) + "Apply complete!";
        let runner = Arc::new(ScriptedRunner::new().respond("apply", out(0, &long_output)));
        let outcome = TfDrift::new(configured(), runner)
            .apply_terraform()
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output.chars().count(), 1000);
        assert!(outcome.output.ends_with("Apply complete!"));
    }

    struct AlwaysMixed;

    impl DriftClassifier for AlwaysMixed {
        fn classify(&self, _resources: &[ResourceChange]) -> DriftClassification {
            crate::drift::classifier::detect_drift_type(&[])
        }
    }

    #[test]
    fn test_classifier_is_pluggable() {
        let mut rc = ResourceChange::new("a.b", "updated in-place");
        rc.changes = vec!["~ tags.Env = \"+x\"".to_string()];
        let tfdrift = TfDrift::new(configured(), Arc::new(ScriptedRunner::new()))
            .with_classifier(Box::new(AlwaysMixed));
        assert_eq!(
            tfdrift.detect_drift_type(&[rc]).confidence,
            crate::drift::classifier::Confidence::Low
        );
    }
}
