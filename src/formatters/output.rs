use crate::drift::classifier::{DriftClassification, RecommendedAction};
use crate::drift::recommendation::RecommendationReport;
use crate::terraform::model::{DriftReport, Severity};
use serde_json::{json, Value};

/// Output formatter for the CLI commands
pub struct OutputFormatter;

impl OutputFormatter {
    /// Render a JSON value for stdout, indented when `pretty` is set.
    pub fn render(value: &Value, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }

    /// Format a drift check with a severity breakdown on top
    pub fn format_drift_report(report: &DriftReport) -> Value {
        let count = |severity: Severity| {
            report
                .drifted_resources
                .iter()
                .filter(|r| r.severity == severity)
                .count()
        };

        json!({
            "summary": {
                "has_changes": report.has_changes,
                "drifted_resources": report.drifted_resources.len(),
                "critical": count(Severity::Critical),
                "warning": count(Severity::Warning),
                "info": count(Severity::Info),
                "last_check": report.last_check,
            },
            "stats": report.stats,
            "resources": report.drifted_resources,
            "message": report.message,
        })
    }

    /// Format classification and recommendations for a batch of changes
    pub fn format_analysis(
        classification: &DriftClassification,
        recommendations: &RecommendationReport,
    ) -> Value {
        let next_step = match classification.recommended_action {
            RecommendedAction::ApplyOnly => {
                "Code is ahead of the infrastructure: apply the plan (action 'apply-terraform')"
            }
            RecommendedAction::CreatePr => {
                "Infrastructure was changed by hand: record it in a pull request (action 'import-manual-changes')"
            }
            RecommendedAction::ManualReview => "Review the plan manually before acting",
        };

        json!({
            "classification": classification,
            "recommendations": recommendations,
            "next_step": next_step,
        })
    }
}
