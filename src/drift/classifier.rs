//! Labels a batch of plan changes by where the drift most likely came from.

use crate::terraform::model::{PlanAction, ResourceChange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DriftType {
    /// The code moved ahead of the deployed infrastructure.
    CodeAhead,
    /// Someone changed the infrastructure outside of Terraform.
    ManualChange,
    Mixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedAction {
    ApplyOnly,
    CreatePr,
    ManualReview,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriftClassification {
    #[serde(rename = "type")]
    pub drift_type: DriftType,
    pub recommended_action: RecommendedAction,
    pub confidence: Confidence,
}

impl DriftClassification {
    fn new(drift_type: DriftType, confidence: Confidence) -> Self {
        let recommended_action = match drift_type {
            DriftType::CodeAhead => RecommendedAction::ApplyOnly,
            DriftType::ManualChange => RecommendedAction::CreatePr,
            DriftType::Mixed => RecommendedAction::ManualReview,
        };
        Self {
            drift_type,
            recommended_action,
            confidence,
        }
    }
}

/// Swappable classification strategy. The text heuristic is the only
/// implementation today; a structured `plan -json` classifier can replace it.
pub trait DriftClassifier: Send + Sync {
    fn classify(&self, resources: &[ResourceChange]) -> DriftClassification;
}

/// Pattern matching over the scraped diff lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl DriftClassifier for HeuristicClassifier {
    fn classify(&self, resources: &[ResourceChange]) -> DriftClassification {
        let lines = || resources.iter().flat_map(|r| r.changes.iter());

        let all_updates = resources.iter().all(|r| r.action == PlanAction::Updated);
        let has_tag_changes = lines().any(|line| line.contains("tags"));
        let has_only_additions = lines()
            .all(|line| line.contains('+') || line.contains('~') || !line.contains('-'));

        if all_updates && has_tag_changes && has_only_additions {
            return DriftClassification::new(DriftType::CodeAhead, Confidence::High);
        }

        let has_removals = lines().any(|line| line.starts_with('-'));
        let has_non_tag_changes = lines().any(|line| !line.contains("tags"));
        if has_removals || has_non_tag_changes {
            return DriftClassification::new(DriftType::ManualChange, Confidence::High);
        }

        DriftClassification::new(DriftType::Mixed, Confidence::Low)
    }
}

/// Classify with the default heuristic.
pub fn detect_drift_type(resources: &[ResourceChange]) -> DriftClassification {
    HeuristicClassifier.classify(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(phrase: &str, changes: &[&str]) -> ResourceChange {
        let mut rc = ResourceChange::new("azurerm_virtual_network.hub", phrase);
        rc.changes = changes.iter().map(|c| c.to_string()).collect();
        rc
    }

    #[test]
    fn test_tag_only_update_is_code_ahead() {
        let resources = vec![change("updated in-place", &[r#"~ tags.Env = "+active""#])];
        let result = detect_drift_type(&resources);
        assert_eq!(result.drift_type, DriftType::CodeAhead);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.recommended_action, RecommendedAction::ApplyOnly);
    }

    #[test]
    fn test_removal_is_manual_change() {
        let resources = vec![change("updated in-place", &[r#"- subnet_id = "abc""#])];
        let result = detect_drift_type(&resources);
        assert_eq!(result.drift_type, DriftType::ManualChange);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.recommended_action, RecommendedAction::CreatePr);
    }

    #[test]
    fn test_tag_removal_on_destroy_is_mixed() {
        // Not all updates, and every diff line is a tag line without a leading '-'.
        let resources = vec![
            change("destroyed", &[r#"~ tags = { "Env" = "dev" }"#]),
            change("updated in-place", &[r#"~ tags.Owner = "ops""#]),
        ];
        let result = detect_drift_type(&resources);
        assert_eq!(result.drift_type, DriftType::Mixed);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.recommended_action, RecommendedAction::ManualReview);
    }

    #[test]
    fn test_non_tag_update_is_manual_change() {
        let resources = vec![change("updated in-place", &[r#"~ sku_name = "S1" -> "S2""#])];
        assert_eq!(
            detect_drift_type(&resources).drift_type,
            DriftType::ManualChange
        );
    }

    #[test]
    fn test_empty_batch_is_mixed() {
        let result = detect_drift_type(&[]);
        assert_eq!(result.drift_type, DriftType::Mixed);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let a = change("updated in-place", &[r#"~ tags.Env = "+active""#]);
        let b = change("updated in-place", &[r#"+ tags.Team = "platform""#]);
        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];

        let first = detect_drift_type(&forward);
        assert_eq!(first, detect_drift_type(&forward));
        assert_eq!(first, detect_drift_type(&backward));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(detect_drift_type(&[change(
            "updated in-place",
            &[r#"~ tags.Env = "+active""#],
        )]))
        .unwrap();
        assert_eq!(json["type"], "code-ahead");
        assert_eq!(json["recommendedAction"], "apply-only");
        assert_eq!(json["confidence"], "high");
    }
}
