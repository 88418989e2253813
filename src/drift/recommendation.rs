//! Per-resource risk and advice for a batch of drifted resources.

use crate::terraform::model::{PlanAction, ResourceChange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Replace,
    Destroy,
}

/// Risk level for a drift correction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub resource: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub action_type: ActionType,
    pub risk: RiskLevel,
    pub description: String,
    pub changes: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationReport {
    pub summary: String,
    pub actions: Vec<Recommendation>,
    pub risk: RiskLevel,
    pub recommendation: String,
}

/// Action type, risk and description for one resource.
fn assess(resource: &ResourceChange) -> (ActionType, RiskLevel, String) {
    let address = &resource.address;
    match resource.action {
        PlanAction::Destroyed => (
            ActionType::Destroy,
            RiskLevel::Critical,
            format!(
                "Resource {} will be DESTROYED. This can cause data loss or a service outage.",
                address
            ),
        ),
        PlanAction::Replaced => (
            ActionType::Replace,
            RiskLevel::High,
            format!(
                "Resource {} will be REPLACED (destroyed and recreated). Expect downtime.",
                address
            ),
        ),
        PlanAction::Updated => (
            ActionType::Update,
            RiskLevel::Medium,
            format!(
                "Resource {} will be updated in-place with configuration changes.",
                address
            ),
        ),
        PlanAction::Created => (
            ActionType::Create,
            RiskLevel::Low,
            format!("New resource {} will be created.", address),
        ),
        PlanAction::Other => (
            ActionType::Update,
            RiskLevel::Low,
            format!("Resource {} has a pending '{}' action.", address, resource.phrase),
        ),
    }
}

fn action_recommendation(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Destroy => {
            "CRITICAL ACTION: review manually before applying and take a backup if needed."
        }
        ActionType::Replace => {
            "HIGH RISK ACTION: verify dependencies and schedule a maintenance window."
        }
        ActionType::Update => {
            "SAFE ACTION: changes can be applied with low risk. Review the specific attribute changes."
        }
        ActionType::Create => {
            "SAFE ACTION: new resource creation with no impact on existing resources."
        }
    }
}

fn overall_recommendation(risk: RiskLevel, actions: &[Recommendation]) -> String {
    let count = |kind: ActionType| actions.iter().filter(|a| a.action_type == kind).count();
    let (creates, updates, replaces, destroys) = (
        count(ActionType::Create),
        count(ActionType::Update),
        count(ActionType::Replace),
        count(ActionType::Destroy),
    );

    match risk {
        RiskLevel::Critical => format!(
            "Do NOT apply automatically. {} resource(s) will be destroyed. \
             Review the plan thoroughly and take backups before proceeding.",
            destroys
        ),
        RiskLevel::High => format!(
            "CAUTION: {} resource(s) will be replaced. Recommended:\n\
             1. Review the full Terraform plan\n\
             2. Schedule a maintenance window\n\
             3. Notify stakeholders\n\
             4. Prepare a rollback plan",
            replaces
        ),
        RiskLevel::Medium => format!(
            "Proceed with CAUTION. Changes are mostly in-place updates ({}). Recommended:\n\
             1. Review the specific changes\n\
             2. Apply to a test environment first\n\
             3. Open a pull request for team review",
            updates
        ),
        RiskLevel::Low => format!(
            "SAFE TO APPLY. Only creations or minor updates ({} creations, {} updates). \
             Open a pull request to document the changes.",
            creates, updates
        ),
    }
}

/// Build the recommendation report for a batch of drifted resources.
pub fn generate_recommendations(resources: &[ResourceChange]) -> RecommendationReport {
    if resources.is_empty() {
        return RecommendationReport {
            summary: "No drifted resources detected.".to_string(),
            actions: Vec::new(),
            risk: RiskLevel::Low,
            recommendation: "Nothing to do: infrastructure matches the configuration.".to_string(),
        };
    }

    let mut actions = Vec::with_capacity(resources.len());
    let mut highest = RiskLevel::Low;

    for resource in resources {
        let (action_type, risk, description) = assess(resource);

        // Precedence critical > high > medium > low; never downgrade.
        if risk == RiskLevel::Critical {
            highest = RiskLevel::Critical;
        } else if risk == RiskLevel::High && highest != RiskLevel::Critical {
            highest = RiskLevel::High;
        } else if risk == RiskLevel::Medium && highest == RiskLevel::Low {
            highest = RiskLevel::Medium;
        }

        actions.push(Recommendation {
            resource: resource.address.clone(),
            resource_type: resource.resource_type.clone(),
            action_type,
            risk,
            description,
            changes: resource.changes.clone(),
            recommendation: action_recommendation(action_type).to_string(),
        });
    }

    RecommendationReport {
        summary: format!(
            "Detected {} resource(s) with drift. Risk level: {}.",
            resources.len(),
            highest.as_str().to_uppercase()
        ),
        recommendation: overall_recommendation(highest, &actions),
        actions,
        risk: highest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(address: &str, phrase: &str) -> ResourceChange {
        ResourceChange::new(address, phrase)
    }

    #[test]
    fn test_empty_batch() {
        let report = generate_recommendations(&[]);
        assert!(report.actions.is_empty());
        assert_eq!(report.risk, RiskLevel::Low);
    }

    #[test]
    fn test_lookup_per_action() {
        let report = generate_recommendations(&[
            resource("a.destroyed", "destroyed"),
            resource("a.replaced", "replaced"),
            resource("a.updated", "updated in-place"),
            resource("a.created", "created"),
        ]);
        let kinds: Vec<_> = report
            .actions
            .iter()
            .map(|a| (a.action_type, a.risk))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ActionType::Destroy, RiskLevel::Critical),
                (ActionType::Replace, RiskLevel::High),
                (ActionType::Update, RiskLevel::Medium),
                (ActionType::Create, RiskLevel::Low),
            ]
        );
        assert!(report.actions[0].recommendation.starts_with("CRITICAL"));
        assert!(report.actions[3].description.contains("a.created"));
    }

    #[test]
    fn test_destroy_always_critical() {
        let orders = [
            vec![resource("x.a", "created"), resource("x.b", "destroyed")],
            vec![resource("x.b", "destroyed"), resource("x.c", "replaced")],
            vec![
                resource("x.c", "replaced"),
                resource("x.d", "updated in-place"),
                resource("x.b", "destroyed"),
            ],
        ];
        for batch in orders {
            let report = generate_recommendations(&batch);
            assert_eq!(report.risk, RiskLevel::Critical);
            assert!(report.summary.contains("CRITICAL"));
            assert!(report.recommendation.contains("1 resource(s) will be destroyed"));
        }
    }

    #[test]
    fn test_risk_never_downgrades() {
        let report = generate_recommendations(&[
            resource("x.a", "replaced"),
            resource("x.b", "updated in-place"),
            resource("x.c", "created"),
        ]);
        assert_eq!(report.risk, RiskLevel::High);
        assert!(report.recommendation.contains("1 resource(s) will be replaced"));
    }

    #[test]
    fn test_low_risk_counts() {
        let report = generate_recommendations(&[
            resource("x.a", "created"),
            resource("x.b", "created"),
        ]);
        assert_eq!(report.risk, RiskLevel::Low);
        assert!(report.recommendation.contains("2 creations, 0 updates"));
    }

    #[test]
    fn test_json_shape() {
        let report = generate_recommendations(&[resource("azurerm_subnet.app", "updated in-place")]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["risk"], "medium");
        assert_eq!(json["actions"][0]["actionType"], "update");
        assert_eq!(json["actions"][0]["type"], "azurerm_subnet");
    }
}
