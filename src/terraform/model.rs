use serde::{Deserialize, Serialize};

/// Action inferred from the prose of a plan header (`will be updated in-place`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Created,
    Updated,
    Destroyed,
    Replaced,
    Other,
}

impl PlanAction {
    /// Substring match over the action phrase. Order matters: a phrase such
    /// as "destroyed and then created replacement" must resolve to destroyed.
    pub fn from_phrase(phrase: &str) -> Self {
        if phrase.contains("destroyed") {
            PlanAction::Destroyed
        } else if phrase.contains("replaced") {
            PlanAction::Replaced
        } else if phrase.contains("updated") {
            PlanAction::Updated
        } else if phrase.contains("created") {
            PlanAction::Created
        } else {
            PlanAction::Other
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            PlanAction::Destroyed | PlanAction::Replaced => Severity::Critical,
            PlanAction::Updated => Severity::Warning,
            PlanAction::Created | PlanAction::Other => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// One resource change detected in `plan` output. Deserialization goes
/// through [`RawResourceChange`] so posted records get the same derived
/// fields as parsed ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawResourceChange")]
pub struct ResourceChange {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub action: PlanAction,
    pub phrase: String,
    pub severity: Severity,
    pub changes: Vec<String>,
}

impl ResourceChange {
    pub fn new(address: &str, phrase: &str) -> Self {
        let (resource_type, name) = split_address(address);
        let action = PlanAction::from_phrase(phrase);
        Self {
            address: address.to_string(),
            resource_type,
            name,
            action,
            phrase: phrase.to_string(),
            severity: action.severity(),
            changes: Vec::new(),
        }
    }
}

/// Wire form of a resource posted back by a client. `action` may be either
/// the serialized label (`destroyed`) or the plan phrase (`updated in-place`).
#[derive(Debug, Deserialize)]
struct RawResourceChange {
    address: String,
    #[serde(rename = "type", default)]
    resource_type: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    action: String,
    #[serde(default)]
    phrase: Option<String>,
    #[serde(default)]
    changes: Vec<String>,
}

impl From<RawResourceChange> for ResourceChange {
    fn from(raw: RawResourceChange) -> Self {
        let phrase = raw
            .phrase
            .filter(|p| !p.is_empty())
            .unwrap_or(raw.action);
        let mut change = ResourceChange::new(&raw.address, &phrase);
        if let Some(resource_type) = raw.resource_type.filter(|t| !t.is_empty()) {
            change.resource_type = resource_type;
        }
        if let Some(name) = raw.name.filter(|n| !n.is_empty()) {
            change.name = name;
        }
        change.changes = raw.changes;
        change
    }
}

/// Split `module.net.azurerm_subnet.app["a"]` into (`azurerm_subnet`, `app["a"]`).
fn split_address(address: &str) -> (String, String) {
    let mut rest = address;
    while let Some(stripped) = rest.strip_prefix("module.") {
        match stripped.split_once('.') {
            Some((_, tail)) => rest = tail,
            None => break,
        }
    }
    // Data sources keep their `data.` prefix out of the type.
    let rest = rest.strip_prefix("data.").unwrap_or(rest);
    match rest.split_once('.') {
        Some((resource_type, name)) => (resource_type.to_string(), name.to_string()),
        None => (rest.to_string(), address.to_string()),
    }
}

/// Aggregate counts reported alongside the drifted resources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total_resources: usize,
    pub in_sync: usize,
    pub drifted: usize,
    pub to_add: usize,
    pub to_change: usize,
    pub to_destroy: usize,
    pub unmanaged: usize,
}

/// Outcome of a single `plan -detailed-exitcode` run.
#[derive(Debug, Clone)]
pub struct PlanRun {
    pub has_changes: bool,
    pub output: String,
}

/// Response body of the drift endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub success: bool,
    pub has_changes: bool,
    pub stats: PlanStats,
    pub drifted_resources: Vec<ResourceChange>,
    pub last_check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_phrase() {
        assert_eq!(PlanAction::from_phrase("destroyed"), PlanAction::Destroyed);
        assert_eq!(
            PlanAction::from_phrase("updated in-place"),
            PlanAction::Updated
        );
        assert_eq!(PlanAction::from_phrase("replaced"), PlanAction::Replaced);
        assert_eq!(PlanAction::from_phrase("created"), PlanAction::Created);
        assert_eq!(
            PlanAction::from_phrase("read during apply"),
            PlanAction::Other
        );
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(PlanAction::Destroyed.severity(), Severity::Critical);
        assert_eq!(PlanAction::Replaced.severity(), Severity::Critical);
        assert_eq!(PlanAction::Updated.severity(), Severity::Warning);
        assert_eq!(PlanAction::Created.severity(), Severity::Info);
        assert_eq!(PlanAction::Other.severity(), Severity::Info);
    }

    #[test]
    fn test_split_address() {
        let rc = ResourceChange::new("azurerm_resource_group.hub", "created");
        assert_eq!(rc.resource_type, "azurerm_resource_group");
        assert_eq!(rc.name, "hub");

        let rc = ResourceChange::new("module.network.azurerm_subnet.app[\"a\"]", "updated");
        assert_eq!(rc.resource_type, "azurerm_subnet");
        assert_eq!(rc.name, "app[\"a\"]");

        let rc = ResourceChange::new("data.azurerm_client_config.current", "read");
        assert_eq!(rc.resource_type, "azurerm_client_config");
    }

    #[test]
    fn test_resource_change_json_shape() {
        let rc = ResourceChange::new("azurerm_resource_group.hub", "destroyed");
        let json = serde_json::to_value(&rc).unwrap();
        assert_eq!(json["type"], "azurerm_resource_group");
        assert_eq!(json["action"], "destroyed");
        assert_eq!(json["severity"], "critical");
    }

    #[test]
    fn test_resource_change_minimal_deserialize() {
        let rc: ResourceChange = serde_json::from_str(
            r#"{"address":"a.b","type":"a","action":"updated"}"#,
        )
        .unwrap();
        assert!(rc.changes.is_empty());
        assert_eq!(rc.action, PlanAction::Updated);
        assert_eq!(rc.severity, Severity::Warning);
    }

    #[test]
    fn test_deserialize_phrase_action() {
        let rc: ResourceChange = serde_json::from_str(
            r#"{"address":"azurerm_subnet.app","action":"updated in-place"}"#,
        )
        .unwrap();
        assert_eq!(rc.action, PlanAction::Updated);
        assert_eq!(rc.phrase, "updated in-place");
        assert_eq!(rc.resource_type, "azurerm_subnet");
        assert_eq!(rc.name, "app");
    }

    #[test]
    fn test_deserialize_derives_severity_from_action() {
        let rc: ResourceChange = serde_json::from_str(
            r#"{"address":"azurerm_resource_group.hub","action":"destroyed","severity":"info"}"#,
        )
        .unwrap();
        assert_eq!(rc.action, PlanAction::Destroyed);
        assert_eq!(rc.severity, Severity::Critical);
        assert_eq!(rc.resource_type, "azurerm_resource_group");
    }

    #[test]
    fn test_serialized_record_reads_back_unchanged() {
        let mut rc = ResourceChange::new("module.net.azurerm_subnet.app", "destroyed and then created replacement");
        rc.changes = vec!["~ address_prefixes = [...]".to_string()];
        let json = serde_json::to_string(&rc).unwrap();
        assert_eq!(serde_json::from_str::<ResourceChange>(&json).unwrap(), rc);
    }
}
