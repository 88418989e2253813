//! Record out-of-band infrastructure changes as a Markdown document and
//! propose it through a pull request, so the drift is reviewed instead of
//! being silently overwritten by the next apply.

use crate::drift::classifier::{detect_drift_type, DriftClassification};
use crate::error::{DriftError, Result};
use crate::git::pr::{PrOutcome, PrRequest, PullRequestSaga, SagaStep};
use crate::shared::shell::to_wsl_path;
use crate::terraform::model::ResourceChange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Directory (relative to the repository root) the records are written to.
pub const RECORD_DIR: &str = "docs/drift";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: bool,
    pub document: String,
    pub classification: DriftClassification,
    pub pr: PrOutcome,
}

/// Render the Markdown record for a batch of manual changes.
pub fn render_record(
    resources: &[ResourceChange],
    classification: &DriftClassification,
    now: DateTime<Utc>,
) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "# Manual infrastructure changes");
    let _ = writeln!(doc);
    let _ = writeln!(doc, "- Detected: {}", now.to_rfc3339());
    let _ = writeln!(doc, "- Resources: {}", resources.len());
    let _ = writeln!(
        doc,
        "- Classification: {} (confidence: {})",
        serde_label(&classification.drift_type),
        serde_label(&classification.confidence)
    );
    let _ = writeln!(doc);
    let _ = writeln!(doc, "| Resource | Type | Action | Severity |");
    let _ = writeln!(doc, "|----------|------|--------|----------|");
    for resource in resources {
        let _ = writeln!(
            doc,
            "| `{}` | {} | {} | {} |",
            resource.address,
            resource.resource_type,
            serde_label(&resource.action),
            serde_label(&resource.severity)
        );
    }

    for resource in resources.iter().filter(|r| !r.changes.is_empty()) {
        let _ = writeln!(doc);
        let _ = writeln!(doc, "## `{}`", resource.address);
        let _ = writeln!(doc);
        let _ = writeln!(doc, "```diff");
        for line in &resource.changes {
            let _ = writeln!(doc, "{}", line);
        }
        let _ = writeln!(doc, "```");
    }
    doc
}

/// Enum values render the same way they serialize.
fn serde_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Writes the record into the repository and opens a PR for it.
pub struct ManualChangeImporter<'a> {
    saga: &'a PullRequestSaga,
}

impl<'a> ManualChangeImporter<'a> {
    pub fn new(saga: &'a PullRequestSaga) -> Self {
        Self { saga }
    }

    pub async fn import(
        &self,
        resources: &[ResourceChange],
        now: DateTime<Utc>,
    ) -> Result<ImportOutcome> {
        if resources.is_empty() {
            return Err(DriftError::Validation(
                "driftedResources must not be empty".to_string(),
            ));
        }

        let classification = detect_drift_type(resources);
        let stamp = now.format("%Y%m%d-%H%M%S").to_string();
        let relative = format!("{}/drift-{}.md", RECORD_DIR, stamp);
        let absolute = record_path(self.saga.repo_dir(), &relative);

        write_record(&absolute, &render_record(resources, &classification, now))?;
        tracing::info!("wrote manual change record to {}", absolute.display());

        let request = PrRequest {
            branch_name: format!("drift/manual-changes-{}", stamp),
            commit_message: format!(
                "docs(drift): record {} manual infrastructure change(s)",
                resources.len()
            ),
            pr_title: format!("Record manual infrastructure changes ({})", stamp),
            pr_description: pr_body(resources, &relative),
        };

        let mut pr = self.saga.execute(&request).await?;
        if !pr.success {
            pr.compensations.push(remove_record(&absolute));
        }

        Ok(ImportOutcome {
            success: pr.success,
            document: relative,
            classification,
            pr,
        })
    }
}

/// Where the record lands on this host. Git runs on the WSL-mapped path when
/// the host is not Windows, so the file must be written there too.
fn record_path(repo_dir: &str, relative: &str) -> PathBuf {
    let root = if cfg!(windows) {
        repo_dir.to_string()
    } else {
        to_wsl_path(repo_dir)
    };
    Path::new(&root).join(relative)
}

fn write_record(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// A record that is already gone counts as removed: checking out the base
/// branch drops it once it was committed on the drift branch.
fn remove_record(path: &Path) -> SagaStep {
    let result = match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    };
    if let Err(e) = &result {
        tracing::error!("failed to remove {}: {}", path.display(), e);
    }
    SagaStep {
        name: "remove-record".to_string(),
        command: format!("rm {}", path.display()),
        success: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
    }
}

fn pr_body(resources: &[ResourceChange], document: &str) -> String {
    let mut body = format!(
        "Records {} resource(s) changed outside of Terraform.\n\nSee `{}` for the captured diff.\n\n",
        resources.len(),
        document
    );
    for resource in resources {
        let _ = writeln!(body, "- `{}` ({})", resource.address, resource.phrase);
    }
    body
}
