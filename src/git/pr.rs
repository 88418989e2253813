//! Branch, commit, push and open a pull request, undoing the local branch if
//! any step fails.
//!
//! The compensations only cover the local repository: a branch that was
//! already pushed stays on the remote. Each compensation is reported with its
//! own outcome and none is retried.

use crate::error::{DriftError, Result};
use crate::shared::shell::{shell_quote, to_wsl_path, CommandRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

static PR_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https://github\.com/\S+").expect("Invalid PR URL regex"));

static BRANCH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").expect("Invalid branch regex"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrRequest {
    pub branch_name: String,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_description: String,
}

impl PrRequest {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("branchName", &self.branch_name),
            ("commitMessage", &self.commit_message),
            ("prTitle", &self.pr_title),
        ] {
            if value.trim().is_empty() {
                return Err(DriftError::Validation(format!("{} is required", field)));
            }
        }
        validate_branch_name(&self.branch_name)
    }
}

/// Reject names git would refuse or that could smuggle options into a command.
pub fn validate_branch_name(name: &str) -> Result<()> {
    let valid = BRANCH_REGEX.is_match(name)
        && !name.contains("..")
        && !name.contains("//")
        && !name.ends_with('/')
        && !name.ends_with('.')
        && !name.ends_with(".lock");
    if valid {
        Ok(())
    } else {
        Err(DriftError::Validation(format!(
            "invalid branch name: {}",
            name
        )))
    }
}

/// One executed step or compensation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SagaStep {
    pub name: String,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrOutcome {
    pub success: bool,
    pub message: String,
    pub pr_url: Option<String>,
    pub branch: String,
    pub steps: Vec<SagaStep>,
    pub compensations: Vec<SagaStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrOutcome {
    /// True when every compensation that ran succeeded.
    pub fn rolled_back_cleanly(&self) -> bool {
        self.compensations.iter().all(|c| c.success)
    }
}

pub struct PullRequestSaga {
    runner: Arc<dyn CommandRunner>,
    repo_dir: String,
    base_branch: String,
    timeout: Duration,
}

impl PullRequestSaga {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        repo_dir: impl Into<String>,
        base_branch: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            repo_dir: repo_dir.into(),
            base_branch: base_branch.into(),
            timeout,
        }
    }

    pub fn repo_dir(&self) -> &str {
        &self.repo_dir
    }

    /// Validation problems are returned as errors; failures while running the
    /// steps are reported in the outcome.
    pub async fn execute(&self, request: &PrRequest) -> Result<PrOutcome> {
        request.validate()?;
        validate_branch_name(&self.base_branch)?;

        let branch = request.branch_name.as_str();
        let mut steps = Vec::new();

        match self.forward(request, &mut steps).await {
            Ok(pr_url) => {
                tracing::info!(branch, pr_url = ?pr_url, "pull request created");
                Ok(PrOutcome {
                    success: true,
                    message: "Pull request created".to_string(),
                    pr_url,
                    branch: branch.to_string(),
                    steps,
                    compensations: Vec::new(),
                    error: None,
                })
            }
            Err(error) => {
                tracing::error!(branch, "pull request saga failed: {}", error);
                let branch_created = steps.first().is_some_and(|s| s.success);
                let compensations = if branch_created {
                    self.compensate(branch).await
                } else {
                    Vec::new()
                };
                Ok(PrOutcome {
                    success: false,
                    message: format!("Failed to create pull request: {}", error),
                    pr_url: None,
                    branch: branch.to_string(),
                    steps,
                    compensations,
                    error: Some(error),
                })
            }
        }
    }

    async fn forward(
        &self,
        request: &PrRequest,
        steps: &mut Vec<SagaStep>,
    ) -> std::result::Result<Option<String>, String> {
        let branch = shell_quote(&request.branch_name);

        self.step(steps, "create-branch", &format!("git checkout -b {}", branch))
            .await?;
        self.step(steps, "stage", "git add .").await?;
        self.step(
            steps,
            "commit",
            &format!("git commit -m {}", shell_quote(&request.commit_message)),
        )
        .await?;
        self.step(steps, "push", &format!("git push origin {}", branch))
            .await?;

        let body_file = match write_body_file(&request.pr_description) {
            Ok(file) => file,
            Err(e) => {
                let error = format!("failed to write PR body: {}", e);
                steps.push(SagaStep {
                    name: "write-body".to_string(),
                    command: String::new(),
                    success: false,
                    error: Some(error.clone()),
                });
                return Err(error);
            }
        };
        let body_path = to_wsl_path(&body_file.path().to_string_lossy());

        let created = self
            .step(
                steps,
                "create-pr",
                &format!(
                    "gh pr create --title {} --body-file {} --base {} --head {}",
                    shell_quote(&request.pr_title),
                    shell_quote(&body_path),
                    shell_quote(&self.base_branch),
                    branch
                ),
            )
            .await;

        if let Err(e) = body_file.close() {
            tracing::warn!("failed to remove PR body file: {}", e);
        }

        let output = created?;
        Ok(PR_URL_REGEX
            .find(&output)
            .map(|m| m.as_str().to_string()))
    }

    async fn compensate(&self, branch: &str) -> Vec<SagaStep> {
        let mut compensations = Vec::new();
        let commands = [
            (
                "checkout-base",
                format!("git checkout {}", shell_quote(&self.base_branch)),
            ),
            (
                "delete-branch",
                format!("git branch -D {}", shell_quote(branch)),
            ),
        ];
        for (name, command) in commands {
            if let Err(e) = self.step(&mut compensations, name, &command).await {
                tracing::error!("compensation '{}' failed: {}", name, e);
            }
        }
        compensations
    }

    /// Run one command and record it. Returns combined output on exit code 0.
    async fn step(
        &self,
        log: &mut Vec<SagaStep>,
        name: &str,
        command: &str,
    ) -> std::result::Result<String, String> {
        let result = self.runner.run(&self.repo_dir, command, self.timeout).await;
        let outcome = match result {
            Ok(output) if output.success() => Ok(output.combined()),
            Ok(output) => {
                let stderr = output.stderr.trim();
                Err(if stderr.is_empty() {
                    format!("'{}' exited with code {}", command, output.exit_code)
                } else {
                    stderr.to_string()
                })
            }
            Err(e) => Err(e.to_string()),
        };

        log.push(SagaStep {
            name: name.to_string(),
            command: command.to_string(),
            success: outcome.is_ok(),
            error: outcome.as_ref().err().cloned(),
        });
        outcome
    }
}

fn write_body_file(body: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("tfdrift-pr-")
        .suffix(".md")
        .tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    Ok(file)
}
