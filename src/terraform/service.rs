use crate::config::Config;
use crate::error::{tail_chars, DriftError, Result};
use crate::shared::shell::{CommandOutput, CommandRunner};
use crate::terraform::model::PlanRun;
use std::sync::Arc;
use std::time::Duration;

/// `plan -detailed-exitcode`: 0 = no changes, 1 = error, 2 = changes present.
const EXIT_NO_CHANGES: i32 = 0;
const EXIT_CHANGES_PRESENT: i32 = 2;

/// Characters of apply output kept in error messages.
const ERROR_TAIL_CHARS: usize = 1000;

/// Runs terraform/terragrunt in the configured working directory.
pub struct TerraformService {
    runner: Arc<dyn CommandRunner>,
    tool: &'static str,
    working_dir: String,
    plan_timeout: Duration,
    apply_timeout: Duration,
}

impl TerraformService {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Result<Self> {
        let working_dir = config.require_working_dir()?.to_string();
        tracing::debug!(
            tool = config.tool(),
            "TerraformService initialized with working directory: {}",
            working_dir
        );
        Ok(Self {
            runner,
            tool: config.tool(),
            working_dir,
            plan_timeout: config.plan_timeout(),
            apply_timeout: config.apply_timeout(),
        })
    }

    pub fn tool(&self) -> &str {
        self.tool
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub async fn plan(&self) -> Result<PlanRun> {
        let command = format!("{} plan -detailed-exitcode -no-color", self.tool);
        let output = self
            .runner
            .run(&self.working_dir, &command, self.plan_timeout)
            .await?;

        let text = if output.stdout.is_empty() {
            output.stderr.clone()
        } else {
            output.stdout.clone()
        };

        match output.exit_code {
            EXIT_NO_CHANGES => Ok(PlanRun {
                has_changes: false,
                output: text,
            }),
            EXIT_CHANGES_PRESENT => Ok(PlanRun {
                has_changes: true,
                output: text,
            }),
            code => {
                tracing::error!("{} plan exited with code {}", self.tool, code);
                let stderr = output.stderr.trim();
                let details = if stderr.is_empty() {
                    format!("{} plan exited with code {}", self.tool, code)
                } else {
                    format!("{} plan exited with code {}: {}", self.tool, code, stderr)
                };
                Err(DriftError::PlanFailed {
                    details,
                    output: text,
                })
            }
        }
    }

    pub async fn apply(&self) -> Result<CommandOutput> {
        let command = format!("{} apply -auto-approve -no-color", self.tool);
        let output = self
            .runner
            .run(&self.working_dir, &command, self.apply_timeout)
            .await?;

        if output.success() {
            Ok(output)
        } else {
            Err(DriftError::CommandFailed(format!(
                "{} apply failed (exit code {}): {}",
                self.tool,
                output.exit_code,
                tail_chars(&output.combined(), ERROR_TAIL_CHARS)
            )))
        }
    }

    /// Addresses of every resource in state.
    pub async fn state_list(&self) -> Result<Vec<String>> {
        let command = format!("{} state list", self.tool);
        let output = self
            .runner
            .run(&self.working_dir, &command, self.plan_timeout)
            .await?;

        if !output.success() {
            return Err(DriftError::CommandFailed(format!(
                "Failed to list resources: {}",
                output.stderr.trim()
            )));
        }

        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
