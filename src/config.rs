use crate::error::{DriftError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_BRANCH: &str = "master";
const DEFAULT_PORT: u16 = 3001;

/// Runtime configuration. Layered as defaults, then an optional JSON file,
/// then environment variables, then CLI flags (applied by the binary).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub terraform: TerraformConfig,
    pub git: GitConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformConfig {
    /// Directory holding the root module (`TERRAFORM_PATH`).
    pub terraform_path: Option<String>,
    /// Directory holding the terragrunt stack (`TERRAGRUNT_PATH`); wins over `terraform_path`.
    pub terragrunt_path: Option<String>,
    pub terragrunt_enabled: bool,
    /// Replace the placeholder resource total with a `state list` count.
    pub count_state_resources: bool,
    pub plan_timeout_secs: u64,
    pub apply_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Repository root used for branch and PR operations. Defaults to the
    /// Terraform working directory.
    pub repo_path: Option<String>,
    pub base_branch: String,
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            terraform_path: None,
            terragrunt_path: None,
            terragrunt_enabled: false,
            count_state_resources: false,
            plan_timeout_secs: 120,
            apply_timeout_secs: 300,
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_path: None,
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            command_timeout_secs: 60,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load from `path` (or `~/.tfdrift/config.json` when present), then
    /// overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(file) if file.exists() => {
                tracing::info!("Loading configuration from {}", file.display());
                Self::from_file(&file)?
            }
            Some(file) if path.is_some() => {
                return Err(DriftError::Config(format!(
                    "config file not found: {}",
                    file.display()
                )));
            }
            _ => {
                tracing::info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            DriftError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| non_empty(key).map(|v| v.eq_ignore_ascii_case("true"));

        if let Some(v) = non_empty("TERRAFORM_PATH") {
            self.terraform.terraform_path = Some(v);
        }
        if let Some(v) = non_empty("TERRAGRUNT_PATH") {
            self.terraform.terragrunt_path = Some(v);
        }
        if let Some(v) = flag("TERRAGRUNT_ENABLED") {
            self.terraform.terragrunt_enabled = v;
        }
        if let Some(v) = flag("TFDRIFT_COUNT_STATE") {
            self.terraform.count_state_resources = v;
        }
        if let Some(v) = non_empty("TFDRIFT_REPO_PATH") {
            self.git.repo_path = Some(v);
        }
        if let Some(v) = non_empty("TFDRIFT_BASE_BRANCH") {
            self.git.base_branch = v;
        }
        if let Some(port) = non_empty("TFDRIFT_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    /// Directory `plan`/`apply` run in. `None` means drift monitoring is disabled.
    pub fn working_dir(&self) -> Option<&str> {
        self.terraform
            .terragrunt_path
            .as_deref()
            .or(self.terraform.terraform_path.as_deref())
    }

    pub fn require_working_dir(&self) -> Result<&str> {
        self.working_dir().ok_or_else(|| {
            DriftError::Config("Set TERRAFORM_PATH or TERRAGRUNT_PATH".to_string())
        })
    }

    pub fn repo_dir(&self) -> Result<&str> {
        match self.git.repo_path.as_deref() {
            Some(dir) => Ok(dir),
            None => self.require_working_dir(),
        }
    }

    /// Binary used for plan/apply.
    pub fn tool(&self) -> &'static str {
        if self.terraform.terragrunt_enabled {
            "terragrunt"
        } else {
            "terraform"
        }
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.terraform.plan_timeout_secs)
    }

    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.terraform.apply_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git.command_timeout_secs)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tfdrift").join("config.json"))
}
