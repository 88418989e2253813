// Re-export modules for testing and external use
pub mod terraform {
    pub mod model;
    pub mod parser;
    pub mod service;
    pub mod summary;

    pub use model::{DriftReport, PlanAction, PlanStats, ResourceChange, Severity};
    pub use parser::{extract_drifted_resources, PlanParser};
    pub use summary::parse_plan_stats;
}

pub mod drift {
    pub mod classifier;
    pub mod recommendation;

    pub use classifier::{detect_drift_type, DriftClassification, DriftClassifier, HeuristicClassifier};
    pub use recommendation::{generate_recommendations, RecommendationReport};
}

pub mod git {
    pub mod manual_changes;
    pub mod pr;

    pub use pr::{PrOutcome, PrRequest, PullRequestSaga};
}

pub mod formatters {
    pub mod output;

    pub use output::OutputFormatter;
}

pub mod shared {
    pub mod logging;
    pub mod shell;
}

pub mod core {
    pub mod tfdrift;
}

pub mod config;
pub mod error;
pub mod server;

// Re-export commonly used types for easier testing and external use
pub use config::Config;
pub use core::tfdrift::TfDrift;
pub use error::DriftError;
pub use shared::shell::{CommandOutput, CommandRunner, ScriptedRunner, ShellRunner};
