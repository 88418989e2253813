use thiserror::Error;

/// Errors raised by drift detection and correction operations.
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Terraform plan failed: {details}")]
    PlanFailed { details: String, output: String },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriftError>;

/// Keep only the tail of long command output.
pub fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_string()
    } else {
        text.chars().skip(count - max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("short", 10), "short");
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ñandú", 2), "dú");
    }

    #[test]
    fn test_error_display() {
        let err = DriftError::Timeout {
            command: "terraform plan".to_string(),
            seconds: 120,
        };
        assert_eq!(err.to_string(), "Command timed out after 120s: terraform plan");

        let err = DriftError::PlanFailed {
            details: "exit code 1".to_string(),
            output: String::new(),
        };
        assert!(err.to_string().contains("exit code 1"));
    }
}
