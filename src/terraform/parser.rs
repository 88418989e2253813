use crate::terraform::model::ResourceChange;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of diff lines kept per resource.
pub const MAX_CHANGES_PER_RESOURCE: usize = 5;

/// Diff lines at or beyond this length are dropped (usually base64 blobs or
/// minified JSON policies).
pub const MAX_CHANGE_LINE_LEN: usize = 200;

// Lazy-initialized regex patterns for better performance
static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\s+(\S+)\s+(?:will|must)\s+be\s+(.+)$").expect("Invalid header regex")
});

static DIFF_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:-/\+|\+/-|[~+-])\s+(.*)$").expect("Invalid diff line regex")
});

/// Scraper for the human-readable output of `plan -no-color`.
pub struct PlanParser {
    content: String,
}

impl PlanParser {
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Extract one record per `# <address> will be <phrase>` header, in plan
    /// order. A repeated address replaces the earlier record in place.
    pub fn drifted_resources(&self) -> Vec<ResourceChange> {
        let mut resources: Vec<ResourceChange> = Vec::new();
        let mut current: Option<ResourceChange> = None;

        for raw_line in self.content.lines() {
            let line = raw_line.trim();

            if let Some(captures) = HEADER_REGEX.captures(line) {
                if let Some(done) = current.take() {
                    push_unique(&mut resources, done);
                }
                current = Some(ResourceChange::new(&captures[1], captures[2].trim()));
                continue;
            }

            let Some(resource) = current.as_mut() else {
                continue;
            };
            if resource.changes.len() >= MAX_CHANGES_PER_RESOURCE
                || line.chars().count() >= MAX_CHANGE_LINE_LEN
            {
                continue;
            }
            if let Some(captures) = DIFF_LINE_REGEX.captures(line) {
                let content = captures[1].trim();
                if !content.is_empty() && !content.starts_with('#') {
                    resource.changes.push(line.to_string());
                }
            }
        }

        if let Some(done) = current.take() {
            push_unique(&mut resources, done);
        }

        resources
    }
}

fn push_unique(resources: &mut Vec<ResourceChange>, resource: ResourceChange) {
    match resources.iter_mut().find(|r| r.address == resource.address) {
        Some(existing) => *existing = resource,
        None => resources.push(resource),
    }
}

/// Convenience wrapper over [`PlanParser::drifted_resources`].
pub fn extract_drifted_resources(output: &str) -> Vec<ResourceChange> {
    PlanParser::new(output.to_string()).drifted_resources()
}
