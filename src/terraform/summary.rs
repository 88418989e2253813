//! Aggregate counts from the `Plan: N to add, M to change, K to destroy.` line.

use crate::terraform::model::PlanStats;
use once_cell::sync::Lazy;
use regex::Regex;

/// Stand-in for the real number of managed resources. Only replaced when the
/// state-listing integration is enabled; see `TerraformService::state_list`.
pub const PLACEHOLDER_TOTAL_RESOURCES: usize = 50;

static PLAN_SUMMARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Plan:\s+(\d+)\s+to\s+add,\s+(\d+)\s+to\s+change,\s+(\d+)\s+to\s+destroy")
        .expect("Invalid plan summary regex")
});

/// Summarize plan output using the placeholder resource total.
pub fn parse_plan_stats(output: &str) -> PlanStats {
    summarize_with_total(output, PLACEHOLDER_TOTAL_RESOURCES)
}

/// Summarize plan output against a known resource total.
pub fn summarize_with_total(output: &str, total_resources: usize) -> PlanStats {
    let (to_add, to_change, to_destroy) = PLAN_SUMMARY_REGEX
        .captures(output)
        .map(|captures| {
            let count = |i: usize| captures[i].parse::<usize>().unwrap_or(0);
            (count(1), count(2), count(3))
        })
        .unwrap_or((0, 0, 0));

    let drifted = to_add.saturating_add(to_change).saturating_add(to_destroy);

    PlanStats {
        total_resources,
        in_sync: total_resources.saturating_sub(drifted),
        drifted,
        to_add,
        to_change,
        to_destroy,
        unmanaged: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let stats = parse_plan_stats("Plan: 2 to add, 3 to change, 1 to destroy.");
        assert_eq!(stats.to_add, 2);
        assert_eq!(stats.to_change, 3);
        assert_eq!(stats.to_destroy, 1);
        assert_eq!(stats.drifted, 6);
        assert_eq!(stats.total_resources, PLACEHOLDER_TOTAL_RESOURCES);
        assert_eq!(stats.in_sync, 44);
        assert_eq!(stats.unmanaged, 0);
    }

    #[test]
    fn test_absent_summary_is_zero() {
        let stats = parse_plan_stats("No changes. Your infrastructure matches the configuration.");
        assert_eq!(stats.to_add, 0);
        assert_eq!(stats.to_change, 0);
        assert_eq!(stats.to_destroy, 0);
        assert_eq!(stats.in_sync, PLACEHOLDER_TOTAL_RESOURCES);
    }

    #[test]
    fn test_in_sync_never_negative() {
        let stats = summarize_with_total("Plan: 40 to add, 30 to change, 0 to destroy.", 10);
        assert_eq!(stats.drifted, 70);
        assert_eq!(stats.in_sync, 0);
    }

    #[test]
    fn test_summary_inside_full_output() {
        let output = "  # a.b will be created\n  + resource \"a\" \"b\" {}\n\nPlan: 1 to add, 0 to change, 0 to destroy.\n";
        let stats = summarize_with_total(output, 7);
        assert_eq!(stats.to_add, 1);
        assert_eq!(stats.in_sync, 6);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let output = format!(
            "Plan: {max} to add, {max} to change, 1 to destroy.",
            max = usize::MAX
        );
        let stats = parse_plan_stats(&output);
        assert_eq!(stats.to_add, usize::MAX);
        assert_eq!(stats.drifted, usize::MAX);
        assert_eq!(stats.in_sync, 0);
    }
}
