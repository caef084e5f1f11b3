//! Priority level selection
//!
//! Pure decision logic: given the normalized priority levels, the per-IP
//! health picture and the currently served priority, pick the level whose IPs
//! should be written to DNS. No I/O happens here; the reconciliation worker
//! probes IPs first and hands the resulting health map in.
//!
//! A level is eligible only when every one of its IPs is healthy, so the
//! round-robin set advertised to clients is never internally degraded. The
//! `return_to_priority` flag controls hysteresis: when false, a failover
//! sticks at its level until that level itself degrades.

use std::collections::HashMap;

use crate::config::PriorityLevel;

/// Outcome of a selection: the chosen level and its IPs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Priority of the chosen level
    pub priority: i64,
    /// IPs of the chosen level, in configured order
    pub ips: Vec<String>,
}

/// Clone `levels` sorted by descending priority
pub fn sort_levels_desc(levels: &[PriorityLevel]) -> Vec<PriorityLevel> {
    let mut sorted = levels.to_vec();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    sorted
}

/// Whether every IP of `level` is healthy according to `health`.
///
/// An empty level is never healthy, and an IP absent from the map counts as
/// unhealthy.
pub fn level_healthy(level: &PriorityLevel, health: &HashMap<String, bool>) -> bool {
    if level.ips.is_empty() {
        return false;
    }
    level
        .ips
        .iter()
        .all(|ip| health.get(ip).copied().unwrap_or(false))
}

/// Find the level with the given priority
pub fn find_level(levels: &[PriorityLevel], priority: i64) -> Option<&PriorityLevel> {
    levels.iter().find(|level| level.priority == priority)
}

/// Select the target level.
///
/// `levels` must be sorted by descending priority. Returns `None` when no
/// level is fully healthy; the caller then leaves the existing records alone.
pub fn select_target(
    levels: &[PriorityLevel],
    health: &HashMap<String, bool>,
    current_priority: Option<i64>,
    return_to_priority: bool,
) -> Option<Selection> {
    // Sticky failover: stay on the current level while it is healthy.
    if !return_to_priority {
        if let Some(current) = current_priority {
            if let Some(level) = find_level(levels, current) {
                if level_healthy(level, health) {
                    return Some(Selection {
                        priority: current,
                        ips: level.ips.clone(),
                    });
                }
            }
        }
    }

    for level in levels {
        if !return_to_priority {
            if let Some(current) = current_priority {
                if level.priority > current {
                    continue;
                }
            }
        }

        if level_healthy(level, health) {
            return Some(Selection {
                priority: level.priority,
                ips: level.ips.clone(),
            });
        }
    }

    None
}

/// Detect the priority level currently served, given the record contents read
/// from the provider.
///
/// Returns the highest priority whose IP set contains every served IP, so a
/// partially converged set still maps to the level it belongs to. Returns
/// `None` when the provider has no records or no level matches.
pub fn detect_current_priority(levels: &[PriorityLevel], current_ips: &[String]) -> Option<i64> {
    if levels.is_empty() || current_ips.is_empty() {
        return None;
    }

    let mut matched: Option<i64> = None;
    for level in levels {
        let superset: std::collections::HashSet<&str> =
            level.ips.iter().map(String::as_str).collect();
        if !current_ips.iter().all(|ip| superset.contains(ip.as_str())) {
            continue;
        }
        matched = Some(match matched {
            Some(existing) if existing >= level.priority => existing,
            _ => level.priority,
        });
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(priority: i64, ips: &[&str]) -> PriorityLevel {
        PriorityLevel {
            priority,
            ips: ips.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn health(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(ip, healthy)| (ip.to_string(), *healthy))
            .collect()
    }

    fn two_levels() -> Vec<PriorityLevel> {
        vec![level(100, &["1.1.1.1"]), level(50, &["2.2.2.2"])]
    }

    #[test]
    fn test_selects_highest_healthy_level() {
        let h = health(&[("1.1.1.1", true), ("2.2.2.2", true)]);
        let selection = select_target(&two_levels(), &h, None, true).unwrap();
        assert_eq!(selection.priority, 100);
        assert_eq!(selection.ips, vec!["1.1.1.1".to_string()]);
    }

    #[test]
    fn test_fails_over_when_top_level_unhealthy() {
        let h = health(&[("1.1.1.1", false), ("2.2.2.2", true)]);
        let selection = select_target(&two_levels(), &h, Some(100), true).unwrap();
        assert_eq!(selection.priority, 50);
    }

    #[test]
    fn test_no_target_when_nothing_healthy() {
        let h = health(&[("1.1.1.1", false), ("2.2.2.2", false)]);
        assert!(select_target(&two_levels(), &h, Some(100), true).is_none());
    }

    #[test]
    fn test_partial_level_failure_is_level_failure() {
        let levels = vec![
            level(100, &["1.1.1.1", "1.1.1.2"]),
            level(50, &["2.2.2.2"]),
        ];
        let h = health(&[("1.1.1.1", false), ("1.1.1.2", true), ("2.2.2.2", true)]);

        let selection = select_target(&levels, &h, Some(100), true).unwrap();
        assert_eq!(selection.priority, 50);
    }

    #[test]
    fn test_sticky_failover_stays_on_healthy_current_level() {
        // Both levels healthy again, but the policy keeps us at 50.
        let h = health(&[("1.1.1.1", true), ("2.2.2.2", true)]);
        let selection = select_target(&two_levels(), &h, Some(50), false).unwrap();
        assert_eq!(selection.priority, 50);
    }

    #[test]
    fn test_sticky_failover_never_climbs_above_current() {
        // Current level degraded; only the higher level is healthy. The scan
        // must not climb past the current priority, so no target exists.
        let levels = vec![
            level(100, &["1.1.1.1"]),
            level(50, &["2.2.2.2"]),
            level(10, &["3.3.3.3"]),
        ];
        let h = health(&[("1.1.1.1", true), ("2.2.2.2", false), ("3.3.3.3", false)]);

        assert!(select_target(&levels, &h, Some(50), false).is_none());
    }

    #[test]
    fn test_sticky_failover_can_descend_further() {
        let levels = vec![
            level(100, &["1.1.1.1"]),
            level(50, &["2.2.2.2"]),
            level(10, &["3.3.3.3"]),
        ];
        let h = health(&[("1.1.1.1", true), ("2.2.2.2", false), ("3.3.3.3", true)]);

        let selection = select_target(&levels, &h, Some(50), false).unwrap();
        assert_eq!(selection.priority, 10);
    }

    #[test]
    fn test_return_to_priority_recovers_upward() {
        let h = health(&[("1.1.1.1", true), ("2.2.2.2", true)]);
        let selection = select_target(&two_levels(), &h, Some(50), true).unwrap();
        assert_eq!(selection.priority, 100);
    }

    #[test]
    fn test_empty_level_is_never_healthy() {
        let lvl = level(100, &[]);
        assert!(!level_healthy(&lvl, &HashMap::new()));
    }

    #[test]
    fn test_unknown_ip_counts_as_unhealthy() {
        let lvl = level(100, &["1.1.1.1"]);
        assert!(!level_healthy(&lvl, &HashMap::new()));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let levels = vec![
            level(100, &["1.1.1.1", "1.1.1.2"]),
            level(50, &["2.2.2.2"]),
        ];
        let h = health(&[("1.1.1.1", true), ("1.1.1.2", false), ("2.2.2.2", true)]);

        let first = select_target(&levels, &h, Some(100), false);
        for _ in 0..10 {
            assert_eq!(select_target(&levels, &h, Some(100), false), first);
        }
    }

    #[test]
    fn test_sort_levels_desc() {
        let levels = vec![level(10, &["a"]), level(100, &["b"]), level(50, &["c"])];
        let sorted = sort_levels_desc(&levels);
        let priorities: Vec<i64> = sorted.iter().map(|l| l.priority).collect();
        assert_eq!(priorities, vec![100, 50, 10]);
    }

    #[test]
    fn test_detect_current_priority_matches_subset() {
        let levels = vec![
            level(100, &["1.1.1.1", "1.1.1.2"]),
            level(50, &["2.2.2.2"]),
        ];

        assert_eq!(
            detect_current_priority(&levels, &["1.1.1.1".to_string()]),
            Some(100)
        );
        assert_eq!(
            detect_current_priority(&levels, &["2.2.2.2".to_string()]),
            Some(50)
        );
        assert_eq!(
            detect_current_priority(&levels, &["9.9.9.9".to_string()]),
            None
        );
        assert_eq!(detect_current_priority(&levels, &[]), None);
    }

    #[test]
    fn test_detect_current_priority_prefers_highest_match() {
        // The same IP appears in two levels; the higher one wins.
        let levels = vec![
            level(50, &["1.1.1.1"]),
            level(100, &["1.1.1.1", "1.1.1.2"]),
        ];

        assert_eq!(
            detect_current_priority(&levels, &["1.1.1.1".to_string()]),
            Some(100)
        );
    }
}
