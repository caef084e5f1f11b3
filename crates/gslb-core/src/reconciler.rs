//! Record reconciliation helpers
//!
//! The pieces of a cycle that sit between the priority selector and the DNS
//! backend: address-family validation of the selected IPs, set comparison
//! against the served records, and the human-readable transition reason
//! attached to failover events. The multi-step record replacement itself
//! lives on the [`DnsBackend`](crate::traits::DnsBackend) trait.

use std::collections::HashSet;
use std::net::IpAddr;

use tracing::warn;

use crate::config::RecordType;
use crate::error::{Error, Result};

/// Parse `ip` and verify it belongs to the family of `record_type`.
pub fn validate_ip_family(record_type: RecordType, ip: &str) -> Result<IpAddr> {
    let addr: IpAddr = ip
        .parse()
        .map_err(|_| Error::InvalidIp(ip.to_string()))?;

    match record_type {
        RecordType::A if !addr.is_ipv4() => Err(Error::InvalidIpv4(ip.to_string())),
        RecordType::Aaaa if !addr.is_ipv6() => Err(Error::InvalidIpv6(ip.to_string())),
        _ => Ok(addr),
    }
}

/// Drop IPs whose textual form fails family validation for `record_type`.
pub fn filter_valid_ips(record_type: RecordType, ips: &[String]) -> Vec<String> {
    let mut valid = Vec::with_capacity(ips.len());
    for ip in ips {
        match validate_ip_family(record_type, ip) {
            Ok(_) => valid.push(ip.clone()),
            Err(err) => {
                warn!("invalid IP {} for record type {}: {}", ip, record_type, err);
            }
        }
    }
    valid
}

/// Whether two IP lists describe the same set, ignoring order and duplicates.
pub fn same_ip_set(a: &[String], b: &[String]) -> bool {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    set_a == set_b
}

/// Build the reason string attached to a failover event.
///
/// `priority_established` says whether the served priority was known before
/// this cycle, either from state or detected from the live records. When it
/// was merely seeded, the transition reads as the first convergence.
pub fn build_change_reason(
    priority_established: bool,
    current_priority: i64,
    selected_priority: i64,
    current_ips: &[String],
    selected_ips: &[String],
) -> String {
    if !priority_established {
        return format!("Switching to priority level {}", selected_priority);
    }
    if selected_priority > current_priority {
        return format!("Priority level {} is healthy again", selected_priority);
    }
    if selected_priority < current_priority {
        return format!(
            "Priority level {} unhealthy, switching to level {}",
            current_priority, selected_priority
        );
    }
    if !same_ip_set(current_ips, selected_ips) {
        return format!(
            "Updating IPs within priority level {} based on health checks",
            selected_priority
        );
    }
    "No change".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_ip_family() {
        assert!(validate_ip_family(RecordType::A, "1.1.1.1").is_ok());
        assert!(validate_ip_family(RecordType::Aaaa, "2001:db8::1").is_ok());

        assert!(matches!(
            validate_ip_family(RecordType::A, "2001:db8::1"),
            Err(Error::InvalidIpv4(_))
        ));
        assert!(matches!(
            validate_ip_family(RecordType::Aaaa, "1.1.1.1"),
            Err(Error::InvalidIpv6(_))
        ));
        assert!(matches!(
            validate_ip_family(RecordType::A, "not-an-ip"),
            Err(Error::InvalidIp(_))
        ));
    }

    #[test]
    fn test_filter_valid_ips_keeps_matching_family() {
        let filtered = filter_valid_ips(
            RecordType::A,
            &ips(&["1.1.1.1", "2001:db8::1", "bogus", "2.2.2.2"]),
        );
        assert_eq!(filtered, ips(&["1.1.1.1", "2.2.2.2"]));
    }

    #[test]
    fn test_filter_can_empty_the_set() {
        assert!(filter_valid_ips(RecordType::Aaaa, &ips(&["1.1.1.1"])).is_empty());
    }

    #[test]
    fn test_same_ip_set_ignores_order_and_duplicates() {
        assert!(same_ip_set(
            &ips(&["1.1.1.1", "2.2.2.2"]),
            &ips(&["2.2.2.2", "1.1.1.1", "1.1.1.1"]),
        ));
        assert!(same_ip_set(&[], &[]));
        assert!(!same_ip_set(&ips(&["1.1.1.1"]), &ips(&["2.2.2.2"])));
        assert!(!same_ip_set(&ips(&["1.1.1.1"]), &[]));
    }

    #[test]
    fn test_reason_first_convergence() {
        let reason = build_change_reason(false, 100, 100, &[], &ips(&["1.1.1.1"]));
        assert_eq!(reason, "Switching to priority level 100");
    }

    #[test]
    fn test_reason_recovery() {
        let reason =
            build_change_reason(true, 50, 100, &ips(&["2.2.2.2"]), &ips(&["1.1.1.1"]));
        assert_eq!(reason, "Priority level 100 is healthy again");
    }

    #[test]
    fn test_reason_failover() {
        let reason =
            build_change_reason(true, 100, 50, &ips(&["1.1.1.1"]), &ips(&["2.2.2.2"]));
        assert_eq!(reason, "Priority level 100 unhealthy, switching to level 50");
    }

    #[test]
    fn test_reason_intra_level_update() {
        let reason = build_change_reason(
            true,
            100,
            100,
            &ips(&["1.1.1.1"]),
            &ips(&["1.1.1.1", "1.1.1.2"]),
        );
        assert_eq!(
            reason,
            "Updating IPs within priority level 100 based on health checks"
        );
    }
}
