//! Configuration types for the GSLB control plane
//!
//! Two file encodings are accepted, selected by extension: YAML (`.yaml`,
//! `.yml`) and JSON (everything else, for backward compatibility). When the
//! configured path is a directory the loader looks for `config.yaml`,
//! `config.yml`, then `config.json` inside it.
//!
//! Priority levels are normalized once at load time (equal priorities merged,
//! IPs de-duplicated, empty levels dropped) and the result is written back
//! onto the origin, so the rest of the system never re-derives them.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Priority assigned to the legacy `priority_failover_ips` field
pub const LEGACY_PRIORITY_HIGH: i64 = 100;

/// Priority assigned to the legacy `failover_ips` field
pub const LEGACY_PRIORITY_LOW: i64 = 0;

/// Main configuration, after loading and normalization
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloudflare API token used by every backend client
    pub api_token: String,

    /// Managed zones; origins reference these by `zone_name`
    pub zones: Vec<ZoneConfig>,

    /// Interval between reconciliation cycle starts
    pub check_interval: Duration,

    /// Managed origins
    pub origins: Vec<OriginConfig>,

    /// Notification sinks
    pub notifications: Vec<NotificationConfig>,
}

/// A managed DNS zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Provider-assigned zone identifier
    pub zone_id: String,

    /// Zone name, referenced by origins
    pub name: String,
}

/// One managed origin: a record name plus its health and failover policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Record name within its zone
    pub name: String,

    /// Zone this origin belongs to, by zone name
    #[serde(default)]
    pub zone_name: String,

    /// Record type; only A and AAAA are supported
    pub record_type: RecordType,

    /// Health check specification
    pub health_check: HealthCheck,

    /// Priority groups of interchangeable IPs; higher priority wins
    #[serde(default)]
    pub priority_levels: Vec<PriorityLevel>,

    /// Legacy form, mapped to priority 100 when `priority_levels` is empty
    #[serde(default)]
    pub priority_failover_ips: Vec<String>,

    /// Legacy form, mapped to priority 0 when `priority_levels` is empty
    #[serde(default)]
    pub failover_ips: Vec<String>,

    /// Provider proxy flag, passed through on every record mutation
    #[serde(default)]
    pub proxied: bool,

    /// When true, traffic moves back to the highest healthy level as soon as
    /// it recovers. When false, a failover sticks until its level degrades.
    #[serde(default)]
    pub return_to_priority: bool,
}

impl OriginConfig {
    /// Merged view over the new and legacy priority fields.
    ///
    /// Explicit `priority_levels` win when non-empty; otherwise the legacy
    /// fields are folded into levels at priorities 100 and 0. The result is
    /// normalized either way.
    pub fn effective_priority_levels(&self) -> Vec<PriorityLevel> {
        let levels = normalize_priority_levels(&self.priority_levels);
        if !levels.is_empty() {
            return levels;
        }
        normalize_priority_levels(&legacy_priority_levels(
            &self.priority_failover_ips,
            &self.failover_ips,
        ))
    }
}

/// A priority group of interchangeable IPs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityLevel {
    /// Rank of this group; larger values are preferred
    pub priority: i64,

    /// Members of the group, served together as a round-robin set
    pub ips: Vec<String>,
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire representation ("A" or "AAAA")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Whether the given address belongs to this record type's family
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            RecordType::A => addr.is_ipv4(),
            RecordType::Aaaa => addr.is_ipv6(),
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::config(format!("unsupported record type: {}", other))),
        }
    }
}

/// Kind of health check to run against each candidate IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Plain HTTP GET
    Http,
    /// HTTPS GET
    Https,
    /// ICMP echo
    Icmp,
}

impl CheckKind {
    /// Registry key for this check kind
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Http => "http",
            CheckKind::Https => "https",
            CheckKind::Icmp => "icmp",
        }
    }
}

/// Health check specification for one origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Check kind
    #[serde(rename = "type")]
    pub kind: CheckKind,

    /// Request path for HTTP/HTTPS checks (e.g. "/healthz")
    #[serde(default)]
    pub endpoint: String,

    /// Host header and TLS SNI name for HTTP/HTTPS checks
    #[serde(default)]
    pub host: String,

    /// Timeout in seconds for the whole check
    #[serde(rename = "timeout", default = "default_check_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (HTTPS only)
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Extra HTTP headers, set verbatim on the probe request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl HealthCheck {
    /// Check timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_check_timeout() -> u64 {
    5
}

/// Notification sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Sink type ("slack" or "discord"); unknown types are skipped with a warning
    #[serde(rename = "type")]
    pub kind: String,

    /// Webhook URL to post events to
    pub webhook_url: String,
}

/// On-disk configuration shape, including legacy keys
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    cloudflare_api_token: String,
    #[serde(default)]
    cloudflare_zone_id: String,
    #[serde(default)]
    cloudflare_zones: Vec<ZoneConfig>,
    #[serde(default)]
    check_interval_seconds: u64,
    #[serde(default)]
    origins: Vec<OriginConfig>,
    #[serde(default)]
    notifications: Vec<NotificationConfig>,
}

impl Config {
    /// Load a configuration file from `path`.
    ///
    /// `path` may also be a directory, in which case `config.yaml`,
    /// `config.yml` and `config.json` are tried in that order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = resolve_config_path(path.as_ref())?;
        let data = std::fs::read_to_string(&path)?;

        let raw = decode_config(&path, &data)?;
        let mut config = build_config(raw);
        normalize_origins(&mut config);

        if config.check_interval.is_zero() {
            return Err(Error::config("check_interval_seconds must be greater than zero"));
        }

        Ok(config)
    }
}

fn resolve_config_path(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    for candidate in ["config.yaml", "config.yml", "config.json"] {
        let candidate = path.join(candidate);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(Error::config(format!(
        "no config.yaml, config.yml or config.json found in directory {}",
        path.display()
    )))
}

fn decode_config(path: &Path, data: &str) -> Result<RawConfig> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(data)?),
        // Default to JSON for backward compatibility
        _ => Ok(serde_json::from_str(data)?),
    }
}

fn build_config(raw: RawConfig) -> Config {
    let mut config = Config {
        api_token: raw.cloudflare_api_token,
        zones: raw.cloudflare_zones,
        check_interval: Duration::from_secs(raw.check_interval_seconds),
        origins: raw.origins,
        notifications: raw.notifications,
    };

    // Legacy single-zone form: synthesize a zone named "default" and point
    // every origin without an explicit zone at it.
    if !raw.cloudflare_zone_id.is_empty() && config.zones.is_empty() {
        config.zones = vec![ZoneConfig {
            zone_id: raw.cloudflare_zone_id,
            name: "default".to_string(),
        }];
        apply_default_zone_name(&mut config.origins, "default");
    }

    config
}

fn apply_default_zone_name(origins: &mut [OriginConfig], zone_name: &str) {
    for origin in origins {
        if origin.zone_name.is_empty() {
            origin.zone_name = zone_name.to_string();
        }
    }
}

fn normalize_origins(config: &mut Config) {
    let default_zone_name = if config.zones.len() == 1 {
        config.zones[0].name.clone()
    } else {
        String::new()
    };

    for origin in &mut config.origins {
        origin.priority_levels = origin.effective_priority_levels();
        if origin.zone_name.is_empty() && !default_zone_name.is_empty() {
            origin.zone_name = default_zone_name.clone();
        }
    }
}

fn legacy_priority_levels(priority_ips: &[String], failover_ips: &[String]) -> Vec<PriorityLevel> {
    let mut levels = Vec::with_capacity(2);
    if !priority_ips.is_empty() {
        levels.push(PriorityLevel {
            priority: LEGACY_PRIORITY_HIGH,
            ips: priority_ips.to_vec(),
        });
    }
    if !failover_ips.is_empty() {
        levels.push(PriorityLevel {
            priority: LEGACY_PRIORITY_LOW,
            ips: failover_ips.to_vec(),
        });
    }
    levels
}

/// Merge levels with equal priorities, de-duplicate their IPs and drop empty
/// levels. First-appearance order of priorities is preserved.
pub fn normalize_priority_levels(levels: &[PriorityLevel]) -> Vec<PriorityLevel> {
    if levels.is_empty() {
        return Vec::new();
    }

    let mut merged: HashMap<i64, Vec<String>> = HashMap::new();
    let mut order: Vec<i64> = Vec::with_capacity(levels.len());

    for level in levels {
        if level.ips.is_empty() {
            continue;
        }
        if !merged.contains_key(&level.priority) {
            order.push(level.priority);
        }
        merged
            .entry(level.priority)
            .or_default()
            .extend(level.ips.iter().cloned());
    }

    let mut normalized = Vec::with_capacity(order.len());
    for priority in order {
        let ips = unique_strings(&merged[&priority]);
        if ips.is_empty() {
            continue;
        }
        normalized.push(PriorityLevel { priority, ips });
    }

    normalized
}

fn unique_strings(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.as_str()) {
            out.push(value.clone());
        }
    }
    out
}
