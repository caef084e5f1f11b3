//! Test doubles and common utilities for the contract tests
//!
//! The doubles count calls and record the mutation order so tests can assert
//! on backend traffic, not just end state. They are cheap to clone; clones
//! share their counters and record tables, which lets a test keep a handle to
//! the same double the service resolves through the registry.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gslb_core::config::{
    CheckKind, Config, HealthCheck, NotificationConfig, OriginConfig, PriorityLevel, RecordType,
    ZoneConfig,
};
use gslb_core::error::{Error, Result};
use gslb_core::event::FailoverEvent;
use gslb_core::registry::ComponentRegistry;
use gslb_core::traits::{
    BackendParams, DnsBackend, DnsBackendFactory, DnsRecord, HealthChecker, HealthCheckerFactory,
    Notifier, NotifierFactory,
};

type RecordKey = (String, RecordType);

/// In-memory DNS backend that records every operation
#[derive(Clone, Default)]
pub struct MockDnsBackend {
    records: Arc<Mutex<HashMap<RecordKey, Vec<DnsRecord>>>>,
    next_id: Arc<AtomicUsize>,
    op_log: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    fail_list: Arc<AtomicBool>,
    fail_list_names: Arc<Mutex<HashSet<String>>>,
    fail_create_contents: Arc<Mutex<HashSet<String>>>,
    fail_delete_contents: Arc<Mutex<HashSet<String>>>,
    /// Smallest record-set size observed after any mutation, per key
    min_len_seen: Arc<Mutex<HashMap<RecordKey, usize>>>,
}

impl MockDnsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate records for a name
    pub fn seed(&self, name: &str, record_type: RecordType, contents: &[&str]) {
        let mut records = self.records.lock().unwrap();
        let entry = records.entry((name.to_string(), record_type)).or_default();
        for content in contents {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            entry.push(DnsRecord {
                id: format!("rec-{}", id),
                name: name.to_string(),
                record_type,
                content: content.to_string(),
            });
        }
        drop(records);
        self.observe_len(name, record_type);
    }

    /// Current record contents for a name, sorted for stable assertions
    pub fn contents(&self, name: &str, record_type: RecordType) -> Vec<String> {
        let records = self.records.lock().unwrap();
        let mut contents: Vec<String> = records
            .get(&(name.to_string(), record_type))
            .map(|entries| entries.iter().map(|r| r.content.clone()).collect())
            .unwrap_or_default();
        contents.sort();
        contents
    }

    /// Ordered log of mutating operations ("create <ip>", "delete <ip>")
    pub fn op_log(&self) -> Vec<String> {
        self.op_log.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Make every `list_records` call fail until cleared
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make `list_records` fail for one record name only
    pub fn fail_list_for(&self, name: &str) {
        self.fail_list_names.lock().unwrap().insert(name.to_string());
    }

    /// Make creating a record with this content fail
    pub fn fail_create(&self, content: &str) {
        self.fail_create_contents
            .lock()
            .unwrap()
            .insert(content.to_string());
    }

    /// Make deleting any record with this content fail
    pub fn fail_delete(&self, content: &str) {
        self.fail_delete_contents
            .lock()
            .unwrap()
            .insert(content.to_string());
    }

    /// Smallest record-set size seen after any mutation for this name
    pub fn min_len_seen(&self, name: &str, record_type: RecordType) -> Option<usize> {
        self.min_len_seen
            .lock()
            .unwrap()
            .get(&(name.to_string(), record_type))
            .copied()
    }

    fn observe_len(&self, name: &str, record_type: RecordType) {
        let key = (name.to_string(), record_type);
        let len = self
            .records
            .lock()
            .unwrap()
            .get(&key)
            .map(Vec::len)
            .unwrap_or(0);
        let mut seen = self.min_len_seen.lock().unwrap();
        let entry = seen.entry(key).or_insert(len);
        if len < *entry {
            *entry = len;
        }
    }
}

#[async_trait]
impl DnsBackend for MockDnsBackend {
    async fn list_records(&self, name: &str, record_type: RecordType) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst)
            || self.fail_list_names.lock().unwrap().contains(name)
        {
            return Err(Error::backend("list failed (injected)"));
        }
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&(name.to_string(), record_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_contents.lock().unwrap().contains(content) {
            return Err(Error::backend(format!("create {} failed (injected)", content)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = DnsRecord {
            id: format!("rec-{}", id),
            name: name.to_string(),
            record_type,
            content: content.to_string(),
        };
        self.records
            .lock()
            .unwrap()
            .entry((name.to_string(), record_type))
            .or_default()
            .push(record.clone());
        self.op_log.lock().unwrap().push(format!("create {}", content));
        self.observe_len(name, record_type);
        Ok(record)
    }

    async fn update_record(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord> {
        let mut records = self.records.lock().unwrap();
        let entry = records
            .entry((name.to_string(), record_type))
            .or_default()
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::backend(format!("record {} not found", record_id)))?;
        entry.content = content.to_string();
        Ok(entry.clone())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock().unwrap();
        let mut deleted: Option<(RecordKey, String)> = None;
        for (key, entries) in records.iter_mut() {
            if let Some(pos) = entries.iter().position(|r| r.id == record_id) {
                let content = entries[pos].content.clone();
                if self.fail_delete_contents.lock().unwrap().contains(&content) {
                    return Err(Error::backend(format!(
                        "delete {} failed (injected)",
                        content
                    )));
                }
                entries.remove(pos);
                deleted = Some((key.clone(), content));
                break;
            }
        }
        drop(records);

        match deleted {
            Some(((name, record_type), content)) => {
                self.op_log.lock().unwrap().push(format!("delete {}", content));
                self.observe_len(&name, record_type);
                Ok(())
            }
            None => Err(Error::backend(format!("record {} not found", record_id))),
        }
    }

    fn zone_id(&self) -> &str {
        "zone-1"
    }
}

/// Health checker answering from a scripted set of healthy addresses
#[derive(Clone, Default)]
pub struct StaticChecker {
    healthy: Arc<Mutex<HashSet<IpAddr>>>,
    check_calls: Arc<AtomicUsize>,
}

impl StaticChecker {
    pub fn new(healthy: &[&str]) -> Self {
        let checker = Self::default();
        for ip in healthy {
            checker.set_healthy(ip, true);
        }
        checker
    }

    pub fn set_healthy(&self, ip: &str, healthy: bool) {
        let addr: IpAddr = ip.parse().expect("test IP parses");
        let mut set = self.healthy.lock().unwrap();
        if healthy {
            set.insert(addr);
        } else {
            set.remove(&addr);
        }
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthChecker for StaticChecker {
    async fn check(&self, addr: IpAddr) -> Result<()> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.lock().unwrap().contains(&addr) {
            Ok(())
        } else {
            Err(Error::probe(format!("{} is down (scripted)", addr)))
        }
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}

/// Notifier that records every delivered event
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<FailoverEvent>>>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every delivery, to exercise the detached dispatch path
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            events: Arc::default(),
            delay: Some(delay),
        }
    }

    pub fn events(&self) -> Vec<FailoverEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &FailoverEvent) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct SharedBackendFactory(pub MockDnsBackend);

impl DnsBackendFactory for SharedBackendFactory {
    fn create(&self, _params: &BackendParams) -> Result<Arc<dyn DnsBackend>> {
        Ok(Arc::new(self.0.clone()))
    }
}

pub struct SharedCheckerFactory(pub StaticChecker);

impl HealthCheckerFactory for SharedCheckerFactory {
    fn create(&self, _spec: &HealthCheck) -> Result<Arc<dyn HealthChecker>> {
        Ok(Arc::new(self.0.clone()))
    }
}

pub struct SharedNotifierFactory(pub RecordingNotifier);

impl NotifierFactory for SharedNotifierFactory {
    fn create(&self, _webhook_url: &str) -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(self.0.clone()))
    }
}

/// Registry wired to the given doubles, under the names the supervisor
/// resolves ("cloudflare" backends, "http" checks, "slack" notifications)
pub fn test_registry(
    backend: &MockDnsBackend,
    checker: &StaticChecker,
    notifier: &RecordingNotifier,
) -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    registry.register_backend("cloudflare", Box::new(SharedBackendFactory(backend.clone())));
    registry.register_checker("http", Box::new(SharedCheckerFactory(checker.clone())));
    registry.register_notifier("slack", Box::new(SharedNotifierFactory(notifier.clone())));
    registry
}

pub fn http_check() -> HealthCheck {
    HealthCheck {
        kind: CheckKind::Http,
        endpoint: "/healthz".to_string(),
        host: String::new(),
        timeout_secs: 1,
        insecure_skip_verify: false,
        headers: HashMap::new(),
    }
}

pub fn origin(
    name: &str,
    record_type: RecordType,
    levels: &[(i64, &[&str])],
    return_to_priority: bool,
) -> OriginConfig {
    OriginConfig {
        name: name.to_string(),
        zone_name: "example.com".to_string(),
        record_type,
        health_check: http_check(),
        priority_levels: levels
            .iter()
            .map(|(priority, ips)| PriorityLevel {
                priority: *priority,
                ips: ips.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
        priority_failover_ips: Vec::new(),
        failover_ips: Vec::new(),
        proxied: false,
        return_to_priority,
    }
}

pub fn test_config(origins: Vec<OriginConfig>, with_notifications: bool) -> Config {
    Config {
        api_token: "test-token".to_string(),
        zones: vec![ZoneConfig {
            zone_id: "zone-1".to_string(),
            name: "example.com".to_string(),
        }],
        check_interval: Duration::from_secs(30),
        origins,
        notifications: if with_notifications {
            vec![NotificationConfig {
                kind: "slack".to_string(),
                webhook_url: "https://hooks.example.com/test".to_string(),
            }]
        } else {
            Vec::new()
        },
    }
}
