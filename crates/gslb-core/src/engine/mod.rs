//! GSLB service supervisor
//!
//! The [`Service`] owns every per-origin component for the process lifetime:
//! it resolves zones, builds one backend client per origin (the provider
//! `proxied` flag is per origin), instantiates health checkers and
//! notifiers through the [`ComponentRegistry`], and runs one reconciliation
//! worker per origin.
//!
//! ```text
//! ┌───────────┐   tick    ┌──────────────┐   list/replace   ┌────────────┐
//! │  Service  │──────────▶│ OriginWorker │─────────────────▶│ DnsBackend │
//! └───────────┘           └──────────────┘                  └────────────┘
//!       │                    │        │ probe
//!       │                    │        ▼
//!       │                    │   ┌───────────────┐
//!       │ owns state         │   │ HealthChecker │
//!       ▼                    │   └───────────────┘
//! ┌──────────────────┐       │ on change (detached task)
//! │ OriginStateStore │       ▼
//! └──────────────────┘  ┌──────────┐
//!                       │ Notifier │
//!                       └──────────┘
//! ```
//!
//! Two entry points: [`Service::start`]/[`Service::stop`] for the long-running
//! daemon, and [`Service::run_once`] which drives a single cycle for every
//! origin concurrently and joins their errors.

pub mod worker;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::FailoverEvent;
use crate::registry::ComponentRegistry;
use crate::selector;
use crate::state::{OriginKey, OriginStateStore};
use crate::traits::{BackendParams, Notifier, RECORD_TTL_SECS};

use worker::OriginWorker;

/// Provider name the supervisor resolves backends under
const BACKEND_PROVIDER: &str = "cloudflare";

/// Budget for delivering one event to every sink
const NOTIFY_FANOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Supervisor for all configured origins
#[derive(Debug)]
pub struct Service {
    workers: Vec<Arc<OriginWorker>>,
    state: OriginStateStore,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Service {
    /// Build the service from a loaded configuration.
    ///
    /// Fails fast on an empty zone list, an origin referencing an unknown
    /// zone, duplicate `(zone, name, type)` origins, and unknown component
    /// types.
    pub fn new(config: Config, registry: &ComponentRegistry) -> Result<Self> {
        if config.zones.is_empty() {
            return Err(Error::config("no zones configured"));
        }

        let zone_id_map: HashMap<&str, &str> = config
            .zones
            .iter()
            .map(|zone| (zone.name.as_str(), zone.zone_id.as_str()))
            .collect();

        let notifiers = Arc::new(build_notifiers(&config, registry)?);
        let state = OriginStateStore::new();

        let mut workers = Vec::with_capacity(config.origins.len());
        let mut keys: HashSet<OriginKey> = HashSet::new();

        for origin in &config.origins {
            let key = OriginKey::for_origin(origin);
            if !keys.insert(key.clone()) {
                return Err(Error::config(format!("duplicate origin: {}", key)));
            }

            let zone_id = zone_id_map.get(origin.zone_name.as_str()).ok_or_else(|| {
                Error::config(format!(
                    "zone name {} not found in configuration",
                    origin.zone_name
                ))
            })?;

            let backend = registry.create_backend(
                BACKEND_PROVIDER,
                &BackendParams {
                    api_token: config.api_token.clone(),
                    zone_id: zone_id.to_string(),
                    proxied: origin.proxied,
                    ttl: RECORD_TTL_SECS,
                },
            )?;

            let checker = registry.create_checker(&origin.health_check).map_err(|err| {
                Error::config(format!(
                    "failed to create health checker for {}: {}",
                    origin.name, err
                ))
            })?;

            let levels = selector::sort_levels_desc(&origin.effective_priority_levels());

            workers.push(Arc::new(OriginWorker::new(
                origin.clone(),
                key,
                levels,
                backend,
                checker,
                notifiers.clone(),
                state.clone(),
                config.check_interval,
            )));
        }

        Ok(Self {
            workers,
            state,
            shutdown: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Spawn one reconciliation loop per origin
    pub async fn start(&self) {
        info!("Starting GSLB service...");
        let mut handles = self.handles.lock().await;
        for worker in &self.workers {
            let worker = worker.clone();
            let shutdown = self.shutdown.clone();
            handles.push(tokio::spawn(worker.run(shutdown)));
        }
    }

    /// Signal every loop to exit and wait for all of them to drain.
    ///
    /// In-flight cycles complete before their loops exit, so records are
    /// never left half replaced by a shutdown.
    pub async fn stop(&self) {
        info!("Stopping GSLB service...");
        self.shutdown.cancel();

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(err) = handle.await {
                error!("Worker task failed: {}", err);
            }
        }
        info!("GSLB service stopped");
    }

    /// Run one cycle for every origin concurrently.
    ///
    /// Per-origin errors are joined into a single aggregate; notifications
    /// triggered by the cycles are awaited before returning so they complete
    /// before process exit.
    pub async fn run_once(&self) -> Result<()> {
        info!("Running one-shot health check for all origins...");

        let cycles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                let worker = worker.clone();
                async move {
                    let result = worker.run_cycle().await;
                    (worker.key().clone(), result)
                }
            })
            .collect();

        let mut errors = Vec::new();
        let mut notify_handles = Vec::new();
        for (key, result) in futures::future::join_all(cycles).await {
            match result {
                Ok(Some(handle)) => notify_handles.push(handle),
                Ok(None) => {}
                Err(err) => {
                    error!("One-shot check failed for {}: {}", key, err);
                    errors.push(Error::Other(format!("origin {}: {}", key, err)));
                }
            }
        }

        for handle in notify_handles {
            let _ = handle.await;
        }

        Error::join(errors)?;
        info!("One-shot health check completed");
        Ok(())
    }

    /// Post-cycle state snapshots, shared with notifications and one-shot
    /// reporting
    pub fn state(&self) -> &OriginStateStore {
        &self.state
    }

    /// Number of managed origins
    pub fn origin_count(&self) -> usize {
        self.workers.len()
    }
}

fn build_notifiers(
    config: &Config,
    registry: &ComponentRegistry,
) -> Result<Vec<Arc<dyn Notifier>>> {
    let mut notifiers = Vec::with_capacity(config.notifications.len());
    for nc in &config.notifications {
        if !registry.has_notifier(&nc.kind) {
            warn!("Unknown notification type: {}", nc.kind);
            continue;
        }
        let notifier = registry.create_notifier(&nc.kind, &nc.webhook_url)?;
        info!("{} notifier configured", nc.kind);
        notifiers.push(notifier);
    }
    Ok(notifiers)
}

/// Hand an event to every notifier on a detached task.
///
/// The task carries its own fan-out deadline so a slow sink cannot stall the
/// reconciliation loop, and it survives the tick boundary; shutting the loop
/// down does not cancel a webhook POST that already started.
pub(crate) fn dispatch_notifications(
    notifiers: Arc<Vec<Arc<dyn Notifier>>>,
    event: FailoverEvent,
) -> Option<JoinHandle<()>> {
    if notifiers.is_empty() {
        return None;
    }

    Some(tokio::spawn(async move {
        let sends: Vec<_> = notifiers
            .iter()
            .map(|notifier| {
                let notifier = notifier.clone();
                let event = event.clone();
                async move {
                    match notifier.notify(&event).await {
                        Ok(()) => info!(
                            "Notification sent via {} for {} ({:?} -> {:?})",
                            notifier.name(),
                            event.origin_display(),
                            event.old_ips,
                            event.new_ips
                        ),
                        Err(err) => warn!("Failed to send notification: {}", err),
                    }
                }
            })
            .collect();

        if tokio::time::timeout(NOTIFY_FANOUT_TIMEOUT, futures::future::join_all(sends))
            .await
            .is_err()
        {
            warn!(
                "Notification fan-out timed out after {:?}",
                NOTIFY_FANOUT_TIMEOUT
            );
        }
    }))
}
