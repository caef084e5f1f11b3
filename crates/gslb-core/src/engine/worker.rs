//! Per-origin reconciliation worker
//!
//! One worker per configured origin, woken by a fixed-interval tick. Each
//! cycle reads the provider's records, probes every candidate IP, selects the
//! target priority level, converges the record set and hands a failover event
//! to the notification dispatcher when something changed.
//!
//! ## Failure model
//!
//! - A backend error aborts the cycle without touching state; the next tick
//!   retries from scratch.
//! - A partial-delete outcome still advances state: the creates succeeded, so
//!   the stragglers reappear as surplus next cycle and are deleted again.
//! - Probe failures are not errors; they mark the IP unhealthy for the cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{OriginConfig, PriorityLevel};
use crate::error::{Error, Result};
use crate::event::FailoverEvent;
use crate::reconciler;
use crate::selector;
use crate::state::{OriginKey, OriginStateStore};
use crate::traits::{DnsBackend, HealthChecker, Notifier};

use super::dispatch_notifications;

/// Worker owning the reconciliation loop for one origin
pub struct OriginWorker {
    origin: OriginConfig,
    key: OriginKey,
    /// Normalized levels, sorted by descending priority; computed once
    levels: Vec<PriorityLevel>,
    backend: Arc<dyn DnsBackend>,
    checker: Arc<dyn HealthChecker>,
    notifiers: Arc<Vec<Arc<dyn Notifier>>>,
    state: OriginStateStore,
    interval: Duration,
    /// Serializes cycles for this origin (loop ticks and one-shot runs)
    cycle_lock: Mutex<()>,
}

impl std::fmt::Debug for OriginWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginWorker")
            .field("origin", &self.origin)
            .field("key", &self.key)
            .field("levels", &self.levels)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl OriginWorker {
    pub(crate) fn new(
        origin: OriginConfig,
        key: OriginKey,
        levels: Vec<PriorityLevel>,
        backend: Arc<dyn DnsBackend>,
        checker: Arc<dyn HealthChecker>,
        notifiers: Arc<Vec<Arc<dyn Notifier>>>,
        state: OriginStateStore,
        interval: Duration,
    ) -> Self {
        Self {
            origin,
            key,
            levels,
            backend,
            checker,
            notifiers,
            state,
            interval,
            cycle_lock: Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &OriginKey {
        &self.key
    }

    /// Run the reconciliation loop until `shutdown` fires.
    ///
    /// An in-flight cycle always finishes before the loop exits, so a
    /// shutdown cannot leave a record replacement half done.
    pub(crate) async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "Starting monitoring for origin: {} ({})",
            self.origin.name, self.origin.record_type
        );

        self.state.register(&self.key).await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(
                        "Stopping monitoring for origin: {} ({})",
                        self.origin.name, self.origin.record_type
                    );
                    return;
                }
                _ = ticker.tick() => {
                    debug!(
                        "Running check cycle for origin: {} ({})",
                        self.origin.name, self.origin.record_type
                    );
                    if let Err(err) = self.run_cycle().await {
                        error!("Check cycle failed for {}: {}", self.key, err);
                    }
                }
            }
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Returns the notification dispatch handle when an event was emitted, so
    /// one-shot mode can wait for deliveries before the process exits.
    pub(crate) async fn run_cycle(&self) -> Result<Option<JoinHandle<()>>> {
        let _guard = self.cycle_lock.lock().await;

        if self.levels.is_empty() {
            warn!("No priority levels configured for {}", self.origin.name);
            return Ok(None);
        }
        let max_priority = self.levels[0].priority;

        let records = self
            .backend
            .list_records(&self.origin.name, self.origin.record_type)
            .await?;
        let current_ips: Vec<String> = records
            .into_iter()
            .filter(|record| !record.content.is_empty())
            .map(|record| record.content)
            .collect();

        let status = self.state.get(&self.key).await.unwrap_or_default();

        let mut current_priority = status.current_priority;
        let mut priority_known = status.initialized;
        if let Some(detected) = selector::detect_current_priority(&self.levels, &current_ips) {
            current_priority = detected;
            priority_known = true;
        }
        // Whether the served priority was established (from state or from the
        // records themselves) rather than seeded below; a change from a
        // seeded priority reads as the first convergence.
        let priority_established = priority_known;
        if !priority_known {
            current_priority = max_priority;
            priority_known = true;
        }

        let health = self.probe_health().await;

        let selection = selector::select_target(
            &self.levels,
            &health,
            Some(current_priority),
            self.origin.return_to_priority,
        );
        let selection = match selection {
            Some(selection) => selection,
            None => {
                warn!("No healthy IPs available for {}", self.origin.name);
                self.state
                    .update(&self.key, current_priority, current_ips, priority_known)
                    .await;
                return Ok(None);
            }
        };

        let selected_ips = reconciler::filter_valid_ips(self.origin.record_type, &selection.ips);
        if selected_ips.is_empty() {
            warn!(
                "No valid IPs available for {} ({})",
                self.origin.name, self.origin.record_type
            );
            self.state
                .update(&self.key, current_priority, current_ips, priority_known)
                .await;
            return Ok(None);
        }

        if reconciler::same_ip_set(&current_ips, &selected_ips) {
            self.state
                .update(&self.key, selection.priority, selected_ips, true)
                .await;
            return Ok(None);
        }

        match self
            .backend
            .replace_records(&self.origin.name, self.origin.record_type, &selected_ips)
            .await
        {
            Ok(()) => {}
            Err(err @ Error::PartialDelete { .. }) => {
                // Creates succeeded; the stragglers show up as surplus next
                // cycle and are deleted again.
                warn!("Stale records left behind for {}: {}", self.origin.name, err);
            }
            Err(err) => return Err(err),
        }

        self.state
            .update(&self.key, selection.priority, selected_ips.clone(), true)
            .await;

        let reason = reconciler::build_change_reason(
            priority_established,
            current_priority,
            selection.priority,
            &current_ips,
            &selected_ips,
        );
        info!(
            "Updated records for {}: {:?} -> {:?} ({})",
            self.key, current_ips, selected_ips, reason
        );

        let event = FailoverEvent {
            origin_name: self.origin.name.clone(),
            zone_name: self.origin.zone_name.clone(),
            record_type: self.origin.record_type,
            old_ips: current_ips,
            new_ips: selected_ips,
            old_priority: current_priority,
            new_priority: selection.priority,
            max_priority,
            reason,
            timestamp: Utc::now(),
            is_priority_ip: selection.priority == max_priority,
            is_failover_ip: selection.priority < max_priority,
            return_to_priority: self.origin.return_to_priority,
        };

        Ok(dispatch_notifications(self.notifiers.clone(), event))
    }

    /// Probe every IP referenced by any level, concurrently.
    ///
    /// IPs that fail family validation for the origin's record type are
    /// marked unhealthy without being probed.
    async fn probe_health(&self) -> HashMap<String, bool> {
        let mut unique: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for level in &self.levels {
            for ip in &level.ips {
                if seen.insert(ip.as_str()) {
                    unique.push(ip.clone());
                }
            }
        }

        let checks: Vec<_> = unique
            .into_iter()
            .map(|ip| {
                let checker = self.checker.clone();
                let record_type = self.origin.record_type;
                async move {
                    let healthy = match reconciler::validate_ip_family(record_type, &ip) {
                        Ok(addr) => match checker.check(addr).await {
                            Ok(()) => true,
                            Err(err) => {
                                debug!("IP {} is unhealthy: {}", ip, err);
                                false
                            }
                        },
                        Err(err) => {
                            warn!("Invalid IP {} for record type {}: {}", ip, record_type, err);
                            false
                        }
                    };
                    (ip, healthy)
                }
            })
            .collect();

        futures::future::join_all(checks).await.into_iter().collect()
    }
}
