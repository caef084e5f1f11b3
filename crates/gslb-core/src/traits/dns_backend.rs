//! DNS backend trait
//!
//! Abstract interface to one DNS zone at a managed provider. Implementations
//! supply the four per-record primitives plus the zone identity; the
//! multi-step record replacement is a provided method built on top of them,
//! so every backend (and every test double) shares the same convergence
//! semantics.
//!
//! # Thread safety
//!
//! Implementations must be thread-safe and usable across async tasks. Each
//! origin holds its own backend instance because the provider `proxied` flag
//! is per origin.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::RecordType;
use crate::error::{Error, Result};

/// TTL carried on every record mutation, in seconds
pub const RECORD_TTL_SECS: u32 = 60;

/// Pause between consecutive record deletions, to stay inside provider rate
/// limits. The exact value is a knob, not a correctness property.
const DELETE_PAUSE: Duration = Duration::from_millis(500);

/// One DNS record as seen at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned record identifier, needed only to delete
    pub id: String,
    /// Record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Record content (the IP literal)
    pub content: String,
}

/// Construction parameters handed to a backend factory
#[derive(Debug, Clone)]
pub struct BackendParams {
    /// Provider API token
    pub api_token: String,
    /// Zone to operate on
    pub zone_id: String,
    /// Provider proxy flag for this origin's records
    pub proxied: bool,
    /// TTL for created and updated records, in seconds
    pub ttl: u32,
}

/// Trait for DNS backend implementations
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// List the records for `name` of the given type within the zone
    async fn list_records(&self, name: &str, record_type: RecordType) -> Result<Vec<DnsRecord>>;

    /// Create a record with the given content
    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord>;

    /// Overwrite an existing record's content
    async fn update_record(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<DnsRecord>;

    /// Delete a record by id
    async fn delete_record(&self, record_id: &str) -> Result<()>;

    /// Identifier of the zone this backend operates on
    fn zone_id(&self) -> &str;

    /// Converge the record set for `name` to exactly `desired`.
    ///
    /// Missing records are created before any surplus record is deleted, so
    /// at least one usable record stays addressable under the name at every
    /// step. If a create fails, records created by this call are deleted
    /// best-effort and the create error is returned. Deletions continue past
    /// individual failures; the survivors are reported as a
    /// [`Error::PartialDelete`] aggregate and swept up by the next cycle.
    ///
    /// Calling this again with the same `desired` issues no mutations.
    async fn replace_records(
        &self,
        name: &str,
        record_type: RecordType,
        desired: &[String],
    ) -> Result<()> {
        if desired.is_empty() {
            warn!(
                "replace_records called with empty contents for {} ({})",
                name, record_type
            );
            return Ok(());
        }

        let records = self.list_records(name, record_type).await?;

        let desired_set: std::collections::HashSet<&str> =
            desired.iter().map(String::as_str).collect();

        let surplus: Vec<&DnsRecord> = records
            .iter()
            .filter(|record| !desired_set.contains(record.content.as_str()))
            .collect();

        let mut missing: Vec<&str> = Vec::new();
        for content in desired {
            let already_present = records.iter().any(|r| r.content == *content);
            if !already_present && !missing.contains(&content.as_str()) {
                missing.push(content);
            }
        }

        if surplus.is_empty() && missing.is_empty() {
            return Ok(());
        }

        let mut created: Vec<DnsRecord> = Vec::with_capacity(missing.len());
        for content in missing {
            match self.create_record(name, record_type, content).await {
                Ok(record) => created.push(record),
                Err(err) => {
                    for record in &created {
                        if let Err(rollback_err) = self.delete_record(&record.id).await {
                            warn!(
                                "failed to roll back created record {} for {} ({}): {}",
                                record.id, name, record_type, rollback_err
                            );
                        }
                        tokio::time::sleep(DELETE_PAUSE).await;
                    }
                    return Err(err);
                }
            }
        }

        let mut failures: Vec<String> = Vec::new();
        for record in surplus {
            if let Err(err) = self.delete_record(&record.id).await {
                failures.push(format!("failed to delete record {}: {}", record.id, err));
            }
            tokio::time::sleep(DELETE_PAUSE).await;
        }

        if !failures.is_empty() {
            return Err(Error::PartialDelete {
                failed: failures.len(),
                details: failures.join("; "),
            });
        }

        Ok(())
    }
}

/// Helper trait for constructing DNS backends from configuration
pub trait DnsBackendFactory: Send + Sync {
    /// Create a backend instance bound to one zone
    fn create(&self, params: &BackendParams) -> Result<std::sync::Arc<dyn DnsBackend>>;
}
