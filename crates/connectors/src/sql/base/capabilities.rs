//! Process-wide memo of what each datasource can do.
//!
//! Capabilities depend on the database, not on a query, so they are worked
//! out once per datasource. Lookups take a read lock; the first resolution
//! (which may run a probe query) happens under a single async lock and
//! re-checks the memo after acquiring it.

use crate::sql::base::{adapter::SqlAdapter, error::DbError, probe::CapabilityProbe};
use lazy_static::lazy_static;
use planner::query::capabilities::DialectCapabilities;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};
use tokio::sync::Mutex;
use tracing::info;

lazy_static! {
    static ref CAPABILITIES: CapabilityCache = CapabilityCache::default();
}

#[derive(Debug, Default)]
pub struct CapabilityCache {
    resolved: RwLock<HashMap<String, DialectCapabilities>>,
    probe_lock: Mutex<()>,
}

impl CapabilityCache {
    pub fn global() -> &'static CapabilityCache {
        &CAPABILITIES
    }

    /// Capabilities already resolved for `datasource`.
    pub fn get(&self, datasource: &str) -> Option<DialectCapabilities> {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(datasource)
            .cloned()
    }

    /// Returns the capabilities of `datasource`, resolving them through
    /// `adapter` (and `probe`, if given) the first time.
    pub async fn resolve(
        &self,
        datasource: &str,
        adapter: &(dyn SqlAdapter + Send + Sync),
        probe: Option<&(dyn CapabilityProbe + Send + Sync)>,
    ) -> Result<DialectCapabilities, DbError> {
        if let Some(caps) = self.get(datasource) {
            return Ok(caps);
        }

        let _guard = self.probe_lock.lock().await;
        if let Some(caps) = self.get(datasource) {
            return Ok(caps);
        }

        let mut caps = DialectCapabilities::for_backend(&adapter.kind())?;
        if let Some(probe) = probe {
            caps = probe.detect(adapter, caps).await?;
        }
        info!("Resolved capabilities for {}: {:?}", datasource, caps);

        self.resolved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(datasource.to_string(), caps.clone());
        Ok(caps)
    }
}
