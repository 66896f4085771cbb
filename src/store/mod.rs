pub mod memory_store;
pub mod mongo_store;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::visit::VisitRecord;

pub use memory_store::MemoryVisitStore;
pub use mongo_store::MongoVisitStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("store operation exceeded its {0:?} deadline")]
    Timeout(Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single accepted-visit write, applied only when the record is absent or
/// its `lastVisit` is at or before `cutoff`.
#[derive(Debug, Clone)]
pub struct VisitWrite<'a> {
    pub ip_address: &'a str,
    pub user_agent: Option<&'a str>,
    pub now: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub history_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalTotals {
    pub unique_visitors: u64,
    pub total_visits: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodCounts {
    pub unique_visitors: u64,
    pub returning_visitors: u64,
    pub active_visitors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: u32,
    pub visits: u64,
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Create indexes or other backend setup. Safe to call repeatedly.
    async fn init(&self) -> StoreResult<()>;

    async fn find_by_ip(&self, ip_address: &str) -> StoreResult<Option<VisitRecord>>;

    /// Atomic conditional upsert. Returns the updated record, or `None` when
    /// an existing record's `lastVisit` is still after `write.cutoff`.
    async fn record_if_due(&self, write: VisitWrite<'_>) -> StoreResult<Option<VisitRecord>>;

    async fn global_totals(&self) -> StoreResult<GlobalTotals>;

    /// Counts scoped to records touched at or after `since`.
    async fn period_counts(&self, since: DateTime<Utc>) -> StoreResult<PeriodCounts>;

    /// Records with `lastVisit >= since`, grouped by UTC hour of `lastVisit`,
    /// ascending. Hours without records are omitted.
    async fn hourly_distribution(&self, since: DateTime<Utc>) -> StoreResult<Vec<HourlyCount>>;

    /// Round trip to the backend, used by the health check.
    async fn ping(&self) -> StoreResult<()>;
}
