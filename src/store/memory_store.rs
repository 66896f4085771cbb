use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{GlobalTotals, HourlyCount, PeriodCounts, StoreResult, VisitStore, VisitWrite};
use crate::models::visit::VisitRecord;

/// Process-local visit store. Each IP lives in its own map shard entry, so the
/// conditional upsert runs under that entry's lock and is atomic per IP.
#[derive(Default)]
pub struct MemoryVisitStore {
    records: DashMap<String, VisitRecord>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, bypassing cooldown checks.
    pub fn insert(&self, record: VisitRecord) {
        self.records.insert(record.ip_address.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn init(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_by_ip(&self, ip_address: &str) -> StoreResult<Option<VisitRecord>> {
        Ok(self.records.get(ip_address).map(|r| r.value().clone()))
    }

    async fn record_if_due(&self, write: VisitWrite<'_>) -> StoreResult<Option<VisitRecord>> {
        let user_agent = write.user_agent.map(String::from);
        match self.records.entry(write.ip_address.to_string()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.last_visit > write.cutoff {
                    return Ok(None);
                }
                record.register_visit(user_agent, write.now, write.history_limit);
                Ok(Some(record.clone()))
            }
            Entry::Vacant(vacant) => {
                let record =
                    VisitRecord::first_sight(write.ip_address.to_string(), user_agent, write.now);
                vacant.insert(record.clone());
                Ok(Some(record))
            }
        }
    }

    async fn global_totals(&self) -> StoreResult<GlobalTotals> {
        let mut totals = GlobalTotals::default();
        for record in self.records.iter() {
            totals.unique_visitors += 1;
            totals.total_visits += record.total_visits.max(0) as u64;
        }
        Ok(totals)
    }

    async fn period_counts(&self, since: DateTime<Utc>) -> StoreResult<PeriodCounts> {
        let mut counts = PeriodCounts::default();
        for record in self.records.iter() {
            if record.first_visit >= since {
                counts.unique_visitors += 1;
            }
            if record.last_visit >= since {
                counts.active_visitors += 1;
                if record.is_returning() {
                    counts.returning_visitors += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn hourly_distribution(&self, since: DateTime<Utc>) -> StoreResult<Vec<HourlyCount>> {
        let mut buckets: BTreeMap<u32, u64> = BTreeMap::new();
        for record in self.records.iter() {
            if record.last_visit >= since {
                *buckets.entry(record.last_visit.hour()).or_default() += 1;
            }
        }
        Ok(buckets
            .into_iter()
            .map(|(hour, visits)| HourlyCount { hour, visits })
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
