use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

use crate::models::visit::VisitRecord;
use crate::store::{StoreResult, VisitStore, VisitWrite};

/// What the caller learns about an accepted visit.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitSummary {
    pub total_visits: i64,
    pub first_visit: DateTime<Utc>,
    pub is_new_visitor: bool,
    pub is_returning_visitor: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(VisitSummary),
    /// The IP was seen inside the cooldown. The retry hint is absent only if
    /// the record vanished between the rejected write and the follow-up read.
    TooSoon {
        next_valid_visit_time: Option<DateTime<Utc>>,
    },
}

pub struct VisitRecorder {
    store: Arc<dyn VisitStore>,
    cooldown: TimeDelta,
    history_limit: Option<usize>,
}

impl VisitRecorder {
    pub fn new(
        store: Arc<dyn VisitStore>,
        cooldown: TimeDelta,
        history_limit: Option<usize>,
    ) -> Self {
        Self {
            store,
            cooldown,
            history_limit,
        }
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Counts one visit from `ip_address` at `now`, at most once per cooldown.
    ///
    /// The initial lookup only short-circuits obvious repeats. Correctness under
    /// concurrent requests from the same IP comes from the store's conditional
    /// upsert: whichever writer loses sees no match and is reported as
    /// [`RecordOutcome::TooSoon`].
    pub async fn record_visit(
        &self,
        ip_address: &str,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<RecordOutcome> {
        if let Some(existing) = self.store.find_by_ip(ip_address).await? {
            if existing.is_within_cooldown(now, self.cooldown) {
                debug!("Visit from {} rejected, last seen {}", ip_address, existing.last_visit);
                return Ok(self.too_soon(&existing));
            }
        }

        let write = VisitWrite {
            ip_address,
            user_agent,
            now,
            cutoff: now - self.cooldown,
            history_limit: self.history_limit,
        };

        match self.store.record_if_due(write).await? {
            Some(record) => Ok(RecordOutcome::Recorded(VisitSummary {
                total_visits: record.total_visits,
                first_visit: record.first_visit,
                is_new_visitor: record.total_visits == 1,
                is_returning_visitor: record.is_returning(),
            })),
            None => {
                debug!("Concurrent visit from {} won the write", ip_address);
                let winner = self.store.find_by_ip(ip_address).await?;
                Ok(match winner {
                    Some(record) => self.too_soon(&record),
                    None => RecordOutcome::TooSoon {
                        next_valid_visit_time: None,
                    },
                })
            }
        }
    }

    fn too_soon(&self, record: &VisitRecord) -> RecordOutcome {
        RecordOutcome::TooSoon {
            next_valid_visit_time: Some(record.next_valid_visit_time(self.cooldown)),
        }
    }
}
