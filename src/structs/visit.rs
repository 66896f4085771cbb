use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::visit::{VisitEntry, VisitRecord};
use crate::services::visit_recorder::VisitSummary;

#[derive(Deserialize)]
pub struct StatisticsQuery {
    pub range: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitData {
    pub total_visits: i64,
    pub first_visit: DateTime<Utc>,
    pub is_new_visitor: bool,
    pub is_returning_visitor: bool,
}

impl From<VisitSummary> for VisitData {
    fn from(summary: VisitSummary) -> Self {
        Self {
            total_visits: summary.total_visits,
            first_visit: summary.first_visit,
            is_new_visitor: summary.is_new_visitor,
            is_returning_visitor: summary.is_returning_visitor,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordVisitResponse {
    pub message: &'static str,
    pub visit_data: VisitData,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub unique_visitors: u64,
    pub returning_visitors: u64,
    pub active_visitors: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HourlyBucket {
    pub hour: u32,
    pub visits: u64,
    /// Epoch milliseconds of today's date at `hour`, UTC.
    pub timestamp: i64,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisitStatistics {
    pub total_unique_visitors: u64,
    pub total_visits: u64,
    pub period_stats: PeriodStats,
    pub hourly_distribution: Vec<HourlyBucket>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitHistoryItem {
    pub timestamp: DateTime<Utc>,
    pub user_agent: Option<String>,
}

impl From<VisitEntry> for VisitHistoryItem {
    fn from(entry: VisitEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            user_agent: entry.user_agent,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorDetailResponse {
    pub ip_address: String,
    pub total_visits: i64,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
    pub is_active: bool,
    pub visit_history: Vec<VisitHistoryItem>,
}

impl VisitorDetailResponse {
    pub fn new(record: VisitRecord, is_active: bool) -> Self {
        Self {
            ip_address: record.ip_address,
            total_visits: record.total_visits,
            first_visit: record.first_visit,
            last_visit: record.last_visit,
            is_active,
            visit_history: record.visits.into_iter().map(VisitHistoryItem::from).collect(),
        }
    }
}
