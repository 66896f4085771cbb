use chrono::{DateTime, TimeDelta, Utc};

use crate::store::{HourlyCount, StoreResult, VisitStore};
use crate::structs::visit::{HourlyBucket, PeriodStats, VisitStatistics};

/// Rolling window used to scope period statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsRange {
    #[default]
    Day,
    Week,
    Month,
}

impl StatsRange {
    /// Unrecognised or missing values fall back to the last 24 hours.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("week") => StatsRange::Week,
            Some("month") => StatsRange::Month,
            _ => StatsRange::Day,
        }
    }

    pub fn span(&self) -> TimeDelta {
        match self {
            StatsRange::Day => TimeDelta::days(1),
            StatsRange::Week => TimeDelta::days(7),
            StatsRange::Month => TimeDelta::days(30),
        }
    }

    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.span()
    }
}

/// Runs the three read-only aggregations concurrently and assembles the
/// statistics payload.
pub async fn collect_statistics(
    store: &dyn VisitStore,
    range: StatsRange,
    now: DateTime<Utc>,
) -> StoreResult<VisitStatistics> {
    let since = range.start(now);
    let (totals, period, hourly) = futures_util::try_join!(
        store.global_totals(),
        store.period_counts(since),
        store.hourly_distribution(since),
    )?;

    Ok(VisitStatistics {
        total_unique_visitors: totals.unique_visitors,
        total_visits: totals.total_visits,
        period_stats: PeriodStats {
            unique_visitors: period.unique_visitors,
            returning_visitors: period.returning_visitors,
            active_visitors: period.active_visitors,
        },
        hourly_distribution: hourly
            .into_iter()
            .filter_map(|bucket| hourly_bucket(bucket, now))
            .collect(),
    })
}

/// Pins an hour-of-day bucket to today's date so clients can plot it directly.
fn hourly_bucket(count: HourlyCount, now: DateTime<Utc>) -> Option<HourlyBucket> {
    let timestamp = now
        .date_naive()
        .and_hms_opt(count.hour, 0, 0)?
        .and_utc()
        .timestamp_millis();
    Some(HourlyBucket {
        hour: count.hour,
        visits: count.visits,
        timestamp,
    })
}
