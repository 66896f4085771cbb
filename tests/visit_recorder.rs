use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::Barrier;

use autograph::models::visit::VisitRecord;
use autograph::services::visit_recorder::{RecordOutcome, VisitRecorder};
use autograph::store::{
    GlobalTotals, HourlyCount, MemoryVisitStore, PeriodCounts, StoreResult, VisitStore,
    VisitWrite,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 7, 30, 0).unwrap()
}

fn recorder_over(store: Arc<dyn VisitStore>) -> Arc<VisitRecorder> {
    Arc::new(VisitRecorder::new(store, TimeDelta::seconds(60), None))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_visits_count_once_per_window() {
    const CALLERS: usize = 32;

    let store = Arc::new(MemoryVisitStore::new());
    let recorder = recorder_over(store.clone());
    let barrier = Arc::new(Barrier::new(CALLERS));

    let mut tasks = Vec::with_capacity(CALLERS);
    for i in 0..CALLERS {
        let recorder = recorder.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            let at = t0() + TimeDelta::milliseconds(i as i64);
            recorder.record_visit("1.2.3.4", Some("burst"), at).await
        }));
    }

    let mut recorded = 0;
    let mut throttled = 0;
    for task in tasks {
        match task.await.unwrap().unwrap() {
            RecordOutcome::Recorded(_) => recorded += 1,
            RecordOutcome::TooSoon { .. } => throttled += 1,
        }
    }

    assert_eq!(recorded, 1);
    assert_eq!(throttled, CALLERS - 1);
    let record = store.find_by_ip("1.2.3.4").await.unwrap().unwrap();
    assert_eq!(record.total_visits, 1);
    assert_eq!(record.visits.len(), 1);
}

#[tokio::test]
async fn counters_follow_accepted_visits_only() {
    let store = Arc::new(MemoryVisitStore::new());
    let recorder = recorder_over(store.clone());

    let mut previous_last = None;
    for k in 1..=8_i64 {
        let at = t0() + TimeDelta::seconds(61 * (k - 1));
        let outcome = recorder.record_visit("5.6.7.8", None, at).await.unwrap();
        let RecordOutcome::Recorded(summary) = outcome else {
            panic!("visit {} should have been accepted", k);
        };
        assert_eq!(summary.total_visits, k);
        assert_eq!(summary.first_visit, t0());
        assert_eq!(summary.is_returning_visitor, k > 1);

        // An immediate repeat never moves the counters
        let repeat = recorder
            .record_visit("5.6.7.8", None, at + TimeDelta::seconds(10))
            .await
            .unwrap();
        assert!(matches!(repeat, RecordOutcome::TooSoon { .. }));

        let record = store.find_by_ip("5.6.7.8").await.unwrap().unwrap();
        assert_eq!(record.total_visits, k);
        assert_eq!(record.visits.len() as i64, k);
        assert_eq!(record.first_visit, t0());
        if let Some(last) = previous_last {
            assert!(record.last_visit >= last);
        }
        previous_last = Some(record.last_visit);
    }
}

#[tokio::test]
async fn sixty_one_seconds_later_is_returning() {
    let recorder = recorder_over(Arc::new(MemoryVisitStore::new()));
    recorder.record_visit("1.2.3.4", None, t0()).await.unwrap();

    match recorder
        .record_visit("1.2.3.4", None, t0() + TimeDelta::seconds(61))
        .await
        .unwrap()
    {
        RecordOutcome::Recorded(summary) => {
            assert_eq!(summary.total_visits, 2);
            assert!(summary.is_returning_visitor);
            assert!(!summary.is_new_visitor);
        }
        other => panic!("expected second visit to be recorded, got {:?}", other),
    }
}

/// Hides the record from the first lookup, as if another request wrote it
/// between this request's read and its conditional write.
struct StaleFirstRead {
    inner: MemoryVisitStore,
    served_stale: AtomicBool,
}

#[async_trait]
impl VisitStore for StaleFirstRead {
    async fn init(&self) -> StoreResult<()> {
        self.inner.init().await
    }

    async fn find_by_ip(&self, ip_address: &str) -> StoreResult<Option<VisitRecord>> {
        if !self.served_stale.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_ip(ip_address).await
    }

    async fn record_if_due(&self, write: VisitWrite<'_>) -> StoreResult<Option<VisitRecord>> {
        self.inner.record_if_due(write).await
    }

    async fn global_totals(&self) -> StoreResult<GlobalTotals> {
        self.inner.global_totals().await
    }

    async fn period_counts(&self, since: DateTime<Utc>) -> StoreResult<PeriodCounts> {
        self.inner.period_counts(since).await
    }

    async fn hourly_distribution(&self, since: DateTime<Utc>) -> StoreResult<Vec<HourlyCount>> {
        self.inner.hourly_distribution(since).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn losing_writer_is_told_too_soon() {
    let inner = MemoryVisitStore::new();
    let winner_time = t0();
    inner.insert(VisitRecord::first_sight("9.9.9.9".into(), None, winner_time));

    let store = Arc::new(StaleFirstRead {
        inner,
        served_stale: AtomicBool::new(false),
    });
    let recorder = recorder_over(store.clone());

    let outcome = recorder
        .record_visit("9.9.9.9", None, winner_time + TimeDelta::seconds(1))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RecordOutcome::TooSoon {
            next_valid_visit_time: Some(winner_time + TimeDelta::seconds(60)),
        }
    );

    let record = store.find_by_ip("9.9.9.9").await.unwrap().unwrap();
    assert_eq!(record.total_visits, 1);
}

#[tokio::test]
async fn global_totals_sum_every_record() {
    let store = Arc::new(MemoryVisitStore::new());
    let recorder = recorder_over(store.clone());

    for (i, ip) in ["a", "b", "c"].iter().enumerate() {
        for visit in 0..=i as i64 {
            recorder
                .record_visit(ip, None, t0() + TimeDelta::seconds(90 * visit))
                .await
                .unwrap();
        }
    }

    assert_eq!(
        store.global_totals().await.unwrap(),
        GlobalTotals {
            unique_visitors: 3,
            total_visits: 6,
        }
    );
}
