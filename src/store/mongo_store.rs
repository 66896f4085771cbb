use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::{debug, info};
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document, doc};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};

use super::{GlobalTotals, HourlyCount, PeriodCounts, StoreResult, VisitStore, VisitWrite};
use crate::db::mongodb::{count_field, is_duplicate_key};
use crate::models::visit::VisitRecord;

pub const VISITS_COLLECTION: &str = "visits";

pub struct MongoVisitStore {
    db: Database,
    visits: Collection<VisitRecord>,
}

impl MongoVisitStore {
    pub fn new(db: Database) -> Self {
        let visits = db.collection::<VisitRecord>(VISITS_COLLECTION);
        Self { db, visits }
    }

    fn due_filter(write: &VisitWrite<'_>) -> Document {
        doc! {
            "ipAddress": write.ip_address,
            "$or": [
                { "lastVisit": { "$exists": false } },
                { "lastVisit": { "$lte": BsonDateTime::from_chrono(write.cutoff) } },
            ],
        }
    }

    fn visit_update(write: &VisitWrite<'_>) -> Document {
        let now = BsonDateTime::from_chrono(write.now);
        let entry = doc! { "timestamp": now, "userAgent": write.user_agent };
        let push = match write.history_limit {
            Some(limit) => doc! {
                "visits": { "$each": [entry], "$slice": -(limit as i64) }
            },
            None => doc! { "visits": entry },
        };

        doc! {
            "$inc": { "totalVisits": 1_i64 },
            "$set": { "lastVisit": now, "userAgent": write.user_agent },
            "$push": push,
            "$setOnInsert": { "firstVisit": now, "isUnique": true },
        }
    }

    async fn conditional_update(
        &self,
        write: &VisitWrite<'_>,
        upsert: bool,
    ) -> mongodb::error::Result<Option<VisitRecord>> {
        self.visits
            .find_one_and_update(Self::due_filter(write), Self::visit_update(write))
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .await
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> StoreResult<Vec<Document>> {
        let docs = self
            .visits
            .aggregate(pipeline)
            .await?
            .try_collect::<Vec<Document>>()
            .await?;
        Ok(docs)
    }
}

/// `$facet` output is `{ key: [ { count: n } ] }`, with an empty array when
/// nothing matched.
fn facet_count(doc: &Document, key: &str) -> u64 {
    doc.get_array(key)
        .ok()
        .and_then(|items| items.first())
        .and_then(Bson::as_document)
        .map(|inner| count_field(inner, "count"))
        .unwrap_or(0)
}

#[async_trait]
impl VisitStore for MongoVisitStore {
    async fn init(&self) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "ipAddress": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.visits.create_index(index).await?;
        info!("Ensured unique index on {}.ipAddress", VISITS_COLLECTION);
        Ok(())
    }

    async fn find_by_ip(&self, ip_address: &str) -> StoreResult<Option<VisitRecord>> {
        let record = self
            .visits
            .find_one(doc! { "ipAddress": ip_address })
            .await?;
        Ok(record)
    }

    async fn record_if_due(&self, write: VisitWrite<'_>) -> StoreResult<Option<VisitRecord>> {
        match self.conditional_update(&write, true).await {
            Ok(record) => Ok(record),
            // Either a concurrent writer inserted this IP first, or the record
            // exists but is still cooling down. Only an update may apply now.
            Err(err) if is_duplicate_key(&err) => {
                debug!(
                    "Upsert for {} hit duplicate key, retrying as update",
                    write.ip_address
                );
                Ok(self.conditional_update(&write, false).await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn global_totals(&self) -> StoreResult<GlobalTotals> {
        let docs = self
            .aggregate(vec![doc! {
                "$group": {
                    "_id": Bson::Null,
                    "totalUniqueVisitors": { "$sum": 1 },
                    "totalVisits": { "$sum": "$totalVisits" },
                }
            }])
            .await?;

        Ok(docs
            .first()
            .map(|totals| GlobalTotals {
                unique_visitors: count_field(totals, "totalUniqueVisitors"),
                total_visits: count_field(totals, "totalVisits"),
            })
            .unwrap_or_default())
    }

    async fn period_counts(&self, since: DateTime<Utc>) -> StoreResult<PeriodCounts> {
        let since = BsonDateTime::from_chrono(since);
        let docs = self
            .aggregate(vec![doc! {
                "$facet": {
                    "uniqueVisitors": [
                        { "$match": { "firstVisit": { "$gte": since } } },
                        { "$count": "count" },
                    ],
                    "returningVisitors": [
                        { "$match": {
                            "totalVisits": { "$gt": 1 },
                            "lastVisit": { "$gte": since },
                        } },
                        { "$count": "count" },
                    ],
                    "activeVisitors": [
                        { "$match": { "lastVisit": { "$gte": since } } },
                        { "$count": "count" },
                    ],
                }
            }])
            .await?;

        Ok(docs
            .first()
            .map(|facets| PeriodCounts {
                unique_visitors: facet_count(facets, "uniqueVisitors"),
                returning_visitors: facet_count(facets, "returningVisitors"),
                active_visitors: facet_count(facets, "activeVisitors"),
            })
            .unwrap_or_default())
    }

    async fn hourly_distribution(&self, since: DateTime<Utc>) -> StoreResult<Vec<HourlyCount>> {
        let docs = self
            .aggregate(vec![
                doc! { "$match": { "lastVisit": { "$gte": BsonDateTime::from_chrono(since) } } },
                doc! { "$group": { "_id": { "$hour": "$lastVisit" }, "visits": { "$sum": 1 } } },
                doc! { "$sort": { "_id": 1 } },
            ])
            .await?;

        Ok(docs
            .iter()
            .filter_map(|bucket| {
                let hour = match bucket.get("_id") {
                    Some(Bson::Int32(h)) => u32::try_from(*h).ok()?,
                    Some(Bson::Int64(h)) => u32::try_from(*h).ok()?,
                    _ => return None,
                };
                Some(HourlyCount {
                    hour,
                    visits: count_field(bucket, "visits"),
                })
            })
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
