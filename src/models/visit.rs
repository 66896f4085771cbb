use chrono::{DateTime, TimeDelta, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// One accepted visit inside a visitor's history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitEntry {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub user_agent: Option<String>,
}

/// Per-IP aggregate document stored in the `visits` collection.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub ip_address: String,
    pub total_visits: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub first_visit: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub last_visit: DateTime<Utc>,
    #[serde(default)]
    pub is_unique: bool,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub visits: Vec<VisitEntry>,
}

impl VisitRecord {
    /// Builds the document written on the insert path of the conditional upsert.
    pub fn first_sight(
        ip_address: String,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            ip_address,
            total_visits: 1,
            first_visit: now,
            last_visit: now,
            is_unique: true,
            user_agent: user_agent.clone(),
            visits: vec![VisitEntry {
                timestamp: now,
                user_agent,
            }],
        }
    }

    /// Applies one accepted visit to an existing record.
    pub fn register_visit(
        &mut self,
        user_agent: Option<String>,
        now: DateTime<Utc>,
        history_limit: Option<usize>,
    ) {
        self.total_visits += 1;
        self.last_visit = now;
        self.user_agent = user_agent.clone();
        self.visits.push(VisitEntry {
            timestamp: now,
            user_agent,
        });
        if let Some(limit) = history_limit {
            let excess = self.visits.len().saturating_sub(limit);
            self.visits.drain(..excess);
        }
    }

    /// Whether a new visit at `now` falls inside the cooldown of the last one.
    pub fn is_within_cooldown(&self, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        now - self.last_visit < cooldown
    }

    pub fn next_valid_visit_time(&self, cooldown: TimeDelta) -> DateTime<Utc> {
        self.last_visit + cooldown
    }

    pub fn is_returning(&self) -> bool {
        self.total_visits > 1
    }

    /// A visitor counts as active while their last visit is inside `window`.
    pub fn is_active(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now - self.last_visit <= window
    }
}
