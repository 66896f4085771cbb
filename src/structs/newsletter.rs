use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NewsletterRequest {
    pub email: Option<String>,
}

/// Signups on one calendar day (UTC), keyed `YYYY-MM-DD`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DailySignups {
    #[serde(rename = "_id")]
    pub day: String,
    pub count: u64,
}

#[derive(Serialize, Debug)]
pub struct GrowthRate {
    /// Percent change against the previous 30 days, two decimals. `None`
    /// when the previous period had no signups.
    pub monthly: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStats {
    pub total_subscribers: u64,
    pub weekly_subscribers: u64,
    pub monthly_subscribers: u64,
    pub prev_month_subscribers: u64,
    pub weekly_breakdown: Vec<DailySignups>,
    pub monthly_breakdown: Vec<DailySignups>,
    pub growth_rate: GrowthRate,
}

#[derive(Serialize)]
pub struct SubscriberStatsEnvelope {
    pub success: bool,
    pub data: SubscriberStats,
}
