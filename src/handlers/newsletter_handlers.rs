use actix_web::{HttpResponse, web};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{DateTime as BsonDateTime, Document, doc};
use validator::ValidateEmail;

use crate::db::mongodb::{count_field, is_duplicate_key};
use crate::errors::ApiError;
use crate::models::newsletter::{NEWSLETTER_COLLECTION, NewsletterSubscription};
use crate::state::AppState;
use crate::structs::newsletter::{
    DailySignups, GrowthRate, NewsletterRequest, SubscriberStats, SubscriberStatsEnvelope,
};

/// Trimmed, lowercased address, checked after trimming.
fn normalize_email(raw: Option<&str>) -> Result<String, ApiError> {
    let email = match raw.map(str::trim) {
        Some(email) if !email.is_empty() => email.to_lowercase(),
        _ => return Err(ApiError::BadRequest("Email is required.".into())),
    };
    if !email.validate_email() {
        return Err(ApiError::BadRequest("Invalid email address".into()));
    }
    Ok(email)
}

pub async fn newsletter_signup(
    app_state: web::Data<AppState>,
    web::Json(req): web::Json<NewsletterRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = normalize_email(req.email.as_deref())?;

    let db = app_state.database()?;
    db.collection::<NewsletterSubscription>(NEWSLETTER_COLLECTION)
        .insert_one(NewsletterSubscription::new(email))
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::Conflict("Email already subscribed.".into())
            } else {
                app_state.db_error("Error subscribing to newsletter", e)
            }
        })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Subscription successful!"
    })))
}

fn growth_rate(current: u64, previous: u64) -> Option<String> {
    if previous == 0 {
        return None;
    }
    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    Some(format!("{:.2}", change))
}

fn created_since(since: DateTime<Utc>) -> Document {
    doc! { "createdAt": { "$gte": BsonDateTime::from_chrono(since) } }
}

fn daily_pipeline(since: DateTime<Utc>) -> Vec<Document> {
    vec![
        doc! { "$match": created_since(since) },
        doc! { "$group": {
            "_id": { "$dateToString": { "format": "%Y-%m-%d", "date": "$createdAt" } },
            "count": { "$sum": 1 },
        } },
        doc! { "$sort": { "_id": 1 } },
    ]
}

async fn daily_signups(
    subscriptions: &Collection<NewsletterSubscription>,
    since: DateTime<Utc>,
) -> mongodb::error::Result<Vec<DailySignups>> {
    let buckets = subscriptions
        .aggregate(daily_pipeline(since))
        .await?
        .try_collect::<Vec<Document>>()
        .await?;

    Ok(buckets
        .iter()
        .filter_map(|bucket| {
            Some(DailySignups {
                day: bucket.get_str("_id").ok()?.to_string(),
                count: count_field(bucket, "count"),
            })
        })
        .collect())
}

/// Subscriber totals, rolling 7/30 day counts, per-day breakdowns and the
/// month-over-month growth rate
pub async fn get_newsletter_subscribers(
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let db = app_state.database()?;
    let subscriptions = db.collection::<NewsletterSubscription>(NEWSLETTER_COLLECTION);

    let now = Utc::now();
    let week_start = now - TimeDelta::days(7);
    let month_start = now - TimeDelta::days(30);
    let prev_month_start = now - TimeDelta::days(60);

    let (total, weekly, monthly, prev_month, weekly_breakdown, monthly_breakdown) =
        futures_util::try_join!(
            subscriptions.count_documents(doc! {}).into_future(),
            subscriptions.count_documents(created_since(week_start)).into_future(),
            subscriptions.count_documents(created_since(month_start)).into_future(),
            subscriptions
                .count_documents(doc! { "createdAt": {
                    "$gte": BsonDateTime::from_chrono(prev_month_start),
                    "$lt": BsonDateTime::from_chrono(month_start),
                } })
                .into_future(),
            daily_signups(&subscriptions, week_start),
            daily_signups(&subscriptions, month_start),
        )
        .map_err(|e| app_state.db_error("Error fetching subscriber data", e))?;

    Ok(HttpResponse::Ok().json(SubscriberStatsEnvelope {
        success: true,
        data: SubscriberStats {
            total_subscribers: total,
            weekly_subscribers: weekly,
            monthly_subscribers: monthly,
            prev_month_subscribers: prev_month,
            weekly_breakdown,
            monthly_breakdown,
            growth_rate: GrowthRate {
                monthly: growth_rate(monthly, prev_month),
            },
        },
    }))
}
