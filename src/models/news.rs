use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::utils::slug::slugify;

pub const NEWS_COLLECTION: &str = "news";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewsPost {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub image: String, // Stored upload path, e.g. /uploads/1700000000-cover.jpg
    pub url: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl NewsPost {
    pub fn new(
        title: String,
        image: String,
        url: String,
        date: DateTime<Utc>,
        post_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            slug: slugify(&title),
            title,
            image,
            url,
            date,
            post_type,
            created_at: now,
            updated_at: now,
        }
    }
}
