use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::news::NewsPost;
use crate::utils::lenient;

#[derive(Deserialize, Validate)]
pub struct CreateNewsRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
    #[serde(deserialize_with = "lenient::date")]
    pub date: DateTime<Utc>,
    #[serde(rename = "postType")]
    pub post_type: Option<String>,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateNewsRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Image cannot be empty"))]
    pub image: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_date")]
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "postType")]
    pub post_type: Option<String>,
}

impl UpdateNewsRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.image.is_none()
            && self.url.is_none()
            && self.date.is_none()
            && self.post_type.is_none()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub id: String,
    pub title: String,
    pub image: String,
    pub url: String,
    pub date: DateTime<Utc>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NewsPost> for NewsResponse {
    fn from(post: NewsPost) -> Self {
        Self {
            id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: post.title,
            image: post.image,
            url: post.url,
            date: post.date,
            slug: post.slug,
            post_type: post.post_type,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsListResponse {
    pub posts: Vec<NewsResponse>,
    pub total_posts: u64,
    pub last_month_posts: u64,
}

#[derive(Serialize)]
pub struct NewsEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: NewsResponse,
}
