use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::utils::lenient;
use crate::utils::slug::slugify;

pub const TOP_TREND: &str = "TopTrend";
const LIFESTYLE: &str = "LifeStyle";

/// How many `TopTrend` posts a section allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopTrendRule {
    Unrestricted,
    /// One across the whole section.
    OnePerSection,
    /// One per `postType`, and one per `subCategory` inside `LifeStyle`.
    OnePerPostType,
}

/// A collection of categorized posts served under its own set of routes.
pub trait PostSection: 'static {
    const COLLECTION: &'static str;
    /// Used in response messages, e.g. "Fashion post not found".
    const LABEL: &'static str;
    const DUPLICATE_TITLE: &'static str = "Post with same title exists";
    const IMAGE_REQUIRED: &'static str = "Image1 is required";
    const REQUIRES_AUTHOR: bool = true;
    /// Stamped on every created post, overriding the request.
    const POST_TYPE: Option<&'static str> = None;
    const TOP_TREND: TopTrendRule = TopTrendRule::Unrestricted;
    /// Page size applied to listings when the client sends no `limit`.
    const PAGE_SIZE: Option<u64> = None;
}

pub struct Fashion;
pub struct Family;
pub struct Latest;
pub struct DigitalEdition;
pub struct Video;

impl PostSection for Fashion {
    const COLLECTION: &'static str = "fashions";
    const LABEL: &'static str = "Fashion post";
    const TOP_TREND: TopTrendRule = TopTrendRule::OnePerPostType;
    const PAGE_SIZE: Option<u64> = Some(9);
}

impl PostSection for Family {
    const COLLECTION: &'static str = "families";
    const LABEL: &'static str = "Family post";
    const POST_TYPE: Option<&'static str> = Some("Family");
    const TOP_TREND: TopTrendRule = TopTrendRule::OnePerSection;
}

impl PostSection for Latest {
    const COLLECTION: &'static str = "latests";
    const LABEL: &'static str = "Latest post";
    const TOP_TREND: TopTrendRule = TopTrendRule::OnePerSection;
}

impl PostSection for DigitalEdition {
    const COLLECTION: &'static str = "digitaleditions";
    const LABEL: &'static str = "Digital edition";
    const DUPLICATE_TITLE: &'static str = "Digital edition with the same title exists";
    const IMAGE_REQUIRED: &'static str = "Cover image is required";
}

impl PostSection for Video {
    const COLLECTION: &'static str = "videos";
    const LABEL: &'static str = "Video post";
    const DUPLICATE_TITLE: &'static str = "Video with same title exists";
    const IMAGE_REQUIRED: &'static str = "Image cover is required";
    const REQUIRES_AUTHOR: bool = false;
    const PAGE_SIZE: Option<u64> = Some(9);
}

/// Every section collection, for index setup.
pub const SECTION_COLLECTIONS: [&str; 5] = [
    Fashion::COLLECTION,
    Family::COLLECTION,
    Latest::COLLECTION,
    DigitalEdition::COLLECTION,
    Video::COLLECTION,
];

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_content: Option<String>,
    // Video documents name the cover `image`
    #[serde(alias = "image", skip_serializing_if = "Option::is_none")]
    pub image1: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub image2: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_clip: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            slug: slugify(&title),
            title,
            content: None,
            category: None,
            sub_category: None,
            post_type: None,
            author_id: None,
            video_tag: None,
            video_content: None,
            image1: None,
            image2: Vec::new(),
            video_clip: None,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The query that finds an existing `TopTrend` post conflicting with a new
/// one, with the message to reject it. `None` when nothing can conflict.
pub fn top_trend_conflict(
    rule: TopTrendRule,
    category: Option<&str>,
    post_type: Option<&str>,
    sub_category: Option<&str>,
) -> Option<(Document, String)> {
    if category != Some(TOP_TREND) {
        return None;
    }
    match rule {
        TopTrendRule::Unrestricted => None,
        TopTrendRule::OnePerSection => Some((
            doc! { "category": TOP_TREND },
            "Only one 'topTrend' post is allowed".to_string(),
        )),
        TopTrendRule::OnePerPostType => match (post_type, sub_category) {
            (Some(LIFESTYLE), Some(sub)) => Some((
                doc! { "postType": LIFESTYLE, "category": TOP_TREND, "subCategory": sub },
                format!(
                    "Only one TopTrend post is allowed for LifeStyle subcategory: {}",
                    sub
                ),
            )),
            _ => Some((
                doc! { "postType": post_type, "category": TOP_TREND },
                format!(
                    "Only one TopTrend post is allowed for postType: {}",
                    post_type.unwrap_or_default()
                ),
            )),
        },
    }
}
