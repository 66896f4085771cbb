use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::author::Author;
use crate::models::post::Post;
use crate::utils::lenient;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub content: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub post_type: Option<String>,
    pub author_id: Option<String>,
    pub video_tag: Option<String>,
    pub video_content: Option<String>,
    /// Stored upload path of the cover image
    #[serde(alias = "image")]
    pub image1: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub image2: Vec<String>,
    pub video_clip: Option<String>,
}

#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub post_type: Option<String>,
    pub author_id: Option<String>,
    pub video_tag: Option<String>,
    pub video_content: Option<String>,
    #[serde(alias = "image")]
    pub image1: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string_list")]
    pub image2: Option<Vec<String>>,
    pub video_clip: Option<String>,
}

impl UpdatePostRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.sub_category.is_none()
            && self.post_type.is_none()
            && self.author_id.is_none()
            && self.video_tag.is_none()
            && self.video_content.is_none()
            && self.image1.is_none()
            && self.image2.is_none()
            && self.video_clip.is_none()
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
    pub category: Option<String>,
    pub post_type: Option<String>,
    pub sub_category: Option<String>,
    pub start_index: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize, Debug)]
pub struct AuthorSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl From<Author> for AuthorSummary {
    fn from(author: Author) -> Self {
        Self {
            id: author.id.to_hex(),
            name: author.name,
            image: author.image,
            bio: author.bio,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
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
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_content: Option<String>,
    pub image1: Option<String>,
    pub image2: Vec<String>,
    pub video_clip: Option<String>,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn with_author(post: Post, author: Option<Author>) -> Self {
        Self {
            id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: post.title,
            slug: post.slug,
            content: post.content,
            category: post.category,
            sub_category: post.sub_category,
            post_type: post.post_type,
            author_id: post.author_id.map(|id| id.to_hex()),
            author: author.map(AuthorSummary::from),
            video_tag: post.video_tag,
            video_content: post.video_content,
            image1: post.image1,
            image2: post.image2,
            video_clip: post.video_clip,
            likes: post.likes,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self::with_author(post, None)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub total_posts: u64,
    pub last_month_posts: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
}

#[derive(Serialize)]
pub struct PostEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: PostResponse,
}
