use actix_web::{HttpResponse, web};
use chrono::{Months, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{DateTime as BsonDateTime, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use validator::Validate;

use crate::db::mongodb::is_duplicate_key;
use crate::errors::ApiError;
use crate::models::news::{NEWS_COLLECTION, NewsPost};
use crate::state::AppState;
use crate::structs::news::{
    CreateNewsRequest, NewsEnvelope, NewsListResponse, NewsResponse, UpdateNewsRequest,
};
use crate::utils::slug::slugify;

fn parse_news_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid news ID".into()))
}

/// Create a news post
pub async fn create_news(
    app_state: web::Data<AppState>,
    web::Json(req): web::Json<CreateNewsRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let db = app_state.database()?;
    let news_collection = db.collection::<NewsPost>(NEWS_COLLECTION);

    let existing = news_collection
        .find_one(doc! { "title": &req.title })
        .await
        .map_err(|e| app_state.db_error("Error creating news", e))?;
    if existing.is_some() {
        return Err(ApiError::BadRequest("Post with same title exists".into()));
    }

    let mut post = NewsPost::new(req.title, req.image, req.url, req.date, req.post_type);
    let result = news_collection.insert_one(&post).await.map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::Conflict("Post with same slug exists".into())
        } else {
            app_state.db_error("Error creating news", e)
        }
    })?;
    post.id = result.inserted_id.as_object_id();

    Ok(HttpResponse::Created().json(NewsResponse::from(post)))
}

/// All posts, newest first, with publishing counters
pub async fn get_all_news(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let db = app_state.database()?;
    let news_collection = db.collection::<NewsPost>(NEWS_COLLECTION);

    let posts = news_collection
        .find(doc! {})
        .sort(doc! { "date": -1 })
        .await
        .map_err(|e| app_state.db_error("Error listing news", e))?
        .try_collect::<Vec<NewsPost>>()
        .await
        .map_err(|e| app_state.db_error("Error listing news", e))?;

    let total_posts = news_collection
        .count_documents(doc! {})
        .await
        .map_err(|e| app_state.db_error("Error counting news", e))?;

    let now = Utc::now();
    let one_month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let last_month_posts = news_collection
        .count_documents(doc! { "createdAt": { "$gte": BsonDateTime::from_chrono(one_month_ago) } })
        .await
        .map_err(|e| app_state.db_error("Error counting news", e))?;

    Ok(HttpResponse::Ok().json(NewsListResponse {
        posts: posts.into_iter().map(NewsResponse::from).collect(),
        total_posts,
        last_month_posts,
    }))
}

pub async fn get_news_by_slug(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let db = app_state.database()?;

    let post = db
        .collection::<NewsPost>(NEWS_COLLECTION)
        .find_one(doc! { "slug": &slug })
        .await
        .map_err(|e| app_state.db_error("Error fetching news", e))?
        .ok_or_else(|| ApiError::NotFound("News post not found".into()))?;

    Ok(HttpResponse::Ok().json(NewsResponse::from(post)))
}

pub async fn get_news_by_id(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_news_id(&path.into_inner())?;
    let db = app_state.database()?;

    let post = db
        .collection::<NewsPost>(NEWS_COLLECTION)
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error("Error fetching news", e))?
        .ok_or_else(|| ApiError::NotFound("News post not found".into()))?;

    Ok(HttpResponse::Ok().json(NewsEnvelope {
        success: true,
        message: None,
        data: post.into(),
    }))
}

/// Build the `$set` document for a partial update. A new title also moves the slug.
fn news_update(req: UpdateNewsRequest) -> Document {
    let mut set = doc! { "updatedAt": BsonDateTime::now() };
    if let Some(title) = req.title {
        set.insert("slug", slugify(&title));
        set.insert("title", title);
    }
    if let Some(url) = req.url {
        set.insert("url", url);
    }
    if let Some(image) = req.image {
        set.insert("image", image);
    }
    if let Some(date) = req.date {
        set.insert("date", BsonDateTime::from_chrono(date));
    }
    if let Some(post_type) = req.post_type {
        set.insert("postType", post_type);
    }
    doc! { "$set": set }
}

pub async fn update_news(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    web::Json(req): web::Json<UpdateNewsRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_news_id(&path.into_inner())?;
    if req.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    req.validate()?;
    let db = app_state.database()?;

    let updated = db
        .collection::<NewsPost>(NEWS_COLLECTION)
        .find_one_and_update(doc! { "_id": id }, news_update(req))
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::Conflict("Post with same title exists".into())
            } else {
                app_state.db_error("Error updating news", e)
            }
        })?
        .ok_or_else(|| ApiError::NotFound("News post not found".into()))?;

    Ok(HttpResponse::Ok().json(NewsEnvelope {
        success: true,
        message: Some("News post updated successfully"),
        data: updated.into(),
    }))
}

pub async fn delete_news(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_news_id(&path.into_inner())?;
    let db = app_state.database()?;

    db.collection::<NewsPost>(NEWS_COLLECTION)
        .find_one_and_delete(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error("Error deleting news", e))?
        .ok_or_else(|| ApiError::NotFound("News post not found".into()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "News post has been deleted successfully"
    })))
}
