use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Months, Utc};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{DateTime as BsonDateTime, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use validator::Validate;

use crate::db::mongodb::is_duplicate_key;
use crate::errors::ApiError;
use crate::models::author::{AUTHORS_COLLECTION, Author};
use crate::models::post::{Post, PostSection, top_trend_conflict};
use crate::state::AppState;
use crate::structs::post::{
    CreatePostRequest, PostEnvelope, PostListQuery, PostListResponse, PostResponse,
    UpdatePostRequest,
};
use crate::utils::pattern::contains_ignore_case;
use crate::utils::slug::slugify;

fn parse_post_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid post ID".into()))
}

fn parse_author_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid author ID".into()))
}

fn not_found<S: PostSection>() -> ApiError {
    ApiError::NotFound(format!("{} not found", S::LABEL))
}

fn posts<S: PostSection>(db: &Database) -> Collection<Post> {
    db.collection::<Post>(S::COLLECTION)
}

/// Filter for a listing: case-insensitive `category` / `subCategory`, exact
/// `postType` unless it is `All`.
fn list_filter(query: &PostListQuery) -> Document {
    let mut filter = doc! {};
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        filter.insert("category", contains_ignore_case(category));
    }
    if let Some(post_type) = query
        .post_type
        .as_deref()
        .filter(|t| !t.is_empty() && *t != "All")
    {
        filter.insert("postType", post_type);
    }
    if let Some(sub_category) = query.sub_category.as_deref().filter(|s| !s.is_empty()) {
        filter.insert("subCategory", contains_ignore_case(sub_category));
    }
    filter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Page {
    skip: u64,
    size: u64,
}

impl Page {
    fn from_query<S: PostSection>(query: &PostListQuery) -> Option<Self> {
        let size = query.limit.filter(|l| *l > 0).or(S::PAGE_SIZE);
        match (size, query.start_index) {
            (Some(size), start) => Some(Page {
                skip: start.unwrap_or(0),
                size,
            }),
            (None, _) => None,
        }
    }

    fn current(&self) -> u64 {
        self.skip / self.size + 1
    }

    fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.size)
    }
}

/// Loads the authors of `posts` in one query and pairs each post with its author.
async fn with_authors(
    db: &Database,
    posts: Vec<Post>,
) -> mongodb::error::Result<Vec<PostResponse>> {
    let ids: Vec<ObjectId> = posts.iter().filter_map(|post| post.author_id).collect();
    let mut authors: HashMap<ObjectId, Author> = HashMap::new();
    if !ids.is_empty() {
        let found = db
            .collection::<Author>(AUTHORS_COLLECTION)
            .find(doc! { "_id": { "$in": ids } })
            .await?
            .try_collect::<Vec<Author>>()
            .await?;
        authors.extend(found.into_iter().map(|author| (author.id, author)));
    }

    Ok(posts
        .into_iter()
        .map(|post| {
            let author = post.author_id.and_then(|id| authors.get(&id).cloned());
            PostResponse::with_author(post, author)
        })
        .collect())
}

async fn with_author(db: &Database, post: Post) -> mongodb::error::Result<PostResponse> {
    let author = match post.author_id {
        Some(id) => {
            db.collection::<Author>(AUTHORS_COLLECTION)
                .find_one(doc! { "_id": id })
                .await?
        }
        None => None,
    };
    Ok(PostResponse::with_author(post, author))
}

fn new_post<S: PostSection>(
    req: CreatePostRequest,
    author_id: Option<ObjectId>,
    now: DateTime<Utc>,
) -> Post {
    let mut post = Post::new(req.title, now);
    post.content = req.content;
    post.category = req.category;
    post.sub_category = req.sub_category;
    post.post_type = S::POST_TYPE.map(String::from).or(req.post_type);
    post.author_id = author_id;
    post.video_tag = req.video_tag;
    post.video_content = req.video_content;
    post.image1 = req.image1;
    post.image2 = req.image2;
    post.video_clip = req.video_clip;
    post
}

/// Create a post in section `S`
pub async fn create_post<S: PostSection>(
    app_state: web::Data<AppState>,
    web::Json(req): web::Json<CreatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    if req.image1.as_deref().is_none_or(str::is_empty) {
        return Err(ApiError::BadRequest(S::IMAGE_REQUIRED.into()));
    }
    let author_id = match req.author_id.as_deref() {
        Some(raw) => Some(parse_author_id(raw)?),
        None if S::REQUIRES_AUTHOR => {
            return Err(ApiError::BadRequest("Author is required".into()));
        }
        None => None,
    };

    let db = app_state.database()?;
    let context = format!("Error creating {}", S::LABEL);

    if let Some(author_id) = author_id {
        db.collection::<Author>(AUTHORS_COLLECTION)
            .find_one(doc! { "_id": author_id })
            .await
            .map_err(|e| app_state.db_error(&context, e))?
            .ok_or_else(|| ApiError::NotFound("Author not found".into()))?;
    }

    let collection = posts::<S>(db);
    let existing = collection
        .find_one(doc! { "title": &req.title })
        .await
        .map_err(|e| app_state.db_error(&context, e))?;
    if existing.is_some() {
        return Err(ApiError::BadRequest(S::DUPLICATE_TITLE.into()));
    }

    if let Some((filter, message)) = top_trend_conflict(
        S::TOP_TREND,
        req.category.as_deref(),
        req.post_type.as_deref(),
        req.sub_category.as_deref(),
    ) {
        let taken = collection
            .find_one(filter)
            .await
            .map_err(|e| app_state.db_error(&context, e))?;
        if taken.is_some() {
            return Err(ApiError::BadRequest(message));
        }
    }

    let mut post = new_post::<S>(req, author_id, Utc::now());
    let result = collection.insert_one(&post).await.map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::Conflict(S::DUPLICATE_TITLE.into())
        } else {
            app_state.db_error(&context, e)
        }
    })?;
    post.id = result.inserted_id.as_object_id();
    info!("Created {} '{}'", S::LABEL, post.slug);

    Ok(HttpResponse::Created().json(PostResponse::from(post)))
}

/// Newest first, optionally filtered and paginated, with publishing counters
pub async fn get_all_posts<S: PostSection>(
    app_state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> Result<HttpResponse, ApiError> {
    let db = app_state.database()?;
    let collection = posts::<S>(db);
    let context = format!("Error listing {}", S::LABEL);

    let filter = list_filter(&query);
    let page = Page::from_query::<S>(&query);

    let mut find = collection.find(filter.clone()).sort(doc! { "createdAt": -1 });
    if let Some(page) = page {
        find = find.skip(page.skip).limit(page.size as i64);
    }
    let found = find
        .await
        .map_err(|e| app_state.db_error(&context, e))?
        .try_collect::<Vec<Post>>()
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    let total_posts = collection
        .count_documents(filter.clone())
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    let now = Utc::now();
    let one_month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let mut recent = filter;
    recent.insert(
        "createdAt",
        doc! { "$gte": BsonDateTime::from_chrono(one_month_ago) },
    );
    let last_month_posts = collection
        .count_documents(recent)
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    let posts = with_authors(db, found)
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    Ok(HttpResponse::Ok().json(PostListResponse {
        posts,
        total_posts,
        last_month_posts,
        current_page: page.map(|p| p.current()),
        total_pages: page.map(|p| p.total_pages(total_posts)),
    }))
}

pub async fn get_post_by_slug<S: PostSection>(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let db = app_state.database()?;
    let context = format!("Error fetching {}", S::LABEL);

    let post = posts::<S>(db)
        .find_one(doc! { "slug": &slug })
        .await
        .map_err(|e| app_state.db_error(&context, e))?
        .ok_or_else(not_found::<S>)?;
    let response = with_author(db, post)
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    Ok(HttpResponse::Ok().json(response))
}

pub async fn get_post_by_id<S: PostSection>(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_post_id(&path.into_inner())?;
    let db = app_state.database()?;
    let context = format!("Error fetching {}", S::LABEL);

    let post = posts::<S>(db)
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error(&context, e))?
        .ok_or_else(not_found::<S>)?;
    let data = with_author(db, post)
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    Ok(HttpResponse::Ok().json(PostEnvelope {
        success: true,
        message: None,
        data,
    }))
}

/// Build the `$set` document for a partial update. A new title also moves the slug.
fn post_update(
    req: UpdatePostRequest,
    author_id: Option<ObjectId>,
    now: DateTime<Utc>,
) -> Document {
    let mut set = doc! { "updatedAt": BsonDateTime::from_chrono(now) };
    if let Some(title) = req.title {
        set.insert("slug", slugify(&title));
        set.insert("title", title);
    }
    let text_fields = [
        ("content", req.content),
        ("category", req.category),
        ("subCategory", req.sub_category),
        ("postType", req.post_type),
        ("videoTag", req.video_tag),
        ("videoContent", req.video_content),
        ("image1", req.image1),
        ("videoClip", req.video_clip),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }
    if let Some(image2) = req.image2 {
        set.insert("image2", image2);
    }
    if let Some(author_id) = author_id {
        set.insert("authorId", author_id);
    }
    doc! { "$set": set }
}

pub async fn update_post<S: PostSection>(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    web::Json(req): web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_post_id(&path.into_inner())?;
    if req.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    req.validate()?;
    let author_id = req.author_id.as_deref().map(parse_author_id).transpose()?;

    let db = app_state.database()?;
    let context = format!("Error updating {}", S::LABEL);

    let updated = posts::<S>(db)
        .find_one_and_update(doc! { "_id": id }, post_update(req, author_id, Utc::now()))
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::Conflict(S::DUPLICATE_TITLE.into())
            } else {
                app_state.db_error(&context, e)
            }
        })?
        .ok_or_else(not_found::<S>)?;
    let data = with_author(db, updated)
        .await
        .map_err(|e| app_state.db_error(&context, e))?;

    Ok(HttpResponse::Ok().json(PostEnvelope {
        success: true,
        message: Some(format!("{} updated successfully", S::LABEL)),
        data,
    }))
}

pub async fn delete_post<S: PostSection>(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_post_id(&path.into_inner())?;
    let db = app_state.database()?;

    posts::<S>(db)
        .find_one_and_delete(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error(&format!("Error deleting {}", S::LABEL), e))?
        .ok_or_else(not_found::<S>)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("{} has been deleted successfully", S::LABEL)
    })))
}
