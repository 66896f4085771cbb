use std::path::Path;

use actix_web::{HttpResponse, web};
use bcrypt::{DEFAULT_COST, hash};
use chrono::{Months, Utc};
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{DateTime as BsonDateTime, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use validator::Validate;

use crate::db::mongodb::is_duplicate_key;
use crate::errors::ApiError;
use crate::models::user::{USERS_COLLECTION, UserProfile};
use crate::state::AppState;
use crate::structs::user::{UpdateProfileRequest, UserListQuery, UserListResponse, UserResponse};

const DEFAULT_USER_PAGE_SIZE: u64 = 5;

fn parse_user_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid User ID".into()))
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}

/// Profiles expose only the stored file name of their image.
fn image_file_name(image: &str) -> String {
    Path::new(image)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.to_string())
}

pub async fn get_all_profiles(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let db = app_state.database()?;

    let users = db
        .collection::<UserProfile>(USERS_COLLECTION)
        .find(doc! {})
        .await
        .map_err(|e| app_state.db_error("Error listing profiles", e))?
        .try_collect::<Vec<UserProfile>>()
        .await
        .map_err(|e| app_state.db_error("Error listing profiles", e))?;

    let responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// Paginated users with `?page=&limit=&sort=asc|desc` on creation time
pub async fn get_users(
    app_state: web::Data<AppState>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_USER_PAGE_SIZE);
    let direction = if query.sort.as_deref() == Some("asc") { 1 } else { -1 };

    let db = app_state.database()?;
    let users_collection = db.collection::<UserProfile>(USERS_COLLECTION);

    let users = users_collection
        .find(doc! {})
        .sort(doc! { "createdAt": direction })
        .skip((page - 1) * limit)
        .limit(limit as i64)
        .await
        .map_err(|e| app_state.db_error("Error listing users", e))?
        .try_collect::<Vec<UserProfile>>()
        .await
        .map_err(|e| app_state.db_error("Error listing users", e))?;

    let total_users = users_collection
        .count_documents(doc! {})
        .await
        .map_err(|e| app_state.db_error("Error counting users", e))?;

    let now = Utc::now();
    let one_month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let last_month_users = users_collection
        .count_documents(doc! { "createdAt": { "$gte": BsonDateTime::from_chrono(one_month_ago) } })
        .await
        .map_err(|e| app_state.db_error("Error counting users", e))?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total_users,
        total_pages: total_users.div_ceil(limit),
        last_month_users,
    }))
}

async fn find_user(app_state: &AppState, id: ObjectId) -> Result<UserProfile, ApiError> {
    app_state
        .database()?
        .collection::<UserProfile>(USERS_COLLECTION)
        .find_one(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error("Error fetching user", e))?
        .ok_or_else(user_not_found)
}

pub async fn get_user_by_id(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_user_id(&path.into_inner())?;
    let user = find_user(&app_state, id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub async fn get_profile_by_id(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_user_id(&path.into_inner())?;
    let mut user = find_user(&app_state, id).await?;
    user.image = user.image.as_deref().map(image_file_name);
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// `$set` for a profile update. `password` must already be hashed.
fn profile_update(req: UpdateProfileRequest, password_hash: Option<String>) -> Document {
    let mut set = doc! { "updatedAt": BsonDateTime::now() };
    let fields = [
        ("username", req.username),
        ("email", req.email),
        ("password", password_hash),
        ("image", req.image.as_deref().map(image_file_name)),
        ("bio", req.bio),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }
    doc! { "$set": set }
}

pub async fn update_profile(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
    web::Json(mut req): web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_user_id(&path.into_inner())?;
    if let Some(email) = req.email.as_mut() {
        *email = email.trim().to_lowercase();
    }
    if req.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    req.validate()?;

    let db = app_state.database()?;

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(
            hash(password, DEFAULT_COST)
                .map_err(|e| {
                    ApiError::internal("Failed to hash password", e, app_state.config.development)
                })?,
        ),
        None => None,
    };

    let updated = db
        .collection::<UserProfile>(USERS_COLLECTION)
        .find_one_and_update(doc! { "_id": id }, profile_update(req, password_hash))
        .return_document(ReturnDocument::After)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::Conflict("Email already in use".into())
            } else {
                app_state.db_error("Error updating user", e)
            }
        })?
        .ok_or_else(user_not_found)?;

    info!("Updated profile {}", id.to_hex());
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

pub async fn delete_user(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_user_id(&path.into_inner())?;
    let db = app_state.database()?;

    db.collection::<UserProfile>(USERS_COLLECTION)
        .find_one_and_delete(doc! { "_id": id })
        .await
        .map_err(|e| app_state.db_error("Error deleting user", e))?
        .ok_or_else(user_not_found)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User deleted successfully"
    })))
}
