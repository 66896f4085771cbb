use actix_web::{HttpResponse, web};
use log::warn;

use crate::state::AppState;
use crate::utils::deadline::with_deadline;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    // Ping the visit store; it shares the connection with the content collections
    let ping_result = with_deadline(state.config.store_timeout, state.visits.ping()).await;

    match ping_result {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => {
            warn!("Health check failed: {}", e);
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "success": false, "error": "Database connection failed" }))
        }
    }
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json("This API is available!!")
}
