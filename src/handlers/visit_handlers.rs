use actix_web::{HttpRequest, HttpResponse, http, web};
use chrono::Utc;
use log::debug;

use crate::errors::ApiError;
use crate::services::visit_recorder::RecordOutcome;
use crate::services::visit_stats::{StatsRange, collect_statistics};
use crate::state::AppState;
use crate::structs::visit::{RecordVisitResponse, StatisticsQuery, VisitorDetailResponse};
use crate::utils::client_ip::client_ip;
use crate::utils::deadline::with_deadline;

pub const TOO_SOON_MESSAGE: &str = "Visit recorded too soon after previous visit";

/// Record a visit from the calling client
pub async fn record_visit(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let ip = client_ip(&req.connection_info(), app_state.config.trust_proxy);
    let user_agent = req
        .headers()
        .get(http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let outcome = with_deadline(
        app_state.config.store_timeout,
        app_state.recorder.record_visit(&ip, user_agent, Utc::now()),
    )
    .await
    .map_err(|e| app_state.store_error("Error recording visit", e))?;

    match outcome {
        RecordOutcome::Recorded(summary) => Ok(HttpResponse::Ok().json(RecordVisitResponse {
            message: "Visit recorded successfully",
            visit_data: summary.into(),
        })),
        RecordOutcome::TooSoon {
            next_valid_visit_time,
        } => {
            debug!("Visit from {} inside cooldown", ip);
            Err(ApiError::throttled(TOO_SOON_MESSAGE, next_valid_visit_time))
        }
    }
}

/// Rolling visit statistics for `?range=24h|week|month`
pub async fn get_visit_statistics(
    app_state: web::Data<AppState>,
    query: web::Query<StatisticsQuery>,
) -> Result<HttpResponse, ApiError> {
    let range = StatsRange::from_query(query.range.as_deref());

    let stats = with_deadline(
        app_state.config.store_timeout,
        collect_statistics(app_state.visits.as_ref(), range, Utc::now()),
    )
    .await
    .map_err(|e| app_state.store_error("Error fetching visit statistics", e))?;

    Ok(HttpResponse::Ok().json(stats))
}

/// Full record and history for one IP
pub async fn get_visitor_details(
    app_state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ip_address = path.into_inner();

    let visitor = with_deadline(
        app_state.config.store_timeout,
        app_state.visits.find_by_ip(&ip_address),
    )
    .await
    .map_err(|e| app_state.store_error("Error fetching visitor details", e))?
    .ok_or_else(|| ApiError::NotFound("Visitor not found".into()))?;

    let is_active = visitor.is_active(Utc::now(), app_state.config.visitor_active_window);
    Ok(HttpResponse::Ok().json(VisitorDetailResponse::new(visitor, is_active)))
}
