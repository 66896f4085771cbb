use std::future::{Ready, ready};

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    error::ErrorInternalServerError,
    web,
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use log::debug;

use crate::errors::ApiError;
use crate::services::rate_limiter::RateDecision;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

pub const RATE_LIMIT_MESSAGE: &str = "Too many visit records created, please try again later";

/// Per-IP throttle in front of the visit recorder. Uses the limiter held in
/// `AppState`, so every worker shares the same counters.
pub struct VisitRateLimit;

impl<S, B> Transform<S, ServiceRequest> for VisitRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = VisitRateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(VisitRateLimitMiddleware { service }))
    }
}

pub struct VisitRateLimitMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for VisitRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let decision = match req.app_data::<web::Data<AppState>>() {
            Some(state) => {
                let ip = client_ip(&req.connection_info(), state.config.trust_proxy);
                let decision = state.limiter.check(&ip, Utc::now());
                if !decision.is_allowed() {
                    debug!("Rate limit hit for {}", ip);
                }
                decision
            }
            None => {
                return Box::pin(async move {
                    Err(ErrorInternalServerError("Application state not configured"))
                });
            }
        };

        match decision {
            RateDecision::Allowed { .. } => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
            }
            RateDecision::Limited { .. } => {
                let response = ApiError::throttled(RATE_LIMIT_MESSAGE, None).error_response();
                Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) })
            }
        }
    }
}
