use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{AppError, Result};
use crate::services::orchestrator::BatchOutcome;
use crate::AppState;

const SERVICE_NAME: &str = "activity-service";
const MAX_LIMIT: u64 = 1000;

/// Raw `/process-users` parameters, validated by [`BatchParams::try_from`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUsersQuery {
    pub months: Option<String>,
    pub country_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchParams {
    pub months: u32,
    pub country_id: i64,
    pub page: u64,
    pub limit: u64,
}

impl BatchParams {
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_param<T: std::str::FromStr>(raw: Option<&str>, default: T) -> Option<T> {
    match raw {
        None => Some(default),
        Some(value) => value.parse().ok(),
    }
}

impl TryFrom<ProcessUsersQuery> for BatchParams {
    type Error = AppError;

    fn try_from(query: ProcessUsersQuery) -> Result<Self> {
        let months = parse_param::<u32>(query.months.as_deref(), 1)
            .ok_or_else(|| AppError::Validation("invalid months parameter".into()))?;

        let country_id = parse_param::<i64>(query.country_id.as_deref(), 0)
            .filter(|country_id| *country_id >= 0)
            .ok_or_else(|| AppError::Validation("invalid countryId parameter".into()))?;

        let page = parse_param::<u64>(query.page.as_deref(), 1)
            .filter(|page| *page >= 1)
            .ok_or_else(|| AppError::Validation("invalid page parameter".into()))?;

        let limit = parse_param::<u64>(query.limit.as_deref(), 50)
            .filter(|limit| (1..=MAX_LIMIT).contains(limit))
            .ok_or_else(|| AppError::Validation("invalid limit parameter (max 1000)".into()))?;

        Ok(Self {
            months,
            country_id,
            page,
            limit,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub inactive_users_count: usize,
    pub orphan_users_count: usize,
    pub registered_no_actions_count: usize,
    pub total_processed: usize,
    pub page: u64,
    pub limit: u64,
    pub months: u32,
    pub country_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProcessUsersResponse {
    #[serde(flatten)]
    pub outcome: BatchOutcome,
    pub summary: BatchSummary,
}

pub async fn process_users(
    state: web::Data<AppState>,
    query: web::Query<ProcessUsersQuery>,
) -> Result<HttpResponse> {
    let params = BatchParams::try_from(query.into_inner())?;

    let user_ids = state
        .repository
        .user_ids(params.offset() as usize, params.limit as usize, params.country_id)
        .await
        .map_err(|err| {
            error!(error = %err, "user id listing failed");
            AppError::UserListing(err)
        })?;

    let outcome = if user_ids.is_empty() {
        info!(page = params.page, limit = params.limit, "no users found");
        BatchOutcome::default()
    } else {
        info!(
            users = user_ids.len(),
            page = params.page,
            limit = params.limit,
            months = params.months,
            "processing users"
        );
        state
            .orchestrator
            .classify(&user_ids, params.country_id, params.months)
            .await
    };

    let summary = BatchSummary {
        inactive_users_count: outcome.inactive_users.len(),
        orphan_users_count: outcome.orphan_users.len(),
        registered_no_actions_count: outcome.registered_no_actions.len(),
        total_processed: user_ids.len(),
        page: params.page,
        limit: params.limit,
        months: params.months,
        country_id: params.country_id,
    };

    Ok(HttpResponse::Ok().json(ProcessUsersResponse { outcome, summary }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME
    }))
}

pub async fn readiness_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    if let Err(err) = state.gateway.ping().await {
        warn!(error = %err, "search backend not ready");
        return Err(AppError::Unavailable(err.to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ready",
        "service": SERVICE_NAME
    })))
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "User Actions API",
        "endpoints": {
            "health": "/health",
            "ready": "/ready",
            "process": "/process-users?months=1&countryId=213&page=5&limit=50"
        }
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .route("/process-users", web::get().to(process_users));
}
