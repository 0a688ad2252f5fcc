use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::subscription_repo;
use crate::errors::AppError;
use crate::models::CopySubscription;
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ListParams {
    pub subscriber_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub subscriber_id: i64,
    pub wallet: String,
    pub display_name: Option<String>,
    pub scale_factor: Decimal,
}

#[derive(Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub enabled: Option<bool>,
    pub scale_factor: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/subscriptions: list all, or one subscriber's with `?subscriber_id=`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<CopySubscription>>>, AppError> {
    let subs = match params.subscriber_id {
        Some(id) => subscription_repo::list_for_subscriber(&state.db, id).await?,
        None => subscription_repo::list_all(&state.db).await?,
    };

    Ok(Json(ApiResponse {
        success: true,
        data: Some(subs),
        error: None,
    }))
}

/// POST /api/subscriptions: create or overwrite a (subscriber, wallet) pair
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<Json<ApiResponse<CopySubscription>>, AppError> {
    if body.wallet.trim().is_empty() {
        return Err(AppError::BadRequest("wallet must not be empty".into()));
    }
    if body.scale_factor <= Decimal::ZERO {
        return Err(AppError::BadRequest("scale_factor must be positive".into()));
    }

    let display_name = body
        .display_name
        .unwrap_or_else(|| body.wallet.trim().to_lowercase());

    let sub = subscription_repo::subscribe(
        &state.db,
        body.subscriber_id,
        &body.wallet,
        &display_name,
        body.scale_factor,
    )
    .await?;

    tracing::info!(
        subscriber = sub.subscriber_id,
        wallet = %sub.source_wallet,
        scale = %sub.scale_factor,
        "Subscription created via API"
    );

    Ok(Json(ApiResponse {
        success: true,
        data: Some(sub),
        error: None,
    }))
}

/// PATCH /api/subscriptions/{subscriber_id}/{wallet}: enable/disable or rescale
pub async fn update(
    State(state): State<AppState>,
    Path((subscriber_id, wallet)): Path<(i64, String)>,
    Json(body): Json<UpdateSubscriptionRequest>,
) -> Result<Json<ApiResponse<CopySubscription>>, AppError> {
    if body.enabled.is_none() && body.scale_factor.is_none() {
        return Err(AppError::BadRequest(
            "provide enabled and/or scale_factor".into(),
        ));
    }

    if let Some(scale) = body.scale_factor {
        if scale <= Decimal::ZERO {
            return Err(AppError::BadRequest("scale_factor must be positive".into()));
        }
        if !subscription_repo::set_scale(&state.db, subscriber_id, &wallet, scale).await? {
            return Err(AppError::NotFound("subscription not found".into()));
        }
    }

    if let Some(enabled) = body.enabled {
        if !subscription_repo::set_enabled(&state.db, subscriber_id, &wallet, enabled).await? {
            return Err(AppError::NotFound("subscription not found".into()));
        }
    }

    let sub = subscription_repo::get(&state.db, subscriber_id, &wallet)
        .await?
        .ok_or_else(|| AppError::NotFound("subscription not found".into()))?;

    Ok(Json(ApiResponse {
        success: true,
        data: Some(sub),
        error: None,
    }))
}

/// DELETE /api/subscriptions/{subscriber_id}/{wallet}: unsubscribe
pub async fn remove(
    State(state): State<AppState>,
    Path((subscriber_id, wallet)): Path<(i64, String)>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    if !subscription_repo::unsubscribe(&state.db, subscriber_id, &wallet).await? {
        return Err(AppError::NotFound("subscription not found".into()));
    }

    tracing::info!(subscriber = subscriber_id, wallet = %wallet, "Subscription removed via API");

    Ok(Json(ApiResponse {
        success: true,
        data: Some(()),
        error: None,
    }))
}
