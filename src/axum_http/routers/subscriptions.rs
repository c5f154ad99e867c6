use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::application::usecases::lifecycle::SubscriptionLifecycleUseCase;
use crate::application::usecases::trial_eligibility::TrialEligibilityUseCase;
use crate::axum_http::auth::{AuthUser, OptionalAuthUser};
use crate::axum_http::error_responses::AppError;
use crate::domain::value_objects::subscriptions::{
    CancelSubscriptionRequest, CheckoutOrder, CreateSubscriptionResponse, SubscriptionDto,
    TrialEligibilityDto,
};

#[derive(Clone)]
pub struct SubscriptionsState {
    pub lifecycle: Arc<SubscriptionLifecycleUseCase>,
    pub trials: Arc<TrialEligibilityUseCase>,
}

pub fn routes(
    lifecycle: Arc<SubscriptionLifecycleUseCase>,
    trials: Arc<TrialEligibilityUseCase>,
) -> Router {
    Router::new()
        .route("/", get(list_subscriptions))
        .route("/:subscription_id/cancel", post(cancel_subscription))
        .route("/:subscription_id/pause", post(pause_subscription))
        .route("/:subscription_id/resume", post(resume_subscription))
        .route(
            "/trial-eligibility/:product_id",
            get(check_trial_eligibility),
        )
        .with_state(SubscriptionsState { lifecycle, trials })
}

pub fn order_routes(lifecycle: Arc<SubscriptionLifecycleUseCase>) -> Router {
    Router::new()
        .route("/complete", post(complete_order))
        .with_state(lifecycle)
}

pub async fn list_subscriptions(
    State(state): State<SubscriptionsState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let subscriptions = state.lifecycle.list_for_user(auth.user_id).await?;
    let dtos: Vec<SubscriptionDto> = subscriptions
        .into_iter()
        .map(SubscriptionDto::from)
        .collect();
    Ok(Json(dtos))
}

pub async fn cancel_subscription(
    State(state): State<SubscriptionsState>,
    auth: AuthUser,
    Path(subscription_id): Path<Uuid>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .lifecycle
        .cancel_for_user(auth.user_id, subscription_id, request.reason.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause_subscription(
    State(state): State<SubscriptionsState>,
    auth: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .lifecycle
        .pause_for_user(auth.user_id, subscription_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resume_subscription(
    State(state): State<SubscriptionsState>,
    auth: AuthUser,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .lifecycle
        .resume_for_user(auth.user_id, subscription_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_trial_eligibility(
    State(state): State<SubscriptionsState>,
    auth: OptionalAuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let eligibility = state
        .trials
        .check_eligibility(auth.0.map(|user| user.user_id), product_id)
        .await?;
    Ok(Json(TrialEligibilityDto {
        eligible: eligibility.eligible,
        reason: eligibility.reason.map(String::from),
    }))
}

/// Order-completion entry point for the storefront. Idempotent: duplicate
/// completion events for one order return the same subscription id.
pub async fn complete_order(
    State(lifecycle): State<Arc<SubscriptionLifecycleUseCase>>,
    _auth: AuthUser,
    Json(order): Json<CheckoutOrder>,
) -> Result<impl IntoResponse, AppError> {
    let subscription_id = lifecycle.create_from_order(&order).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSubscriptionResponse { subscription_id }),
    ))
}
