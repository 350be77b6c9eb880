use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreatePlanOptionRequest, PlanOption, PlanStatus, StudentPlan},
    error::{AppError, Result},
};

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanOptionRequest>,
) -> Result<Json<PlanOption>> {
    if request.weekly_classes <= 0 {
        return Err(AppError::Validation(
            "Plan must allow at least one class per week".to_string(),
        ));
    }

    let now = Utc::now();
    let option = PlanOption {
        id: Uuid::new_v4(),
        name: request.name,
        weekly_classes: request.weekly_classes,
        duration_months: request.duration_months,
        price_monthly_cents: request.price_monthly_cents,
        price_upfront_cents: request.price_upfront_cents,
        created_at: now,
        updated_at: now,
    };

    let option = state.service_context.plan_repo.create_option(option).await?;
    Ok(Json(option))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PlanOption>>> {
    let options = state.service_context.plan_repo.list_options().await?;
    Ok(Json(options))
}

#[derive(Deserialize)]
pub struct UpdatePlanStatusRequest {
    pub status: PlanStatus,
}

/// Pause or expire a student's plan assignment directly.
pub async fn update_assignment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanStatusRequest>,
) -> Result<Json<StudentPlan>> {
    let plan = state
        .service_context
        .plan_repo
        .update_plan_status(id, request.status)
        .await?;
    Ok(Json(plan))
}
