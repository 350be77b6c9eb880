use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{Attendance, Enrollment, EnrollmentStatus},
    error::Result,
};

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: EnrollmentStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Enrollment>> {
    let enrollment = state
        .service_context
        .enrollment_service
        .update_enrollment_status(id, request.status)
        .await?;
    Ok(Json(enrollment))
}

#[derive(Deserialize, Default)]
pub struct CheckInRequest {
    pub session_id: Option<Uuid>,
}

pub async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Attendance>> {
    let attendance = state
        .service_context
        .enrollment_service
        .record_check_in(id, request.session_id)
        .await?;
    Ok(Json(attendance))
}
