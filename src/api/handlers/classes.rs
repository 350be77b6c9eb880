use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{
        CapacityUsage, ClassSession, CreateClassRequest, CreateSessionRequest,
        EnrollmentStatus, RosterEntry, TrainingClass,
    },
    error::{AppError, Result},
};

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateClassRequest>,
) -> Result<Json<TrainingClass>> {
    if request.capacity <= 0 {
        return Err(AppError::Validation("Class capacity must be positive".to_string()));
    }

    let now = Utc::now();
    let class = TrainingClass {
        id: Uuid::new_v4(),
        name: request.name,
        capacity: request.capacity,
        location: request.location,
        created_at: now,
        updated_at: now,
    };

    let class = state.service_context.class_repo.create(class).await?;
    Ok(Json(class))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainingClass>> {
    let class = state.service_context.class_repo.find_by_id(id).await?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;
    Ok(Json(class))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TrainingClass>>> {
    let classes = state.service_context.class_repo.list().await?;
    Ok(Json(classes))
}

pub async fn create_session(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<ClassSession>> {
    if request.start_time >= request.end_time {
        return Err(AppError::Validation(
            "Session start time must precede end time".to_string(),
        ));
    }

    state.service_context.class_repo.find_by_id(class_id).await?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

    let now = Utc::now();
    let session = ClassSession {
        id: Uuid::new_v4(),
        class_id,
        start_time: request.start_time,
        end_time: request.end_time,
        capacity: request.capacity,
        location: request.location,
        created_at: now,
        updated_at: now,
    };

    let session = state.service_context.class_repo.create_session(session).await?;
    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<ClassSession>>> {
    let sessions = state.service_context.class_repo.list_sessions(class_id).await?;
    Ok(Json(sessions))
}

pub async fn capacity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CapacityUsage>> {
    let usage = state.service_context.enrollment_service.capacity_usage(id).await?;
    Ok(Json(usage))
}

#[derive(Deserialize)]
pub struct EnrollRequest {
    pub student_id: Uuid,
}

#[derive(Serialize)]
pub struct EnrollResponse {
    pub enrollment_id: Uuid,
    pub status: EnrollmentStatus,
    pub already_enrolled: bool,
}

pub async fn enroll(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
    Json(request): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>> {
    let outcome = state
        .service_context
        .enrollment_service
        .enroll_student(request.student_id, class_id)
        .await?;

    Ok(Json(EnrollResponse {
        enrollment_id: outcome.enrollment.id,
        status: outcome.enrollment.status,
        already_enrolled: outcome.already_enrolled,
    }))
}

pub async fn roster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RosterEntry>>> {
    let entries = state.service_context.roster_service.roster_for(id).await?;
    Ok(Json(entries))
}
