use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::SessionBooking,
    error::Result,
};

#[derive(Deserialize)]
pub struct BookRequest {
    pub student_id: Uuid,
}

pub async fn book(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<BookRequest>,
) -> Result<Json<SessionBooking>> {
    let booking = state
        .service_context
        .quota_service
        .book_session(session_id, request.student_id)
        .await?;
    Ok(Json(booking))
}

/// Cancelling a booking hands the quota slot back for its week.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<SessionBooking>> {
    let booking = state
        .service_context
        .quota_service
        .cancel_booking(booking_id)
        .await?;
    Ok(Json(booking))
}
