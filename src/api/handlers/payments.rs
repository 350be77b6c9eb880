use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{IntentStatus, PaymentIntent, PaymentMethod, PaymentSession, WebhookOutcome},
    error::Result,
};

#[derive(Deserialize, Default)]
pub struct CreateIntentRequest {
    pub method: Option<PaymentMethod>,
}

#[derive(Serialize)]
pub struct IntentResponse {
    pub intent_id: Uuid,
    pub status: IntentStatus,
    pub client_secret: String,
}

/// Finds or creates the live intent for an outstanding payment.
pub async fn create_intent(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<IntentResponse>> {
    let method = request.method.unwrap_or(PaymentMethod::CreditCard);
    let intent = state
        .service_context
        .payment_service
        .intent_for_payment(payment_id, method)
        .await?;

    Ok(Json(intent_response(intent)))
}

fn intent_response(intent: PaymentIntent) -> IntentResponse {
    // The secret is opaque to clients; the engine never verifies it since
    // the real gateway handshake is out of scope.
    let client_secret = format!("{}_secret_{}", intent.id.simple(), Uuid::new_v4().simple());
    IntentResponse {
        intent_id: intent.id,
        status: intent.status,
        client_secret,
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub checkout_url: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(intent_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let session = state
        .service_context
        .payment_service
        .start_session(intent_id, None)
        .await?;

    Ok(Json(SessionResponse {
        session_id: session.id,
        checkout_url: session.checkout_url,
        expires_at: session.expires_at,
    }))
}

#[derive(Deserialize)]
pub struct WebhookRequest {
    pub session_id: Uuid,
    pub outcome: WebhookOutcome,
    pub failure_reason: Option<String>,
}

/// Webhook receiver, idempotent by session id: duplicate deliveries get
/// the already-resolved session back with a 200.
pub async fn webhook(
    State(state): State<AppState>,
    Json(request): Json<WebhookRequest>,
) -> Result<Json<PaymentSession>> {
    let session = state
        .service_context
        .payment_service
        .process_webhook(request.session_id, request.outcome, request.failure_reason)
        .await?;
    Ok(Json(session))
}

#[derive(Serialize)]
pub struct PayNowResponse {
    pub session: PaymentSession,
    pub intent: PaymentIntent,
}

/// "Pay now" shortcut: checkout and settlement in one call.
pub async fn pay_now(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PayNowResponse>> {
    let (session, intent) = state
        .service_context
        .payment_service
        .pay_outstanding(payment_id)
        .await?;
    Ok(Json(PayNowResponse { session, intent }))
}

#[derive(Serialize)]
pub struct ExpireSweepResponse {
    pub expired: u64,
}

/// Ops sweep marking open checkout sessions past their expiry as expired.
pub async fn expire_sessions(State(state): State<AppState>) -> Result<Json<ExpireSweepResponse>> {
    let expired = state
        .service_context
        .payment_service
        .expire_stale_sessions(Utc::now())
        .await?;
    Ok(Json(ExpireSweepResponse { expired }))
}
