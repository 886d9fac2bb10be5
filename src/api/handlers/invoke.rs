use crate::models::{InvocationEnvelope, InvocationPayload};
use crate::services::converter::Converter;
use axum::{Json, body::Bytes, extract::State};
use std::sync::Arc;

/// Converter entry point. Always answers HTTP 200; the outcome lives in
/// the envelope's `statusCode`.
#[utoipa::path(
    post,
    path = "/invoke",
    request_body = InvocationPayload,
    responses(
        (status = 200, description = "Invocation envelope", body = InvocationEnvelope)
    ),
    tag = "worker"
)]
pub async fn invoke(
    State(converter): State<Arc<Converter>>,
    body: Bytes,
) -> Json<InvocationEnvelope> {
    Json(converter.handle_json(&body).await)
}
