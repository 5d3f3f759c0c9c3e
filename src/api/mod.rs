//! HTTP API - thin axum handlers over the core and fulfillment services.
//!
//! Every route answers JSON. Failures render as `{ "error": "<message>" }` with the
//! status picked by [`Error::kind`]; internal errors are logged and hidden behind a
//! generic message.

/// Admin routes: orders, payment preview/confirm, enrollment edits
pub mod admin;
/// Guardian (LIFF) routes: credit summary, attendance, leave
pub mod liff;

use crate::{
    config::AppConfig,
    errors::{Error, ErrorKind},
};
use axum::{
    Json, Router,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Unhandled request error");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Reads an optional JSON body. An empty body yields `T::default()`; anything else
/// must parse, so a malformed field is never silently dropped.
pub(crate) fn json_or_default<T>(body: &Bytes) -> crate::errors::Result<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::invalid_input(format!("Invalid request body: {e}")))
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/orders", get(admin::list_orders))
        .route(
            "/api/admin/orders/:id/preview-payment",
            post(admin::preview_payment),
        )
        .route(
            "/api/admin/orders/:id/confirm-payment",
            post(admin::confirm_payment),
        )
        .route("/api/admin/enrollments", get(admin::list_enrollments))
        .route("/api/admin/enrollments/:id", patch(admin::update_enrollment))
        .route("/api/liff/enrollments", get(liff::list_enrollments))
        .route("/api/liff/attendance", get(liff::list_attendance))
        .route("/api/liff/attendance/leave", post(liff::apply_leave))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until the process is stopped.
pub async fn serve(state: AppState) -> crate::errors::Result<()> {
    let bind_address = state.config.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %listener.local_addr()?, "Enrollment desk API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::fulfillment::FulfillmentRequest;
    use sea_orm::DbErr;

    #[test]
    fn test_json_or_default() {
        let empty: FulfillmentRequest = json_or_default(&Bytes::from_static(b"  \n")).unwrap_or_default();
        assert!(empty.credits_overrides.is_empty());

        let parsed: crate::errors::Result<FulfillmentRequest> =
            json_or_default(&Bytes::from_static(br#"{"creditsOverrides":{"k":4}}"#));
        assert!(matches!(parsed, Ok(ref r) if r.credits_overrides.len() == 1));

        let bad: crate::errors::Result<FulfillmentRequest> =
            json_or_default(&Bytes::from_static(br#"{"creditsOverrides":{"k":null}}"#));
        assert!(matches!(bad, Err(Error::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_error_response_status_and_body() {
        let response = Error::OrderNotFound {
            order_id: "o-1".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = Error::from(DbErr::Custom("disk on fire".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap_or_default();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
        assert_eq!(body["error"], "Internal Server Error");
    }
}
