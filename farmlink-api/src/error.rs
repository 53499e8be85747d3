use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use farmlink_catalog::CatalogError;
use farmlink_core::{AccountError, CoreError, StoreError};
use farmlink_order::{OrderError, TransitionDenied};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    /// The target exists but is not in a state that allows the operation
    InvalidState(String),
    NotFoundError(String),
    ConflictError(String),
    InvalidTransition(TransitionDenied),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidState(msg) => {
                let body = Json(json!({
                    "error": msg,
                    "code": "invalid_state",
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidTransition(denied) => {
                let body = Json(json!({
                    "error": "Invalid status transition",
                    "code": "invalid_transition",
                    "current_status": denied.current,
                    "requested_status": denied.requested,
                    "valid_transitions": denied.valid_next,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            },
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::ConflictError(msg),
            other => AppError::Anyhow(other.into()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(msg) => AppError::NotFoundError(msg),
            OrderError::Forbidden(msg) => AppError::AuthorizationError(msg),
            OrderError::InvalidState(msg) => AppError::InvalidState(msg),
            OrderError::Validation(msg) => AppError::ValidationError(msg),
            OrderError::InvalidTransition(denied) => AppError::InvalidTransition(denied),
            OrderError::Storage(err) => err.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => AppError::NotFoundError(msg),
            CatalogError::Forbidden(msg) => AppError::AuthorizationError(msg),
            CatalogError::Validation(msg) => AppError::ValidationError(msg),
            CatalogError::Storage(err) => err.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
            CoreError::IdentityError(msg) => AppError::AuthenticationError(msg),
            CoreError::InternalError(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => AppError::ValidationError(msg),
            AccountError::Conflict(msg) => AppError::ConflictError(msg),
            AccountError::InvalidCredentials | AccountError::Deactivated => {
                AppError::AuthenticationError(err.to_string())
            }
            AccountError::NotFound(msg) => AppError::NotFoundError(msg),
            AccountError::Core(err) => err.into(),
            AccountError::Storage(err) => err.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use farmlink_order::OrderStatus;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_transition_body() {
        let denied = TransitionDenied::new(OrderStatus::Pending, OrderStatus::Shipped);
        let (status, body) = body_json(OrderError::from(denied).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_transition");
        assert_eq!(body["current_status"], "pending");
        assert_eq!(body["requested_status"], "shipped");
        assert_eq!(body["valid_transitions"], json!(["accepted", "rejected"]));
    }

    #[tokio::test]
    async fn test_invalid_state_is_distinguishable_from_validation() {
        let unavailable = OrderError::InvalidState("Product is not available for ordering (status: closed)".into());
        let (status, body) = body_json(unavailable.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_state");

        let (status, body) = body_json(OrderError::Validation("Quantity must be greater than 0".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_hides_detail() {
        let err = StoreError::Decode("orders.status 'bogus'".into());
        let (status, body) = body_json(OrderError::Storage(err).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_account_errors_map_to_http() {
        let (status, _) = body_json(AccountError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = body_json(AccountError::Conflict("Phone number already registered".into()).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Phone number already registered");
    }
}
