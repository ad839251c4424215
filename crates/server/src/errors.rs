use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::ServiceError;
use service::notice::Notice;

/// A failed request: HTTP status plus the notice the page should show.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub notice: Notice,
}

impl ApiError {
    pub fn new(status: StatusCode, notice: Notice) -> Self { Self { status, notice } }

    pub fn dismiss_after(mut self, ms: u64) -> Self {
        self.notice = self.notice.dismiss_after(ms);
        self
    }
}

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Unauthorized | ServiceError::PermissionDenied(_) => StatusCode::UNAUTHORIZED,
        ServiceError::Storage(_) | ServiceError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self { status: status_for(&err), notice: Notice::from_error(&err) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "notice": self.notice }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::notice::Severity;

    #[test]
    fn maps_service_errors() {
        let e = ApiError::from(ServiceError::validation("username must be 3-20 characters"));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.notice.severity, Severity::Error);

        let e = ApiError::from(ServiceError::conflict("email is already registered"));
        assert_eq!(e.status, StatusCode::CONFLICT);

        let e = ApiError::from(ServiceError::PermissionDenied("please log in".into())).dismiss_after(1000);
        assert_eq!(e.status, StatusCode::UNAUTHORIZED);
        assert_eq!(e.notice.severity, Severity::Warning);
        assert_eq!(e.notice.dismiss_after_ms, 1000);

        assert_eq!(status_for(&ServiceError::storage("io")), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
