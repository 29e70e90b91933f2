//! JSON error responses for service failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::service::ServiceError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    /// Reason phrase of the status
    pub error: String,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub error_code: &'static str,
}

/// Wrapper so handlers can return `ServiceError` with `?`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError(ServiceError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::Validation(_) | ServiceError::UnknownSymbology(_) | ServiceError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) | ServiceError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.0 {
            ServiceError::Validation(_) => "INVALID_ARGUMENT",
            ServiceError::UnknownSymbology(_) => "UNKNOWN_BARCODE_TYPE",
            ServiceError::Encoding(_) => "BARCODE_ENCODING_ERROR",
            ServiceError::InvalidImage(_) => "INVALID_IMAGE",
            ServiceError::NotFound(_) => "BARCODE_NOT_FOUND",
            ServiceError::Storage(_) => "STORAGE_ERROR",
            ServiceError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    // Server side failures keep their detail in the logs
    fn client_message(&self) -> String {
        match self.0 {
            ServiceError::Storage(_) => "Failed to access barcode storage".to_string(),
            ServiceError::Unexpected(_) => "An unexpected error occurred".to_string(),
            ref e => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.error_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, error_code = code, "Request failed");
        } else {
            tracing::debug!(error = %self.0, error_code = code, "Request rejected");
        }

        let body = ErrorResponse {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: self.client_message(),
            error_code: code,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;
    use crate::common::BarcodeError;
    use crate::service::store::StoreError;
    use crate::symbology::UnknownSymbology;
    use test_case::test_case;

    #[test_case(ServiceError::Validation("bad".into()), 400, "INVALID_ARGUMENT")]
    #[test_case(ServiceError::UnknownSymbology(UnknownSymbology("x".into())), 400, "UNKNOWN_BARCODE_TYPE")]
    #[test_case(ServiceError::Encoding(BarcodeError::InvalidChar), 422, "BARCODE_ENCODING_ERROR")]
    #[test_case(ServiceError::InvalidImage("eof".into()), 400, "INVALID_IMAGE")]
    #[test_case(ServiceError::NotFound("none".into()), 404, "BARCODE_NOT_FOUND")]
    #[test_case(ServiceError::Storage(StoreError::Disabled), 500, "STORAGE_ERROR")]
    #[test_case(ServiceError::Unexpected("boom".into()), 500, "UNEXPECTED_ERROR")]
    fn test_status_and_code(err: ServiceError, status: u16, code: &str) {
        let err = ApiError(err);
        assert_eq!((err.status().as_u16(), err.error_code()), (status, code));
        assert_eq!(err.into_response().status().as_u16(), status);
    }

    #[test]
    fn test_hides_server_detail() {
        let err = ApiError(ServiceError::Unexpected("/secret/path".into()));
        assert!(!err.client_message().contains("secret"));
        let err = ApiError(ServiceError::Validation("width must be positive".into()));
        assert_eq!(err.client_message(), "width must be positive");
    }
}
