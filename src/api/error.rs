// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! HTTP status mapping for [`AppError`]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{AppError, StoreError};

pub(crate) fn status_of(error: &AppError) -> StatusCode {
    match error {
        AppError::Device(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        AppError::Device(_) => StatusCode::BAD_GATEWAY,
        AppError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        AppError::Store(StoreError::NotFound(_)) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::Store(StoreError::Backend(_))
        | AppError::Config(_)
        | AppError::Io(_)
        | AppError::Metrics(_)
        | AppError::AddrParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::DeviceError;

    #[test]
    fn test_status_mapping() {
        let timeout = AppError::Device(DeviceError::CommandTimeout {
            command: "/interface/wireguard/print".to_string(),
            after: Duration::from_secs(15),
        });
        assert_eq!(status_of(&timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_of(&AppError::Device(DeviceError::RemoteRejected("no such item".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(&AppError::Store(StoreError::Conflict("dup".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(&AppError::Store(StoreError::NotFound("peer #1".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(&AppError::NotFound("peer #1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(&AppError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(&AppError::Store(StoreError::Backend("disk I/O error".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(&AppError::Metrics("encode".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_status() {
        let response = AppError::NotFound("interface #9".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
