//! Outcome to HTTP response mapping.
//!
//! # Responsibilities
//! - Render the handler body, or the canned body of a fault
//! - Stamp `x-correlation-id` and `traceparent` on every response
//!
//! # Design Decisions
//! - Outage faults are 503, error-rate faults and handler failures are 500
//! - Fault bodies carry the version label so canary traffic is recognizable

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::fault::FaultKind;
use crate::lifecycle::{HandledRequest, RequestOutcome, ResponseBody};

pub const X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");
pub const TRACEPARENT: HeaderName = HeaderName::from_static("traceparent");

/// Map a finished request to its HTTP response with correlation headers.
pub fn into_response(handled: HandledRequest, version_label: &str) -> Response {
    let status = StatusCode::from_u16(handled.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = match handled.outcome {
        RequestOutcome::Healthy(ok) => match ok.body {
            ResponseBody::Text(text) => (status, text).into_response(),
            ResponseBody::Json(value) => (status, Json(value)).into_response(),
        },
        RequestOutcome::Fault(FaultKind::Outage) => {
            (status, format!("Service Unavailable [{version_label}]")).into_response()
        }
        RequestOutcome::Fault(FaultKind::ErrorRate) => {
            (status, format!("ERROR [{version_label}]")).into_response()
        }
        RequestOutcome::Failed(_) => {
            (status, format!("Internal Server Error [{version_label}]")).into_response()
        }
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&handled.correlation_id.to_string()) {
        headers.insert(X_CORRELATION_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&handled.traceparent) {
        headers.insert(TRACEPARENT, value);
    }
    response
}
