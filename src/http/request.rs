//! Request metadata extraction.
//!
//! # Responsibilities
//! - Capture the request fields that go into telemetry
//! - Attach the endpoint label chosen by the router
//!
//! # Design Decisions
//! - Missing fields stay `None` and serialize as null
//! - The peer address comes from `ConnectInfo` when the server was started
//!   with connect info, and is absent otherwise (e.g. in-process tests)

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::header;

use crate::correlation::RequestMetadata;

/// Capture method, path, client and user agent before the body is touched.
pub fn request_metadata(request: &Request, endpoint: &str) -> RequestMetadata {
    let headers = request.headers();
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    RequestMetadata {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        endpoint: endpoint.to_string(),
        query: request.uri().query().map(str::to_string),
        remote_address: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent: header_str(header::USER_AGENT),
        content_length: header_str(header::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extracts_present_fields() {
        let mut request = Request::builder()
            .method("GET")
            .uri("/users?limit=3")
            .header(header::USER_AGENT, "curl/8.0")
            .header(header::CONTENT_LENGTH, "0")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        let meta = request_metadata(&request, "users");
        assert_eq!(meta.method, "GET");
        assert_eq!(meta.path, "/users");
        assert_eq!(meta.endpoint, "users");
        assert_eq!(meta.query.as_deref(), Some("limit=3"));
        assert_eq!(meta.remote_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.content_length, Some(0));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let meta = request_metadata(&request, "root");
        assert!(meta.query.is_none());
        assert!(meta.remote_address.is_none());
        assert!(meta.user_agent.is_none());
        assert!(meta.content_length.is_none());
    }
}
