//! HTTP request/response types shared by the client and its transports.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient` builds an
//! `HttpRequest` per attempt with `build_request` (a pure function), hands it
//! to a `Transport`, and interprets the returned `HttpResponse`. Keeping the
//! I/O behind the transport seam lets the retry logic be tested against a
//! scripted transport with no network involved.

use std::fmt;

use serde::Serialize;

use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Canonical JSON text. Sent with `content-type: application/json`.
    Json(String),
    /// Text fields sent as `multipart/form-data`. The transport picks the
    /// boundary and the content type.
    Multipart(Vec<(String, String)>),
    /// Bytes sent as-is with no content type forced.
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Serialize `value` into a `Json` body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_string(value)
            .map(RequestBody::Json)
            .map_err(ApiError::Serialization)
    }

    pub fn multipart<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Multipart(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Join `base` and `endpoint` with exactly one `/` between them.
pub fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Build the request for one attempt.
///
/// Header order: content type (JSON bodies only), then authorization (when a
/// non-empty token is given), then `extra_headers`, which replace any earlier
/// header of the same name.
pub fn build_request(
    method: HttpMethod,
    url: &str,
    body: Option<&RequestBody>,
    extra_headers: &[(String, String)],
    token: Option<&str>,
) -> HttpRequest {
    let mut headers: Vec<(String, String)> = Vec::new();
    if let Some(RequestBody::Json(_)) = body {
        headers.push((CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
    }
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
    }
    for (name, value) in extra_headers {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        headers.push((name.clone(), value.clone()));
    }

    HttpRequest {
        method,
        url: url.to_string(),
        headers,
        body: body.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://x/", "/getProducts"), "http://x/getProducts");
        assert_eq!(join_url("http://x", "getProducts"), "http://x/getProducts");
        assert_eq!(join_url("http://x//", "//getProducts"), "http://x/getProducts");
        assert_eq!(
            join_url("http://x/api/", "getOrderDetails/42"),
            "http://x/api/getOrderDetails/42"
        );
    }

    #[test]
    fn get_without_token_has_no_headers() {
        let req = build_request(HttpMethod::Get, "http://x/getUOM", None, &[], None);
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn json_body_sets_content_type() {
        let body = RequestBody::json(&json!({"customer_name": "Jane", "grand_total": 100})).unwrap();
        let req = build_request(HttpMethod::Post, "http://x/insertOrder", Some(&body), &[], None);
        assert_eq!(req.header("Content-Type"), Some(APPLICATION_JSON));
        assert_eq!(
            req.body,
            Some(RequestBody::Json(
                r#"{"customer_name":"Jane","grand_total":100}"#.to_string()
            ))
        );
    }

    #[test]
    fn multipart_and_raw_bodies_get_no_content_type() {
        let form = RequestBody::multipart([("product_id", "7")]);
        let req = build_request(HttpMethod::Post, "http://x/deleteProduct", Some(&form), &[], None);
        assert!(req.header(CONTENT_TYPE).is_none());

        let raw = RequestBody::Raw(vec![0, 1, 2]);
        let req = build_request(HttpMethod::Post, "http://x/upload", Some(&raw), &[], None);
        assert!(req.header(CONTENT_TYPE).is_none());
        assert_eq!(req.body, Some(RequestBody::Raw(vec![0, 1, 2])));
    }

    #[test]
    fn token_becomes_bearer_header() {
        let req = build_request(HttpMethod::Get, "http://x/a", None, &[], Some("abc"));
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));

        let req = build_request(HttpMethod::Get, "http://x/a", None, &[], Some(""));
        assert!(req.header(AUTHORIZATION).is_none());
    }

    #[test]
    fn extra_headers_override_defaults() {
        let body = RequestBody::Json("{}".to_string());
        let extra = vec![
            ("Content-Type".to_string(), "application/vnd.custom+json".to_string()),
            ("x-request-id".to_string(), "r1".to_string()),
        ];
        let req = build_request(HttpMethod::Post, "http://x/a", Some(&body), &extra, None);
        assert_eq!(req.header(CONTENT_TYPE), Some("application/vnd.custom+json"));
        assert_eq!(req.header("X-Request-Id"), Some("r1"));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn response_success_range() {
        let mut resp = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 204;
        assert!(resp.is_success());
        resp.status = 301;
        assert!(!resp.is_success());
        resp.status = 401;
        assert!(!resp.is_success());
    }
}
