//! HTTP types shared by the services.
//!
//! Connections are served by hyper; services see a request whose body has
//! already been collected and answer with a fully buffered response.

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;

/// Maximum size of the request line plus headers
pub const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Maximum request body size
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Request with its body collected
pub type Request = http::Request<Bytes>;

/// Fully buffered response
pub type Response = http::Response<Bytes>;

/// Collect a request body, rejecting bodies over [`MAX_BODY_SIZE`]
pub async fn collect_body<B>(body: B) -> Result<Bytes, Response>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, MAX_BODY_SIZE).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large",
        )),
        Err(e) => Err(error(
            StatusCode::BAD_REQUEST,
            &format!("failed to read request body: {e}"),
        )),
    }
}

/// First decoded value of a query parameter
pub fn query_param(request: &Request, name: &str) -> Option<String> {
    let query = request.uri().query()?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// A response with a JSON body
pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = http::Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// An error response with a `{"detail": ...}` body
pub fn error(status: StatusCode, detail: &str) -> Response {
    let body = serde_json::json!({ "detail": detail });
    json(status, body.to_string())
}

pub fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Not Found")
}

/// `405` listing the allowed methods
pub fn method_not_allowed(allow: &'static str) -> Response {
    let mut response = error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}
