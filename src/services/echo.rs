//! HTTP echo service.
//!
//! Stands in for an upstream when testing proxies: every request, whatever
//! its method or path, is answered with `200`, the request body, and the
//! request headers minus hop-by-hop ones.
//!
//! ```text
//! Request:  POST /api/1/store/ HTTP/1.1
//!           X-Sentry-Auth: abc
//!           Content-Length: 5
//!
//!           hello
//!
//! Response: HTTP/1.1 200 OK
//!           X-Sentry-Auth: abc
//!           Content-Length: 5
//!
//!           hello
//! ```

use ::http::header::{
    HeaderName, CONNECTION, CONTENT_LENGTH, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRAILER, TRANSFER_ENCODING, UPGRADE, USER_AGENT,
};
use tracing::{debug, info};

use crate::http::{Request, Response};

/// Headers that describe a single connection and are never echoed.
/// `content-length` is recomputed for the response body.
static SKIPPED_HEADERS: [HeaderName; 9] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
    CONTENT_LENGTH,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoService;

impl EchoService {
    pub fn handle(&self, request: &Request) -> Response {
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        info!(
            method = %request.method(),
            path = %request.uri().path(),
            user_agent,
            "Echo request"
        );
        for (name, value) in request.headers() {
            debug!(%name, value = ?value, "Echo header");
        }
        if !request.body().is_empty() {
            debug!(body = %String::from_utf8_lossy(request.body()), "Echo body");
        }

        let mut response = Response::new(request.body().clone());
        let headers = response.headers_mut();
        for (name, value) in request.headers() {
            if !SKIPPED_HEADERS.contains(name) {
                headers.append(name, value.clone());
            }
        }
        response
    }
}
