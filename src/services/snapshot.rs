//! Snapshot endpoints of the mock control plane.
//!
//! ## Routes
//!
//! ```text
//! GET /internal/<kind>-cell-mappings/?cursor=<token>   one page of <kind>
//! GET /org-cell-mappings/?cursor=<token>               legacy alias for org
//! GET /health                                          liveness check
//! ```
//!
//! Clients start without a cursor and pass `metadata.cursor` back verbatim
//! until `metadata.has_more` is false.

use ::http::{Method, StatusCode};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

use crate::http::{self, Request, Response};
use crate::pagination::PageResolver;
use crate::projection::SnapshotResponse;
use crate::store::{Catalog, EntityKind, UnknownKindError};

const INTERNAL_PREFIX: &str = "/internal/";
const MAPPINGS_SUFFIX: &str = "-cell-mappings";
const LEGACY_ORG_PATH: &str = "/org-cell-mappings";
const HEALTH_PATH: &str = "/health";

/// Methods accepted on every snapshot route
const ALLOWED_METHODS: &str = "GET, HEAD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Health,
    Mappings(EntityKind),
}

/// Serves pages of the catalog for each routed kind
#[derive(Debug)]
pub struct SnapshotService {
    catalog: Arc<Catalog>,
    resolver: PageResolver,
    kinds: Vec<EntityKind>,
}

impl SnapshotService {
    /// Route every known kind. Fails if the catalog lacks a store for one.
    pub fn new(catalog: Arc<Catalog>, resolver: PageResolver) -> Result<Self, UnknownKindError> {
        Self::with_kinds(catalog, resolver, &EntityKind::ALL)
    }

    /// Route only `kinds`, which must all be registered in the catalog
    pub fn with_kinds(
        catalog: Arc<Catalog>,
        resolver: PageResolver,
        kinds: &[EntityKind],
    ) -> Result<Self, UnknownKindError> {
        catalog.validate(kinds)?;
        info!(
            ?kinds,
            page_size = resolver.page_size(),
            "Snapshot routes ready"
        );
        Ok(Self {
            catalog,
            resolver,
            kinds: kinds.to_vec(),
        })
    }

    pub fn handle(&self, request: &Request) -> Response {
        let route = match self.route(request.uri().path()) {
            Some(route) => route,
            None => return http::not_found(),
        };

        if request.method() != Method::GET && request.method() != Method::HEAD {
            return http::method_not_allowed(ALLOWED_METHODS);
        }

        match route {
            Route::Health => http::json(StatusCode::OK, &br#"{"status":"ok"}"#[..]),
            Route::Mappings(kind) => self.mappings(kind, cursor_param(request).as_deref()),
        }
    }

    fn route(&self, path: &str) -> Option<Route> {
        let path = path.trim_end_matches('/');

        if path == HEALTH_PATH {
            return Some(Route::Health);
        }

        let kind = if path == LEGACY_ORG_PATH {
            EntityKind::Org
        } else {
            let slug = path
                .strip_prefix(INTERNAL_PREFIX)?
                .strip_suffix(MAPPINGS_SUFFIX)?;
            EntityKind::from_slug(slug)?
        };

        self.kinds.contains(&kind).then_some(Route::Mappings(kind))
    }

    fn mappings(&self, kind: EntityKind, cursor: Option<&str>) -> Response {
        let store = match self.catalog.store(kind) {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "Routed kind has no store");
                return http::error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
            }
        };

        let page = match self.resolver.resolve(store, cursor) {
            Ok(page) => page,
            Err(e) => {
                warn!(%kind, error = %e, "Rejected cursor");
                return http::error(StatusCode::BAD_REQUEST, &format!("invalid cursor: {e}"));
            }
        };

        trace!(
            %kind,
            total = store.len(),
            records = page.records.len(),
            has_more = page.has_more,
            "Resolved page"
        );

        let body = SnapshotResponse::new(kind, &page, self.catalog.cell_to_locality());
        match serde_json::to_vec(&body) {
            Ok(bytes) => http::json(StatusCode::OK, bytes),
            Err(e) => {
                error!(error = %e, "Failed to serialize snapshot page");
                http::error(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed")
            }
        }
    }
}

/// The `cursor` query parameter, if present and non-empty.
///
/// Unescaped `+` in a query string decodes to a space; base64 never
/// contains spaces, so they are mapped back.
fn cursor_param(request: &Request) -> Option<String> {
    http::query_param(request, "cursor")
        .filter(|cursor| !cursor.is_empty())
        .map(|cursor| cursor.replace(' ', "+"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor;
    use crate::store::{default_localities, generate, EntityRecord, EntityStore};
    use bytes::Bytes;
    use serde_json::{json, Value};

    const START: i64 = 1_700_000_000;

    fn service() -> SnapshotService {
        let catalog = Catalog::generated(15, START);
        SnapshotService::new(Arc::new(catalog), PageResolver::default()).unwrap()
    }

    /// `cursor` is placed in the query string as is, unescaped
    fn request(method: Method, path: &str, cursor: Option<&str>) -> Request {
        let uri = match cursor {
            Some(cursor) => format!("{path}?cursor={cursor}"),
            None => path.to_string(),
        };
        ::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_first_org_page() {
        let response = service().handle(&request(Method::GET, "/internal/org-cell-mappings/", None));
        assert_eq!(response.status(), StatusCode::OK);

        let value = body(&response);
        let data = value["data"].as_array().unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data[0], json!({"id": "0", "slug": "sentry0", "cell": "us1"}));
        assert_eq!(value["metadata"]["has_more"], json!(true));
        assert_eq!(
            value["metadata"]["cell_to_locality"],
            json!({"us1": "us", "us2": "us"})
        );

        let next = cursor::decode(value["metadata"]["cursor"].as_str().unwrap()).unwrap();
        assert_eq!(next.order_key, START + 10);
        assert_eq!(next.id.as_deref(), Some("10"));
    }

    #[test]
    fn test_walk_project_keys() {
        let service = service();
        let mut token: Option<String> = None;
        let mut ids = Vec::new();

        loop {
            let response = service.handle(&request(
                Method::GET,
                "/internal/projectkey-cell-mappings/",
                token.as_deref(),
            ));
            assert_eq!(response.status(), StatusCode::OK);

            let value = body(&response);
            for record in value["data"].as_array().unwrap() {
                assert!(record.get("slug").is_none());
                ids.push(record["id"].as_str().unwrap().to_string());
            }
            if value["metadata"]["has_more"] == json!(false) {
                assert_eq!(value["metadata"]["cursor"], Value::Null);
                break;
            }
            token = value["metadata"]["cursor"].as_str().map(String::from);
        }

        let expected: Vec<String> = (0..15).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_cursor_past_end() {
        let token = cursor::encode(START + 1000, None);
        let response = service().handle(&request(
            Method::GET,
            "/internal/org-cell-mappings/",
            Some(&token),
        ));

        assert_eq!(response.status(), StatusCode::OK);
        let value = body(&response);
        assert_eq!(value["data"], json!([]));
        assert_eq!(value["metadata"]["has_more"], json!(false));
        assert_eq!(value["metadata"]["cursor"], Value::Null);
    }

    #[test]
    fn test_malformed_cursor_is_bad_request() {
        let response = service().handle(&request(
            Method::GET,
            "/internal/org-cell-mappings/",
            Some("!!not-base64!!"),
        ));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body(&response)["detail"]
            .as_str()
            .unwrap()
            .starts_with("invalid cursor"));
    }

    #[test]
    fn test_space_in_cursor_is_plus() {
        let records = ["a", "a>b", "c"]
            .iter()
            .zip(100..)
            .map(|(id, order_key)| EntityRecord {
                id: id.to_string(),
                order_key,
                slug: Some(format!("slug-{id}")),
                cell: "us1".to_string(),
            })
            .collect();
        let mut catalog = Catalog::new(default_localities());
        catalog.register(EntityStore::new(EntityKind::Org, records));
        let service =
            SnapshotService::with_kinds(Arc::new(catalog), PageResolver::new(1), &[EntityKind::Org])
                .unwrap();

        let token = cursor::encode(101, Some("a>b"));
        assert!(token.contains('+'));
        // Sent unescaped, so the query decoder reads each '+' as a space
        let response = service.handle(&request(
            Method::GET,
            "/internal/org-cell-mappings/",
            Some(&token),
        ));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["data"][0]["id"], json!("a>b"));
    }

    #[test]
    fn test_empty_cursor_is_first_page() {
        let response = service().handle(&request(Method::GET, "/org-cell-mappings", Some("")));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["data"][0]["id"], json!("0"));
    }

    #[test]
    fn test_unknown_path() {
        let service = service();
        for path in ["/", "/internal/team-cell-mappings/", "/internal/org", "/internal/"] {
            let response = service.handle(&request(Method::GET, path, None));
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {path}");
        }
    }

    #[test]
    fn test_method_not_allowed() {
        let response = service().handle(&request(Method::POST, "/internal/org-cell-mappings/", None));
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(::http::header::ALLOW).unwrap(),
            ALLOWED_METHODS
        );
    }

    #[test]
    fn test_health() {
        let response = service().handle(&request(Method::GET, "/health", None));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response), json!({"status": "ok"}));
    }

    #[test]
    fn test_missing_store_fails_at_startup() {
        let mut catalog = Catalog::new(default_localities());
        catalog.register(EntityStore::new(
            EntityKind::Org,
            generate(EntityKind::Org, 3, START),
        ));
        let catalog = Arc::new(catalog);

        let err = SnapshotService::new(catalog.clone(), PageResolver::default()).unwrap_err();
        assert_eq!(err, UnknownKindError(EntityKind::ProjectKey));

        let service =
            SnapshotService::with_kinds(catalog, PageResolver::default(), &[EntityKind::Org])
                .unwrap();
        let response = service.handle(&request(
            Method::GET,
            "/internal/projectkey-cell-mappings/",
            None,
        ));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
