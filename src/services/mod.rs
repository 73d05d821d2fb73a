//! Request handlers.
//!
//! Each service maps a collected HTTP request to a response:
//! - `snapshot`: Paginated cell-mapping snapshots for each entity kind
//! - `echo`: Echoes request headers and body, for proxy testing
//!
//! The server runs exactly one service, chosen at startup.

pub mod echo;
pub mod snapshot;

use crate::config::{Config, ServiceMode};
use crate::http::{Request, Response};
use crate::pagination::PageResolver;
use crate::store::{Catalog, UnknownKindError};
use std::sync::Arc;

pub use echo::EchoService;
pub use snapshot::SnapshotService;

/// The service a server instance runs
#[derive(Debug)]
pub enum Service {
    Snapshot(SnapshotService),
    Echo(EchoService),
}

impl Service {
    /// Build the service selected by `config`.
    ///
    /// Fails when a snapshot route has no entity store registered.
    pub fn from_config(config: &Config) -> Result<Self, UnknownKindError> {
        match config.mode {
            ServiceMode::Snapshot => {
                let start_time = config
                    .start_time
                    .unwrap_or_else(|| chrono::Utc::now().timestamp());
                let catalog = Catalog::generated(config.total_results, start_time);
                let service =
                    SnapshotService::new(Arc::new(catalog), PageResolver::new(config.page_size))?;
                Ok(Service::Snapshot(service))
            }
            ServiceMode::Echo => Ok(Service::Echo(EchoService)),
        }
    }

    pub fn handle(&self, request: &Request) -> Response {
        match self {
            Service::Snapshot(service) => service.handle(request),
            Service::Echo(service) => service.handle(request),
        }
    }
}
