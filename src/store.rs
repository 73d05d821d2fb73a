//! Immutable in-memory entity store.
//!
//! Provides, per entity kind:
//! - An ordered list of records, sorted ascending by order key
//! - A shared `cell -> locality` map used for response metadata
//!
//! Stores are built once at startup and never mutated afterwards, so they
//! can be shared between connections behind an `Arc` without locking.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::info;

/// Category of entity served by a snapshot endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Organizations (`id`, `slug`, `cell`)
    Org,
    /// Project keys (`id`, `cell`)
    ProjectKey,
}

impl EntityKind {
    /// All known kinds, in routing order
    pub const ALL: [EntityKind; 2] = [EntityKind::Org, EntityKind::ProjectKey];

    /// Slug used in the `/internal/<slug>-cell-mappings/` path
    pub fn slug(self) -> &'static str {
        match self {
            EntityKind::Org => "org",
            EntityKind::ProjectKey => "projectkey",
        }
    }

    /// Look up a kind from its path slug
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A single snapshot row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// Identifier, unique within its kind
    pub id: String,
    /// Ascending ordering key (a timestamp-like counter)
    pub order_key: i64,
    /// Human readable slug (organizations only)
    pub slug: Option<String>,
    /// Cell the entity lives in
    pub cell: String,
}

/// Ordered, immutable records of one kind
#[derive(Debug, Clone)]
pub struct EntityStore {
    kind: EntityKind,
    records: Vec<EntityRecord>,
}

impl EntityStore {
    /// Build a store, sorting records by order key.
    ///
    /// The sort is stable: records sharing an order key keep the order they
    /// were supplied in, which is then the same for every request.
    pub fn new(kind: EntityKind, mut records: Vec<EntityRecord>) -> Self {
        records.sort_by_key(|record| record.order_key);
        Self { kind, records }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Raised when a route refers to a kind with no registered store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no entity store registered for kind '{0}'")]
pub struct UnknownKindError(pub EntityKind);

/// Dispatch table from kind to store, plus the shared locality map
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    stores: HashMap<EntityKind, EntityStore>,
    cell_to_locality: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(cell_to_locality: BTreeMap<String, String>) -> Self {
        Self {
            stores: HashMap::new(),
            cell_to_locality,
        }
    }

    /// Build the catalog served by default: every kind, `total` records each.
    pub fn generated(total: usize, start_time: i64) -> Self {
        let mut catalog = Self::new(default_localities());
        for kind in EntityKind::ALL {
            catalog.register(EntityStore::new(kind, generate(kind, total, start_time)));
        }
        info!(total, start_time, "Generated snapshot dataset");
        catalog
    }

    /// Register (or replace) the store for its kind
    pub fn register(&mut self, store: EntityStore) {
        self.stores.insert(store.kind(), store);
    }

    pub fn store(&self, kind: EntityKind) -> Result<&EntityStore, UnknownKindError> {
        self.stores.get(&kind).ok_or(UnknownKindError(kind))
    }

    /// Startup check that every routed kind has a store
    pub fn validate(&self, kinds: &[EntityKind]) -> Result<(), UnknownKindError> {
        for &kind in kinds {
            self.store(kind)?;
        }
        Ok(())
    }

    pub fn cell_to_locality(&self) -> &BTreeMap<String, String> {
        &self.cell_to_locality
    }
}

/// Localities for the generated cells
pub fn default_localities() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("us1".to_string(), "us".to_string()),
        ("us2".to_string(), "us".to_string()),
    ])
}

/// Generate `total` records of `kind` with strictly increasing order keys
/// starting at `start_time`.
pub fn generate(kind: EntityKind, total: usize, start_time: i64) -> Vec<EntityRecord> {
    (0..total)
        .map(|i| EntityRecord {
            id: i.to_string(),
            order_key: start_time.saturating_add(i as i64),
            slug: match kind {
                EntityKind::Org => Some(format!("sentry{i}")),
                EntityKind::ProjectKey => None,
            },
            cell: format!("us{}", i % 2 + 1),
        })
        .collect()
}
