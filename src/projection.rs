//! Response shapes for snapshot pages.

use crate::pagination::Page;
use crate::store::{EntityKind, EntityRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// A record rendered with the fields its kind exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProjectedRecord<'a> {
    Org {
        id: &'a str,
        slug: &'a str,
        cell: &'a str,
    },
    ProjectKey {
        id: &'a str,
        cell: &'a str,
    },
}

/// Render `record` for `kind`
pub fn project(kind: EntityKind, record: &EntityRecord) -> ProjectedRecord<'_> {
    match kind {
        EntityKind::Org => ProjectedRecord::Org {
            id: &record.id,
            slug: record.slug.as_deref().unwrap_or_default(),
            cell: &record.cell,
        },
        EntityKind::ProjectKey => ProjectedRecord::ProjectKey {
            id: &record.id,
            cell: &record.cell,
        },
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotMetadata<'a> {
    pub cursor: Option<&'a str>,
    pub has_more: bool,
    pub cell_to_locality: &'a BTreeMap<String, String>,
}

/// Envelope returned by every snapshot endpoint
#[derive(Debug, Serialize)]
pub struct SnapshotResponse<'a> {
    pub data: Vec<ProjectedRecord<'a>>,
    pub metadata: SnapshotMetadata<'a>,
}

impl<'a> SnapshotResponse<'a> {
    pub fn new(
        kind: EntityKind,
        page: &'a Page<'a>,
        cell_to_locality: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            data: page.records.iter().map(|record| project(kind, record)).collect(),
            metadata: SnapshotMetadata {
                cursor: page.next_cursor.as_deref(),
                has_more: page.has_more,
                cell_to_locality,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{default_localities, generate};
    use serde_json::json;

    #[test]
    fn test_project_org() {
        let records = generate(EntityKind::Org, 2, 0);
        let value = serde_json::to_value(project(EntityKind::Org, &records[1])).unwrap();
        assert_eq!(value, json!({"id": "1", "slug": "sentry1", "cell": "us2"}));
    }

    #[test]
    fn test_project_key_omits_slug() {
        let records = generate(EntityKind::ProjectKey, 1, 0);
        let value = serde_json::to_value(project(EntityKind::ProjectKey, &records[0])).unwrap();
        assert_eq!(value, json!({"id": "0", "cell": "us1"}));
    }

    #[test]
    fn test_terminal_envelope() {
        let records = generate(EntityKind::Org, 1, 0);
        let localities = default_localities();
        let page = Page {
            records: &records,
            next_cursor: None,
            has_more: false,
        };

        let value = serde_json::to_value(SnapshotResponse::new(EntityKind::Org, &page, &localities))
            .unwrap();
        assert_eq!(
            value,
            json!({
                "data": [{"id": "0", "slug": "sentry0", "cell": "us1"}],
                "metadata": {
                    "cursor": null,
                    "has_more": false,
                    "cell_to_locality": {"us1": "us", "us2": "us"}
                }
            })
        );
    }
}
