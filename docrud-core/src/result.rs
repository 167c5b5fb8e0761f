//! Result records returned by write operations.

use std::collections::BTreeMap;

use bson::Bson;
use serde::Serialize;

/// The outcome of a write operation.
///
/// Only the fields relevant to the producing operation are populated:
///
/// | operation | fields |
/// |---|---|
/// | `insert_one` | `inserted_id` |
/// | `insert_many` | `inserted_ids` |
/// | `update_one` / `update_many` | `matched_count`, `modified_count`, `upserted_id` |
/// | `delete_one` / `delete_many` | `deleted_count` |
///
/// `matched_count >= modified_count` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<Bson>,
    /// Input position to assigned identifier.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inserted_ids: BTreeMap<usize, Bson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Bson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<u64>,
}

impl OperationResult {
    pub fn inserted_one(id: Bson) -> Self {
        Self {
            acknowledged: true,
            inserted_id: Some(id),
            ..Self::default()
        }
    }

    pub fn inserted_many(ids: BTreeMap<usize, Bson>) -> Self {
        Self {
            acknowledged: true,
            inserted_ids: ids,
            ..Self::default()
        }
    }

    pub fn updated(matched: u64, modified: u64, upserted_id: Option<Bson>) -> Self {
        debug_assert!(matched >= modified);

        Self {
            acknowledged: true,
            matched_count: Some(matched),
            modified_count: Some(modified),
            upserted_id,
            ..Self::default()
        }
    }

    pub fn deleted(count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count: Some(count),
            ..Self::default()
        }
    }
}
