//! Error types produced by the catalog crate.
//!
//! Every variant rejects the whole catalog. A catalog that fails validation is
//! never partially loaded, so downstream stages only ever see complete,
//! well-formed [`CatalogItem`](crate::CatalogItem) records.
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`Io`](CatalogError::Io) | Source | Catalog file could not be read |
//! | [`Parse`](CatalogError::Parse) | Source | JSON malformed or a required field missing |
//! | [`DuplicateId`](CatalogError::DuplicateId) | Validation | Two items share an id |
//! | [`InvalidField`](CatalogError::InvalidField) | Validation | A field violates its policy |
//! | [`InvalidImageReference`](CatalogError::InvalidImageReference) | Validation | Image path escapes the image root |

use thiserror::Error;

use crate::ItemId;

/// Errors surfaced while loading or validating a catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog source could not be read.
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },

    /// The catalog JSON is malformed or a record is missing a required field.
    #[error("failed to parse catalog: {0}")]
    Parse(String),

    /// Item ids must be unique across the catalog.
    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),

    /// A field value violates its validation rule.
    #[error("item {id}: invalid {field}: {reason}")]
    InvalidField {
        id: ItemId,
        field: &'static str,
        reason: String,
    },

    /// The image reference is absolute or climbs out of the image root.
    #[error("item {id}: image reference {reference:?} must be a relative path inside the image root")]
    InvalidImageReference { id: ItemId, reference: String },
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_names_item_and_field() {
        let err = CatalogError::InvalidField {
            id: 7,
            field: "price",
            reason: "must be finite".into(),
        };
        let text = err.to_string();
        assert!(text.contains("item 7"));
        assert!(text.contains("price"));
    }

    #[test]
    fn serde_errors_become_parse_errors() {
        let err = serde_json::from_str::<u64>("nope").unwrap_err();
        assert!(matches!(CatalogError::from(err), CatalogError::Parse(_)));
    }
}
