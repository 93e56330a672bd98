//! # prodmatch catalog
//!
//! Loads the product catalog (`products.json`) into explicit, validated
//! [`CatalogItem`] records. Validation happens once, at load time, and is
//! all-or-nothing: a catalog with a duplicate id, a blank name, a bad price, or
//! an image path that escapes the image root is rejected as a whole.
//!
//! ```
//! use catalog::Catalog;
//!
//! let json = br#"[{"id": 1, "name": "Blue Apparel Item", "category": "Apparel",
//!                  "price": 26.0, "description": "A blue item.", "image_url": "product_1.jpg"}]"#;
//! let catalog = Catalog::from_json_slice(json).unwrap();
//! assert_eq!(catalog.get(1).unwrap().name, "Blue Apparel Item");
//! ```

mod error;
mod types;

pub use crate::error::CatalogError;
pub use crate::types::{CatalogItem, ItemId};

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// An ordered, validated product catalog with id lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    by_id: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Read and validate a catalog from a JSON file holding an array of items.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| CatalogError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let catalog = Self::from_json_slice(&bytes)?;
        tracing::info!(
            path = %path.display(),
            items = catalog.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse and validate a catalog from raw JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        let items: Vec<CatalogItem> = serde_json::from_slice(bytes)?;
        Self::from_items(items)
    }

    /// Validate already-constructed items, keeping their order.
    pub fn from_items(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            validate_item(item)?;
            if by_id.insert(item.id, position).is_some() {
                return Err(CatalogError::DuplicateId(item.id));
            }
        }
        Ok(Self { items, by_id })
    }

    /// Look up an item by id.
    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.by_id.get(&id).map(|&position| &self.items[position])
    }

    /// Items in catalog order.
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve an item's image reference under `image_root`.
    ///
    /// References were validated as relative and free of `..` at load time, so
    /// the joined path always stays inside the root.
    pub fn resolve_image(image_root: &Path, item: &CatalogItem) -> PathBuf {
        image_root.join(&item.image_reference)
    }
}

fn validate_item(item: &CatalogItem) -> Result<(), CatalogError> {
    if item.name.trim().is_empty() {
        return Err(CatalogError::InvalidField {
            id: item.id,
            field: "name",
            reason: "must not be blank".into(),
        });
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(CatalogError::InvalidField {
            id: item.id,
            field: "price",
            reason: format!("must be finite and non-negative, got {}", item.price),
        });
    }
    if !is_contained_relative_path(&item.image_reference) {
        return Err(CatalogError::InvalidImageReference {
            id: item.id,
            reference: item.image_reference.clone(),
        });
    }
    Ok(())
}

fn is_contained_relative_path(reference: &str) -> bool {
    if reference.trim().is_empty() {
        return false;
    }
    let path = Path::new(reference);
    let mut saw_normal = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => saw_normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    saw_normal
}
