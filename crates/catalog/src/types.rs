use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog item.
pub type ItemId = u64;

/// One product record as stored in `products.json`.
///
/// Records are immutable once a build has indexed them. The image path is kept
/// relative; callers resolve it against an image root with
/// [`Catalog::resolve_image`](crate::Catalog::resolve_image).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Unique, stable item id. Positionally aligned with vectors in the store.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Product category.
    pub category: String,
    /// Unit price, finite and non-negative.
    pub price: f64,
    /// Free-form description.
    pub description: String,
    /// Image path relative to the image root. Serialized as `image_url` to stay
    /// compatible with existing catalogs.
    #[serde(rename = "image_url", alias = "image_reference")]
    pub image_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_image_url_field() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 1,
            "name": "Black Apparel Item",
            "category": "Apparel",
            "price": 26.0,
            "description": "A high-quality black apparel item.",
            "image_url": "product_1.jpg"
        }))
        .unwrap();

        assert_eq!(item.id, 1);
        assert_eq!(item.image_reference, "product_1.jpg");
    }

    #[test]
    fn accepts_image_reference_alias() {
        let item: CatalogItem = serde_json::from_value(json!({
            "id": 2,
            "name": "n",
            "category": "c",
            "price": 1.5,
            "description": "d",
            "image_reference": "img/2.png"
        }))
        .unwrap();
        assert_eq!(item.image_reference, "img/2.png");
    }

    #[test]
    fn missing_field_is_rejected() {
        let result = serde_json::from_value::<CatalogItem>(json!({
            "id": 3,
            "name": "n",
            "price": 1.0,
            "description": "d",
            "image_url": "3.png"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn serializes_back_to_image_url() {
        let item = CatalogItem {
            id: 4,
            name: "n".into(),
            category: "c".into(),
            price: 2.0,
            description: "d".into(),
            image_reference: "4.png".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["image_url"], "4.png");
    }
}
