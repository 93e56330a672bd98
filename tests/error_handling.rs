//! Failure modes across crate boundaries.

use std::fs;
use std::sync::Arc;

use prodmatch::{
    BuildError, Catalog, CatalogError, CatalogItem, EmbedConfig, EmbedMode, EmbeddingStore,
    IndexBuilder, IndexError, MatchError, ProductMatcher, SearchOptions, StoreDir, StoreHandle,
    StubEmbedder, build_embedder, l2_normalized, search,
};
use tempfile::TempDir;

#[test]
fn opening_a_missing_store_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = StoreHandle::open(StoreDir::new(dir.path().join("never-built"))).unwrap_err();
    assert!(matches!(err, IndexError::NotFound { .. }));
}

#[test]
fn misaligned_artifacts_refuse_to_load() {
    let dir = TempDir::new().unwrap();
    let store_dir = StoreDir::new(dir.path());
    let vectors = vec![
        l2_normalized(&[1.0, 2.0]).unwrap(),
        l2_normalized(&[2.0, 1.0]).unwrap(),
    ];
    let generation = store_dir.save(&[1, 2], &vectors).unwrap();
    fs::write(
        dir.path().join(&generation).join(index::IDS_FILE),
        b"[1, 2, 3]",
    )
    .unwrap();

    let err = StoreHandle::open(store_dir).unwrap_err();
    assert!(matches!(err, IndexError::Corrupt(_)));
}

#[test]
fn save_rejects_mismatched_lengths() {
    let dir = TempDir::new().unwrap();
    let err = StoreDir::new(dir.path())
        .save(&[1, 2, 3], &[l2_normalized(&[1.0]).unwrap()])
        .unwrap_err();
    assert_eq!(err, IndexError::ShapeMismatch { ids: 3, vectors: 1 });
}

#[test]
fn wrong_query_dimension_is_rejected() {
    let vectors = vec![l2_normalized(&vec![0.5; 512]).unwrap()];
    let err = search(&[1.0, 0.0, 0.0], 5, &vectors, &[7]).unwrap_err();
    assert_eq!(
        err,
        IndexError::DimensionMismatch {
            expected: 512,
            actual: 3
        }
    );
}

#[test]
fn empty_store_answers_with_nothing() {
    assert!(search(&[1.0, 0.0, 0.0], 3, &[], &[]).unwrap().is_empty());
}

#[test]
fn invalid_catalog_is_rejected_whole() {
    let json = br#"[
        {"id": 1, "name": "A", "category": "x", "price": 1.0, "description": "", "image_url": "a.jpg"},
        {"id": 1, "name": "B", "category": "x", "price": 1.0, "description": "", "image_url": "b.jpg"}
    ]"#;
    assert_eq!(
        Catalog::from_json_slice(json).unwrap_err(),
        CatalogError::DuplicateId(1)
    );

    let json = br#"[{"id": 1, "name": "A", "category": "x", "price": 1.0,
                     "description": "", "image_url": "../../etc/passwd"}]"#;
    assert!(matches!(
        Catalog::from_json_slice(json),
        Err(CatalogError::InvalidImageReference { .. })
    ));
}

#[test]
fn unwritable_store_fails_the_build() {
    let dir = TempDir::new().unwrap();
    // a regular file where the store directory should go
    let blocker = dir.path().join("store");
    fs::write(&blocker, b"not a directory").unwrap();

    let catalog = Catalog::from_items(vec![CatalogItem {
        id: 1,
        name: "Lamp".into(),
        category: "Home".into(),
        price: 40.0,
        description: String::new(),
        image_reference: "lamp.jpg".into(),
    }])
    .unwrap();
    fs::write(dir.path().join("lamp.jpg"), b"lamp bytes").unwrap();

    let embedder = build_embedder(&EmbedConfig {
        mode: EmbedMode::Stub,
        dim: 8,
        ..Default::default()
    })
    .unwrap();
    let err = IndexBuilder::new(embedder)
        .build(&catalog, dir.path(), &StoreDir::new(&blocker))
        .unwrap_err();
    assert!(matches!(err, BuildError::Store(IndexError::Io(_))));
}

#[test]
fn reload_refuses_store_from_another_embedder() {
    let dir = TempDir::new().unwrap();
    let store_dir = StoreDir::new(dir.path());
    store_dir.save_store(&EmbeddingStore::empty(16)).unwrap();

    let matcher = ProductMatcher::new(
        Catalog::default(),
        StoreHandle::open(store_dir.clone()).unwrap(),
        Arc::new(StubEmbedder::new(16).unwrap()),
    )
    .unwrap();

    store_dir
        .save(&[1], &[l2_normalized(&[1.0, 0.0, 0.0]).unwrap()])
        .unwrap();
    let err = matcher.reload().unwrap_err();
    assert!(matches!(
        err,
        MatchError::StoreMismatch {
            store_dim: 3,
            embedder_dim: 16,
            ..
        }
    ));
    assert!(matcher.store().snapshot().store.is_empty());
    assert!(matcher
        .match_vector(&[0.25; 16], SearchOptions::top(3))
        .unwrap()
        .is_empty());
}
