//! Artifact store behavior through the public API.

use carousel_gen::store::{ArtifactStore, StoreError, new_carousel_id};
use carousel_gen::types::{ArtifactFile, CarouselArtifactSet};
use std::time::Duration;
use tempfile::TempDir;

fn carousel(n: usize) -> CarouselArtifactSet {
    CarouselArtifactSet {
        carousel_id: new_carousel_id(),
        files: (1..=n)
            .map(|i| ArtifactFile {
                filename: format!("slide_{i}.png"),
                bytes: vec![i as u8; 16],
            })
            .collect(),
    }
}

#[test]
fn saved_files_are_retrievable_until_swept() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::open(tmp.path().join("store")).unwrap();
    let set = carousel(3);
    store.save(&set).unwrap();

    for i in 1..=3 {
        let bytes = store
            .get(&set.carousel_id, &format!("slide_{i}.png"))
            .unwrap();
        assert_eq!(bytes, vec![i as u8; 16]);
    }
    assert_eq!(
        store.list(&set.carousel_id).unwrap(),
        ["slide_1.png", "slide_2.png", "slide_3.png"]
    );

    let report = store.sweep_expired(Duration::ZERO).unwrap();
    assert_eq!(report.removed, [set.carousel_id.clone()]);
    assert!(matches!(
        store.get(&set.carousel_id, "slide_1.png"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn traversal_attempts_are_forbidden() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("passwd"), "root").unwrap();
    let store = ArtifactStore::open(tmp.path().join("store")).unwrap();
    let set = carousel(1);
    store.save(&set).unwrap();

    for (id, file) in [
        (set.carousel_id.as_str(), "../../passwd"),
        (set.carousel_id.as_str(), "slide_1.png; rm -rf"),
        ("..", "passwd"),
        ("../store", "slide_1.png"),
        (set.carousel_id.as_str(), "/etc/passwd"),
        (set.carousel_id.as_str(), "slide_1.png/.."),
    ] {
        assert!(
            matches!(store.get(id, file), Err(StoreError::Forbidden(_))),
            "{id:?}/{file:?} was not rejected"
        );
    }
}

#[test]
fn sweep_spares_fresh_carousels() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::open(tmp.path().join("store")).unwrap();
    let a = carousel(1);
    let b = carousel(2);
    store.save(&a).unwrap();
    store.save(&b).unwrap();

    let report = store.sweep_expired(Duration::from_secs(24 * 3600)).unwrap();
    assert!(report.removed.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.kept, 2);
    assert!(store.get(&b.carousel_id, "slide_2.png").is_ok());

    let report = store.sweep_expired(Duration::ZERO).unwrap();
    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.kept, 0);
}

#[test]
fn sweep_on_empty_store_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::open(tmp.path().join("store")).unwrap();
    let report = store.sweep_expired(Duration::ZERO).unwrap();
    assert_eq!(report.to_string(), "0 removed, 0 kept");
}
