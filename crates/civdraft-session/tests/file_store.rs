//! Integration tests for `FileStore`.
//!
//! Each test works in its own random directory under the system temp dir.

use std::path::PathBuf;

use civdraft_draft::{CardCatalog, Draft, Phase, Preset};
use civdraft_protocol::DraftId;
use civdraft_session::{unique_id, FileStore, MemoryStore, SessionStore, StoreError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// -- Helpers ----------------------------------------------------------

fn temp_root() -> PathBuf {
    let suffix: u64 = rand::rng().random();
    std::env::temp_dir().join(format!("civdraft-store-{suffix:016x}"))
}

fn draft(id: &str) -> Draft {
    let catalog = CardCatalog::uniform([20, 10, 10, 10, 10]);
    Draft::new(DraftId::new(id), Preset::default(), &catalog, 1_700_000_000_000).unwrap()
}

// =====================================================================
// FileStore
// =====================================================================

#[test]
fn test_file_store_put_then_get_round_trips_record() {
    let root = temp_root();
    let store = FileStore::open(&root).unwrap();
    let mut record = draft("123456789012345");
    record.gamestate.phase = Phase::Setup;
    record.players[0].name = "host".into();

    store.put(&record).unwrap();

    assert!(store.exists(&record.id).unwrap());
    assert!(store.dir().join("123456789012345.json").is_file());
    let loaded = store.get(&record.id).unwrap().unwrap();
    assert_eq!(loaded, record);

    std::fs::remove_dir_all(root).unwrap();
}

#[test]
fn test_file_store_get_missing_returns_none() {
    let root = temp_root();
    let store = FileStore::open(&root).unwrap();

    assert!(store.get(&DraftId::new("999")).unwrap().is_none());
    assert!(!store.exists(&DraftId::new("999")).unwrap());

    std::fs::remove_dir_all(root).unwrap();
}

#[test]
fn test_file_store_path_like_ids_are_never_found_or_written() {
    let root = temp_root();
    let store = FileStore::open(&root).unwrap();

    for bad in ["", "../etc/passwd", "12a", "abc"] {
        let id = DraftId::new(bad);
        assert!(store.get(&id).unwrap().is_none(), "{bad:?}");
        assert!(!store.exists(&id).unwrap(), "{bad:?}");

        let mut record = draft("1");
        record.id = id;
        let result = store.put(&record);
        assert!(matches!(result, Err(StoreError::InvalidId(_))), "{bad:?}");
    }

    std::fs::remove_dir_all(root).unwrap();
}

#[test]
fn test_file_store_corrupt_record_is_serde_error() {
    let root = temp_root();
    let store = FileStore::open(&root).unwrap();
    std::fs::write(store.dir().join("55.json"), b"{ not json").unwrap();

    assert!(matches!(
        store.get(&DraftId::new("55")),
        Err(StoreError::Serde(_))
    ));

    std::fs::remove_dir_all(root).unwrap();
}

#[test]
fn test_file_store_reads_record_written_by_hand() {
    // Minimal record in the on-disk shape, with most fields left to defaults.
    let root = temp_root();
    let store = FileStore::open(&root).unwrap();
    let raw = r#"{
        "id": "77",
        "timestamp": 1,
        "preset": { "slots": 2, "rounds": 3, "rarities": [true, true, true, true, true] },
        "players": [{ "name": "a", "ready": 1 }, { "name": "b", "ready": 0 }],
        "gamestate": { "phase": 2, "turn": 3, "cards": [4, -1, 6], "order": [1, 0] }
    }"#;
    std::fs::write(store.dir().join("77.json"), raw).unwrap();

    let loaded = store.get(&DraftId::new("77")).unwrap().unwrap();
    assert_eq!(loaded.phase(), Phase::Picking);
    assert!(loaded.players[0].ready);
    assert_eq!(loaded.preset.cards_per_roll, 3);
    assert!(loaded.gamestate.cards[1].is_empty());

    std::fs::remove_dir_all(root).unwrap();
}

// =====================================================================
// unique_id()
// =====================================================================

#[test]
fn test_unique_id_skips_taken_ids() {
    let store = MemoryStore::new();
    // The same seed produces the same first id, so the second call has
    // to move past it.
    let first = unique_id(&store, &mut StdRng::seed_from_u64(5)).unwrap();
    store.put(&draft(first.as_str())).unwrap();

    let second = unique_id(&store, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_ne!(first, second);
    assert_eq!(second.as_str().len(), 15);
}
