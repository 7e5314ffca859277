use super::common::{strategy_in, ContentCache};
use cache_snapshot::{
    CachePersistenceStrategy, EnvelopeCodec, FixedDirectory, PersistOutcome, ReplaceMode,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::tempdir;

#[test]
fn test_corrupted_bytes_self_heal() {
    let dir = tempdir().unwrap();
    let strategy = strategy_in(dir.path());
    strategy.persist(Some(&ContentCache::new("v1")));

    let mut bytes = fs::read(strategy.path()).unwrap();
    let last = bytes.len() - 2;
    bytes[last] ^= 0xFF;
    fs::write(strategy.path(), &bytes).unwrap();

    assert_eq!(strategy.load::<ContentCache>(), None);
    assert!(!strategy.path().exists());
    // Second load finds nothing and does not error
    assert_eq!(strategy.load::<ContentCache>(), None);
}

#[test]
fn test_truncated_snapshot_self_heals() {
    let dir = tempdir().unwrap();
    let strategy = strategy_in(dir.path());
    strategy.persist(Some(&ContentCache::new("v1")));

    let len = fs::metadata(strategy.path()).unwrap().len();
    let file = OpenOptions::new().write(true).open(strategy.path()).unwrap();
    file.set_len(len / 2).unwrap();
    drop(file);

    assert_eq!(strategy.load::<ContentCache>(), None);
    assert!(!strategy.path().exists());
}

#[test]
fn test_appended_bytes_are_corruption() {
    let dir = tempdir().unwrap();
    let strategy = strategy_in(dir.path());
    strategy.persist(Some(&ContentCache::new("v1")));

    let mut file = OpenOptions::new().append(true).open(strategy.path()).unwrap();
    file.write_all(b"{\"id\":\"v0\"}").unwrap();
    drop(file);

    assert_eq!(strategy.load::<ContentCache>(), None);
    assert!(!strategy.path().exists());
}

#[test]
fn test_schema_change_discards_old_snapshot() {
    let dir = tempdir().unwrap();
    let resolver = FixedDirectory::new(dir.path());

    let old = CachePersistenceStrategy::init(&resolver, EnvelopeCodec::new(1)).unwrap();
    old.persist(Some(&ContentCache::new("v1")));

    let upgraded = CachePersistenceStrategy::init(&resolver, EnvelopeCodec::new(2)).unwrap();
    assert_eq!(upgraded.load::<ContentCache>(), None);
    assert!(!upgraded.path().exists());
}

#[test]
fn test_incompatible_payload_shape_discards_snapshot() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Legacy {
        identifier: u32,
    }

    let dir = tempdir().unwrap();
    let strategy = strategy_in(dir.path());
    strategy.persist(Some(&Legacy { identifier: 9 }));

    assert_eq!(strategy.load::<ContentCache>(), None);
    assert!(!strategy.path().exists());
}

#[test]
fn test_stale_file_that_cannot_be_deleted_is_kept() {
    let dir = tempdir().unwrap();
    let strategy = strategy_in(dir.path()).with_replace_mode(ReplaceMode::InPlace);
    // A directory at the snapshot path cannot be removed with remove_file
    fs::create_dir(strategy.path()).unwrap();

    assert_eq!(
        strategy.persist(Some(&ContentCache::new("v1"))),
        PersistOutcome::Aborted
    );
    assert!(strategy.path().is_dir());
    assert_eq!(strategy.load::<ContentCache>(), None);
    strategy.remove();
    assert!(strategy.path().is_dir());
}
