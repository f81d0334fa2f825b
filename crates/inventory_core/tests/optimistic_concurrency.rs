use inventory_core::{
    ConnectionManager, DbLocation, EquipmentDb, EquipmentPatch, NewEquipment, RepoError,
};
use std::path::Path;

fn file_repo(path: &Path) -> EquipmentDb {
    EquipmentDb::new(ConnectionManager::new(DbLocation::File(path.to_path_buf())))
}

#[test]
fn stale_update_from_another_connection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let mut first = file_repo(&path);
    let mut second = file_repo(&path);

    let id = first.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    let seen_by_first = first.get_by_id(&id).unwrap().unwrap();

    second
        .update(
            &id,
            EquipmentPatch {
                location: Some("Bay 9".to_string()),
                ..EquipmentPatch::default()
            },
        )
        .unwrap();

    let err = first
        .update_if_version(
            &id,
            seen_by_first.audit.version,
            EquipmentPatch {
                name: Some("Press-X".to_string()),
                ..EquipmentPatch::default()
            },
        )
        .unwrap_err();
    match err {
        RepoError::Conflict {
            expected_version,
            actual_version,
            ..
        } => {
            assert_eq!(expected_version, 1);
            assert_eq!(actual_version, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let stored = first.get_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.name, "Press-1");
    assert_eq!(stored.location, "Bay 9");
    assert_eq!(stored.audit.version, 2);
}

#[test]
fn versioned_update_and_delete_succeed_when_current() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = file_repo(&dir.path().join("inventory.db"));

    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    repo.update_if_version(
        &id,
        1,
        EquipmentPatch {
            serial_number: Some("SN-1".to_string()),
            ..EquipmentPatch::default()
        },
    )
    .unwrap();
    repo.delete_if_version(&id, 2).unwrap();

    let stored = repo.get_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.serial_number, "SN-1");
    assert!(stored.audit.deleted);
    assert_eq!(stored.audit.version, 3);

    let err = repo.delete_if_version(&id, 2).unwrap_err();
    assert!(matches!(err, RepoError::Conflict { .. }));
}

#[test]
fn records_survive_release_and_reopen_of_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = file_repo(&dir.path().join("inventory.db"));

    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    assert!(repo.is_connected());

    repo.release();
    assert!(!repo.is_connected());

    let loaded = repo.get_by_id(&id).unwrap().unwrap();
    assert_eq!(loaded.name, "Press-1");
    assert!(repo.is_connected());
}

#[test]
fn corrupted_document_is_reported_as_invalid_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let mut repo = file_repo(&path);
    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE equipment SET document = json_set(document, '$.name', '') WHERE id = ?1",
        [id.as_str()],
    )
    .unwrap();
    drop(raw);

    let err = repo.get_by_id(&id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

fn rewrite_document(path: &Path, id: &str, edit: impl FnOnce(&mut serde_json::Value)) {
    let raw = rusqlite::Connection::open(path).unwrap();
    let stored: String = raw
        .query_row("SELECT document FROM equipment WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .unwrap();
    let mut document: serde_json::Value = serde_json::from_str(&stored).unwrap();
    edit(&mut document);
    raw.execute(
        "UPDATE equipment SET document = ?1 WHERE id = ?2",
        [document.to_string().as_str(), id],
    )
    .unwrap();
}

#[test]
fn exhausted_version_is_reported_as_invalid_data_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let mut repo = file_repo(&path);
    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    rewrite_document(&path, &id, |document| {
        document["version"] = serde_json::json!(u64::MAX);
    });

    let err = repo
        .update(
            &id,
            EquipmentPatch {
                location: Some("Bay 4".to_string()),
                ..EquipmentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(matches!(repo.delete(&id).unwrap_err(), RepoError::InvalidData(_)));

    let stored = repo.get_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.location, "Bay 3");
    assert_eq!(stored.audit.version, u64::MAX);
    assert!(!stored.audit.deleted);
}

#[test]
fn version_beyond_sqlite_integer_range_is_invalid_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let mut repo = file_repo(&path);
    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    rewrite_document(&path, &id, |document| {
        document["version"] = serde_json::json!(i64::MAX as u64 + 1);
    });

    let err = repo.delete(&id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(!repo.get_by_id(&id).unwrap().unwrap().audit.deleted);
}

#[test]
fn document_without_deleted_flag_is_active_on_both_read_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.db");
    let mut repo = file_repo(&path);
    let id = repo.create(NewEquipment::new("Press-1", "Bay 3")).unwrap();
    rewrite_document(&path, &id, |document| {
        document.as_object_mut().unwrap().remove("deleted");
    });

    let loaded = repo.get_by_id(&id).unwrap().unwrap();
    assert!(!loaded.audit.deleted);

    let listed = repo.list_all().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);

    repo.delete(&id).unwrap();
    assert!(repo.list_all().unwrap().is_empty());
}
