//! JSON file session store behavior against a real temporary directory.

use roster_core::effects::{SessionStoreEffects, SessionStoreExt, StoreKey};
use roster_core::{AuthToken, Profile, RoleAssignment, RosterError};
use roster_effects::FileSessionStore;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> FileSessionStore {
    FileSessionStore::new(dir.path().join("session").join("store.json"))
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    assert_eq!(store.get_item("token").await.unwrap(), None);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn writes_survive_reopening() {
    let dir = TempDir::new().unwrap();
    let profile = Profile::new(
        "u-1",
        "UnitLeader",
        vec![RoleAssignment::scoped("UnitLeader", "B")],
    );

    {
        let store = store_in(&dir);
        store
            .store_token(&AuthToken::new("abc").unwrap())
            .await
            .unwrap();
        store.store_profile(&profile).await.unwrap();
        store.set_active_unit_id(Some("B")).await.unwrap();
    }

    let reopened = store_in(&dir);
    assert_eq!(reopened.load_token().await.unwrap().unwrap().expose(), "abc");
    assert_eq!(reopened.load_profile().await.unwrap(), Some(profile));
    assert_eq!(reopened.active_unit_id().await.unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn clear_session_persists_removal() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    for key in StoreKey::SESSION_KEYS {
        store.set_item(key.as_str(), "x".into()).await.unwrap();
    }
    store.set_item("onboardingSeen", "true".into()).await.unwrap();

    store.clear_session().await.unwrap();

    let reopened = store_in(&dir);
    for key in StoreKey::SESSION_KEYS {
        assert_eq!(reopened.get_item(key.as_str()).await.unwrap(), None, "{key}");
    }
    assert_eq!(
        reopened.get_item("onboardingSeen").await.unwrap().as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn no_temp_file_is_left_behind() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.set_item("token", "abc".into()).await.unwrap();

    let names: Vec<_> = std::fs::read_dir(store.path().parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("store.json")]);
}

#[tokio::test]
async fn corrupt_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = FileSessionStore::new(&path).get_item("token").await.unwrap_err();
    assert!(matches!(err, RosterError::Serialization { .. }));
}

#[tokio::test]
async fn failed_flush_keeps_reads_in_line_with_disk() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.set_item("token", "old".into()).await.unwrap();

    // A directory squatting on the temp path makes the next flush fail.
    std::fs::create_dir(store.path().with_extension("tmp")).unwrap();

    assert!(store.set_item("token", "new".into()).await.is_err());
    assert!(store.remove_item("token").await.is_err());
    assert_eq!(store.get_item("token").await.unwrap().as_deref(), Some("old"));
    assert_eq!(
        store_in(&dir).get_item("token").await.unwrap().as_deref(),
        Some("old")
    );
}
