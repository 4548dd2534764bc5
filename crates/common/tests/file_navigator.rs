//! File navigator behaviour against the in-memory runtime

use std::sync::Arc;

use dockhand_common::navigator::{self, NavAction};
use dockhand_common::{EntryKind, Error, FileNavigator, MemoryRuntime, Session};

const CONTAINER: &str = "4f2a9c1e7b3d8a6f5e4c3b2a1908f7e6d5c4b3a2918070605040302010a0b0c0";

fn setup() -> (Arc<MemoryRuntime>, FileNavigator) {
    let runtime = Arc::new(MemoryRuntime::new());
    runtime.add_container(CONTAINER, "web", Some("/data"));
    runtime.add_file(CONTAINER, "/data/notes.txt", b"01234567890123456789");
    runtime.add_dir(CONTAINER, "/data/logs");
    runtime.add_file(CONTAINER, "/data/logs/app.log", b"started\n");
    runtime.add_dir(CONTAINER, "/tmp");
    runtime.add_dir(CONTAINER, "/home");
    let nav = FileNavigator::new(runtime.clone());
    (runtime, nav)
}

#[test]
fn enter_then_up_is_identity() {
    for p in ["/data", "/data/", "/a/b/c", "/usr/local/share/"] {
        let entered = navigator::resolve(&NavAction::Enter { name: "x".into() }, p);
        let back = navigator::resolve(&NavAction::Up, &entered);
        assert_eq!(back, p.trim_end_matches('/'), "path {}", p);
    }

    let entered = navigator::resolve(&NavAction::Enter { name: "x".into() }, "/");
    assert_eq!(entered, "/x");
    assert_eq!(navigator::resolve(&NavAction::Up, &entered), "/");
}

#[test]
fn root_is_unconditional() {
    for p in ["/", "/data/logs", "", "relative/dir", "/tmp/"] {
        assert_eq!(navigator::resolve(&NavAction::Root, p), "/");
    }
}

#[tokio::test]
async fn listing_never_contains_dot_entries() {
    let (_rt, nav) = setup();
    for path in ["/", "/data", "/data/logs", "/tmp"] {
        let mut session = Session::new(CONTAINER, Some(path.to_string()));
        let listing = nav.navigate(&mut session, NavAction::Goto { path: path.into() }).await.unwrap();
        assert!(listing.entries().all(|e| e.name != "." && e.name != ".."));
    }
}

#[tokio::test]
async fn upload_then_download_round_trips() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    nav.upload(&mut session, "blob.bin", &payload).await.unwrap();

    let downloaded = nav.download_file(&mut session, "blob.bin").await.unwrap();
    assert_eq!(downloaded, payload);
}

#[tokio::test]
async fn download_of_missing_path_is_path_error() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    let err = nav.download_file(&mut session, "missing.txt").await.unwrap_err();
    assert!(matches!(err, Error::Path(_)), "got {:?}", err);

    assert!(nav.select_for_download(&mut session, "missing.txt").await.is_err());
    assert!(session.pending_transfer.is_none());
}

#[tokio::test]
async fn second_delete_request_replaces_first() {
    let (rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    nav.request_delete(&mut session, "notes.txt", EntryKind::File).unwrap();
    nav.request_delete(&mut session, "logs", EntryKind::Directory).unwrap();
    assert_eq!(session.delete.pending().unwrap().name, "logs");

    let (removed, listing) = nav.confirm_delete(&mut session).await.unwrap();
    assert_eq!(removed, "/data/logs");
    assert!(!rt.exists(CONTAINER, "/data/logs"));
    assert!(rt.exists(CONTAINER, "/data/notes.txt"));
    assert!(listing.find("notes.txt").is_some());
    assert!(listing.find("logs").is_none());
    assert!(session.delete.pending().is_none());
}

#[tokio::test]
async fn data_directory_scenario() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();
    assert_eq!(session.current_path, "/data");

    let listing = nav.list(&session).await.unwrap();
    assert_eq!(listing.len(), 2);

    let notes = listing.find("notes.txt").unwrap();
    assert!(!notes.is_directory);
    assert_eq!(notes.size_bytes_display, "20");
    assert!(listing.find("logs").unwrap().is_directory);

    nav.navigate(&mut session, NavAction::Enter { name: "logs".into() }).await.unwrap();
    assert_eq!(session.current_path, "/data/logs");

    nav.navigate(&mut session, NavAction::Up).await.unwrap();
    assert_eq!(session.current_path, "/data");
}

#[tokio::test]
async fn empty_upload_is_listed_with_zero_size() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    nav.upload(&mut session, "empty.txt", b"").await.unwrap();

    let listing = nav.list(&session).await.unwrap();
    let entry = listing.find("empty.txt").unwrap();
    assert_eq!(entry.size_bytes_display, "0");
}

#[tokio::test]
async fn failed_navigation_keeps_current_path() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    let err = nav
        .navigate(&mut session, NavAction::Goto { path: "/does/not/exist".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Path(ref msg) if msg.contains("No such file")));
    assert_eq!(session.current_path, "/data");
}

#[tokio::test]
async fn dropped_confirm_leaves_session_usable() {
    let (rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();
    rt.stall_removals(true);

    nav.request_delete(&mut session, "notes.txt", EntryKind::File).unwrap();
    let res = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        nav.confirm_delete(&mut session),
    )
    .await;
    assert!(res.is_err());
    assert!(session.delete.pending().is_none());

    rt.stall_removals(false);
    nav.request_delete(&mut session, "notes.txt", EntryKind::File).unwrap();
    let (removed, _) = nav.confirm_delete(&mut session).await.unwrap();
    assert_eq!(removed, "/data/notes.txt");
    assert!(!rt.exists(CONTAINER, "/data/notes.txt"));
}

#[tokio::test]
async fn navigating_to_a_file_is_refused() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    let err = nav
        .navigate(&mut session, NavAction::Goto { path: "/data/notes.txt".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Path(ref msg) if msg.contains("Not a directory")));
    assert_eq!(session.current_path, "/data");

    let err = nav
        .navigate(&mut session, NavAction::Enter { name: "notes.txt".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Path(_)));
    assert_eq!(session.current_path, "/data");
}

#[tokio::test]
async fn shortcuts_jump_to_fixed_paths() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    nav.navigate(&mut session, NavAction::Tmp).await.unwrap();
    assert_eq!(session.current_path, "/tmp");
    nav.navigate(&mut session, NavAction::Home).await.unwrap();
    assert_eq!(session.current_path, "/home");
    nav.navigate(&mut session, NavAction::Goto { path: "".into() }).await.unwrap();
    assert_eq!(session.current_path, "/");
    nav.navigate(&mut session, NavAction::Goto { path: "data/logs".into() }).await.unwrap();
    assert_eq!(session.current_path, "/data/logs");
}

#[tokio::test]
async fn folder_download_is_named_after_directory() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();
    nav.navigate(&mut session, NavAction::Enter { name: "logs".into() }).await.unwrap();

    let archive = nav.download_folder(&mut session).await.unwrap();
    assert_eq!(archive.filename, "logs.tar");
    assert!(!archive.bytes.is_empty());

    let mut reader = tar::Archive::new(std::io::Cursor::new(archive.bytes));
    let names: Vec<String> = reader
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n == "logs/app.log"));
}

#[tokio::test]
async fn staged_transfer_is_taken_once() {
    let (_rt, nav) = setup();
    let mut session = nav.open(CONTAINER).await.unwrap();

    let staged = nav.select_for_download(&mut session, "notes.txt").await.unwrap();
    assert_eq!(staged.bytes.len(), 20);

    let taken = nav.take_transfer(&mut session).unwrap();
    assert_eq!(taken.filename, "notes.txt");
    assert!(matches!(nav.take_transfer(&mut session), Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn failed_delete_clears_pending_state() {
    let (rt, nav) = setup();
    rt.make_read_only(CONTAINER, "/data/logs");
    let mut session = nav.open(CONTAINER).await.unwrap();

    nav.request_delete(&mut session, "logs", EntryKind::Directory).unwrap();
    let err = nav.confirm_delete(&mut session).await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert!(session.delete.pending().is_none());
    assert!(rt.exists(CONTAINER, "/data/logs"));

    assert!(matches!(nav.confirm_delete(&mut session).await, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn upload_to_read_only_directory_fails() {
    let (rt, nav) = setup();
    rt.make_read_only(CONTAINER, "/data");
    let mut session = nav.open(CONTAINER).await.unwrap();

    let err = nav.upload(&mut session, "x.txt", b"x").await.unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    assert!(!rt.exists(CONTAINER, "/data/x.txt"));
}

#[tokio::test]
async fn unreachable_runtime_is_not_recoverable() {
    let (rt, nav) = setup();
    let session = nav.open(CONTAINER).await.unwrap();
    rt.set_unavailable(true);

    let err = nav.list(&session).await.unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn switching_container_starts_in_its_working_dir() {
    let (rt, nav) = setup();
    rt.add_container("other", "db", Some("/var/lib/db"));
    let mut session = nav.open(CONTAINER).await.unwrap();
    nav.request_delete(&mut session, "notes.txt", EntryKind::File).unwrap();

    let session = nav.switch_container(session, "other").await.unwrap();
    assert_eq!(session.container_id, "other");
    assert_eq!(session.current_path, "/var/lib/db");
    assert!(session.delete.pending().is_none());
}
