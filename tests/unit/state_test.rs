//! Unit tests for the state store and legacy migration

use std::fs;

use tscan::scanner::{ExtractorOutput, SenderRole, StateStore, STATE_VERSION};

use crate::helpers::{human, Workspace};

fn write_legacy_last_message(ws: &Workspace, id: &str, offset: u64) {
    fs::create_dir_all(&ws.state_dir).unwrap();
    fs::write(
        ws.state_dir.join(format!("last-message-{}.json", id)),
        format!(
            r#"{{"offset":{},"mtime":1737280800000,"lastMessage":{{"timestamp":1737280800000,"preview":"legacy preview","sender":"human","turnNumber":3}}}}"#,
            offset
        ),
    )
    .unwrap();
}

fn write_legacy_secrets(ws: &Workspace, id: &str, offset: u64) {
    fs::create_dir_all(&ws.state_dir).unwrap();
    fs::write(
        ws.state_dir.join(format!("secrets-{}.json", id)),
        format!(
            r#"{{"offset":{},"mtime":1737280700000,"knownFingerprints":["aws_access_key:00112233aabbccdd"]}}"#,
            offset
        ),
    )
    .unwrap();
}

#[test]
fn legacy_last_message_file_is_migrated_and_saved() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 120);
    let store = StateStore::new(&ws.state_dir);

    let state = store.load("abc").unwrap();
    assert_eq!(state.version, STATE_VERSION);
    assert_eq!(state.last_offset, 120);
    assert_eq!(state.last_mtime_ms, 1_737_280_800_000);
    match &state.record("last_message").unwrap().output {
        ExtractorOutput::LastMessage(info) => {
            assert_eq!(info.preview, "legacy preview");
            assert_eq!(info.sender, SenderRole::Human);
            assert_eq!(info.turn_number, 3);
        }
        other => panic!("unexpected output: {:?}", other),
    }

    // Saved in the current schema; the legacy file is left alone
    assert!(store.state_path("abc").exists());
    assert!(ws.state_dir.join("last-message-abc.json").exists());
    assert_eq!(store.load("abc"), Some(state));
}

#[test]
fn legacy_secrets_file_is_migrated() {
    let ws = Workspace::new();
    write_legacy_secrets(&ws, "abc", 64);
    let state = StateStore::new(&ws.state_dir).load("abc").unwrap();

    assert_eq!(state.last_offset, 64);
    match &state.record("secrets").unwrap().output {
        ExtractorOutput::Secrets(secrets) => {
            assert_eq!(secrets.len(), 1);
            assert_eq!(secrets[0].kind, "aws_access_key");
            assert_eq!(secrets[0].fingerprint, "aws_access_key:00112233aabbccdd");
        }
        other => panic!("unexpected output: {:?}", other),
    }
}

#[test]
fn both_legacy_files_merge_at_the_smaller_offset() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 500);
    write_legacy_secrets(&ws, "abc", 300);

    let state = StateStore::new(&ws.state_dir).load("abc").unwrap();
    assert_eq!(state.last_offset, 300);
    assert_eq!(state.last_mtime_ms, 1_737_280_700_000);
    assert!(state.record("last_message").is_some());
    assert!(state.record("secrets").is_some());
}

#[test]
fn malformed_legacy_file_is_skipped() {
    let ws = Workspace::new();
    fs::create_dir_all(&ws.state_dir).unwrap();
    fs::write(ws.state_dir.join("secrets-abc.json"), "{oops").unwrap();
    write_legacy_last_message(&ws, "abc", 10);

    let state = StateStore::new(&ws.state_dir).load("abc").unwrap();
    assert_eq!(state.last_offset, 10);
    assert!(state.record("secrets").is_none());
}

#[test]
fn current_schema_takes_precedence_over_legacy() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 10);
    let store = StateStore::new(&ws.state_dir);

    let mut current = StateStore::create_initial(1);
    current.last_offset = 999;
    assert!(store.save("abc", &current));

    assert_eq!(store.load("abc").unwrap().last_offset, 999);
}

#[test]
fn corrupt_current_file_does_not_resurrect_legacy_state() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 10);
    fs::write(ws.state_dir.join("abc.json"), "garbage").unwrap();

    assert!(StateStore::new(&ws.state_dir).load("abc").is_none());
}

#[test]
fn delete_removes_legacy_files_too() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 10);
    write_legacy_secrets(&ws, "abc", 10);
    let store = StateStore::new(&ws.state_dir);
    store.load("abc").unwrap();

    assert!(store.delete("abc").unwrap());
    assert!(store.load("abc").is_none());
    assert!(fs::read_dir(&ws.state_dir).unwrap().next().is_none());
}

#[test]
fn scan_resumes_from_migrated_offset() {
    let ws = Workspace::new();
    let old = human("already seen", 1);
    ws.append(&old);
    write_legacy_last_message(&ws, "abc", old.len() as u64);

    ws.append(&human("new message", 2));
    let result = ws.scanner().scan("abc", &ws.transcript);

    assert_eq!(result.metrics.lines_scanned, 1);
    assert_eq!(result.last_message.preview, "new message");
    // The legacy turn number seeds the running total
    assert_eq!(result.last_message.turn_number, 4);
}

#[test]
fn ids_shaped_like_legacy_files_are_refused() {
    let ws = Workspace::new();
    ws.append(&human("hello", 1));
    write_legacy_secrets(&ws, "abc", 64);
    let legacy = fs::read(ws.state_dir.join("secrets-abc.json")).unwrap();

    let result = ws.scanner().scan("secrets-abc", &ws.transcript);
    assert!(!result.health.exists);

    let store = StateStore::new(&ws.state_dir);
    assert!(!store.save("secrets-abc", &StateStore::create_initial(1)));
    assert_eq!(fs::read(ws.state_dir.join("secrets-abc.json")).unwrap(), legacy);
    assert!(store.list_sessions().unwrap().is_empty());

    // The file still belongs to session `abc`
    assert_eq!(store.load("abc").unwrap().last_offset, 64);
    assert_eq!(store.list_sessions().unwrap(), vec!["abc"]);
}

#[test]
fn peek_does_not_save_migrated_state() {
    let ws = Workspace::new();
    write_legacy_last_message(&ws, "abc", 10);
    let store = StateStore::new(&ws.state_dir);

    assert_eq!(store.peek("abc").unwrap().last_offset, 10);
    assert!(!store.state_path("abc").exists());
    assert!(store.peek("secrets-abc").is_none());
}
