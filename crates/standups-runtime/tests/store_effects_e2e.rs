//! Store Effects E2E Tests
//!
//! End-to-end validation of background effects on the threaded store.
//!
//! # Invariants
//!
//! 1. **Debounce collapsing**: a burst of saves writes once, with the last payload
//! 2. **Scoped timers**: popping a stack element stops the timers it started
//! 3. **File round trip**: documents written by an effect thread load back intact
//! 4. **Overlapping writes**: effect threads saving the same file never fail

use standups_runtime::{
    CancelScope, Cmd, FileStorage, ForEachStack, MemoryStorage, Reducer, StackAction, StackState,
    StorageBackend, StorageKey, Store,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Utilities
// ============================================================================

struct Notes {
    storage: Arc<dyn StorageBackend>,
    save: CancelScope,
    debounce: Duration,
    failed_saves: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, PartialEq)]
enum NoteAction {
    Append(String),
}

impl Reducer for Notes {
    type State = Vec<String>;
    type Action = NoteAction;

    fn reduce(&mut self, notes: &mut Vec<String>, action: NoteAction) -> Cmd<NoteAction> {
        match action {
            NoteAction::Append(note) => {
                notes.push(note);
                let storage = Arc::clone(&self.storage);
                let failed_saves = Arc::clone(&self.failed_saves);
                let payload = notes.join("\n").into_bytes();
                Cmd::debounce(&self.save, "save-notes", self.debounce, move || {
                    if let Err(e) = storage.save(&StorageKey::new("notes.txt"), &payload) {
                        failed_saves.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!(error = %e, "save failed");
                    }
                    None
                })
            }
        }
    }
}

fn notes(storage: Arc<dyn StorageBackend>, debounce: Duration) -> Notes {
    Notes {
        storage,
        save: CancelScope::new("save-notes"),
        debounce,
        failed_saves: Arc::new(AtomicUsize::new(0)),
    }
}

// ============================================================================
// 1. Debounce
// ============================================================================

#[test]
fn burst_of_saves_writes_last_payload_once() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = Store::new(
        notes(storage.clone(), Duration::from_millis(150)),
        Vec::new(),
    );

    for word in ["a", "b", "c"] {
        store.send(NoteAction::Append(word.to_string()));
    }
    assert!(store.run_until_idle(Duration::from_secs(5)));

    let writes = storage.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, b"a\nb\nc".to_vec());
}

#[test]
fn separated_saves_each_write() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = Store::new(notes(storage.clone(), Duration::from_millis(10)), Vec::new());

    store.send(NoteAction::Append("first".into()));
    assert!(store.run_until_idle(Duration::from_secs(5)));
    store.send(NoteAction::Append("second".into()));
    assert!(store.run_until_idle(Duration::from_secs(5)));

    assert_eq!(storage.write_count(), 2);
}

// ============================================================================
// 2. Scoped timers
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Beat {
    Start,
    Fired,
}

struct Heart;

impl Reducer for Heart {
    type State = u32;
    type Action = Beat;

    fn reduce(&mut self, beats: &mut u32, action: Beat) -> Cmd<Beat> {
        match action {
            Beat::Start => Cmd::every("heartbeat", Duration::from_millis(2), || Some(Beat::Fired)),
            Beat::Fired => {
                *beats += 1;
                Cmd::none()
            }
        }
    }
}

#[test]
fn popping_element_stops_its_timer() {
    let mut store = Store::new(ForEachStack::new(Heart), StackState::new());
    store.send(StackAction::Push(0));
    let id = store.state().ids().next().expect("pushed element");
    store.send(StackAction::Element {
        id,
        action: Beat::Start,
    });

    thread::sleep(Duration::from_millis(30));
    store.process_effects();
    assert!(store.state().get(id).copied().unwrap_or(0) > 0);

    store.send(StackAction::PopLast);
    assert!(store.run_until_idle(Duration::from_secs(5)));
    assert_eq!(store.reducer().active_scopes(), 0);
    assert!(store.state().is_empty());
}

// ============================================================================
// 3. File storage
// ============================================================================

#[test]
fn effect_written_file_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path().join("nested")));
    let mut store = Store::new(notes(Arc::clone(&storage), Duration::ZERO), Vec::new());

    store.send(NoteAction::Append("persisted".into()));
    assert!(store.run_until_idle(Duration::from_secs(5)));

    let loaded = storage
        .load(&StorageKey::new("notes.txt"))
        .expect("load")
        .expect("document present");
    assert_eq!(loaded, b"persisted".to_vec());
    assert!(!dir.path().join("nested").join("notes.txt.tmp").exists());
}

#[test]
fn zero_debounce_burst_never_fails_a_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(dir.path()));
    let mut store = Store::new(notes(Arc::clone(&storage), Duration::ZERO), Vec::new());

    for n in 0..30 {
        store.send(NoteAction::Append(format!("note {n}")));
    }
    assert!(store.run_until_idle(Duration::from_secs(5)));

    assert_eq!(store.reducer().failed_saves.load(Ordering::SeqCst), 0);
    assert!(storage.load(&StorageKey::new("notes.txt")).expect("load").is_some());
    assert!(!dir.path().join("notes.txt.tmp").exists());
}
