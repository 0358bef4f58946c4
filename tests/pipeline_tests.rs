//! Pipeline Integration Tests
//!
//! Drives a ModelManager through full acquisition, save and load cycles:
//! - Event dispatch to feature loaders and finalizers
//! - Sorting and trace window bookkeeping
//! - Rejected transitions
//! - Background save/load, including corrupt input and busy tasks

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use profiler_trace::codec::{self, TaskContext};
use profiler_trace::manager::drain;
use profiler_trace::types::{Event, EventType, Message, RangeType, SourceLocation};
use profiler_trace::utils::AtomicFile;
use profiler_trace::{
    Feature, FeatureSet, ManagerError, ManagerEvent, ModelManager, PipelineState, TraceData,
};

fn add_js(manager: &mut ModelManager, start: i64, duration: i64) -> u32 {
    manager
        .add_event(
            Message::RangeStart,
            RangeType::Javascript,
            0,
            start,
            duration,
            "",
            SourceLocation::new("main.qml", 3, 1),
            [0; 5],
        )
        .expect("event accepted")
}

fn save_and_wait(manager: &mut ModelManager, path: &Path) {
    manager.save(path).expect("save started");
    manager
        .wait_for_codec()
        .expect("save task present")
        .expect("save succeeded");
}

/// Write a trace large enough that loading it takes a while
fn write_large_trace(path: &Path, events: usize) {
    let data = TraceData {
        trace_start: 0,
        trace_end: events as i64 * 10,
        features: FeatureSet::from(Feature::JavaScript),
        event_types: vec![EventType::new(
            Message::RangeStart,
            RangeType::Javascript,
            0,
            String::new(),
            SourceLocation::new("main.qml", 3, 1),
        )],
        events: (0..events)
            .map(|i| Event::new(0, i as i64 * 10, 5, [0; 5]))
            .collect(),
        notes: Vec::new(),
    };
    let output = AtomicFile::create(path, path.with_extension("tmp")).unwrap();
    codec::write_trace(output, &data, &TaskContext::new()).unwrap();
}

fn load_and_wait(manager: &mut ModelManager, path: &Path) -> Result<(), ManagerError> {
    manager.load(path)?;
    manager.wait_for_codec().expect("load task present")
}

#[test]
fn test_empty_trace_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a.trace");
    let mut manager = ModelManager::new();

    manager.start_acquiring().unwrap();
    manager.acquiring_done().unwrap();
    assert_eq!(manager.state(), PipelineState::Done);
    assert!(manager.event_store().events().unwrap().is_empty());
    assert_eq!(manager.trace_window().start(), -1);
    assert_eq!(manager.trace_window().end(), -1);

    save_and_wait(&mut manager, &path);
    manager.clear().unwrap();
    load_and_wait(&mut manager, &path).unwrap();

    assert_eq!(manager.state(), PipelineState::Done);
    assert!(manager.event_store().events().unwrap().is_empty());
    assert_eq!(manager.trace_window().start(), -1);
    assert_eq!(manager.trace_window().end(), -1);
}

#[test]
fn test_single_javascript_event() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let finalized = Arc::new(AtomicUsize::new(0));
    let mut manager = ModelManager::new();

    let sink = Arc::clone(&received);
    let counter = Arc::clone(&finalized);
    manager
        .announce_features(
            FeatureSet::from(Feature::JavaScript),
            move |event: &Event, ty: &EventType| {
                sink.lock().push((event.start_time, ty.range_type))
            },
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    manager.start_acquiring().unwrap();
    add_js(&mut manager, 1000, 50);
    manager.acquiring_done().unwrap();

    assert_eq!(*received.lock(), vec![(1000, RangeType::Javascript)]);
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
    assert_eq!(manager.trace_window().start(), 1000);
    assert_eq!(manager.trace_window().end(), 1050);
    assert_eq!(manager.state(), PipelineState::Done);
}

#[test]
fn test_out_of_order_events_are_sorted() {
    let mut manager = ModelManager::new();
    manager.start_acquiring().unwrap();
    for start in [5, 1, 3, 2, 4] {
        add_js(&mut manager, start, 0);
    }
    manager.acquiring_done().unwrap();

    let events = manager.event_store().events().unwrap();
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.start_time, i as i64 + 1);
    }
    assert_eq!(manager.trace_window().start(), 1);
    assert_eq!(manager.trace_window().end(), 5);
}

#[test]
fn test_add_event_in_empty_state_is_rejected() {
    let mut manager = ModelManager::new();
    let mut rx = manager.subscribe();

    let result = manager.add_event(
        Message::RangeStart,
        RangeType::Javascript,
        0,
        10,
        1,
        "",
        SourceLocation::default(),
        [0; 5],
    );

    assert!(matches!(result, Err(ManagerError::InvalidState { .. })));
    assert_eq!(manager.state(), PipelineState::Empty);
    assert!(manager.is_empty());
    assert!(manager.trace_window().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_corrupt_trace_load_fails_and_clears() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.trace");
    fs::write(
        &path,
        concat!(
            r#"{"version":256,"traceStart":0,"traceEnd":10,"duration":10,"featureSet":0}"#,
            "\n",
            r#"{"section":"eventTypes","count":0}"#,
            "\n",
            r#"{"section":"events","count":1000000}"#,
            "\n",
        ),
    )
    .unwrap();

    let mut manager = ModelManager::new();
    let mut rx = manager.subscribe();
    let result = load_and_wait(&mut manager, &path);

    assert!(matches!(result, Err(ManagerError::ParseFailure { .. })));
    assert_eq!(manager.state(), PipelineState::Empty);
    assert!(manager.is_empty());

    let events = drain(&mut rx);
    let error_at = events
        .iter()
        .position(|e| matches!(e, ManagerEvent::Error(_)))
        .expect("error reported");
    let finished_at = events
        .iter()
        .position(|e| *e == ManagerEvent::LoadFinished)
        .expect("load finished reported");
    assert!(error_at < finished_at);
    assert_eq!(
        events.last(),
        Some(&ManagerEvent::StateChanged(PipelineState::Empty))
    );
}

#[test]
fn test_second_save_while_busy() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.trace");
    let second = dir.path().join("second.trace");

    let mut manager = ModelManager::new();
    manager.start_acquiring().unwrap();
    for i in 0..100 {
        add_js(&mut manager, i * 10, 5);
    }
    manager.acquiring_done().unwrap();

    manager.save(&first).unwrap();
    assert_eq!(manager.save(&second), Err(ManagerError::BusyAsync));
    assert_eq!(manager.load(&second), Err(ManagerError::BusyAsync));

    manager.wait_for_codec().unwrap().unwrap();
    assert!(first.exists());
    assert!(!second.exists());
    assert!(!manager.is_busy());
}

#[test]
fn test_clear_is_idempotent() {
    let mut manager = ModelManager::new();
    manager.start_acquiring().unwrap();
    add_js(&mut manager, 10, 10);
    manager.acquiring_done().unwrap();

    manager.clear().unwrap();
    let window = *manager.trace_window();
    manager.clear().unwrap();

    assert_eq!(manager.state(), PipelineState::Empty);
    assert_eq!(*manager.trace_window(), window);
    assert!(manager.is_empty());
    assert_eq!(manager.event_store().events(), None);
}

#[test]
fn test_loaded_events_reach_loaders_before_finalizers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dispatch.trace");

    let mut producer = ModelManager::new();
    producer.start_acquiring().unwrap();
    add_js(&mut producer, 30, 5);
    add_js(&mut producer, 10, 5);
    producer.acquiring_done().unwrap();
    save_and_wait(&mut producer, &path);

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut consumer = ModelManager::new();
    let loader_log = Arc::clone(&log);
    let finalizer_log = Arc::clone(&log);
    consumer
        .announce_features(
            FeatureSet::from(Feature::JavaScript),
            move |event: &Event, _: &EventType| {
                loader_log.lock().push(format!("event {}", event.start_time))
            },
            move || finalizer_log.lock().push("finalized".to_string()),
        )
        .unwrap();

    load_and_wait(&mut consumer, &path).unwrap();
    assert_eq!(
        *log.lock(),
        vec!["event 10", "event 30", "finalized"]
    );
    assert_eq!(consumer.trace_window().start(), 10);
    assert_eq!(consumer.trace_window().end(), 35);
}

#[test]
fn test_notes_survive_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.trace");

    let mut manager = ModelManager::new();
    manager.start_acquiring().unwrap();
    add_js(&mut manager, 20, 4);
    add_js(&mut manager, 10, 2);
    manager.acquiring_done().unwrap();
    manager.add_note(0, 1, "slow frame").unwrap();
    manager.set_recorded_features(FeatureSet::from(Feature::JavaScript));

    save_and_wait(&mut manager, &path);
    manager.clear().unwrap();
    assert!(manager.notes().is_empty());

    load_and_wait(&mut manager, &path).unwrap();
    let notes: Vec<_> = manager.notes().iter().map(|(_, n)| n.clone()).collect();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "slow frame");
    assert_eq!(notes[0].start_time, 20);
    assert_eq!(
        manager.recorded_features(),
        FeatureSet::from(Feature::JavaScript)
    );
}

#[test]
fn test_load_missing_file_reports_io_failure() {
    let dir = TempDir::new().unwrap();
    let mut manager = ModelManager::new();
    let mut rx = manager.subscribe();

    let result = manager.load(dir.path().join("absent.trace"));
    assert!(matches!(result, Err(ManagerError::IoFailure { .. })));
    assert!(!manager.is_busy());
    assert_eq!(manager.state(), PipelineState::Empty);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(ManagerEvent::Error(_))));
    assert_eq!(events.last(), Some(&ManagerEvent::LoadFinished));
}

#[test]
fn test_cancelled_load_clears_manager() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("large.trace");
    write_large_trace(&path, 200_000);

    let mut manager = ModelManager::new();
    manager.start_acquiring().unwrap();
    add_js(&mut manager, 1, 1);
    manager.acquiring_done().unwrap();

    let mut rx = manager.subscribe();
    manager.load(&path).unwrap();
    assert_eq!(manager.codec_kind(), Some(profiler_trace::CodecKind::Load));
    assert!(manager.cancel_codec());

    let result = manager.wait_for_codec().expect("load task present");
    assert_eq!(result, Err(ManagerError::Cancelled));
    assert_eq!(manager.state(), PipelineState::Empty);
    assert!(manager.is_empty());
    assert!(manager.trace_window().is_empty());
    assert!(!manager.is_busy());

    let events = drain(&mut rx);
    assert!(events.contains(&ManagerEvent::LoadFinished));
    assert!(!events.iter().any(|e| matches!(e, ManagerEvent::Error(_))));
    assert_eq!(
        events.last(),
        Some(&ManagerEvent::StateChanged(PipelineState::Empty))
    );
}

#[test]
fn test_clear_during_load_discards_result() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("large.trace");
    write_large_trace(&path, 200_000);

    let loaded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loaded);
    let mut manager = ModelManager::new();
    manager
        .announce_features(
            FeatureSet::from(Feature::JavaScript),
            move |_: &Event, _: &EventType| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            || {},
        )
        .unwrap();

    let mut rx = manager.subscribe();
    manager.load(&path).unwrap();
    assert_eq!(manager.state(), PipelineState::AcquiringData);
    manager.clear().unwrap();

    assert_eq!(manager.state(), PipelineState::Empty);
    assert!(!manager.is_busy());
    assert!(manager.is_empty());
    assert_eq!(manager.wait_for_codec(), None);
    assert_eq!(loaded.load(Ordering::SeqCst), 0);

    let events = drain(&mut rx);
    let finished_at = events
        .iter()
        .position(|e| *e == ManagerEvent::LoadFinished)
        .expect("load finished reported");
    assert_eq!(
        events[finished_at + 1..],
        [
            ManagerEvent::StateChanged(PipelineState::ClearingData),
            ManagerEvent::StateChanged(PipelineState::Empty),
        ]
    );
}
