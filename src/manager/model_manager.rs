//! Model Manager - lifecycle authority for one trace
//!
//! The manager owns the stores and drives them through
//! `Empty → AcquiringData → ProcessingData → Done`, with `ClearingData` as a
//! transient step back to `Empty`. Producers call into it from a single
//! owner thread. Saving and loading run on worker threads; their results are
//! only applied when the owner calls [`ModelManager::poll_codec`] or
//! [`ModelManager::wait_for_codec`].

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::codec::{self, CodecKind, CodecTask, TraceData};
use crate::error::{ManagerError, ManagerResult};
use crate::model::{EventStore, NotesStore, TraceWindow};
use crate::types::{
    DebugLevel, Event, EventType, Feature, FeatureSet, Message, Note, PipelineState, RangeType,
    SourceLocation, UNSET_TIME,
};
use crate::utils::AtomicFile;

use super::config::ManagerConfig;
use super::dispatch::Dispatcher;
use super::notify::{ManagerEvent, Notification, Notifier};
use super::registry::{AnnounceOutcome, FeatureRegistry, Finalizer, Loader};

enum PendingCodec {
    Save(CodecTask<u64>),
    Load(CodecTask<TraceData>),
}

impl PendingCodec {
    fn kind(&self) -> CodecKind {
        match self {
            PendingCodec::Save(_) => CodecKind::Save,
            PendingCodec::Load(_) => CodecKind::Load,
        }
    }

    fn progress(&self) -> f64 {
        match self {
            PendingCodec::Save(task) => task.progress(),
            PendingCodec::Load(task) => task.progress(),
        }
    }

    fn cancel(&self) {
        match self {
            PendingCodec::Save(task) => task.cancel(),
            PendingCodec::Load(task) => task.cancel(),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            PendingCodec::Save(task) => task.is_finished(),
            PendingCodec::Load(task) => task.is_finished(),
        }
    }
}

pub struct ModelManager {
    config: ManagerConfig,
    state: PipelineState,
    window: TraceWindow,
    events: EventStore,
    notes: NotesStore,
    registry: FeatureRegistry,
    recorded: FeatureSet,
    notifier: Notifier,
    codec: Option<PendingCodec>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let notifier = Notifier::new(config.notification_capacity);
        Self {
            config,
            state: PipelineState::Empty,
            window: TraceWindow::new(),
            events: EventStore::new(),
            notes: NotesStore::new(),
            registry: FeatureRegistry::new(),
            recorded: FeatureSet::EMPTY,
            notifier,
            codec: None,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn trace_window(&self) -> &TraceWindow {
        &self.window
    }

    pub fn event_store(&self) -> &EventStore {
        &self.events
    }

    pub fn notes(&self) -> &NotesStore {
        &self.notes
    }

    /// True when no events, types or notes are held
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.notes.is_empty()
    }

    fn emit(&self, event: ManagerEvent) {
        self.notifier.emit(event);
    }

    fn set_state(&mut self, next: PipelineState, operation: &'static str) -> ManagerResult<()> {
        // Re-entering the current state is not a transition
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            warn!(operation, from = %self.state, to = %next, "rejected state transition");
            return Err(ManagerError::InvalidState {
                operation,
                state: self.state,
            });
        }

        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.emit(ManagerEvent::StateChanged(next));
        Ok(())
    }

    fn load_in_flight(&self) -> bool {
        matches!(self.codec, Some(PendingCodec::Load(_)))
    }

    /// Producer calls are refused while a load owns the acquisition
    fn ensure_producer_access(&self, operation: &'static str) -> ManagerResult<()> {
        if self.state != PipelineState::AcquiringData || self.load_in_flight() {
            warn!(operation, state = %self.state, "dropping producer call");
            return Err(ManagerError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    // ---- features -------------------------------------------------------

    /// Register a model's loader and finalizer for `features`
    ///
    /// Only possible while no data is being acquired or processed, so the
    /// loader lists never change under a running acquisition.
    pub fn announce_features<L, F>(
        &mut self,
        features: FeatureSet,
        loader: L,
        finalizer: F,
    ) -> ManagerResult<()>
    where
        L: Fn(&Event, &EventType) + Send + Sync + 'static,
        F: Fn() + Send + Sync + 'static,
    {
        if matches!(
            self.state,
            PipelineState::AcquiringData | PipelineState::ProcessingData
        ) {
            warn!(state = %self.state, "announce_features during acquisition");
            return Err(ManagerError::InvalidState {
                operation: "announce_features",
                state: self.state,
            });
        }

        let loader: Loader = Arc::new(loader);
        let finalizer: Finalizer = Arc::new(finalizer);
        let AnnounceOutcome { available, visible } =
            self.registry.announce(features, loader, finalizer);

        if let Some(available) = available {
            self.emit(ManagerEvent::AvailableFeaturesChanged(available));
        }
        if let Some(visible) = visible {
            self.emit(ManagerEvent::VisibleFeaturesChanged(visible));
        }
        Ok(())
    }

    pub fn register_model_proxy(&mut self) -> usize {
        self.registry.register_model_proxy()
    }

    pub fn available_features(&self) -> FeatureSet {
        self.registry.available()
    }

    pub fn visible_features(&self) -> FeatureSet {
        self.registry.visible()
    }

    pub fn recorded_features(&self) -> FeatureSet {
        self.recorded
    }

    pub fn set_visible_features(&mut self, features: FeatureSet) {
        if self.registry.set_visible(features) {
            self.emit(ManagerEvent::VisibleFeaturesChanged(features));
        }
    }

    pub fn set_recorded_features(&mut self, features: FeatureSet) {
        if self.recorded != features {
            self.recorded = features;
            self.emit(ManagerEvent::RecordedFeaturesChanged(features));
        }
    }

    /// Forget all available features; `clear` keeps them
    pub fn reset_available_features(&mut self) {
        if self.registry.reset_available() {
            self.emit(ManagerEvent::AvailableFeaturesChanged(FeatureSet::EMPTY));
        }
    }

    pub fn feature_name(feature: Feature) -> &'static str {
        feature.name()
    }

    // ---- producer interface ----------------------------------------------

    /// Begin accepting events
    pub fn start_acquiring(&mut self) -> ManagerResult<()> {
        if self.load_in_flight() {
            return Err(ManagerError::InvalidState {
                operation: "start_acquiring",
                state: self.state,
            });
        }
        self.set_state(PipelineState::AcquiringData, "start_acquiring")
    }

    /// Record an event and dispatch it to the loaders of its feature
    ///
    /// Rejected with `InvalidState`, without touching any store, outside
    /// `AcquiringData`. Compare [`ModelManager::add_debug_message`], which
    /// drops such calls silently.
    #[allow(clippy::too_many_arguments)]
    pub fn add_event(
        &mut self,
        message: Message,
        range_type: RangeType,
        detail_type: i32,
        start_time: i64,
        duration: i64,
        data: impl Into<String>,
        location: SourceLocation,
        payload: [i64; 5],
    ) -> ManagerResult<u32> {
        self.ensure_producer_access("add_event")?;

        let index = self.events.add_event(
            message,
            range_type,
            detail_type,
            start_time,
            duration,
            data.into(),
            location,
            payload,
        )?;
        self.accept(index);
        Ok(index)
    }

    /// Record a debug message from the profiled application
    ///
    /// Outside `AcquiringData` the message is dropped without an error:
    /// producers may still deliver log output while a session is torn down.
    pub fn add_debug_message(
        &mut self,
        timestamp: i64,
        level: DebugLevel,
        text: impl Into<String>,
        location: SourceLocation,
    ) -> Option<u32> {
        if self.state != PipelineState::AcquiringData || self.load_in_flight() {
            debug!(state = %self.state, "ignoring debug message");
            return None;
        }

        let ty = EventType::new(
            Message::DebugMessage,
            RangeType::Undefined,
            level as i32,
            String::new(),
            location,
        );
        match self.events.add_event_with_text(ty, timestamp, 0, text.into()) {
            Ok(index) => {
                self.accept(index);
                Some(index)
            }
            Err(err) => {
                debug!(%err, "ignoring debug message");
                None
            }
        }
    }

    /// Widen the window over a stored event and dispatch it
    fn accept(&mut self, index: u32) {
        let Some(event) = self.events.event(index) else {
            return;
        };

        if self.window.start() == UNSET_TIME {
            self.window.decrease_start(event.start_time);
        }
        self.window.enclose(event.start_time, event.end_time());

        if let Some(ty) = self.events.event_type(event.type_index) {
            Dispatcher::dispatch(&self.registry, event, ty);
        }
    }

    /// End acquisition: sort, finalize, enter `Done`
    pub fn acquiring_done(&mut self) -> ManagerResult<()> {
        if self.load_in_flight() {
            return Err(ManagerError::InvalidState {
                operation: "acquiring_done",
                state: self.state,
            });
        }
        self.process()
    }

    fn process(&mut self) -> ManagerResult<()> {
        if self.state != PipelineState::AcquiringData {
            warn!(state = %self.state, "acquiring_done outside acquisition");
            return Err(ManagerError::InvalidState {
                operation: "acquiring_done",
                state: self.state,
            });
        }
        self.set_state(PipelineState::ProcessingData, "acquiring_done")?;

        match self.events.process_data() {
            Ok(Some(last_time_mark)) => self.window.increase_end(last_time_mark),
            Ok(None) => {}
            Err(err) => warn!(%err, "events were already processed"),
        }

        for finalizer in self.registry.finalizers() {
            finalizer();
        }

        self.set_state(PipelineState::Done, "processing_done")?;

        // Notes bind to the sorted events
        if self.notes.load_data(&self.events) > 0 {
            self.emit(ManagerEvent::NotesChanged);
        }
        self.emit(ManagerEvent::LoadFinished);
        Ok(())
    }

    /// Drop all data and return to `Empty`
    ///
    /// Visible and recorded features are reset; available features persist.
    /// A load in progress is cancelled and its result discarded.
    pub fn clear(&mut self) -> ManagerResult<()> {
        if self.load_in_flight() {
            if let Some(PendingCodec::Load(task)) = self.codec.take() {
                task.cancel();
                let _ = task.join();
                info!("load cancelled by clear");
                self.emit(ManagerEvent::LoadFinished);
            }
        }

        self.set_state(PipelineState::ClearingData, "clear")?;

        self.events.clear();
        self.window.clear();
        let had_notes = !self.notes.is_empty();
        self.notes.clear();
        if had_notes {
            self.emit(ManagerEvent::NotesChanged);
        }
        if self.registry.reset_visible() {
            self.emit(ManagerEvent::VisibleFeaturesChanged(FeatureSet::EMPTY));
        }
        self.set_recorded_features(FeatureSet::EMPTY);

        self.set_state(PipelineState::Empty, "clear")
    }

    // ---- notes ------------------------------------------------------------

    fn ensure_done(&self, operation: &'static str) -> ManagerResult<()> {
        if self.state != PipelineState::Done {
            return Err(ManagerError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    pub fn add_note(
        &mut self,
        type_index: u32,
        event_index: u32,
        text: impl Into<String>,
    ) -> ManagerResult<u32> {
        self.ensure_done("add_note")?;
        let id = self.notes.add(&self.events, type_index, event_index, text)?;
        self.emit(ManagerEvent::NotesChanged);
        Ok(id)
    }

    pub fn update_note(&mut self, note_id: u32, text: impl Into<String>) -> ManagerResult<()> {
        self.notes.update(note_id, text)?;
        self.emit(ManagerEvent::NotesChanged);
        Ok(())
    }

    pub fn remove_note(&mut self, note_id: u32) -> ManagerResult<Note> {
        let note = self.notes.remove(note_id)?;
        self.emit(ManagerEvent::NotesChanged);
        Ok(note)
    }

    // ---- persistence --------------------------------------------------------

    pub fn is_busy(&self) -> bool {
        self.codec.is_some()
    }

    pub fn codec_kind(&self) -> Option<CodecKind> {
        self.codec.as_ref().map(PendingCodec::kind)
    }

    /// Progress of the running save or load in `[0, 1]`
    ///
    /// A save counts records written against the records in its snapshot; a
    /// load counts bytes read against the file size.
    pub fn codec_progress(&self) -> Option<f64> {
        self.codec.as_ref().map(PendingCodec::progress)
    }

    /// Ask the running task to stop at its next record boundary
    pub fn cancel_codec(&self) -> bool {
        match &self.codec {
            Some(pending) => {
                pending.cancel();
                true
            }
            None => false,
        }
    }

    /// Start writing the trace to `path` in the background
    ///
    /// A task counts as in flight until its result has been collected, so a
    /// second save or load before that fails with `BusyAsync`.
    ///
    /// Unlike a cancelled load, a cancelled save does not clear the manager:
    /// the temporary file is removed, any existing trace at `path` is left as
    /// it was, and the model stays in `Done`. The result is `Cancelled`
    /// followed by `SaveFinished`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> ManagerResult<()> {
        let path = path.as_ref();
        if self.codec.is_some() {
            return Err(ManagerError::BusyAsync);
        }
        if !matches!(self.state, PipelineState::Done | PipelineState::Empty) {
            warn!(state = %self.state, "save requested before processing finished");
            return Err(ManagerError::InvalidState {
                operation: "save",
                state: self.state,
            });
        }

        let output = match AtomicFile::create(path, self.config.temp_path_for(path)) {
            Ok(output) => output,
            Err(e) => {
                let err = ManagerError::io(path, &e);
                self.report_failure(&err);
                self.emit(ManagerEvent::SaveFinished);
                return Err(err);
            }
        };

        let data = TraceData {
            trace_start: self.window.start(),
            trace_end: self.window.end(),
            features: self.recorded,
            event_types: self.events.staged_types().to_vec(),
            events: self.events.staged_events().to_vec(),
            notes: self.notes.save_data(),
        };

        let task = CodecTask::spawn(
            &self.config.worker_thread_name,
            CodecKind::Save,
            path,
            move |context| codec::write_trace(output, &data, context),
        );
        match task {
            Ok(task) => {
                debug!(path = %path.display(), "save started");
                self.codec = Some(PendingCodec::Save(task));
                Ok(())
            }
            Err(err) => {
                self.report_failure(&err);
                self.emit(ManagerEvent::SaveFinished);
                Err(err)
            }
        }
    }

    /// Clear the model and start reading `path` in the background
    pub fn load(&mut self, path: impl AsRef<Path>) -> ManagerResult<()> {
        let path = path.as_ref();
        if self.codec.is_some() {
            return Err(ManagerError::BusyAsync);
        }

        let (file, size) = match codec::open_trace(path) {
            Ok(opened) => opened,
            Err(err) => {
                self.report_failure(&err);
                self.emit(ManagerEvent::LoadFinished);
                return Err(err);
            }
        };

        self.clear()?;
        self.set_state(PipelineState::AcquiringData, "load")?;

        let worker_path = path.to_path_buf();
        let task = CodecTask::spawn(
            &self.config.worker_thread_name,
            CodecKind::Load,
            path,
            move |context| codec::read_trace(file, size, &worker_path, context),
        );
        match task {
            Ok(task) => {
                debug!(path = %path.display(), "load started");
                self.codec = Some(PendingCodec::Load(task));
                Ok(())
            }
            Err(err) => {
                self.report_failure(&err);
                self.emit(ManagerEvent::LoadFinished);
                self.clear()?;
                Err(err)
            }
        }
    }

    /// Apply the result of a finished task, if any
    ///
    /// Returns `None` while nothing has finished.
    pub fn poll_codec(&mut self) -> Option<ManagerResult<()>> {
        if !self.codec.as_ref()?.is_finished() {
            return None;
        }
        let pending = self.codec.take()?;
        Some(self.finish_codec(pending))
    }

    /// Block until the running task finishes and apply its result
    ///
    /// Returns `None` when no task was running.
    pub fn wait_for_codec(&mut self) -> Option<ManagerResult<()>> {
        let pending = self.codec.take()?;
        Some(self.finish_codec(pending))
    }

    fn finish_codec(&mut self, pending: PendingCodec) -> ManagerResult<()> {
        match pending {
            PendingCodec::Save(task) => {
                let result = task.join().map(|_| ());
                match &result {
                    Ok(()) => {}
                    Err(ManagerError::Cancelled) => info!("save cancelled"),
                    Err(err) => self.report_failure(err),
                }
                self.emit(ManagerEvent::SaveFinished);
                result
            }
            PendingCodec::Load(task) => {
                let result = task.join().and_then(|data| self.install(data));
                match &result {
                    Ok(()) => {}
                    Err(err) => {
                        if *err == ManagerError::Cancelled {
                            info!("load cancelled");
                        } else {
                            self.report_failure(err);
                        }
                        self.emit(ManagerEvent::LoadFinished);
                        self.clear()?;
                    }
                }
                result
            }
        }
    }

    /// Install loaded data and run it through processing
    fn install(&mut self, data: TraceData) -> ManagerResult<()> {
        self.events.set_data(
            &mut self.window,
            data.trace_start,
            data.trace_end,
            data.event_types,
            data.events,
        )?;
        self.notes.set_notes(data.notes);
        self.set_recorded_features(data.features);

        Dispatcher::dispatch_all(
            &self.registry,
            self.events.staged_types(),
            self.events.staged_events(),
        );
        self.process()
    }

    fn report_failure(&self, err: &ManagerError) {
        error!(%err, "trace codec failure");
        if err.is_user_visible() {
            self.emit(ManagerEvent::Error(err.to_string()));
        }
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ModelManager {
    fn drop(&mut self) {
        if let Some(pending) = self.codec.take() {
            match pending {
                PendingCodec::Save(task) => {
                    let _ = task.join();
                }
                PendingCodec::Load(task) => {
                    task.cancel();
                    let _ = task.join();
                }
            }
        }
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("state", &self.state)
            .field("window", &self.window)
            .field("events", &self.events.len())
            .field("notes", &self.notes.len())
            .field("registry", &self.registry)
            .field("codec", &self.codec_kind())
            .finish()
    }
}
