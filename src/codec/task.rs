//! Background codec tasks
//!
//! A [`CodecTask`] wraps a worker thread together with the two pieces of
//! state it shares with its owner: a progress counter and a cancellation
//! flag. The worker polls the flag between records; the owner collects the
//! result with [`CodecTask::join`] and applies it on its own thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{ManagerError, ManagerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Save,
    Load,
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecKind::Save => write!(f, "save"),
            CodecKind::Load => write!(f, "load"),
        }
    }
}

/// Progress counter shared between a worker and its owner
#[derive(Debug, Default)]
pub struct CodecProgress {
    done: AtomicU64,
    total: AtomicU64,
}

impl CodecProgress {
    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.done() as f64 / total as f64).min(1.0)
    }
}

/// Worker-side view of a task: progress reporting and cancellation polling
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    progress: Arc<CodecProgress>,
    cancelled: Arc<AtomicBool>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&self, total: u64) {
        self.progress.total.store(total, Ordering::Relaxed);
    }

    pub fn set_done(&self, done: u64) {
        self.progress.done.store(done, Ordering::Relaxed);
    }

    pub fn advance(&self, amount: u64) {
        self.progress.done.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn progress(&self) -> &CodecProgress {
        &self.progress
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Record boundary check: `Err(Cancelled)` once cancellation was requested
    pub fn check_cancelled(&self) -> ManagerResult<()> {
        if self.is_cancelled() {
            Err(ManagerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Handle to a running save or load
pub struct CodecTask<T> {
    kind: CodecKind,
    path: PathBuf,
    context: TaskContext,
    handle: JoinHandle<ManagerResult<T>>,
}

impl<T: Send + 'static> CodecTask<T> {
    /// Run `work` on a named worker thread
    pub fn spawn<F>(thread_name: &str, kind: CodecKind, path: &Path, work: F) -> ManagerResult<Self>
    where
        F: FnOnce(&TaskContext) -> ManagerResult<T> + Send + 'static,
    {
        let context = TaskContext::new();
        let worker_context = context.clone();
        let handle = thread::Builder::new()
            .name(format!("{}-{}", thread_name, kind))
            .spawn(move || work(&worker_context))
            .map_err(|e| ManagerError::io(path, &e))?;

        Ok(Self {
            kind,
            path: path.to_path_buf(),
            context,
            handle,
        })
    }

    pub fn kind(&self) -> CodecKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn progress(&self) -> f64 {
        self.context.progress().fraction()
    }

    /// Ask the worker to stop at the next record boundary
    pub fn cancel(&self) {
        self.context.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.context.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result
    pub fn join(self) -> ManagerResult<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(ManagerError::IoFailure {
                path: self.path,
                reason: format!("{} worker panicked", self.kind),
            }),
        }
    }
}

impl<T> std::fmt::Debug for CodecTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecTask")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("progress", &self.context.progress().fraction())
            .finish()
    }
}
