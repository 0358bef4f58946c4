//! Trace persistence
//!
//! - `format`: the JSON Lines layout and its version number
//! - `writer` / `reader`: record-by-record (de)serialization with progress
//!   and cancellation checks between records
//! - `task`: worker threads with `{progress, cancel, join}` handles
//!
//! The file helpers below are what the worker threads run.

mod format;
mod reader;
mod task;
mod writer;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use crate::error::{ManagerError, ManagerResult};
use crate::utils::AtomicFile;

pub use format::{
    Section, SectionHeader, TraceData, TraceHeader, FORMAT_MAJOR, FORMAT_MINOR, FORMAT_VERSION,
};
pub use reader::TraceReader;
pub use task::{CodecKind, CodecProgress, CodecTask, TaskContext};
pub use writer::TraceWriter;

/// Open a trace for reading, returning the file and its length
pub fn open_trace(path: &Path) -> ManagerResult<(File, u64)> {
    let file = File::open(path).map_err(|e| ManagerError::io(path, &e))?;
    let size = file
        .metadata()
        .map_err(|e| ManagerError::io(path, &e))?
        .len();
    Ok((file, size))
}

/// Parse an opened trace file
pub fn read_trace(
    file: File,
    size: u64,
    path: &Path,
    context: &TaskContext,
) -> ManagerResult<TraceData> {
    let data = TraceReader::new(BufReader::new(file), size, path, context).read()?;
    info!(
        path = %path.display(),
        events = data.events.len(),
        "trace loaded"
    );
    Ok(data)
}

/// Write `data` through `output`, committing it over the target on success
///
/// On any failure, including cancellation, the temporary file is removed and
/// the target is left untouched.
pub fn write_trace(
    mut output: AtomicFile,
    data: &TraceData,
    context: &TaskContext,
) -> ManagerResult<u64> {
    let path = output.target().to_path_buf();
    let result = TraceWriter::new(BufWriter::new(output.file()), &path, context).write(data);

    match result {
        Ok(bytes) => {
            output.commit().map_err(|e| ManagerError::io(&path, &e))?;
            info!(path = %path.display(), bytes, "trace saved");
            Ok(bytes)
        }
        Err(err) => {
            // The write error is the one worth reporting
            let _ = output.discard();
            Err(err)
        }
    }
}

/// Read a whole trace on the calling thread
pub fn load_trace(path: &Path) -> ManagerResult<TraceData> {
    let (file, size) = open_trace(path)?;
    read_trace(file, size, path, &TaskContext::new())
}
