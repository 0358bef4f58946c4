//! Configuration for the ModelManager

use std::path::{Path, PathBuf};

/// Configuration for a [`ModelManager`](super::ModelManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Capacity of the observer broadcast channel
    pub notification_capacity: usize,
    /// Name given to codec worker threads
    pub worker_thread_name: String,
    /// Extension of the temporary file a save writes before renaming
    pub temp_extension: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 256,
            worker_thread_name: "trace-codec".to_string(),
            temp_extension: "tmp".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        // broadcast channels panic on a zero capacity
        self.notification_capacity = capacity.max(1);
        self
    }

    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    pub fn with_temp_extension(mut self, extension: impl Into<String>) -> Self {
        self.temp_extension = extension.into();
        self
    }

    /// Path of the temporary file written while saving to `path`
    pub fn temp_path_for(&self, path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".");
        name.push(&self.temp_extension);
        path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = ManagerConfig::new()
            .with_notification_capacity(0)
            .with_worker_thread_name("saver");
        assert_eq!(config.notification_capacity, 1);
        assert_eq!(config.worker_thread_name, "saver");
        assert_eq!(config.temp_extension, "tmp");
    }

    #[test]
    fn test_temp_path_keeps_original_extension() {
        let config = ManagerConfig::default();
        let temp = config.temp_path_for(Path::new("/data/run.trace"));
        assert_eq!(temp, PathBuf::from("/data/run.trace.tmp"));
    }
}
