//! Utility functions and helpers

pub mod atomic;

pub use atomic::AtomicFile;
