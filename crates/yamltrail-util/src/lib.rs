//! Shared utilities for yamltrail.
//!
//! - Logging setup with tracing
//! - Per-path lock registry for read-modify-write cycles on tracked documents
//! - Path utilities

pub mod lock;
pub mod log;
pub mod path;

pub use lock::{PathGuard, PathLocks};
pub use log::{LogConfig, LogLevel};
