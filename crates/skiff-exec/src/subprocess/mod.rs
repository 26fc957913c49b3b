//! Cluster launcher backed by an external command.
//!
//! The command receives the launch request as JSON on stdin and reports acceptance through
//! its exit status. Cluster-specific submit tooling plugs in this way without linking it.
mod config;
pub use config::SubprocessConfig;

mod launcher;
pub use launcher::SubprocessLauncher;

mod logger;
pub use logger::LogConfig;

/// Launcher name used in logs.
pub const LAUNCHER_SUBPROCESS: &str = "subprocess";
