mod request;
pub use request::{ClusterTarget, LaunchRequest, LauncherFile};
