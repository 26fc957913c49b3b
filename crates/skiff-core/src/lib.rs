pub mod bundle;
pub mod cache;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod launcher;
pub mod metrics;
pub mod orchestrator;
pub mod preparer;
pub mod resolve;
pub mod settings;

pub use error::{ConfigError, LaunchError};
pub use orchestrator::{LaunchStage, Orchestrator, RunHandle};
pub use preparer::{LaunchPlan, Preparer};
pub use settings::LaunchSettings;

pub mod prelude {
    pub use crate::bundle::{BundleKind, ClassCatalog, ManifestCatalog};
    pub use crate::cache::{ContentCache, LocalContentCache};
    pub use crate::error::{ConfigError, LaunchError};
    pub use crate::launcher::{ClusterLauncher, LauncherError};
    pub use crate::metrics::{LaunchOutcome, MetricsBackend, MetricsHandle};
    pub use crate::orchestrator::{LaunchStage, Orchestrator, RunHandle};
    pub use crate::preparer::{LaunchPlan, Preparer};
    pub use crate::resolve::{FileResolver, MountedStorage, RemoteFetcher};
    pub use crate::settings::LaunchSettings;
}
