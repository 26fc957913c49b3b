mod domain;
pub use domain::constants;
pub use domain::{Env, FileUri, KeyValue, ModuleId, Properties, RunId, RunnableName, file_extension};

mod error;
pub use error::{ModelError, ModelResult};

mod launch;
pub use launch::{ClusterTarget, LaunchRequest, LauncherFile};

mod program;
pub use program::{
    EntryPoint, EventHandlerSpec, LOG_ONLY_EVENT_HANDLER, LocalFileRef, ProgramRun, ProgramSpec,
    ResolvedFile, ResourceSpec, RunnableSpec,
};

mod runtime;
pub use runtime::{
    Arguments, DESCRIPTOR_FORMAT, DESCRIPTOR_VERSION, DebugOptions, JvmOptions, LogLevel,
    RuntimeDescriptor, RuntimeRunnable, join_options,
};
