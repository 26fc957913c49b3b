mod event_handler;
pub use event_handler::{EventHandlerSpec, LOG_ONLY_EVENT_HANDLER};

mod local_file;
pub use local_file::{LocalFileRef, ResolvedFile};

mod runnable;
pub use runnable::{EntryPoint, ResourceSpec, RunnableSpec};

mod spec;
pub use spec::{ProgramRun, ProgramSpec};
