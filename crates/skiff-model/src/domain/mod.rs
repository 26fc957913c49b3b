mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod properties;
pub use properties::Properties;

mod run_id;
pub use run_id::RunId;

mod uri;
pub use uri::{FileUri, file_extension};

pub mod constants;

/// Name of a runnable inside a program.
pub type RunnableName = String;

/// Identifier of a class or module in the dependency manifest (e.g. `com.acme.Main`).
pub type ModuleId = String;
