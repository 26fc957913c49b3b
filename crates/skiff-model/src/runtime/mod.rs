mod arguments;
pub use arguments::Arguments;

mod descriptor;
pub use descriptor::{DESCRIPTOR_FORMAT, DESCRIPTOR_VERSION, RuntimeDescriptor, RuntimeRunnable};

mod jvm;
pub use jvm::{DebugOptions, JvmOptions, join_options};

mod log_level;
pub use log_level::LogLevel;
