//! Well-known names shared by the preparer and the remote agent.
//!
//! Both sides must agree on these, so they live in the model crate rather
//! than being scattered as string literals.

/// Bootstrap bundle: launcher-support entries. Not an archive.
pub const LAUNCHER_BUNDLE: &str = "launcher.zip";

/// Runtime-support bundle: execution agent entries.
pub const RUNTIME_BUNDLE: &str = "runtime.zip";

/// Application bundle: program entry points and declared dependencies.
///
/// The cached artifact is stored as `<fingerprint>-application.zip`; it is always
/// shipped under this name.
pub const APPLICATION_BUNDLE: &str = "application.zip";

/// Ad-hoc resources attached to one launch.
pub const RESOURCES_BUNDLE: &str = "resources.zip";

/// Packed runtime-config directory.
pub const RUNTIME_CONFIG_BUNDLE: &str = "runtime-config.zip";

/// Serialized [`crate::RuntimeDescriptor`] inside the runtime-config bundle.
pub const RUNTIME_SPEC_FILE: &str = "runtime-spec.json";

/// Serialized [`crate::Arguments`] inside the runtime-config bundle.
pub const ARGUMENTS_FILE: &str = "arguments.json";

/// `:`-joined container classpath.
pub const CLASSPATH_FILE: &str = "classpath";

/// `:`-joined application classpath.
pub const APPLICATION_CLASSPATH_FILE: &str = "application-classpath";

/// Optional logging template copied into the runtime-config bundle.
pub const LOGBACK_TEMPLATE_FILE: &str = "logback-template.xml";

/// Logger name that addresses the root logger in log-level overrides.
pub const ROOT_LOGGER: &str = "ROOT";

/// JVM system property naming the container class loader.
pub const CONTAINER_CLASSLOADER_PROPERTY: &str = "skiff.container.class.loader";

/// Configuration namespace propagated into the runtime descriptor by default.
pub const DEFAULT_CONFIG_PREFIX: &str = "skiff.";

/// Default launch timeout in milliseconds.
pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 60_000;
