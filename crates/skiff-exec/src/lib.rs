mod error;
pub use error::ExecError;

#[cfg(feature = "subprocess")]
pub mod subprocess;

#[cfg(feature = "http")]
pub mod http;
