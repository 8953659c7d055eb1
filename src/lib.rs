pub mod artifact;
pub mod config;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod outputs;
pub mod vision;

pub use config::TripkikConfig;
pub use error::{ErrorKind, Failure, SessionError};
pub use kernel::reactor::{ResetHandle, SessionReactor};
