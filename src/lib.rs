pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{LocalWorkspace, ProcessRunner};
pub use config::BootstrapConfig;
pub use crate::core::{bootstrap::Bootstrapper, plan::BootstrapPlan, plan::Variant};
pub use utils::error::{BootstrapError, Result};
