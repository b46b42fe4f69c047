pub mod bootstrap;
pub mod plan;

pub use crate::domain::model::{BootstrapReport, CommandSpec, FailurePolicy, StepKind, StepOutcome};
pub use crate::domain::ports::{CommandRunner, Workspace};
pub use crate::utils::error::Result;
