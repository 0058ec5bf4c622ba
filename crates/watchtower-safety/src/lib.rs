pub mod audit;
pub mod command;
pub mod context;
pub mod error;
pub mod kernel;
pub mod node;
pub mod path;
pub mod protected;
pub mod secrets;
pub mod tables;
pub mod url;

pub use context::{is_override_active, run_with_context};
pub use error::{Result, SafetyError};
pub use kernel::{SafetyDecision, SafetyKernel};
