pub mod error;
pub mod state;
pub mod threshold;
pub mod types;

pub use error::{ClusterError, Result};
pub use state::StateTracker;
pub use threshold::ThresholdEvaluator;
pub use types::{NodeObservation, VmKind, VmObservation};
