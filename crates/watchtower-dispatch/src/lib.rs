pub mod clients;
pub mod dispatcher;
pub mod error;
pub mod tools;

pub use dispatcher::{Caller, DispatchResult, Dispatcher};
pub use error::{DispatchError, Result};
