pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use config::WatchtowerConfig;
pub use error::{CoreError, Result};
