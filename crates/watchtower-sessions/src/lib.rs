pub mod db;
pub mod error;
pub mod manager;
pub mod memory;
pub mod timer;
pub mod tokenizer;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use memory::MemoryStore;
pub use timer::{RequestTimer, TimerBreakdown};
pub use tokenizer::Tokenizer;
pub use types::{
    ContextMessage, Message, MemoryCategory, MemorySource, Session, SessionKey, UserContext, UserMemory,
};
