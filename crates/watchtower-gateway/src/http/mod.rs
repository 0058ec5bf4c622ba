pub mod auth;
pub mod cameras;
pub mod chat;
pub mod health;
pub mod memory;
pub mod monitor;
pub mod tools;
