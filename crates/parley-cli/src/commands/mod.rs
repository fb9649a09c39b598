pub mod agents;
pub mod chat;
pub mod health;
pub mod memory;
