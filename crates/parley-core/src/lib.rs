//! Core domain of the Parley conversation client.
//!
//! Everything here is synchronous and free of I/O: the speech, exchange and
//! history components are plain state machines driven by the application
//! layer, and the collaborators they need are expressed as traits in
//! [`ports`].

pub mod config;
pub mod error;
pub mod exchange;
pub mod history;
pub mod message;
pub mod ports;
pub mod session;
pub mod speech;
pub mod transcript;

// Re-export common types
pub use config::{ClientConfig, DeliveryMode, DiagnosticsSettings};
pub use error::{ParleyError, Result};
