//! Application layer for Parley.
//!
//! [`ConversationController`] is a pure reducer that reconciles speech,
//! message exchange and history paging into one transcript.
//! [`ControllerRuntime`] executes the effects it returns on tokio.

pub mod controller;
pub mod effect;
pub mod event;
pub mod runtime;

pub use controller::ConversationController;
pub use effect::Effect;
pub use event::{ControllerEvent, TimerKind};
pub use runtime::{ControllerRuntime, Platform, RuntimeHandle};
