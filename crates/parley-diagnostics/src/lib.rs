//! Diagnostic capture for Parley clients.
//!
//! [`DiagnosticLayer`] turns tracing events into [`DiagnosticEntry`] records
//! and hands them to a channel; [`DiagnosticBatcher`] drains that channel and
//! ships batches to a [`DiagnosticSink`] on a size or time trigger.
//!
//! [`DiagnosticEntry`]: parley_core::ports::DiagnosticEntry
//! [`DiagnosticSink`]: parley_core::ports::DiagnosticSink

pub mod batcher;
pub mod layer;

pub use batcher::DiagnosticBatcher;
pub use layer::{DiagnosticLayer, split_category};
