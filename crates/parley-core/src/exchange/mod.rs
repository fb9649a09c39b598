//! Message exchange domain module.
//!
//! Turns one user composition into exactly one logical request and folds
//! the service's answer back into the transcript.
//!
//! # Module Structure
//!
//! - `request`: request/response value types (`SendRequest`, `StreamChunk`, ...)
//! - `pipeline`: single-flight submission and response handling (`ExchangePipeline`)
//! - `ledger`: at-most-once bookkeeping for in-process backends (`IdempotencyLedger`)

mod ledger;
mod pipeline;
mod request;

// Re-export public API
pub use ledger::{Admission, IdempotencyLedger};
pub use pipeline::{
    ExchangeOutcome, ExchangePipeline, ExchangeStatus, LOADING_TEXT, NO_CONTENT_TEXT,
    SubmitRejection,
};
pub use request::{PendingRequest, RequestStatus, SendRequest, SendResponse, StreamChunk};
