//! Agent service clients.
//!
//! - [`HttpAgentService`]: the remote service over HTTP (reqwest)
//! - [`HttpDiagnosticSink`]: batched log delivery to the same service
//! - [`LoopbackAgentService`]: an in-process echo agent for offline use and tests

pub mod http_agent_service;
pub mod http_diagnostic_sink;
pub mod loopback;
pub mod ndjson;
mod wire;

pub use http_agent_service::HttpAgentService;
pub use http_diagnostic_sink::HttpDiagnosticSink;
pub use loopback::LoopbackAgentService;
