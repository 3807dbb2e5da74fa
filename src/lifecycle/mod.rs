//! Request and process lifecycle.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build registry + sinks → Orchestrator → Bind listener
//!
//! Per request (orchestrator.rs):
//!     STARTED → FAULT_EVALUATED → HANDLER_RAN → COMPLETED
//!
//! Shutdown (signals.rs, shutdown.rs):
//!     SIGINT/SIGTERM → Stop accepting → Drain in-flight → Flush sinks
//! ```
//!
//! # Design Decisions
//! - The random source is the only lock on the request path, and it is
//!   never held across an await
//! - Sinks are isolated from each other and from the response

pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use orchestrator::{
    Endpoint, HandledRequest, HandlerError, HandlerResponse, Orchestrator, OrchestratorBuilder,
    RequestOutcome, RequestScope, ResponseBody,
};
pub use shutdown::Shutdown;
pub use startup::build_orchestrator;
