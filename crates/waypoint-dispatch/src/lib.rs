//! # waypoint-dispatch
//!
//! Workflow dispatch for the waypoint engine.
//!
//! Intents resolve to entries in a [`WorkflowRegistry`] — a concurrent
//! table mapping the routing artifact's code paths to handlers
//! implementing the [`Workflow`] capability (`run(context) -> result`).
//! The [`Dispatcher`] drives the full request pipeline
//! (validate → match → execute) and normalizes every failure mode into a
//! structured [`DispatchOutcome`]; no fault crosses its boundary as an
//! error.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod workflow;

// ── re-exports ───────────────────────────────────────────────────────

pub use engine::{DispatchOutcome, Dispatcher};
pub use error::{DispatchError, DispatchResult, ErrorCode};
pub use handlers::register_builtin_workflows;
pub use registry::WorkflowRegistry;
pub use workflow::{FnWorkflow, Workflow, WorkflowContext, WorkflowResult};
