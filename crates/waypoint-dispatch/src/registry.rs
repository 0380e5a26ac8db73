//! Workflow registry: the dispatch table.
//!
//! Intents do not resolve to files on disk; they resolve to entries in
//! this table, keyed by the routing rule's `paths.code` string and
//! populated at startup.  The table is backed by [`DashMap`] and mutable
//! at runtime, so re-registering a key swaps the implementation for all
//! subsequent invocations without a restart.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::DispatchResult;
use crate::workflow::{FnWorkflow, Workflow, WorkflowContext};

/// Concurrent dispatch table mapping code paths to workflow handlers.
///
/// Cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    inner: Arc<DashMap<String, Arc<dyn Workflow>>>,
}

impl WorkflowRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow under a code path, replacing any previous
    /// registration for the same path.
    pub fn register(&self, code_path: impl Into<String>, workflow: Arc<dyn Workflow>) {
        let code_path = code_path.into();
        debug!(path = %code_path, "workflow registered");
        self.inner.insert(code_path, workflow);
    }

    /// Register a bare async closure as a workflow.
    pub fn register_fn<F, Fut>(&self, code_path: impl Into<String>, f: F)
    where
        F: Fn(WorkflowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<serde_json::Value>> + Send + 'static,
    {
        self.register(code_path, Arc::new(FnWorkflow(f)));
    }

    /// Resolve a code path to its handler, freshly on every call.
    #[must_use]
    pub fn resolve(&self, code_path: &str) -> Option<Arc<dyn Workflow>> {
        self.inner.get(code_path).map(|entry| Arc::clone(&entry))
    }

    /// Whether a handler is registered under the given path.
    #[must_use]
    pub fn contains(&self, code_path: &str) -> bool {
        self.inner.contains_key(code_path)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All registered code paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
