//! Upgrade dispatcher: request path → endpoint.
//!
//! Consulted from the WebSocket handshake. A path with no registered
//! endpoint is refused before the upgrade completes.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::connection::{Endpoint, EndpointHandler};

// ============================================================================
// UpgradeDispatcher
// ============================================================================

/// Routing table from upgrade path to endpoint.
///
/// # Example
///
/// ```ignore
/// let dispatcher = UpgradeDispatcher::new()
///     .route("/chat", ChatEndpoint::new(Arc::clone(&router)))
///     .route("/users", PresenceEndpoint::new(router));
/// ```
#[derive(Default)]
pub struct UpgradeDispatcher {
    routes: FxHashMap<String, Arc<dyn EndpointHandler>>,
}

impl UpgradeDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `endpoint` under `path`.
    ///
    /// Registering the same path twice keeps the later endpoint.
    #[must_use]
    pub fn route<E: Endpoint>(mut self, path: impl Into<String>, endpoint: E) -> Self {
        let path = path.into();

        if self.routes.insert(path.clone(), Arc::new(endpoint)).is_some() {
            warn!(path = %path, "Endpoint replaced");
        } else {
            debug!(path = %path, "Endpoint registered");
        }

        self
    }

    /// Looks up the endpoint for a request target. The query string, if any,
    /// is ignored.
    #[must_use]
    pub fn resolve(&self, target: &str) -> Option<Arc<dyn EndpointHandler>> {
        let path = target.split_once('?').map_or(target, |(path, _)| path);
        self.routes.get(path).cloned()
    }

    /// Registered paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<_> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Number of registered paths.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no path is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for UpgradeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeDispatcher")
            .field("paths", &self.paths())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
