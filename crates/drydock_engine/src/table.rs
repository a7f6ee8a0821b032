//! Operation table: the engine's loaded definitions.
//!
//! Names are stable qualified identifiers. The [`OperationTable::swap`]
//! capability is the contract the interception registry consumes: it lets a
//! caller atomically replace a named entry with a wrapped version of itself.

use crate::operation::Operation;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

/// Named operations currently loaded in the engine
///
/// Interior-mutable so a shared handle can be patched after the session is
/// built; all access is through this type, never through the raw map.
pub struct OperationTable {
    ops: RwLock<IndexMap<String, Arc<dyn Operation>>>,
}

impl OperationTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: RwLock::new(IndexMap::new()),
        }
    }

    /// Register an operation under its own name
    ///
    /// Re-registering a name replaces the previous entry; the builtin set is
    /// registered exactly once at engine construction.
    pub fn register(&self, op: Arc<dyn Operation>) {
        let name = op.name().to_string();
        if let Ok(mut ops) = self.ops.write() {
            ops.insert(name, op);
        }
    }

    /// Look up an operation by qualified name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.ops.read().ok()?.get(name).map(Arc::clone)
    }

    /// Whether the table holds the named operation
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.ops.read().map(|ops| ops.contains_key(name)).unwrap_or(false)
    }

    /// Atomically replace a named entry with a function of its current value
    ///
    /// Returns false (and leaves the table untouched) if the name is not
    /// present.
    pub fn swap<F>(&self, name: &str, wrap: F) -> bool
    where
        F: FnOnce(Arc<dyn Operation>) -> Arc<dyn Operation>,
    {
        let Ok(mut ops) = self.ops.write() else {
            return false;
        };
        let Some(current) = ops.get(name).map(Arc::clone) else {
            return false;
        };
        ops.insert(name.to_string(), wrap(current));
        true
    }

    /// All registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.ops
            .read()
            .map(|ops| ops.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered operations
    #[must_use]
    pub fn count(&self) -> usize {
        self.ops.read().map(|ops| ops.len()).unwrap_or(0)
    }
}

impl Default for OperationTable {
    fn default() -> Self {
        Self::new()
    }
}
