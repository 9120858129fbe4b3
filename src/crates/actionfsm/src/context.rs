//! Execution context passed through to every step
//!
//! The engine never inspects a [`Context`]; it hands the caller's context to
//! each step unchanged. Steps use it to reach request-scoped values such as a
//! tenant, a locale or a correlation id.
//!
//! # Example
//!
//! ```rust
//! use actionfsm::Context;
//! use serde_json::json;
//!
//! let ctx = Context::new()
//!     .with_value("locale", json!("en"))
//!     .with_value("channel", json!("line"));
//!
//! assert_eq!(ctx.value("locale"), Some(&json!("en")));
//! assert!(ctx.value("missing").is_none());
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Request-scoped context for one engine call
///
/// Cloning is cheap; values are shared behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Context {
    run_id: Uuid,
    values: Arc<HashMap<String, Value>>,
}

impl Context {
    /// Create an empty context with a fresh run id
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            values: Arc::new(HashMap::new()),
        }
    }

    /// Create a context with a caller-chosen run id
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            values: Arc::new(HashMap::new()),
        }
    }

    /// Add a value, returning the extended context
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.values).insert(key.into(), value);
        self
    }

    /// Identifier of this call, for correlating logs
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Look up a value
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All values carried by this context
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
