//! Registry-based chain executor
//!
//! Steps are registered under names in a [`StepRegistry`]. A [`Transaction`]
//! names the step to run next and carries a typed payload; each step decides
//! where the chain goes by designating the next name, which allows branches
//! and loops:
//!
//! ```text
//!   next_step = "count" ──► count ──┐ data < 10: repeat()
//!                             ▲     │
//!                             └─────┘
//!                                   │ data >= 10: goto("report")
//!                                   ▼
//!                                report ──► next_step = "" ──► done
//! ```
//!
//! The executor clears the designator before every step, so a step that
//! does not designate anything ends the chain. A step that always
//! re-designates itself never terminates; bounding loops is up to the steps.
//!
//! # Example
//!
//! ```rust,ignore
//! use actionfsm::{run_steps, Context, StepRegistry, Transaction};
//!
//! let mut registry = StepRegistry::<u32>::new();
//! registry.register_fn("count", |_ctx, mut tx| {
//!     if tx.data < 10 {
//!         tx.data += 1;
//!         tx.repeat();
//!     }
//!     Ok(Some(tx))
//! });
//!
//! let done = run_steps(&Context::new(), &registry, Transaction::new("count", 0)).await?;
//! assert_eq!(done.unwrap().data, 10);
//! ```

use crate::context::Context;
use crate::error::{Result, StepResult, WorkflowError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Carrier of "what runs next" plus the payload threaded through a chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction<T> {
    /// Name of the step currently executing
    pub current_step: String,
    /// Name of the step to run after this one; empty ends the chain
    pub next_step: String,
    /// Payload shared by every step of the chain
    pub data: T,
}

impl<T> Transaction<T> {
    /// Create a transaction that starts at `first_step`
    pub fn new(first_step: impl Into<String>, data: T) -> Self {
        Self {
            current_step: String::new(),
            next_step: first_step.into(),
            data,
        }
    }

    /// Designate the next step
    pub fn goto(&mut self, step: impl Into<String>) {
        self.next_step = step.into();
    }

    /// Designate the current step again
    pub fn repeat(&mut self) {
        self.next_step = self.current_step.clone();
    }

    /// Clear the designator so the chain ends after this step
    pub fn finish(&mut self) {
        self.next_step.clear();
    }

    /// Whether no next step is designated
    pub fn is_complete(&self) -> bool {
        self.next_step.is_empty()
    }

    /// Consume the transaction, keeping its payload
    pub fn into_data(self) -> T {
        self.data
    }
}

/// A step run by the registry executor
///
/// Returning `Ok(None)` ends the chain immediately; returning the
/// transaction continues with whatever it designates.
#[async_trait]
pub trait TransactionStep<T: Send + 'static>: Send + Sync {
    /// Run the step
    async fn execute(&self, ctx: &Context, tx: Transaction<T>) -> StepResult<Option<Transaction<T>>>;
}

/// Adapter turning a closure into a [`TransactionStep`]
pub struct FnTransactionStep<F> {
    func: F,
}

impl<F> FnTransactionStep<F> {
    /// Wrap `func`
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<T, F> TransactionStep<T> for FnTransactionStep<F>
where
    T: Send + 'static,
    F: Fn(&Context, Transaction<T>) -> StepResult<Option<Transaction<T>>> + Send + Sync,
{
    async fn execute(&self, ctx: &Context, tx: Transaction<T>) -> StepResult<Option<Transaction<T>>> {
        (self.func)(ctx, tx)
    }
}

/// Name to step lookup table for the registry executor
pub struct StepRegistry<T: Send + 'static> {
    steps: HashMap<String, Arc<dyn TransactionStep<T>>>,
}

impl<T: Send + 'static> StepRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Register a step, replacing any step already under `name`
    pub fn register(&mut self, name: impl Into<String>, step: impl TransactionStep<T> + 'static) {
        self.steps.insert(name.into(), Arc::new(step));
    }

    /// Register a closure as a step
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Context, Transaction<T>) -> StepResult<Option<Transaction<T>>> + Send + Sync + 'static,
    {
        self.register(name, FnTransactionStep::new(func));
    }

    /// Look up a step by name
    pub fn get_step(&self, name: &str) -> Option<Arc<dyn TransactionStep<T>>> {
        self.steps.get(name).cloned()
    }

    /// Whether a step is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Names of all registered steps
    pub fn step_names(&self) -> Vec<String> {
        self.steps.keys().cloned().collect()
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<T: Send + 'static> Default for StepRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for StepRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Run a chain of registry steps until nothing is designated
///
/// Returns the final transaction when a step leaves the designator empty,
/// or `None` when a step ended the chain by returning no transaction.
/// An unregistered name fails with [`WorkflowError::StepNotFound`] before
/// anything runs under that name.
#[tracing::instrument(skip(ctx, registry, tx), fields(run_id = %ctx.run_id(), first_step = %tx.next_step))]
pub async fn run_steps<T: Send + 'static>(
    ctx: &Context,
    registry: &StepRegistry<T>,
    tx: Transaction<T>,
) -> Result<Option<Transaction<T>>> {
    let mut current = Some(tx);
    let mut executed = 0usize;

    while let Some(mut tx) = current {
        if tx.is_complete() {
            tracing::debug!(executed, "Step chain complete");
            return Ok(Some(tx));
        }

        let step = registry.get_step(&tx.next_step).ok_or_else(|| {
            tracing::error!(step = %tx.next_step, "Step not found in registry");
            WorkflowError::step_not_found(tx.next_step.clone(), &registry.step_names())
        })?;

        tx.current_step = std::mem::take(&mut tx.next_step);
        let name = tx.current_step.clone();
        tracing::trace!(step = %name, "Executing transaction step");

        current = step.execute(ctx, tx).await.map_err(|source| {
            tracing::error!(step = %name, error = %source, "Transaction step failed");
            WorkflowError::TransactionStepFailed { step: name, source }
        })?;
        executed += 1;
    }

    tracing::debug!(executed, "Step chain ended by step");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_designators() {
        let mut tx = Transaction::new("first", ());
        assert!(!tx.is_complete());

        tx.current_step = "first".to_string();
        tx.finish();
        assert!(tx.is_complete());

        tx.repeat();
        assert_eq!(tx.next_step, "first");

        tx.goto("second");
        assert_eq!(tx.next_step, "second");
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = StepRegistry::<i32>::new();
        registry.register_fn("noop", |_ctx, tx| Ok(Some(tx)));

        assert!(registry.contains("noop"));
        assert!(registry.get_step("noop").is_some());
        assert!(registry.get_step("other").is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.step_names(), vec!["noop".to_string()]);
    }

    #[tokio::test]
    async fn test_step_that_sets_nothing_runs_once() {
        let mut registry = StepRegistry::<u32>::new();
        registry.register_fn("once", |_ctx, mut tx| {
            tx.data += 1;
            Ok(Some(tx))
        });

        let done = run_steps(&Context::new(), &registry, Transaction::new("once", 0))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(done.data, 1);
        assert_eq!(done.current_step, "once");
        assert!(done.is_complete());
    }

    #[tokio::test]
    async fn test_count_loop_then_branch() {
        let mut registry = StepRegistry::<u32>::new();
        registry.register_fn("count", |_ctx, mut tx| {
            if tx.data >= 10 {
                tx.goto("report");
            } else {
                tx.data += 1;
                tx.repeat();
            }
            Ok(Some(tx))
        });
        registry.register_fn("report", |_ctx, mut tx| {
            tx.data *= 100;
            Ok(Some(tx))
        });

        let done = run_steps(&Context::new(), &registry, Transaction::new("count", 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.into_data(), 1000);
    }

    #[tokio::test]
    async fn test_step_returning_none_ends_chain() {
        let mut registry = StepRegistry::<u32>::new();
        registry.register_fn("stop", |_ctx, _tx| Ok(None));
        registry.register_fn("unreachable", |_ctx, _tx| Err("should not run".into()));

        let mut tx = Transaction::new("stop", 0);
        tx.data = 5;
        let done = run_steps(&Context::new(), &registry, tx).await.unwrap();
        assert!(done.is_none());
    }

    #[tokio::test]
    async fn test_unknown_step_fails_without_running() {
        let mut registry = StepRegistry::<u32>::new();
        registry.register_fn("known", |_ctx, _tx| Err("must not run".into()));

        let err = run_steps(&Context::new(), &registry, Transaction::new("missing", 0))
            .await
            .unwrap_err();

        match err {
            WorkflowError::StepNotFound { name, available } => {
                assert_eq!(name, "missing");
                assert_eq!(available, "known");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_step_error_is_wrapped() {
        let mut registry = StepRegistry::<u32>::new();
        registry.register_fn("first", |_ctx, mut tx| {
            tx.goto("broken");
            Ok(Some(tx))
        });
        registry.register_fn("broken", |_ctx, _tx| Err("disk full".into()));

        let err = run_steps(&Context::new(), &registry, Transaction::new("first", 0))
            .await
            .unwrap_err();

        assert!(err.is_step_failure());
        assert_eq!(err.to_string(), "Transaction step 'broken' failed: disk full");
    }

    #[tokio::test]
    async fn test_empty_initial_designator_is_complete() {
        let registry = StepRegistry::<u32>::new();
        let done = run_steps(&Context::new(), &registry, Transaction::new("", 3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.data, 3);
    }
}
