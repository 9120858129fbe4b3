//! Ordered Actions and the position-based chain executor
//!
//! An [`Action`] is a named, fixed list of steps. Progress through it is
//! tracked by position: the step after index `i` is index `i + 1`, and the
//! Action is complete once there is no following position. Positions are
//! plain integers, so two steps built from the same closure never confuse
//! the cursor.
//!
//! An Action can be driven in two ways:
//!
//! - one step at a time through [`Action::begin`] / [`Action::advance`], which
//!   is what [`StateMachineManager`](crate::StateMachineManager) does between
//!   external events;
//! - in one call through [`Action::run`], which executes every step in order.
//!
//! # Example
//!
//! ```rust,ignore
//! use actionfsm::{Action, Attributes, Context, FnStep};
//! use serde_json::json;
//!
//! let action = Action::new("Onboard")
//!     .with_step(FnStep::new("profile", |_, _, attrs, _| {
//!         attrs.insert("profile".into(), json!(true));
//!         Ok(())
//!     }))
//!     .with_step(FnStep::new("welcome", |_, _, attrs, _| {
//!         attrs.insert("welcomed".into(), json!(true));
//!         Ok(())
//!     }));
//!
//! let mut attrs = Attributes::new();
//! action.run(&Context::new(), "user-7", &mut attrs, &[]).await?;
//! assert_eq!(attrs.len(), 2);
//! ```

use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::step::{Attributes, Step};
use serde_json::Value;
use std::sync::Arc;

/// A named, ordered sequence of steps
///
/// The list is fixed once the Action is registered. Cloning shares the
/// step implementations.
#[derive(Clone)]
pub struct Action {
    name: String,
    steps: Vec<Arc<dyn Step>>,
}

/// Resumable position inside an Action
///
/// Produced by [`Action::begin`]; `next` is the index of the step that runs
/// on the following call and `attrs` is the bag accumulated so far.
#[derive(Debug, Clone, Default)]
pub struct StepCursor {
    /// Index of the step to execute next
    pub next: usize,
    /// Attribute bag carried to that step
    pub attrs: Attributes,
}

impl Action {
    /// Create an Action with no steps
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append a step that is shared with other Actions
    pub fn with_shared_step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the Action has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`
    pub fn step(&self, index: usize) -> Option<&Arc<dyn Step>> {
        self.steps.get(index)
    }

    /// Names of all steps, in order
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    /// Position of the step that follows `current`
    ///
    /// With no current step this is the first position. Returns `None` at
    /// the end of the list, for an empty Action, and for a `current` that is
    /// not a position of this Action.
    pub fn next_index(&self, current: Option<usize>) -> Option<usize> {
        let next = match current {
            None => 0,
            Some(index) if index < self.steps.len() => index + 1,
            Some(_) => return None,
        };
        (next < self.steps.len()).then_some(next)
    }

    /// Execute the step at `index` and return the position that follows it
    ///
    /// `None` means the Action is complete. An `index` outside the Action is
    /// treated as completion without executing anything.
    pub async fn advance(
        &self,
        ctx: &Context,
        id: &str,
        index: usize,
        attrs: &mut Attributes,
        args: &[Value],
    ) -> Result<Option<usize>> {
        let Some(step) = self.steps.get(index) else {
            tracing::warn!(
                action = %self.name,
                entity_id = %id,
                index,
                steps = self.steps.len(),
                "Cursor is outside the action, treating it as complete"
            );
            return Ok(None);
        };

        tracing::debug!(action = %self.name, entity_id = %id, step = step.name(), index, "Executing step");

        step.execute(ctx, id, attrs, args)
            .await
            .map_err(|source| {
                tracing::error!(
                    action = %self.name,
                    entity_id = %id,
                    step = step.name(),
                    index,
                    error = %source,
                    "Step failed"
                );
                WorkflowError::StepFailed {
                    action: self.name.clone(),
                    step: step.name().to_string(),
                    index,
                    id: id.to_string(),
                    source,
                }
            })?;

        Ok(self.next_index(Some(index)))
    }

    /// Start the Action for `id`, executing exactly its first step
    ///
    /// Returns the cursor to resume from, or `None` when the Action finished
    /// (single-step or empty Actions).
    pub async fn begin(&self, ctx: &Context, id: &str, args: &[Value]) -> Result<Option<StepCursor>> {
        let Some(first) = self.next_index(None) else {
            tracing::debug!(action = %self.name, entity_id = %id, "Action has no steps");
            return Ok(None);
        };

        let mut attrs = Attributes::new();
        let next = self.advance(ctx, id, first, &mut attrs, args).await?;
        Ok(next.map(|next| StepCursor { next, attrs }))
    }

    /// Resume from `cursor`, executing exactly one step
    ///
    /// Returns `true` while the Action has more steps, with `cursor` moved
    /// forward. On failure `cursor` still points at the failing step; only
    /// what that step wrote into the attributes is kept.
    pub async fn resume(
        &self,
        ctx: &Context,
        id: &str,
        cursor: &mut StepCursor,
        args: &[Value],
    ) -> Result<bool> {
        match self.advance(ctx, id, cursor.next, &mut cursor.attrs, args).await? {
            Some(next) => {
                cursor.next = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Execute every step in order within one call
    pub async fn run(
        &self,
        ctx: &Context,
        id: &str,
        attrs: &mut Attributes,
        args: &[Value],
    ) -> Result<()> {
        let mut next = self.next_index(None);
        while let Some(index) = next {
            next = self.advance(ctx, id, index, attrs, args).await?;
        }
        tracing::debug!(action = %self.name, entity_id = %id, "Action ran to completion");
        Ok(())
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish()
    }
}
