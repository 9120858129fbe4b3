//! Per-entity workflow state machine manager
//!
//! The [`StateMachineManager`] keeps a registry of named [`Action`]s and, for
//! every external entity id, a cursor into the Action that entity is running.
//! Each external event for an entity advances it by exactly one step:
//!
//! ```text
//!                begin_action(name)            update
//!  Unregistered ───────────────────► Running ──────────┐
//!       ▲        (>= 2 steps)          │  ▲             │ more steps
//!       │                              │  └─────────────┘
//!       └──────────────────────────────┘
//!              last step executed
//! ```
//!
//! A failed step leaves the entity where it was, so the next `update`
//! retries the same step. Entities without a cursor that call `update` are
//! started on the default Action when one is configured.
//!
//! # Concurrency
//!
//! Registration, begin, update and membership queries may be called from any
//! number of tasks. Calls for the same entity run one after the other; calls
//! for different entities proceed independently. [`in_action`] never waits
//! for a running step.
//!
//! # Example
//!
//! ```rust,ignore
//! use actionfsm::{Action, Context, FnStep, ManagerConfig, StateMachineManager};
//!
//! let manager = StateMachineManager::with_config(
//!     ManagerConfig::new().with_default_action("Idle"),
//! );
//! manager.set_action(Action::new("Idle").with_step(FnStep::new("idle", |_, _, _, _| Ok(()))));
//! manager.set_action(
//!     Action::new("Count")
//!         .with_step(FnStep::new("one", |_, _, _, _| Ok(())))
//!         .with_step(FnStep::new("two", |_, _, _, _| Ok(()))),
//! );
//!
//! let ctx = Context::new();
//! manager.begin_action(&ctx, "user-1", "Count", &[]).await?;
//! assert!(manager.in_action("user-1"));
//!
//! manager.update(&ctx, "user-1", &[]).await?;
//! assert!(!manager.in_action("user-1"));
//! ```
//!
//! [`in_action`]: StateMachineManager::in_action

use crate::action::{Action, StepCursor};
use crate::config::ManagerConfig;
use crate::context::Context;
use crate::error::{Result, WorkflowError};
use crate::step::Attributes;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where one entity currently is inside an Action
#[derive(Debug, Clone)]
pub struct UserState {
    /// Action the entity started; later re-registrations do not affect it
    pub action: Arc<Action>,
    /// Position of the next step plus the attribute bag accumulated so far
    pub cursor: StepCursor,
}

/// Per-entity slot
///
/// `state` is held for the whole of a begin/update call. `active` mirrors
/// `state.is_some()` so membership checks do not wait on a running step.
#[derive(Default)]
struct EntitySlot {
    state: tokio::sync::Mutex<Option<UserState>>,
    active: AtomicBool,
}

impl EntitySlot {
    fn store(&self, guard: &mut Option<UserState>, state: Option<UserState>) {
        self.active.store(state.is_some(), Ordering::Release);
        *guard = state;
    }
}

/// Registry of Actions plus per-entity cursors
pub struct StateMachineManager {
    actions: RwLock<HashMap<String, Arc<Action>>>,
    entities: Mutex<HashMap<String, Arc<EntitySlot>>>,
    default_action: Option<String>,
}

impl StateMachineManager {
    /// Create a manager with no default Action
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Create a manager from configuration
    pub fn with_config(config: ManagerConfig) -> Self {
        let default_action = config.default_action().map(str::to_string);
        tracing::debug!(default_action = ?default_action, "Creating state machine manager");
        Self {
            actions: RwLock::new(HashMap::new()),
            entities: Mutex::new(HashMap::new()),
            default_action,
        }
    }

    /// Name of the Action `update` falls back to
    pub fn default_action(&self) -> Option<&str> {
        self.default_action.as_deref()
    }

    /// Register an Action, replacing any Action with the same name
    ///
    /// Entities already running the previous definition keep it until they
    /// complete.
    pub fn set_action(&self, action: Action) {
        let name = action.name().to_string();
        let steps = action.len();
        let replaced = self
            .actions
            .write()
            .insert(name.clone(), Arc::new(action))
            .is_some();
        tracing::info!(action = %name, steps, replaced, "Registered action");
    }

    /// Look up a registered Action
    pub fn get_action(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.read().get(name).cloned()
    }

    /// Whether an Action is registered under `name`
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.read().contains_key(name)
    }

    /// Names of all registered Actions, sorted
    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fail if a default Action is configured but not registered
    pub fn check_default_action(&self) -> Result<()> {
        match self.default_action() {
            Some(name) if !self.has_action(name) => Err(WorkflowError::Configuration(format!(
                "default action '{}' is not registered",
                name
            ))),
            _ => Ok(()),
        }
    }

    /// Whether `id` is part-way through an Action
    pub fn in_action(&self, id: &str) -> bool {
        self.entities
            .lock()
            .get(id)
            .map(|slot| slot.active.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Number of entities part-way through an Action
    pub fn active_count(&self) -> usize {
        self.entities
            .lock()
            .values()
            .filter(|slot| slot.active.load(Ordering::Acquire))
            .count()
    }

    /// Name of the Action `id` is running
    ///
    /// Waits for a call already running for `id` to finish.
    pub async fn current_action(&self, id: &str) -> Option<String> {
        let slot = self.existing_slot(id)?;
        let name = slot
            .state
            .lock()
            .await
            .as_ref()
            .map(|s| s.action.name().to_string());
        self.release(id, &slot);
        name
    }

    /// Snapshot of the attribute bag stored for `id`
    ///
    /// Waits for a call already running for `id` to finish.
    pub async fn attributes(&self, id: &str) -> Option<Attributes> {
        let slot = self.existing_slot(id)?;
        let attrs = slot
            .state
            .lock()
            .await
            .as_ref()
            .map(|s| s.cursor.attrs.clone());
        self.release(id, &slot);
        attrs
    }

    /// Attach `id` to the Action `name` and execute its first step
    ///
    /// An unregistered `name` is ignored. If the Action continues past its
    /// first step the entity's cursor is stored, replacing any previous one;
    /// otherwise any previous cursor is removed. On failure the previous
    /// cursor, if any, is left as it was.
    #[tracing::instrument(skip(self, ctx, args), fields(run_id = %ctx.run_id()))]
    pub async fn begin_action(&self, ctx: &Context, id: &str, name: &str, args: &[Value]) -> Result<()> {
        let slot = self.slot(id);
        let result = {
            let mut state = slot.state.lock().await;
            self.begin_locked(ctx, id, name, &slot, &mut *state, args).await
        };
        self.release(id, &slot);
        result
    }

    /// Advance `id` by one step
    ///
    /// Without a cursor this starts the default Action, or does nothing when
    /// no default is configured. On failure the cursor stays on the failing
    /// step.
    #[tracing::instrument(skip(self, ctx, args), fields(run_id = %ctx.run_id()))]
    pub async fn update(&self, ctx: &Context, id: &str, args: &[Value]) -> Result<()> {
        let slot = self.slot(id);
        let result = {
            let mut state = slot.state.lock().await;
            self.update_locked(ctx, id, &slot, &mut *state, args).await
        };
        self.release(id, &slot);
        result
    }

    async fn update_locked(
        &self,
        ctx: &Context,
        id: &str,
        slot: &EntitySlot,
        state: &mut Option<UserState>,
        args: &[Value],
    ) -> Result<()> {
        match state.as_mut() {
            None => match &self.default_action {
                Some(name) => {
                    tracing::debug!(entity_id = %id, action = %name, "Starting default action");
                    self.begin_locked(ctx, id, name, slot, state, args).await
                }
                None => Ok(()),
            },
            Some(current) => {
                let action = current.action.clone();
                if action.resume(ctx, id, &mut current.cursor, args).await? {
                    tracing::debug!(
                        entity_id = %id,
                        action = %action.name(),
                        next = current.cursor.next,
                        "Cursor advanced"
                    );
                } else {
                    slot.store(state, None);
                    tracing::info!(entity_id = %id, action = %action.name(), "Action completed");
                }
                Ok(())
            }
        }
    }

    async fn begin_locked(
        &self,
        ctx: &Context,
        id: &str,
        name: &str,
        slot: &EntitySlot,
        state: &mut Option<UserState>,
        args: &[Value],
    ) -> Result<()> {
        let Some(action) = self.get_action(name) else {
            tracing::debug!(entity_id = %id, action = %name, "Action not registered, ignoring");
            return Ok(());
        };

        tracing::info!(entity_id = %id, action = %name, "Beginning action");

        match action.begin(ctx, id, args).await? {
            Some(cursor) => {
                slot.store(state, Some(UserState { action, cursor }));
            }
            None => {
                slot.store(state, None);
                tracing::info!(entity_id = %id, action = %name, "Action completed");
            }
        }
        Ok(())
    }

    fn slot(&self, id: &str) -> Arc<EntitySlot> {
        self.entities
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    fn existing_slot(&self, id: &str) -> Option<Arc<EntitySlot>> {
        self.entities.lock().get(id).cloned()
    }

    /// Drop the slot for `id` once it is idle and nobody else holds it
    fn release(&self, id: &str, slot: &Arc<EntitySlot>) {
        let mut entities = self.entities.lock();
        // One reference lives in the map, the other is ours.
        if !slot.active.load(Ordering::Acquire) && Arc::strong_count(slot) == 2 {
            if let Some(current) = entities.get(id) {
                if Arc::ptr_eq(current, slot) {
                    entities.remove(id);
                }
            }
        }
    }
}

impl Default for StateMachineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateMachineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachineManager")
            .field("actions", &self.action_names())
            .field("active_entities", &self.active_count())
            .field("default_action", &self.default_action)
            .finish()
    }
}
