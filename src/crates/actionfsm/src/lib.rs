//! # actionfsm - Step chains and per-entity workflow state machines
//!
//! `actionfsm` runs small multi-step workflows for many independent entities
//! (users, sessions, devices) where each external event moves one entity
//! forward by exactly one step.
//!
//! ## Overview
//!
//! The crate has two executors that share a [`Context`] and the
//! [`WorkflowError`] taxonomy:
//!
//! - **Registry chains** ([`StepRegistry`], [`run_steps`]) - named steps
//!   hand a [`Transaction`] along; each step designates the name of the next
//!   one, so chains can branch and loop within one call.
//! - **Ordered Actions** ([`Action`], [`StateMachineManager`]) - a named list
//!   of [`Step`]s advanced by position. The manager keeps a cursor per entity
//!   id and executes one step per `begin_action` / `update` call.
//!
//! ```text
//!  event(id) ──► StateMachineManager ──► cursor[id] ──► Action[next] ──► Step
//!                       │                                       │
//!                       └────────── store / remove cursor ◄─────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actionfsm::{Action, Context, FnStep, ManagerConfig, StateMachineManager};
//! use serde_json::json;
//!
//! let manager = StateMachineManager::with_config(ManagerConfig::load(None, "ACTIONFSM_")?);
//!
//! manager.set_action(
//!     Action::new("SayHello")
//!         .with_step(FnStep::new("ask", |_, _, attrs, _| {
//!             attrs.insert("asked".into(), json!(true));
//!             Ok(())
//!         }))
//!         .with_step(FnStep::new("greet", |_, id, _, args| {
//!             println!("hello {id}: {args:?}");
//!             Ok(())
//!         })),
//! );
//!
//! let ctx = Context::new();
//! manager.begin_action(&ctx, "user-1", "SayHello", &[]).await?;
//! manager.update(&ctx, "user-1", &[json!("Ada")]).await?;
//! assert!(!manager.in_action("user-1"));
//! ```
//!
//! ## Logging
//!
//! Everything is reported through `tracing`. Registration and Action
//! completion log at `info`, step execution at `debug`, and step failures at
//! `error` with the action, step, position and entity id as fields. Install
//! any subscriber to see them.

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod manager;
pub mod step;
pub mod transaction;

pub use action::{Action, StepCursor};
pub use config::ManagerConfig;
pub use context::Context;
pub use error::{Result, StepError, StepResult, WorkflowError};
pub use manager::{StateMachineManager, UserState};
pub use step::{Attributes, FnStep, Step};
pub use transaction::{run_steps, FnTransactionStep, StepRegistry, Transaction, TransactionStep};
