//! The step capability used by ordered Actions
//!
//! A step receives the caller's [`Context`], the id of the entity it runs
//! for, the entity's mutable attribute bag and the arguments of the call that
//! triggered it. It decides nothing about sequencing: the [`Action`] that
//! holds it always moves on to the following position.
//!
//! Steps can be written as types implementing [`Step`], or as plain closures
//! wrapped in [`FnStep`]:
//!
//! ```rust
//! use actionfsm::{Action, FnStep};
//! use serde_json::json;
//!
//! let greet = FnStep::new("greet", |_ctx, id, attrs, args| {
//!     attrs.insert("greeted".to_string(), json!(id));
//!     attrs.insert("args".to_string(), json!(args.len()));
//!     Ok(())
//! });
//!
//! let action = Action::new("SayHello").with_step(greet);
//! assert_eq!(action.len(), 1);
//! ```
//!
//! [`Action`]: crate::Action

use crate::context::Context;
use crate::error::StepResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Per-entity attribute bag threaded through an Action
pub type Attributes = HashMap<String, Value>;

/// A unit of work inside an Action
///
/// Implementations own no per-entity state between invocations; anything
/// that must survive until the next step belongs in `attrs`.
#[async_trait]
pub trait Step: Send + Sync {
    /// Run the step
    ///
    /// Returning an error aborts the current call and leaves the entity's
    /// cursor on this step.
    async fn execute(
        &self,
        ctx: &Context,
        id: &str,
        attrs: &mut Attributes,
        args: &[Value],
    ) -> StepResult;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a closure into a [`Step`]
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&Context, &str, &mut Attributes, &[Value]) -> StepResult + Send + Sync,
{
    /// Wrap `func` under the given step name
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&Context, &str, &mut Attributes, &[Value]) -> StepResult + Send + Sync,
{
    async fn execute(
        &self,
        ctx: &Context,
        id: &str,
        attrs: &mut Attributes,
        args: &[Value],
    ) -> StepResult {
        (self.func)(ctx, id, attrs, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("func", &"<function>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Tally;

    #[async_trait]
    impl Step for Tally {
        async fn execute(
            &self,
            _ctx: &Context,
            _id: &str,
            attrs: &mut Attributes,
            _args: &[Value],
        ) -> StepResult {
            let count = attrs.get("tally").and_then(Value::as_u64).unwrap_or(0);
            attrs.insert("tally".to_string(), json!(count + 1));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fn_step_passes_arguments_through() {
        let step = FnStep::new("echo", |_ctx, id, attrs, args| {
            attrs.insert("id".to_string(), json!(id));
            attrs.insert("args".to_string(), Value::Array(args.to_vec()));
            Ok(())
        });

        let mut attrs = Attributes::new();
        step.execute(&Context::new(), "user-1", &mut attrs, &[json!("hi"), json!(3)])
            .await
            .unwrap();

        assert_eq!(step.name(), "echo");
        assert_eq!(attrs["id"], json!("user-1"));
        assert_eq!(attrs["args"], json!(["hi", 3]));
    }

    #[tokio::test]
    async fn test_fn_step_error() {
        let step = FnStep::new("broken", |_ctx, _id, _attrs, _args| Err("boom".into()));
        let err = step
            .execute(&Context::new(), "x", &mut Attributes::new(), &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_trait_step_default_name() {
        let mut attrs = Attributes::new();
        Tally.execute(&Context::new(), "x", &mut attrs, &[]).await.unwrap();
        Tally.execute(&Context::new(), "x", &mut attrs, &[]).await.unwrap();

        assert_eq!(attrs["tally"], json!(2));
        assert!(Tally.name().ends_with("Tally"));
    }
}
