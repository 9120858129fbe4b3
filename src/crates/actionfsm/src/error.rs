//! Error types for step execution and workflow management
//!
//! Step implementations report failures as a boxed [`StepError`]. The engine
//! never recovers from them: it wraps the error with the position it failed
//! at and returns it to the caller, keeping the original available through
//! [`std::error::Error::source`].
//!
//! # Error Hierarchy
//!
//! ```text
//! WorkflowError
//! ├── StepNotFound           - Registry has no step under the designated name
//! ├── StepFailed             - An Action step returned an error
//! ├── TransactionStepFailed  - A registry step returned an error
//! ├── Configuration          - Invalid manager configuration
//! ├── Io                     - Reading a configuration file failed
//! ├── Yaml                   - YAML configuration could not be parsed
//! └── Toml                   - TOML configuration could not be parsed
//! ```
//!
//! # Example
//!
//! ```rust
//! use actionfsm::error::WorkflowError;
//!
//! fn describe(err: &WorkflowError) -> String {
//!     match err {
//!         WorkflowError::StepNotFound { name, .. } => format!("missing step {}", name),
//!         WorkflowError::StepFailed { action, index, .. } => {
//!             format!("{} stopped at step {}", action, index)
//!         }
//!         other => other.to_string(),
//!     }
//! }
//! ```

use thiserror::Error;

/// Error returned by step implementations
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by step implementations
pub type StepResult<T = ()> = std::result::Result<T, StepError>;

/// Convenience result type using [`WorkflowError`]
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors raised by the chain executors and the state machine manager
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The registry executor was asked to run a step that was never registered
    ///
    /// Raised before anything executes for that name.
    #[error("Step '{name}' not found in registry. Available steps: {available}")]
    StepNotFound {
        /// Designated step name
        name: String,
        /// Comma separated list of registered names
        available: String,
    },

    /// A step of an ordered Action failed
    ///
    /// The entity's cursor still points at `index`; calling `update` again
    /// re-executes the same step.
    #[error("Step '{step}' (#{index}) of action '{action}' failed for '{id}': {source}")]
    StepFailed {
        /// Action name
        action: String,
        /// Step name
        step: String,
        /// Position of the failing step in the Action
        index: usize,
        /// Entity the Action was running for
        id: String,
        /// Error returned by the step
        #[source]
        source: StepError,
    },

    /// A registry step failed
    #[error("Transaction step '{step}' failed: {source}")]
    TransactionStepFailed {
        /// Registered name of the failing step
        step: String,
        /// Error returned by the step
        #[source]
        source: StepError,
    },

    /// Manager configuration is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WorkflowError {
    /// Create a step-not-found error listing the names that do exist
    pub fn step_not_found(name: impl Into<String>, available: &[String]) -> Self {
        let mut available = available.to_vec();
        available.sort();
        Self::StepNotFound {
            name: name.into(),
            available: available.join(", "),
        }
    }

    /// Whether this error came out of a step implementation
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            WorkflowError::StepFailed { .. } | WorkflowError::TransactionStepFailed { .. }
        )
    }
}
