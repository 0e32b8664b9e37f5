//! # Stepwire
//!
//! Contract-checked step chains, and a static validator for the data that
//! flows through them.
//!
//! ## Features
//!
//! - **Contracts**: every step declares the fields it requires, accepts, and promises
//! - **Composition DSL**: organize steps into chains with inline lambdas, `if` and `each`
//! - **Wiring validation**: find required fields no upstream step promises, without running anything
//! - **Forgiving or strict execution**: breaches fail the context or come back as errors
//! - **Background jobs**: `Async` siblings that enqueue instead of running (feature `jobs`)
//!
//! ## Quick Start
//!
//! ```rust
//! use stepwire::prelude::*;
//!
//! let ns = Namespace::new();
//!
//! let one = ns.leaf("One")
//!     .expect(["foo"])
//!     .promise(["bar"])
//!     .call(|ctx| {
//!         let foo = ctx.value("foo");
//!         ctx.set("bar", foo);
//!         Ok(NodeValue::Null)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let two = ns.leaf("Two")
//!     .expect(["bar"])
//!     .promise(["baz"])
//!     .call(|ctx| {
//!         ctx.set("baz", true);
//!         Ok(NodeValue::Null)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let organizer = ns.organizer("Organizer")
//!     .expect(["foo"])
//!     .organize([one, two])
//!     .build()
//!     .unwrap();
//!
//! // Nothing is missing, so the report is empty.
//! assert_eq!(validate(&ns, Ignore::Nothing), "");
//!
//! let ctx = Executor::default()
//!     .call(&organizer, Context::from_json(serde_json::json!({"foo": 1})))
//!     .unwrap();
//! assert!(ctx.is_success());
//! assert_eq!(ctx.value("baz"), serde_json::json!(true));
//! ```
//!
//! ## Module Organization
//!
//! - [`prelude`]: Commonly used types and traits (import with `use stepwire::prelude::*`)
//! - [`inflect`]: The English inflection used for generated names
//! - [`jobs`]: The background job bridge (feature `jobs`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Data and contracts
pub use crate::core::context::{is_filled, is_truthy, Context, NodeValue};
pub use crate::core::contract::{Breaches, Contract, Field, FieldOptions, Promise};
pub use crate::core::error::{DefinitionError, StepError, StepResult};
pub use crate::core::hooks::{BreachLog, Hooks};

// Steps and execution
pub use crate::core::executor::{Executor, Invocation, Invoker};
pub use crate::core::step::chain::{Chain, ChainBuilder};
pub use crate::core::step::leaf::{Leaf, LeafBuilder, StepLogic};
pub use crate::core::step::AsAny;
pub use crate::core::{SourceLocation, Step};

// Composition
pub use crate::core::dsl::inflect;
pub use crate::core::dsl::{Condition, Conditional, EachLoop, Link, Namespace};

// Wiring validation
pub use crate::core::wiring::discovery::qualified_name_for_path;
pub use crate::core::wiring::report::{exit_code, format_report, format_violation};
pub use crate::core::wiring::{validate, DeclarationRecord, Discovery, Ignore, ValidationState, Violation, Wiring};

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: everything needed to declare, run, and validate chains.
///
/// # Example
/// ```rust
/// use stepwire::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Data
        Context,
        Contract,
        DefinitionError,
        // Execution
        Executor,
        FieldOptions,
        Hooks,
        Ignore,
        Invocation,
        Invoker,
        // Composition
        Condition,
        Link,
        Namespace,
        NodeValue,
        Step,
        StepError,
        StepLogic,
        StepResult,
        // Validation
        Wiring,
        validate,
    };
}

// ============================================================================
// Jobs Feature
// ============================================================================

#[cfg(feature = "jobs")]
pub mod jobs {
    //! Background execution: `Async` siblings, queues, and workers.
    pub use crate::core::jobs::{
        options::VALID_KEYS, Dispatch, InMemoryQueue, Job, JobError, JobMaker, JobOptions,
        JobOutcome, JobSink, JobSource, JobWorker, QueueReceiver,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
