//! Callback chains for sqlchain.
//!
//! A create is a chain of named steps run in order over one [`Scope`]. The
//! default chain ([`create::register_defaults`]) covers transactions, hooks,
//! timestamps, the INSERT itself, reloading database defaults and saving
//! related entities. Applications add, move, replace or remove steps through
//! [`Callbacks`] before handing it to an engine.
//!
//! Steps talk to each other only through the scope: its field snapshot, its
//! statement, its single error slot and its typed instance store.

pub mod association;
pub mod create;
pub mod hooks;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod scope;
pub mod transaction;

#[cfg(test)]
mod mock;

pub use create::{names, register_defaults};
pub use hooks::Hook;
pub use options::CreateOptions;
pub use pipeline::{Clock, CreateReport, Pipeline, Settings};
pub use registry::{CallbackRegistry, CallbackStep, Callbacks, Chain, ChainKind, Placement, StepFn};
pub use scope::{BLANK_COLUMNS_WITH_DEFAULT, InstanceKey, Scope};
