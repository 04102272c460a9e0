//! Everything a create operation shares across its scopes.
//!
//! A [`Pipeline`] bundles the compiled chain with the collaborators the steps
//! call into (dialect, introspector, clock) and the engine-level settings.
//! It is cheap to build: every part is behind an `Arc`.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlchain_core::{Connection, DefaultIntrospector, Dialect, Entity, FieldIntrospector, Result, Value};

use crate::options::CreateOptions;
use crate::registry::Chain;
use crate::scope::{Handle, Scope};
use crate::transaction;

/// Source of the operation timestamp, in microseconds since the Unix epoch.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> i64 + Send + Sync>);

impl Clock {
    /// Wall-clock time.
    pub fn system() -> Self {
        Self(Arc::new(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
                .unwrap_or(0)
        }))
    }

    /// Always the same instant.
    pub fn fixed(micros: i64) -> Self {
        Self(Arc::new(move || micros))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn now(&self) -> i64 {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").finish_non_exhaustive()
    }
}

/// Engine-level knobs read by the default steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Field stamped on create when blank.
    pub created_at_field: String,
    /// Field stamped on create (and update) when blank.
    pub updated_at_field: String,
    /// Default for [`CreateOptions::save_associations`].
    pub save_associations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            created_at_field: "created_at".to_string(),
            updated_at_field: "updated_at".to_string(),
            save_associations: true,
        }
    }
}

/// What a successful create reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateReport {
    /// Rows affected by the INSERT.
    pub rows_affected: u64,
    /// The INSERT statement as executed.
    pub sql: String,
    /// Bound parameters in placeholder order.
    pub vars: Vec<Value>,
}

/// A compiled chain plus its collaborators.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) chain: Arc<Chain>,
    pub(crate) dialect: Arc<dyn Dialect>,
    pub(crate) introspector: Arc<dyn FieldIntrospector>,
    pub(crate) clock: Clock,
    pub(crate) settings: Settings,
}

impl Pipeline {
    pub fn new(chain: Arc<Chain>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            chain,
            dialect,
            introspector: Arc::new(DefaultIntrospector),
            clock: Clock::system(),
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn introspector(mut self, introspector: Arc<dyn FieldIntrospector>) -> Self {
        self.introspector = introspector;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    /// Run the chain once over `entity`.
    ///
    /// A transaction the chain left open (because a custom chain dropped the
    /// commit step) is resolved before returning.
    pub fn run(
        &self,
        conn: &dyn Connection,
        entity: &mut dyn Entity,
        options: CreateOptions,
    ) -> Result<CreateReport> {
        let mut scope = Scope::new(self, entity, Handle::Idle(conn), options, 0);
        self.chain.run(&mut scope);
        if scope.handle.is_owned() {
            tracing::debug!(
                table = scope.table_name(),
                "chain finished with an open transaction, resolving it"
            );
            transaction::resolve(&mut scope);
        }
        scope.into_report()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("dialect", &self.dialect.name())
            .field("introspector", &self.introspector)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
