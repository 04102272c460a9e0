//! The engine: owns the callback registries and runs creates.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlchain::prelude::*;
//!
//! let engine = Engine::builder()
//!     .dialect(Sqlite::new())
//!     .created_at_field("inserted_at")
//!     .build();
//! let report = engine.create(&conn, &mut hero)?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use sqlchain_callbacks::{
    Callbacks, ChainKind, Clock, CreateOptions, CreateReport, Pipeline, Settings,
};
use sqlchain_core::{
    Connection, DefaultIntrospector, Dialect, Entity, FieldIntrospector, Result, Sqlite,
};

use crate::config::EngineConfig;

/// Runs create operations through a configurable callback chain.
///
/// An engine is immutable while operations run; change its callbacks through
/// [`Engine::callbacks_mut`] between operations. The compiled chain is cached
/// and shared by concurrent creates.
#[derive(Debug, Clone)]
pub struct Engine {
    callbacks: Callbacks,
    dialect: Arc<dyn Dialect>,
    introspector: Arc<dyn FieldIntrospector>,
    clock: Clock,
    settings: Settings,
}

impl Engine {
    /// An engine with the default create chain.
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self::builder().dialect(dialect).build()
    }

    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Build an engine from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::builder().config(config)?.build())
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Mutable access for registering, moving or removing steps.
    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The pipeline for one chain kind, as it would run now.
    pub fn pipeline(&self, kind: ChainKind) -> Pipeline {
        Pipeline::new(self.callbacks.chain(kind), Arc::clone(&self.dialect))
            .introspector(Arc::clone(&self.introspector))
            .clock(self.clock.clone())
            .settings(self.settings.clone())
    }

    /// Create `entity` with default options.
    pub fn create(&self, conn: &dyn Connection, entity: &mut dyn Entity) -> Result<CreateReport> {
        self.create_with(conn, entity, CreateOptions::default())
    }

    /// Create `entity` with per-call options.
    #[tracing::instrument(
        level = "debug",
        skip(self, conn, entity, options),
        fields(table = %entity.table_name(), dialect = self.dialect.name())
    )]
    pub fn create_with(
        &self,
        conn: &dyn Connection,
        entity: &mut dyn Entity,
        options: CreateOptions,
    ) -> Result<CreateReport> {
        let start = Instant::now();
        let result = self.pipeline(ChainKind::Create).run(conn, entity, options);
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        match &result {
            Ok(report) => tracing::info!(
                rows_affected = report.rows_affected,
                elapsed_us,
                "create completed"
            ),
            Err(err) => tracing::info!(error = %err, elapsed_us, "create failed"),
        }
        result
    }
}

/// Fluent builder for [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    dialect: Option<Arc<dyn Dialect>>,
    introspector: Option<Arc<dyn FieldIntrospector>>,
    clock: Option<Clock>,
    callbacks: Option<Callbacks>,
    settings: Settings,
}

impl EngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a configuration (dialect and settings).
    pub fn config(mut self, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        self.dialect = Some(config.resolve_dialect()?);
        self.settings = config.settings();
        Ok(self)
    }

    #[must_use]
    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Some(Arc::new(dialect));
        self
    }

    #[must_use]
    pub fn shared_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Replace the default introspector.
    #[must_use]
    pub fn introspector(mut self, introspector: Arc<dyn FieldIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Time source for timestamps (defaults to the system clock).
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Start from these callbacks instead of the defaults.
    #[must_use]
    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    #[must_use]
    pub fn created_at_field(mut self, name: impl Into<String>) -> Self {
        self.settings.created_at_field = name.into();
        self
    }

    #[must_use]
    pub fn updated_at_field(mut self, name: impl Into<String>) -> Self {
        self.settings.updated_at_field = name.into();
        self
    }

    #[must_use]
    pub fn save_associations(mut self, save: bool) -> Self {
        self.settings.save_associations = save;
        self
    }

    pub fn build(self) -> Engine {
        let dialect = self.dialect.unwrap_or_else(|| Arc::new(Sqlite::new()));
        tracing::debug!(dialect = dialect.name(), "building engine");
        Engine {
            callbacks: self.callbacks.unwrap_or_else(Callbacks::with_default_create),
            dialect,
            introspector: self
                .introspector
                .unwrap_or_else(|| Arc::new(DefaultIntrospector)),
            clock: self.clock.unwrap_or_else(Clock::system),
            settings: self.settings,
        }
    }
}
