//! Callback registries and compiled chains.
//!
//! A [`CallbackRegistry`] is the mutable, named list of steps for one kind of
//! operation. Steps are appended by default or anchored before/after another
//! step by name. [`CallbackRegistry::compile`] flattens the placement rules
//! into an immutable [`Chain`], which is cached until the registry changes.
//!
//! ```ignore
//! let mut callbacks = Callbacks::with_default_create();
//! callbacks.register_after(ChainKind::Create, names::CREATE, "audit", |scope| {
//!     tracing::info!(table = scope.table_name(), "row created");
//! });
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::scope::Scope;

/// A step function. Steps communicate only through the scope.
pub type StepFn = Arc<dyn Fn(&mut Scope<'_>) + Send + Sync>;

/// The operation a chain implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    Create,
    Update,
    Delete,
    Query,
}

impl ChainKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Create => "create",
            ChainKind::Update => "update",
            ChainKind::Delete => "delete",
            ChainKind::Query => "query",
        }
    }
}

/// Where a step goes relative to the others.
///
/// `before` wins when both anchors are set. An anchor that names no registered
/// step (including one removed later) is ignored and the step is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl Placement {
    /// Append in registration order.
    pub fn end() -> Self {
        Self::default()
    }

    pub fn before(anchor: impl Into<String>) -> Self {
        Self {
            before: Some(anchor.into()),
            after: None,
        }
    }

    pub fn after(anchor: impl Into<String>) -> Self {
        Self {
            before: None,
            after: Some(anchor.into()),
        }
    }
}

/// A named step with its placement.
#[derive(Clone)]
pub struct CallbackStep {
    name: String,
    placement: Placement,
    func: StepFn,
}

impl CallbackStep {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }
}

impl fmt::Debug for CallbackStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackStep")
            .field("name", &self.name)
            .field("placement", &self.placement)
            .finish_non_exhaustive()
    }
}

/// The ordered, mutable step list for one [`ChainKind`].
#[derive(Clone)]
pub struct CallbackRegistry {
    kind: ChainKind,
    steps: Vec<CallbackStep>,
    compiled: OnceLock<Arc<Chain>>,
}

impl CallbackRegistry {
    pub fn new(kind: ChainKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Step names in registration order (not execution order).
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Append a step.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.register_with(name, Placement::end(), func);
    }

    /// Register a step that runs immediately before `anchor`.
    pub fn register_before<F>(&mut self, anchor: &str, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.register_with(name, Placement::before(anchor), func);
    }

    /// Register a step that runs immediately after `anchor`.
    pub fn register_after<F>(&mut self, anchor: &str, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.register_with(name, Placement::after(anchor), func);
    }

    /// Register a step with explicit placement.
    ///
    /// Re-registering an existing name replaces that step (function and
    /// placement) where it stands.
    pub fn register_with<F>(&mut self, name: impl Into<String>, placement: Placement, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        let step = CallbackStep {
            name: name.into(),
            placement,
            func: Arc::new(func),
        };
        if let Some(idx) = self.position(&step.name) {
            tracing::warn!(
                kind = self.kind.as_str(),
                step = %step.name,
                "callback already registered, replacing it"
            );
            self.steps[idx] = step;
        } else {
            self.steps.push(step);
        }
        self.invalidate();
    }

    /// Swap the function of an existing step, keeping its placement.
    ///
    /// An unknown name is appended.
    pub fn replace<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        match self.position(name) {
            Some(idx) => {
                self.steps[idx].func = Arc::new(func);
                self.invalidate();
            }
            None => {
                tracing::warn!(
                    kind = self.kind.as_str(),
                    step = name,
                    "replacing unregistered callback, appending it"
                );
                self.register(name, func);
            }
        }
    }

    /// Remove a step. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(idx) = self.position(name) else {
            return false;
        };
        self.steps.remove(idx);
        self.invalidate();
        true
    }

    /// The compiled chain, built on first use after each mutation.
    pub fn compile(&self) -> Arc<Chain> {
        Arc::clone(self.compiled.get_or_init(|| {
            let order = resolve_order(&self.steps);
            let steps = order
                .into_iter()
                .map(|idx| {
                    let step = &self.steps[idx];
                    (step.name.clone(), Arc::clone(&step.func))
                })
                .collect::<Vec<_>>();
            tracing::debug!(
                kind = self.kind.as_str(),
                steps = steps.len(),
                "compiled callback chain"
            );
            Arc::new(Chain {
                kind: self.kind,
                steps,
            })
        }))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    fn invalidate(&mut self) {
        self.compiled = OnceLock::new();
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("kind", &self.kind)
            .field("steps", &self.steps)
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}

/// Resolve placements into an execution order of step indices.
fn resolve_order(steps: &[CallbackStep]) -> Vec<usize> {
    let mut sorted = Vec::with_capacity(steps.len());
    let mut visiting = vec![false; steps.len()];
    for idx in 0..steps.len() {
        place(steps, idx, &mut sorted, &mut visiting);
    }
    sorted
}

fn place(steps: &[CallbackStep], idx: usize, sorted: &mut Vec<usize>, visiting: &mut [bool]) {
    if visiting[idx] || sorted.contains(&idx) {
        return;
    }
    visiting[idx] = true;

    let placement = &steps[idx].placement;
    if let Some(anchor) = anchor_index(steps, placement.before.as_deref(), idx) {
        place(steps, anchor, sorted, visiting);
        if let Some(pos) = sorted.iter().position(|&s| s == anchor) {
            sorted.insert(pos, idx);
            return;
        }
    }
    if let Some(anchor) = anchor_index(steps, placement.after.as_deref(), idx) {
        place(steps, anchor, sorted, visiting);
        if let Some(pos) = sorted.iter().position(|&s| s == anchor) {
            sorted.insert(pos + 1, idx);
            return;
        }
    }
    // No anchor, unknown anchor, or an anchor caught in a placement cycle.
    sorted.push(idx);
}

fn anchor_index(steps: &[CallbackStep], anchor: Option<&str>, this: usize) -> Option<usize> {
    let anchor = anchor?;
    let found = steps
        .iter()
        .enumerate()
        .position(|(i, s)| i != this && s.name == anchor);
    if found.is_none() {
        tracing::warn!(
            step = %steps[this].name,
            anchor,
            "callback anchor not registered, appending step"
        );
    }
    found
}

/// An immutable, ordered step sequence ready to run.
pub struct Chain {
    kind: ChainKind,
    steps: Vec<(String, StepFn)>,
}

impl Chain {
    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    /// Step names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order over one scope.
    ///
    /// All steps run even after an error; each step decides whether an
    /// error on the scope means it should do nothing.
    pub fn run(&self, scope: &mut Scope<'_>) {
        for (name, func) in &self.steps {
            tracing::trace!(
                kind = self.kind.as_str(),
                step = %name,
                has_error = scope.has_error(),
                "running callback"
            );
            func(scope);
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("kind", &self.kind)
            .field("steps", &self.names())
            .finish()
    }
}

/// One registry per chain kind, owned by an engine.
#[derive(Debug, Clone)]
pub struct Callbacks {
    create: CallbackRegistry,
    update: CallbackRegistry,
    delete: CallbackRegistry,
    query: CallbackRegistry,
}

impl Callbacks {
    /// Registries with no steps at all.
    pub fn empty() -> Self {
        Self {
            create: CallbackRegistry::new(ChainKind::Create),
            update: CallbackRegistry::new(ChainKind::Update),
            delete: CallbackRegistry::new(ChainKind::Delete),
            query: CallbackRegistry::new(ChainKind::Query),
        }
    }

    /// Registries with the default create chain installed.
    pub fn with_default_create() -> Self {
        let mut callbacks = Self::empty();
        crate::create::register_defaults(&mut callbacks.create);
        callbacks
    }

    pub fn registry(&self, kind: ChainKind) -> &CallbackRegistry {
        match kind {
            ChainKind::Create => &self.create,
            ChainKind::Update => &self.update,
            ChainKind::Delete => &self.delete,
            ChainKind::Query => &self.query,
        }
    }

    pub fn registry_mut(&mut self, kind: ChainKind) -> &mut CallbackRegistry {
        match kind {
            ChainKind::Create => &mut self.create,
            ChainKind::Update => &mut self.update,
            ChainKind::Delete => &mut self.delete,
            ChainKind::Query => &mut self.query,
        }
    }

    pub fn create(&mut self) -> &mut CallbackRegistry {
        &mut self.create
    }

    pub fn register<F>(&mut self, kind: ChainKind, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.registry_mut(kind).register(name, func);
    }

    pub fn register_before<F>(
        &mut self,
        kind: ChainKind,
        anchor: &str,
        name: impl Into<String>,
        func: F,
    ) where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.registry_mut(kind).register_before(anchor, name, func);
    }

    pub fn register_after<F>(
        &mut self,
        kind: ChainKind,
        anchor: &str,
        name: impl Into<String>,
        func: F,
    ) where
        F: Fn(&mut Scope<'_>) + Send + Sync + 'static,
    {
        self.registry_mut(kind).register_after(anchor, name, func);
    }

    pub fn remove(&mut self, kind: ChainKind, name: &str) -> bool {
        self.registry_mut(kind).remove(name)
    }

    /// The compiled chain for `kind`.
    pub fn chain(&self, kind: ChainKind) -> Arc<Chain> {
        self.registry(kind).compile()
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::with_default_create()
    }
}
