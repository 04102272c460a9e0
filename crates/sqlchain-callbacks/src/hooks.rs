//! Lifecycle hook dispatch.

use sqlchain_core::{CreateHooks, Error, HookContext, HookError, Result};

use crate::scope::Scope;

/// The four points at which entity hooks run during a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeSave,
    BeforeCreate,
    AfterCreate,
    AfterSave,
}

impl Hook {
    pub const fn name(&self) -> &'static str {
        match self {
            Hook::BeforeSave => "before_save",
            Hook::BeforeCreate => "before_create",
            Hook::AfterCreate => "after_create",
            Hook::AfterSave => "after_save",
        }
    }

    fn invoke(self, hooks: &mut dyn CreateHooks, cx: &HookContext<'_>) -> Result<()> {
        match self {
            Hook::BeforeSave => hooks.before_save(cx),
            Hook::BeforeCreate => hooks.before_create(cx),
            Hook::AfterCreate => hooks.after_create(cx),
            Hook::AfterSave => hooks.after_save(cx),
        }
    }
}

/// Call one hook on the scope's entity.
///
/// Does nothing when the scope already failed or the entity has no hooks.
/// A failing hook stores an [`Error::Hook`] on the scope.
pub fn dispatch(scope: &mut Scope<'_>, hook: Hook) {
    if scope.has_error() {
        return;
    }
    let result = {
        let Some(hooks) = scope.entity.hooks() else {
            return;
        };
        let cx = HookContext::new(&scope.handle, &*scope.pipeline.dialect, scope.now);
        hook.invoke(hooks, &cx)
    };
    if let Err(err) = result {
        tracing::debug!(
            table = scope.table_name(),
            hook = hook.name(),
            error = %err,
            "hook rejected the operation"
        );
        scope.set_error(into_hook_error(hook, err));
    }
}

fn into_hook_error(hook: Hook, err: Error) -> Error {
    match err {
        Error::Hook(_) => err,
        other => Error::Hook(HookError {
            hook: hook.name(),
            message: other.to_string(),
        }),
    }
}
