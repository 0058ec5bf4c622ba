use std::future::Future;

tokio::task_local! {
    static OVERRIDE_ACTIVE: bool;
}

/// Per-request override context (§3 "Override Context", §9 "Override-context
/// propagation"). Carried on the task running a single dispatch, never on a
/// process-global — two concurrently-executing requests run on distinct
/// tasks and therefore never observe each other's override flag.
pub async fn run_with_context<F, T>(override_active: bool, fut: F) -> T
where
    F: Future<Output = T>,
{
    OVERRIDE_ACTIVE.scope(override_active, fut).await
}

/// Read the override flag of the enclosing `run_with_context` scope.
/// Returns `false` outside of any scope (fail-safe default: no override).
pub fn is_override_active() -> bool {
    OVERRIDE_ACTIVE.try_with(|v| *v).unwrap_or(false)
}
