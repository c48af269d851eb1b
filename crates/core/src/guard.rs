// Run-state guard: the external check that blocks writes while the game is running.

/// Reports whether the application that owns the config file is active.
///
/// Implementations are thin OS queries supplied by the caller; the core only
/// consults them before writing.
pub trait RunStateGuard {
    /// Name of the running process that blocks writes, or `None` when it is safe to write.
    fn running_process(&self) -> Option<String>;
}

/// Guard that never blocks. Used by tests and when no process check is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRunning;

impl RunStateGuard for NeverRunning {
    fn running_process(&self) -> Option<String> {
        None
    }
}

impl<F> RunStateGuard for F
where
    F: Fn() -> Option<String>,
{
    fn running_process(&self) -> Option<String> {
        self()
    }
}

/// Precondition message for a blocked write.
pub fn running_message(process: &str) -> String {
    format!("{process} is running; close the game before writing settings")
}
