//! Host-side execution context.
//!
//! The step borrows a `StepContext` for the duration of one run: it logs
//! task-tagged messages through it and pulls the host's "save current task"
//! trigger on success. `HostContext` is the implementation used by the
//! bundled runner; it forwards log lines to `tracing` and records save
//! requests for the runner to act on once the run has settled.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use uuid::Uuid;

/// What a step may ask of its host.
pub trait StepContext: Send + Sync {
    /// Name of the task that owns the step (used in log tagging).
    fn task_name(&self) -> &str;

    fn info(&self, msg: &str);

    fn warn(&self, msg: &str);

    fn error(&self, msg: &str);

    /// Ask the host to persist the current task state.
    fn save_task(&self);
}

/// `tracing`-backed context for a single run of a single task.
#[derive(Debug)]
pub struct HostContext {
    task_name: String,
    run_id: Uuid,
    save_requested: AtomicBool,
}

impl HostContext {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            run_id: Uuid::new_v4(),
            save_requested: AtomicBool::new(false),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Whether the step asked for its state to be saved. Clears the flag.
    pub fn take_save_request(&self) -> bool {
        self.save_requested.swap(false, Ordering::AcqRel)
    }
}

impl StepContext for HostContext {
    fn task_name(&self) -> &str {
        &self.task_name
    }

    fn info(&self, msg: &str) {
        info!(task = %self.task_name, run_id = %self.run_id, "{msg}");
    }

    fn warn(&self, msg: &str) {
        warn!(task = %self.task_name, run_id = %self.run_id, "{msg}");
    }

    fn error(&self, msg: &str) {
        error!(task = %self.task_name, run_id = %self.run_id, "{msg}");
    }

    fn save_task(&self) {
        self.save_requested.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_request_is_taken_once() {
        let ctx = HostContext::new("kindle");
        assert!(!ctx.take_save_request());

        ctx.save_task();
        assert!(ctx.take_save_request());
        assert!(!ctx.take_save_request());
    }

    #[test]
    fn test_task_name_and_run_id() {
        let a = HostContext::new("kindle");
        let b = HostContext::new("kindle");
        assert_eq!(a.task_name(), "kindle");
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_logging_without_subscriber_is_noop() {
        let ctx = HostContext::new("kindle");
        ctx.info("hello");
        ctx.warn("careful");
        ctx.error("broken");
        assert!(!ctx.take_save_request());
    }
}
