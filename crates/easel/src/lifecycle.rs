//! Process lifetime bookkeeping
//!
//! Counts open windows and ends the process when the last one closes. The
//! decision uses only the flag of the window that is closing at the moment
//! the count reaches zero; a window opened with the flag off does not keep
//! the process alive once it is gone, and it cannot veto the exit of another
//! window closing last.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Exit code used when the last window closes.
pub const EXIT_CODE: i32 = 0;

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

/// Open-window counter plus the action taken when it drops to zero
pub struct Lifecycle {
    open: Mutex<usize>,
    exit: ExitHook,
}

impl Lifecycle {
    /// Process-wide instance; its exit hook is [`std::process::exit`]
    pub fn global() -> Arc<Lifecycle> {
        static GLOBAL: OnceLock<Arc<Lifecycle>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Lifecycle::with_exit_hook(|code| std::process::exit(code))))
            .clone()
    }

    /// Isolated instance calling `exit` instead of terminating the process
    pub fn with_exit_hook(exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        Self {
            open: Mutex::new(0),
            exit: Box::new(exit),
        }
    }

    /// Record a window that is about to be constructed
    pub fn window_opened(&self) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open = open.saturating_add(1);
        tracing::debug!(open = *open, "window opened");
    }

    /// Record a window that finished closing
    ///
    /// Returns `true` when the exit hook was called. The hook runs while the
    /// counter is still locked, so no other window can open in between.
    pub fn window_closed(&self, exit_on_last_close: bool) -> bool {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        *open = open.saturating_sub(1);
        tracing::debug!(open = *open, exit_on_last_close, "window closed");

        if *open == 0 && exit_on_last_close {
            tracing::debug!(code = EXIT_CODE, "last window closed, exiting");
            (self.exit)(EXIT_CODE);
            true
        } else {
            false
        }
    }

    /// Number of windows currently open
    pub fn open_windows(&self) -> usize {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("open", &self.open_windows())
            .finish_non_exhaustive()
    }
}
