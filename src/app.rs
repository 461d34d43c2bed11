use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    /// Shutdown flag, set by the quit key or Ctrl-C
    should_quit: AtomicBool,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            should_quit: AtomicBool::new(false),
        })
    }

    /// Signal shutdown
    pub fn quit(&self) {
        self.should_quit.store(true, Ordering::SeqCst);
    }

    /// Check if shutdown requested
    pub fn is_quitting(&self) -> bool {
        self.should_quit.load(Ordering::SeqCst)
    }
}
