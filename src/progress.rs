//! Progress reporting and cooperative cancellation for the pipeline stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller can raise to stop long-running work. The transform
/// checks it between work units, never inside a single correlation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Optional observation hooks threaded through the transform: a
/// `(units_done, units_total)` progress callback and a cancellation token.
#[derive(Default)]
pub struct TransformHooks<'a> {
    pub progress: Option<&'a mut dyn FnMut(usize, usize)>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> TransformHooks<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: &'a mut dyn FnMut(usize, usize)) -> Self {
        Self {
            progress: Some(progress),
            cancel: None,
        }
    }

    pub(crate) fn report(&mut self, done: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(done, total);
        }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}
