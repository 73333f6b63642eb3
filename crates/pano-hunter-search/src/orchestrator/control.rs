use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use super::AbortCause;
use crate::cancel::CancelToken;

/// Per-run stop flags shared by all workers.
pub(super) struct RunControl {
    aborted: AtomicBool,
    cause: Mutex<Option<AbortCause>>,
    cancel: CancelToken,
}

impl RunControl {
    pub(super) fn new(cancel: CancelToken) -> Self {
        Self {
            aborted: AtomicBool::new(false),
            cause: Mutex::new(None),
            cancel,
        }
    }

    #[inline]
    pub(super) fn should_stop(&self) -> bool {
        self.aborted.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    /// Record the first abort cause; later ones are dropped.
    pub(super) fn abort(&self, cause: AbortCause) {
        let mut slot = self.cause.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(cause);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub(super) fn into_cause(self) -> Option<AbortCause> {
        let cause = self.cause.into_inner().unwrap_or_else(PoisonError::into_inner);
        cause.or_else(|| self.cancel.is_cancelled().then_some(AbortCause::Cancelled))
    }
}
