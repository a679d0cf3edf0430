// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::{atomic::AtomicBool, Arc, Mutex};

/// Shared fail-fast flag for worker threads.
///
/// The first worker that hits a fatal error parks it here; peers poll
/// `is_failed` at loop iterations and barriers and unwind at the next
/// barrier instead of continuing a doomed solve.
#[derive(Clone, Debug, Default)]
pub struct FailSignal {
    failed: Arc<AtomicBool>,
    error: Arc<Mutex<Option<crate::Error>>>,
}

impl FailSignal {
    /// Stores the first error and raises the flag.
    pub fn fail(&self, error: crate::Error) {
        #[allow(clippy::expect_used)]
        let mut slot = self.error.lock().expect("lock is poisoned");

        if slot.is_none() {
            *slot = Some(error);
        }

        self.failed.store(true, std::sync::atomic::Ordering::Release);
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Takes the stored error, leaving the flag raised.
    #[allow(clippy::expect_used)]
    pub fn take(&self) -> Option<crate::Error> {
        self.error.lock().expect("lock is poisoned").take()
    }

    /// Returns the stored error, or a generic one if a peer raced us to it.
    pub fn into_error(self) -> crate::Error {
        self.take()
            .unwrap_or_else(|| crate::Error::Runtime("worker failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn fail_signal_keeps_first_error() {
        let signal = FailSignal::default();
        assert!(!signal.is_failed());

        signal.fail(crate::Error::IllegalArgument("first".into()));
        signal.fail(crate::Error::IllegalArgument("second".into()));
        assert!(signal.is_failed());

        match signal.take() {
            Some(crate::Error::IllegalArgument(msg)) => assert_eq!("first", msg),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
