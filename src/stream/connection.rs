use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Handle on the adapter's current transport connection.
///
/// Each connection attempt takes a fresh guard token, a child of the
/// adapter's stop signal; [`close`] cancels the live one so a pending request
/// or body read returns immediately. Cloning shares the handle.
///
/// [`close`]: ConnectionHandle::close
#[derive(Clone, Default)]
pub struct ConnectionHandle {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl ConnectionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, dropping any previous one first.
    pub(crate) fn open(&self, stop: &CancellationToken) -> CancellationToken {
        let token = stop.child_token();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Force-close the current connection, if any. Returns whether one was open.
    pub fn close(&self) -> bool {
        match self.current.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_cancels_open_connection() {
        let handle = ConnectionHandle::new();
        let guard = handle.open(&CancellationToken::new());
        assert!(handle.is_open());

        assert!(handle.close());
        assert!(guard.is_cancelled());
        assert!(!handle.is_open());
    }

    #[test]
    fn test_close_without_connection_is_noop() {
        let handle = ConnectionHandle::new();
        assert!(!handle.close());
    }

    #[test]
    fn test_reopen_drops_previous_connection() {
        let handle = ConnectionHandle::new();
        let stop = CancellationToken::new();
        let first = handle.open(&stop);
        let second = handle.clone().open(&stop);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn test_stop_closes_connection() {
        let handle = ConnectionHandle::new();
        let stop = CancellationToken::new();
        let guard = handle.open(&stop);

        stop.cancel();
        assert!(guard.is_cancelled());
        assert!(!handle.is_open());
    }
}
