//! # Cancellation
//!
//! Plain request/response transports have no way to interrupt an exchange from the other side, so
//! cancellation is a local latch: an [`AbortController`] flips once, and every [`AbortSignal`]
//! cloned from it observes the flip. The invoker races the exchange against the signal.
//!
//! The primitive is created through a [`CancellationFactory`] injected into the client, which lets
//! callers observe or replace it (tests count abort dispatches this way).
//!
//! [`CallHandle`] is what every invocation returns. Its `cancel()` is single-shot: the first call
//! on a pending invocation dispatches one abort, anything after that is a no-op.
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::watch;

/// A one-way latch that can be tripped once.
#[derive(Debug, Clone)]
pub struct AbortController {
    tx: Arc<watch::Sender<bool>>,
}

/// The observing side of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trips the latch. Idempotent.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    /// A signal that is never aborted.
    pub fn never() -> Self {
        AbortController::new().signal()
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller is aborted.
    ///
    /// If the controller is dropped without aborting, this never resolves.
    pub async fn aborted(&mut self) {
        let closed = self.rx.wait_for(|aborted| *aborted).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// The cancellation primitive bound to a single call.
pub trait Cancellation: Send + Sync + 'static {
    /// Requests abort of the underlying exchange.
    fn abort(&self);

    /// A signal observing [`Cancellation::abort`].
    fn signal(&self) -> AbortSignal;
}

impl Cancellation for AbortController {
    fn abort(&self) {
        AbortController::abort(self)
    }

    fn signal(&self) -> AbortSignal {
        AbortController::signal(self)
    }
}

/// Creates one [`Cancellation`] per call.
pub trait CancellationFactory: Send + Sync + 'static {
    fn create(&self) -> Arc<dyn Cancellation>;
}

/// The default factory, handing out fresh [`AbortController`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortControllerFactory;

impl CancellationFactory for AbortControllerFactory {
    fn create(&self) -> Arc<dyn Cancellation> {
        Arc::new(AbortController::new())
    }
}

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELLED: u8 = 2;

/// Lifecycle of one call, shared between its [`CallHandle`] and the task running it.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallState(Arc<AtomicU8>);

impl CallState {
    /// Moves `pending -> completed`. Returns `false` if the call was cancelled first.
    pub(crate) fn complete(&self) -> bool {
        self.transition(COMPLETED)
    }

    fn cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

/// A handle on one in-flight invocation.
///
/// Cancelling is best-effort: it aborts the bound [`Cancellation`] and the call's callback then
/// receives [`CallError::Cancelled`](crate::stub::CallError::Cancelled) exactly once. A call that
/// already delivered its result is not affected.
pub struct CallHandle {
    cancellation: Arc<dyn Cancellation>,
    state: CallState,
}

impl CallHandle {
    pub(crate) fn new(cancellation: Arc<dyn Cancellation>, state: CallState) -> Self {
        Self {
            cancellation,
            state,
        }
    }

    /// Cancels the call. Only the first call on a pending invocation dispatches an abort.
    pub fn cancel(&self) {
        if self.state.cancel() {
            tracing::debug!("call cancelled, aborting exchange");
            self.cancellation.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == CANCELLED
    }

    /// Whether the callback already received a result (success or error).
    pub fn is_finished(&self) -> bool {
        self.state.get() == COMPLETED
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.get() {
            PENDING => "pending",
            COMPLETED => "completed",
            _ => "cancelled",
        };
        f.debug_struct("CallHandle").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Counting {
        aborts: AtomicUsize,
        inner: AbortController,
    }

    impl Cancellation for Counting {
        fn abort(&self) {
            self.aborts.fetch_add(1, Ordering::SeqCst);
            self.inner.abort();
        }

        fn signal(&self) -> AbortSignal {
            self.inner.signal()
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            aborts: AtomicUsize::new(0),
            inner: AbortController::new(),
        })
    }

    #[test]
    fn cancel_dispatches_a_single_abort() {
        let cancellation = counting();
        let handle = CallHandle::new(cancellation.clone(), CallState::default());

        handle.cancel();
        handle.cancel();

        assert_eq!(cancellation.aborts.load(Ordering::SeqCst), 1);
        assert!(handle.is_cancelled());
        assert!(cancellation.inner.is_aborted());
    }

    #[test]
    fn cancel_after_completion_is_a_noop() {
        let cancellation = counting();
        let state = CallState::default();
        let handle = CallHandle::new(cancellation.clone(), state.clone());

        assert!(state.complete());
        handle.cancel();

        assert_eq!(cancellation.aborts.load(Ordering::SeqCst), 0);
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn completion_loses_against_an_earlier_cancel() {
        let state = CallState::default();
        let handle = CallHandle::new(counting(), state.clone());

        handle.cancel();

        assert!(!state.complete());
    }

    #[tokio::test]
    async fn signal_resolves_after_abort() {
        let controller = AbortController::new();
        let mut signal = controller.signal();
        assert!(!signal.is_aborted());

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
        });

        controller.abort();
        controller.abort();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal never resolved")
            .unwrap();
    }

    #[tokio::test]
    async fn signal_never_resolves_without_abort() {
        let mut signal = AbortSignal::never();

        let res = tokio::time::timeout(Duration::from_millis(20), signal.aborted()).await;
        assert!(res.is_err());
    }
}
