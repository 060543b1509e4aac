use tracing::{Dispatch, Subscriber};

/// Where the interposer's own events go.
///
/// The default discards everything. Only events emitted by the interposer
/// run under this dispatcher; the wrapped handler keeps logging through
/// whatever subscriber is active around it.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// A logger that records nothing.
    pub fn none() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Capture the subscriber active on the calling thread.
    pub fn current() -> Self {
        Self {
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    pub fn new<S>(subscriber: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Run `f` with this logger as the thread's default dispatcher.
    pub(crate) fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }
}
