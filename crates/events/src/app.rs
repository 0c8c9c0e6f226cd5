//! Capabilities a hosting application lends to its handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Span;

use crate::handler::ProcessError;

/// Cooperative shutdown flag shared by a worker and its handlers.
///
/// Requesting shutdown never interrupts anything: it only makes the next
/// [`ShutdownSignal::check`] (usually through `ProcessContext::checkpoint`)
/// return [`ProcessError::Stopping`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    stopping: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ProcessError> {
        if self.is_requested() {
            Err(ProcessError::Stopping)
        } else {
            Ok(())
        }
    }
}

/// What a handler may use from the application hosting it.
///
/// The application outlives every handler and is shared between them; handlers
/// only read from it.
pub trait Application: Send + Sync {
    /// Shared environment (clients, pools, namespace settings...).
    type Env: Send + Sync;

    fn app_env(&self) -> &Self::Env;

    /// Logging scope every dispatch is recorded under.
    fn span(&self) -> &Span;

    fn shutdown(&self) -> &ShutdownSignal;
}

impl<A> Application for Arc<A>
where
    A: Application + ?Sized,
{
    type Env = A::Env;

    fn app_env(&self) -> &Self::Env {
        (**self).app_env()
    }

    fn span(&self) -> &Span {
        (**self).span()
    }

    fn shutdown(&self) -> &ShutdownSignal {
        (**self).shutdown()
    }
}

/// Plain [`Application`] for workers that need nothing more than an
/// environment value.
#[derive(Debug)]
pub struct App<E> {
    env: E,
    span: Span,
    shutdown: ShutdownSignal,
}

impl<E> App<E> {
    pub fn new(name: &str, env: E) -> Self {
        Self {
            env,
            span: tracing::info_span!("app", app = %name),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }
}

impl<E> Application for App<E>
where
    E: Send + Sync,
{
    type Env = E;

    fn app_env(&self) -> &E {
        &self.env
    }

    fn span(&self) -> &Span {
        &self.span
    }

    fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let worker_copy = signal.clone();
        assert!(worker_copy.check().is_ok());

        signal.request();
        assert!(worker_copy.is_requested());
        assert!(matches!(worker_copy.check(), Err(ProcessError::Stopping)));
    }

    #[test]
    fn app_exposes_env_and_shutdown() {
        let signal = ShutdownSignal::new();
        let app = Arc::new(App::new("test", 7u32).with_shutdown(signal.clone()));
        assert_eq!(*app.app_env(), 7);

        signal.request();
        assert!(app.shutdown().is_requested());
    }
}
