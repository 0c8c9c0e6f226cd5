use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::app::{Application, ShutdownSignal};
use crate::config::{ConfigMap, ConfigResult, HandlerConfig};
use crate::envelope::{Envelope, Event};
use crate::outcome::{Completion, Outcome};

/// Body reported when a job was interrupted by a worker shutdown.
pub const STOPPING_BODY: &str = "Process is stopping";

/// Body reported when processing failed for any other reason.
pub const FAULT_BODY: &str = "An error occurred";

/// Why a processing step did not produce an outcome.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The worker is shutting down; not a failure of the job itself.
    #[error("the process is stopping")]
    Stopping,

    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl ProcessError {
    pub fn fault(err: impl Into<anyhow::Error>) -> Self {
        Self::Fault(err.into())
    }
}

/// Everything a processing step can read besides the event itself.
#[derive(Debug)]
pub struct ProcessContext<'c, E> {
    config: &'c HandlerConfig,
    app_env: &'c E,
    shutdown: &'c ShutdownSignal,
}

impl<'c, E> ProcessContext<'c, E> {
    pub fn config(&self) -> &'c HandlerConfig {
        self.config
    }

    pub fn app_env(&self) -> &'c E {
        self.app_env
    }

    /// Cancellation point: fails with [`ProcessError::Stopping`] once the
    /// worker has been asked to stop.
    ///
    /// Call it before blocking IO; nothing between two checkpoints can be
    /// interrupted.
    pub fn checkpoint(&self) -> Result<(), ProcessError> {
        self.shutdown.check()
    }
}

/// The per-event processing step of a handler.
///
/// The default implementation accepts every event unchanged.
pub trait Process<E>: Send + Sync {
    fn process<'a>(
        &self,
        event: Event<'a>,
        _ctx: &ProcessContext<'_, E>,
    ) -> Result<Outcome<'a>, ProcessError> {
        Ok(Outcome::ok(event))
    }
}

/// Processing step that acknowledges every event as-is.
#[derive(Debug, Default, Copy, Clone)]
pub struct Passthrough;

impl<E> Process<E> for Passthrough {}

/// Processing step backed by a closure, see [`process_fn`].
#[derive(Clone)]
pub struct ProcessFn<F>(F);

impl<F> core::fmt::Debug for ProcessFn<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ProcessFn")
    }
}

impl<E, F> Process<E> for ProcessFn<F>
where
    F: for<'a, 'c> Fn(Event<'a>, &ProcessContext<'c, E>) -> Result<Outcome<'a>, ProcessError>
        + Send
        + Sync,
{
    fn process<'a>(
        &self,
        event: Event<'a>,
        ctx: &ProcessContext<'_, E>,
    ) -> Result<Outcome<'a>, ProcessError> {
        (self.0)(event, ctx)
    }
}

/// Wrap a closure as a processing step.
pub fn process_fn<E, F>(f: F) -> ProcessFn<F>
where
    F: for<'a, 'c> Fn(Event<'a>, &ProcessContext<'c, E>) -> Result<Outcome<'a>, ProcessError>
        + Send
        + Sync,
{
    ProcessFn(f)
}

/// Dispatch boundary between a transport and a processing step.
///
/// ## Guarantees
///
/// For every call to [`Handler::dispatch`]:
///
/// - the transport callback is invoked exactly once, with the finalized outcome
/// - nothing the processing step does (error, shutdown request, panic) escapes
///   as anything other than an error outcome
/// - a shutdown request is logged at `INFO`, any other failure at `ERROR`
///
/// The handler holds no mutable state; the application and the configuration
/// are only read, so one handler may serve several workers.
#[derive(Debug)]
pub struct Handler<A, P = Passthrough> {
    app: Arc<A>,
    config: HandlerConfig,
    process: P,
}

impl<A, P> Handler<A, P>
where
    A: Application,
    P: Process<A::Env>,
{
    pub fn new(app: Arc<A>, config: HandlerConfig, process: P) -> Self {
        Self {
            app,
            config,
            process,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn app(&self) -> &Arc<A> {
        &self.app
    }

    /// Process one job and report it to the transport.
    ///
    /// Returns whatever `callback` returns.
    pub fn dispatch<T, R, C>(&self, envelope: &Envelope, transport: &mut T, callback: C) -> R
    where
        T: ?Sized,
        C: FnOnce(&mut T, Completion) -> R,
    {
        let span = tracing::debug_span!(
            parent: self.app.span(),
            "dispatch",
            handler = %self.config.name(),
            job_id = %envelope.job_id()
        );
        let _entered = span.enter();

        let outcome = self.handle(Event::new(envelope));
        debug!(status = %outcome.status(), "job finalized");
        outcome.finalize(transport, callback)
    }

    /// Run the processing step on `event` and contain whatever it does.
    ///
    /// This is [`Handler::dispatch`] without the report to the transport.
    pub fn handle<'a>(&self, event: Event<'a>) -> Outcome<'a> {
        let ctx = ProcessContext {
            config: &self.config,
            app_env: self.app.app_env(),
            shutdown: self.app.shutdown(),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process.process(event, &ctx)));

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(ProcessError::Stopping)) => {
                info!(
                    job_id = %event.job_id(),
                    "job not handled: the process is stopping"
                );
                Outcome::error(event, STOPPING_BODY)
            }
            Ok(Err(ProcessError::Fault(err))) => {
                error!(
                    job_id = %event.job_id(),
                    error = ?err,
                    "job not handled: {err:#}"
                );
                Outcome::error(event, FAULT_BODY)
            }
            Err(payload) => {
                error!(
                    job_id = %event.job_id(),
                    panic = %panic_message(&*payload),
                    "job not handled: processing panicked"
                );
                Outcome::error(event, FAULT_BODY)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Build the default (pass-through) handler from a base configuration and
/// handler-specific overrides.
pub fn build<A>(
    app: Arc<A>,
    base: &ConfigMap,
    overrides: &ConfigMap,
) -> ConfigResult<Handler<A, Passthrough>>
where
    A: Application,
{
    build_with(app, base, overrides, Passthrough)
}

/// Like [`build`], with a custom processing step.
pub fn build_with<A, P>(
    app: Arc<A>,
    base: &ConfigMap,
    overrides: &ConfigMap,
    process: P,
) -> ConfigResult<Handler<A, P>>
where
    A: Application,
    P: Process<A::Env>,
{
    let config = HandlerConfig::merge(base, overrides)?;
    Ok(Handler::new(app, config, process))
}
