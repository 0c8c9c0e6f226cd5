//! Event consumer core: job envelopes, outcomes and the dispatch boundary.
//!
//! A transport (beanstalkd tube, Redis stream, ...) hands each job to a
//! [`Handler`]. The handler runs a pluggable [`Process`] step and always
//! finalizes exactly one [`Outcome`] back to the transport, whatever the step
//! did: returned, asked to stop, failed, or panicked.

pub mod app;
pub mod config;
pub mod envelope;
pub mod handler;
pub mod outcome;

pub use app::{App, Application, ShutdownSignal};
pub use config::{ConfigError, ConfigMap, ConfigResult, HandlerConfig, LOG_LEVELS};
pub use envelope::{Envelope, EnvelopeError, Event, JobId};
pub use handler::{
    Handler, Passthrough, Process, ProcessContext, ProcessError, ProcessFn, build, build_with,
    process_fn,
};
pub use outcome::{Completion, Outcome, Status};
