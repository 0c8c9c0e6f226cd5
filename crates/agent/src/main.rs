//! Minimal event agent: reads one JSON job per line on stdin, dispatches it
//! through a pass-through handler and prints `<job_id> <status> <body>` for
//! each finalized job.
//!
//! Usage: `sds-event-agent [CONF.json]`, where the optional file holds a
//! `base` section shared by handlers and a `handler` section overriding it.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::Value;

use sds_events::{App, Application, ConfigMap, Envelope, Handler, Process, build};
use sds_observability::ObservabilityConfig;

fn load_conf(path: &str) -> anyhow::Result<(ConfigMap, ConfigMap)> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    parse_conf(&raw)
}

/// Split a conf document into its `base` and `handler` sections.
fn parse_conf(raw: &str) -> anyhow::Result<(ConfigMap, ConfigMap)> {
    let Value::Object(mut root) = serde_json::from_str::<Value>(raw).context("invalid configuration")?
    else {
        bail!("configuration must be a JSON object");
    };

    let mut section = |name: &str| match root.remove(name) {
        None => Ok(ConfigMap::new()),
        Some(Value::Object(m)) => Ok(m),
        Some(_) => Err(anyhow::anyhow!("section '{name}' must be an object")),
    };
    Ok((section("base")?, section("handler")?))
}

/// Dispatch every job read from `input`, writing one completion line per job
/// to `output`. Blank lines are ignored and malformed jobs are logged and
/// skipped.
fn run<A, P>(handler: &Handler<A, P>, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()>
where
    A: Application,
    P: Process<A::Env>,
{
    for line in input.lines() {
        let line = line.context("failed to read job")?;
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match Envelope::from_slice(line.as_bytes()) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed job");
                continue;
            }
        };

        handler
            .dispatch(&envelope, &mut output, |out, c| {
                writeln!(out, "{} {} {}", c.job_id, c.status.code(), c.body)
            })
            .context("failed to report job")?;
    }

    output.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let (base, overrides) = match std::env::args().nth(1) {
        Some(path) => load_conf(&path)?,
        None => (ConfigMap::new(), ConfigMap::new()),
    };

    sds_observability::init_with(&ObservabilityConfig::from_settings(&base)?);

    let app = Arc::new(App::new("sds-event-agent", ()));
    let handler = build(app, &base, &overrides)?;
    tracing::info!(handler = %handler.config().name(), "agent started");

    run(&handler, io::stdin().lock(), io::stdout().lock())
}
