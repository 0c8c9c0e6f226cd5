//! Terminal result of one dispatch.

use core::fmt;

use crate::envelope::{Event, JobId};

/// Status reported back to the transport.
///
/// Codes follow the HTTP convention the event agents have always used, so that
/// transports can log them next to proxy responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Error => 500,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What the transport callback receives when a job is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub job_id: JobId,
    pub status: Status,
    pub body: String,
}

/// Result of processing one event.
///
/// An outcome is built once per dispatch and consumed by [`Outcome::finalize`],
/// which is the only way a job is reported back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<'a> {
    Ok { event: Event<'a> },
    Error { event: Event<'a>, body: String },
}

impl<'a> Outcome<'a> {
    pub fn ok(event: Event<'a>) -> Self {
        Outcome::Ok { event }
    }

    pub fn error(event: Event<'a>, body: impl Into<String>) -> Self {
        Outcome::Error {
            event,
            body: body.into(),
        }
    }

    pub fn event(&self) -> Event<'a> {
        match self {
            Outcome::Ok { event } | Outcome::Error { event, .. } => *event,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Outcome::Ok { .. } => Status::Ok,
            Outcome::Error { .. } => Status::Error,
        }
    }

    /// Body sent with the status; empty on success.
    pub fn body(&self) -> &str {
        match self {
            Outcome::Ok { .. } => "",
            Outcome::Error { body, .. } => body,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }

    /// Report this outcome to the transport.
    ///
    /// The callback decides what the status means (ack, release, bury...);
    /// its return value is handed back unchanged.
    pub fn finalize<T, R, C>(self, transport: &mut T, callback: C) -> R
    where
        T: ?Sized,
        C: FnOnce(&mut T, Completion) -> R,
    {
        let status = self.status();
        let (event, body) = match self {
            Outcome::Ok { event } => (event, String::new()),
            Outcome::Error { event, body } => (event, body),
        };

        callback(
            transport,
            Completion {
                job_id: event.job_id().clone(),
                status,
                body,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;

    #[test]
    fn ok_finalizes_with_200_and_empty_body() {
        let env = Envelope::new(5u64);
        let mut acked: Vec<Completion> = Vec::new();

        Outcome::ok(Event::new(&env)).finalize(&mut acked, |acked, c| acked.push(c));

        assert_eq!(
            acked,
            vec![Completion {
                job_id: JobId::new("5"),
                status: Status::Ok,
                body: String::new(),
            }]
        );
    }

    #[test]
    fn error_finalizes_with_500_and_body() {
        let env = Envelope::new(6u64);
        let outcome = Outcome::error(Event::new(&env), "boom");
        assert_eq!(outcome.body(), "boom");
        assert!(!outcome.is_ok());

        let code = outcome.finalize(&mut (), |_, c| {
            assert_eq!(c.body, "boom");
            c.status.code()
        });
        assert_eq!(code, 500);
    }
}
