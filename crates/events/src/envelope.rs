use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use sds_core::{Identity, Version};

/// Identifier the transport assigned to a job (log correlation only).
///
/// Queues hand out numeric ids (beanstalkd) or opaque strings (streams); both
/// are kept in their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => JobId::from(n),
            Raw::Text(s) => JobId(s),
        })
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload was not a JSON object carrying a `job_id`.
    #[error("invalid job envelope: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A job as delivered by the transport.
///
/// The transport owns the envelope for the whole life of the job; handlers only
/// ever borrow it through an [`Event`]. Keys this crate does not know about are
/// kept in `extra` so that re-serializing an envelope is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    job_id: JobId,

    #[serde(rename = "event", default, skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,

    /// Address of the object or container the event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<Value>,

    /// Producer timestamp: integer microseconds or float seconds depending
    /// on the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    when: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,

    #[serde(default)]
    data: Value,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Envelope {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            event_type: None,
            url: None,
            when: None,
            request_id: None,
            data: Value::Null,
            extra: Map::new(),
        }
    }

    /// Parse the raw job body handed out by the queue.
    pub fn from_slice(raw: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn from_json(value: Value) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_url(mut self, url: Value) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_when(mut self, when: impl Into<Number>) -> Self {
        self.when = Some(when.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Read-only view of one job, valid for the duration of a single dispatch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Event<'a> {
    envelope: &'a Envelope,
}

impl<'a> Event<'a> {
    pub fn new(envelope: &'a Envelope) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &'a Envelope {
        self.envelope
    }

    pub fn job_id(&self) -> &'a JobId {
        &self.envelope.job_id
    }

    /// Event type, e.g. `storage.content.new`.
    pub fn event_type(&self) -> Option<&'a str> {
        self.envelope.event_type.as_deref()
    }

    pub fn url(&self) -> Option<&'a Value> {
        self.envelope.url.as_ref()
    }

    pub fn when(&self) -> Option<&'a Number> {
        self.envelope.when.as_ref()
    }

    pub fn request_id(&self) -> Option<&'a str> {
        self.envelope.request_id.as_deref()
    }

    pub fn data(&self) -> &'a Value {
        &self.envelope.data
    }

    /// Identity of the object version this event is about, read from `url`.
    ///
    /// The url carries `account`, `user` (the container), `path`, `version`
    /// and `content` (the content id). Returns `None` if any of them is
    /// missing or has the wrong type. Numeric versions outside the `i64`
    /// range are kept in their decimal text form.
    pub fn object_identity(&self) -> Option<Identity> {
        let url = self.url()?.as_object()?;
        let text = |key: &str| url.get(key).and_then(Value::as_str);
        let version = match url.get("version")? {
            Value::Number(n) => match n.as_i64() {
                Some(v) => Version::Number(v),
                None => Version::Text(n.to_string()),
            },
            Value::String(s) => Version::Text(s.clone()),
            _ => return None,
        };

        Some(Identity::new(
            text("account")?,
            text("user")?,
            text("path")?,
            version,
            text("content")?,
        ))
    }
}
