//! Fullpath: the canonical storage key of an object version.
//!
//! A fullpath is the five identity fields (account, container, path, version,
//! content id), each percent-encoded on its own, joined by `/`:
//!
//! ```text
//! acct/cont/obj%2Fname/3/cid1
//! ```
//!
//! Because every field is encoded independently, a `/` inside a field never
//! collides with the separator, and splitting on `/` always yields the original
//! five fields. The format is persisted, so the encoding must stay
//! backward-decodable for keys written by earlier producers.
//!
//! ## Encoding scheme
//!
//! Fields are encoded like a form value (`quote_plus`):
//!
//! - ASCII letters, digits and `_ . -` are kept as-is
//! - a space becomes `+`
//! - every other byte (UTF-8 encoded) becomes `%XX` with uppercase hex
//!
//! Decoding reverses this per segment: `+` becomes a space, then `%XX`
//! sequences are decoded. The decoder accepts anything that splits into five
//! segments, including empty ones; only the encoder validates fields.

use core::fmt;
use core::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::{FullpathError, FullpathResult};

/// Separator between the encoded fields.
pub const SEPARATOR: char = '/';

/// Number of fields in a fullpath.
pub const FIELD_COUNT: usize = 5;

/// Bytes escaped when encoding a field: everything except `[A-Za-z0-9_.-]`.
const FIELD_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

/// Names of the identity fields, in fullpath order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Account,
    Container,
    Path,
    Version,
    ContentId,
}

impl IdentityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Account => "account",
            IdentityField::Container => "container",
            IdentityField::Path => "path",
            IdentityField::Version => "version",
            IdentityField::ContentId => "content_id",
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version of an object, as provided by the producer.
///
/// Producers hand out versions either as integers (meta2 versions are
/// microsecond timestamps) or as already-stringified values. Both are keyed by
/// their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
    Number(i64),
    Text(String),
}

impl Version {
    /// Whether this version is unusable as a key component.
    ///
    /// An integer version of `0` counts as empty, like an empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Version::Number(n) => *n == 0,
            Version::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Number(n) => fmt::Display::fmt(n, f),
            Version::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Version::Number(value)
    }
}

impl From<i32> for Version {
    fn from(value: i32) -> Self {
        Version::Number(value.into())
    }
}

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Version::Number(value.into())
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Version::Text(value)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Version::Text(value.to_string())
    }
}

/// Identity of one stored object version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    account: String,
    container: String,
    path: String,
    version: Version,
    content_id: String,
}

impl Identity {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<Version>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            container: container.into(),
            path: path.into(),
            version: version.into(),
            content_id: content_id.into(),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Encode this identity as a fullpath.
    pub fn encode(&self) -> FullpathResult<String> {
        encode_parts(
            &self.account,
            &self.container,
            &self.path,
            &self.version,
            &self.content_id,
        )
    }

    /// Split into `(account, container, path, version, content_id)`, with the
    /// version in its string form.
    pub fn into_parts(self) -> (String, String, String, String, String) {
        let version = match self.version {
            Version::Text(s) => s,
            Version::Number(n) => n.to_string(),
        };
        (
            self.account,
            self.container,
            self.path,
            version,
            self.content_id,
        )
    }
}

impl FromStr for Identity {
    type Err = FullpathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fullpath(s)
    }
}

/// Encode an object identity as a fullpath.
///
/// Fails with [`FullpathError::InvalidIdentity`] naming the first empty field
/// (checked in fullpath order). A zero integer version is rejected too.
pub fn encode_fullpath(
    account: &str,
    container: &str,
    path: &str,
    version: impl Into<Version>,
    content_id: &str,
) -> FullpathResult<String> {
    encode_parts(account, container, path, &version.into(), content_id)
}

/// Decode a fullpath back into its identity.
///
/// Fails with [`FullpathError::MalformedFullpath`] unless the input splits into
/// exactly five segments. Decoded fields are not validated; the version is
/// always returned as text.
pub fn decode_fullpath(fullpath: &str) -> FullpathResult<Identity> {
    let segments: Vec<&str> = fullpath.split(SEPARATOR).collect();
    let [account, container, path, version, content_id] = segments.as_slice() else {
        return Err(FullpathError::malformed(segments.len()));
    };

    Ok(Identity {
        account: decode_field(account),
        container: decode_field(container),
        path: decode_field(path),
        version: Version::Text(decode_field(version)),
        content_id: decode_field(content_id),
    })
}

fn encode_parts(
    account: &str,
    container: &str,
    path: &str,
    version: &Version,
    content_id: &str,
) -> FullpathResult<String> {
    let checks = [
        (IdentityField::Account, account.is_empty()),
        (IdentityField::Container, container.is_empty()),
        (IdentityField::Path, path.is_empty()),
        (IdentityField::Version, version.is_empty()),
        (IdentityField::ContentId, content_id.is_empty()),
    ];
    if let Some((field, _)) = checks.iter().find(|(_, empty)| *empty) {
        return Err(FullpathError::invalid_identity(*field));
    }

    let version = version.to_string();
    let fields = [account, container, path, version.as_str(), content_id];

    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        encode_field(field, &mut out);
    }
    Ok(out)
}

fn encode_field(field: &str, out: &mut String) {
    // Each escaped byte comes out as its own "%XX" chunk.
    for chunk in utf8_percent_encode(field, FIELD_ENCODE_SET) {
        if chunk == "%20" {
            out.push('+');
        } else {
            out.push_str(chunk);
        }
    }
}

fn decode_field(segment: &str) -> String {
    let unplussed = segment.replace('+', " ");
    percent_decode(unplussed.as_bytes())
        .decode_utf8_lossy()
        .into_owned()
}
