//! `sds-core` — storage-key primitives shared across the event pipeline.
//!
//! This crate is **pure** (no IO, no logging): it only knows how to turn an
//! object identity into a durable key and back.

pub mod error;
pub mod fullpath;

pub use error::{FullpathError, FullpathResult};
pub use fullpath::{Identity, IdentityField, Version, decode_fullpath, encode_fullpath};
