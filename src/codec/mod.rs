//! Codec module - the typed value model and its wire encodings.
//!
//! - [`Value`] - the closed tagged union of wire values
//! - [`MessageDecoder`] - recursive self-describing decode
//! - [`encode`] - the request-side scalar encoders (the codec is
//!   intentionally asymmetric: server-only tags are never re-emitted)
//! - [`RequestBuilder`] - complete outbound request byte sequences

pub mod encode;

mod decode;
mod request;
mod value;

pub use decode::MessageDecoder;
pub use request::RequestBuilder;
pub use value::{Date, DateTime, Path, PathSegment, Time, Value};
