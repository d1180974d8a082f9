//! # mdb-client
//!
//! Synchronous Rust client for the MDB graph database wire protocol.
//!
//! A [`Driver`] holds the server address; each [`Session`] owns one TCP
//! connection and runs one request at a time. Query results stream back as
//! self-describing values and are collected into a [`QueryResult`].
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): length-prefixed chunks, a zero-length seal
//!   terminates each logical message
//! - **Codec** ([`codec`]): tagged value decoding, request encoding
//! - **Driving** ([`Session`]): blocking request/response with response
//!   correlation and best-effort query cancellation
//!
//! ## Example
//!
//! ```ignore
//! use mdb_client::Driver;
//!
//! fn main() -> mdb_client::Result<()> {
//!     let driver = Driver::new("localhost:8080")?;
//!     let mut session = driver.session()?;
//!
//!     let result = session.run("MATCH (?x) RETURN ?x LIMIT 10")?;
//!     for record in &result {
//!         println!("{record}");
//!     }
//!
//!     driver.close();
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

mod catalog;
mod driver;
mod receiver;
mod record;
mod response;
mod result;
mod session;

pub use catalog::Catalog;
pub use codec::{Date, DateTime, Path, PathSegment, Time, Value};
pub use driver::{Driver, DriverConfig};
pub use error::{MdbError, Result};
pub use receiver::MessageReceiver;
pub use record::Record;
pub use response::QueryPreamble;
pub use result::QueryResult;
pub use session::Session;
