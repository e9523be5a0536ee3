//! Response decoder module
//!
//! # Overview
//!
//! The decode module is the boundary between raw response bytes and the
//! typed query envelope. Bodies are consumed through a [`MonitoredReader`]
//! that counts bytes, feeds liveness on every read and refuses to read past
//! the reserved parse buffer.

mod decoders;
mod monitor;
mod types;

pub use decoders::JsonDecoder;
pub use monitor::MonitoredReader;
pub use types::{QueryResponse, RawRow, ResponseDecoder};
