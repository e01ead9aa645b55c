// SPDX-License-Identifier: MIT OR Apache-2.0
//! A compact binary protocol codec, in the style of Apache Thrift's
//! `TCompactProtocol`.
//!
//! [`CompactProtocol`] drives a write/read state machine over any
//! `std::io::{Read, Write}` transport, encoding integers as zig-zag
//! varints, field headers as a single byte when consecutive field ids
//! are close together, and boolean field values fused directly into
//! their header byte.
//!
//! ```
//! use compact_codec::{CompactProtocol, MessageType, TType};
//!
//! let mut protocol = CompactProtocol::new(Vec::new());
//! protocol.write_message_begin(b"ping", MessageType::Call, 1).unwrap();
//! protocol.write_struct_begin("PingArgs").unwrap();
//! protocol.write_field_stop().unwrap();
//! protocol.write_struct_end().unwrap();
//! protocol.write_message_end().unwrap();
//! ```

mod error;
mod factory;
mod limits;
mod message;
mod phase;
mod protocol;
mod ttype;
mod varint;

pub use error::{Error, Result};
pub use factory::CompactProtocolFactory;
pub use limits::Limits;
pub use message::MessageType;
pub use phase::Phase;
pub use protocol::CompactProtocol;
pub use ttype::{CompactType, TType};
