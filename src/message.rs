//! The 2-byte message envelope preamble.

use crate::error::Error;

/// First byte of every message: identifies the compact protocol family.
pub(crate) const PROTOCOL_ID: u8 = 0x82;
/// Low 5 bits of the second preamble byte.
pub(crate) const VERSION: u8 = 1;
pub(crate) const VERSION_MASK: u8 = 0x1F;
pub(crate) const TYPE_SHIFT: u8 = 5;

/// The kind of RPC message being framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call,
    Reply,
    Exception,
    Oneway,
}

impl MessageType {
    pub(crate) const fn to_u8(self) -> u8 {
        match self {
            MessageType::Call => 1,
            MessageType::Reply => 2,
            MessageType::Exception => 3,
            MessageType::Oneway => 4,
        }
    }

    /// The 3 bits carried in the high bits of a message's second preamble
    /// byte have no dedicated error kind; an unrecognized value is treated
    /// the same as any other unmapped wire tag.
    pub(crate) fn from_u8(v: u8) -> Result<Self, Error> {
        match v {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(Error::UnknownTypeTag(other)),
        }
    }
}
