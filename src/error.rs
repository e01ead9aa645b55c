//! Error kinds surfaced by the compact protocol codec.
//!
//! Every error aborts the current message: the codec instance that produced
//! it must be discarded, since its delta-compression bookkeeping is no
//! longer trustworthy once an error has escaped.

use std::io;

use crate::phase::Phase;

/// Everything that can go wrong while driving a [`crate::CompactProtocol`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The first byte of a message was not `0x82`.
    #[error("bad protocol id: {0:#x}")]
    BadProtocolId(u8),

    /// The version nibble of a message's second byte was not `1`.
    #[error("bad version: {0} (expected 1)")]
    BadVersion(u8),

    /// A 4-bit compact tag read from the wire has no abstract mapping.
    #[error("unknown compact type tag: {0:#x}")]
    UnknownTypeTag(u8),

    /// A varint's continuation bit exceeded the target width, or the
    /// transport ended mid-varint.
    #[error("malformed varint: {0}")]
    MalformedVarint(&'static str),

    /// A string length or container size exceeded the configured limit.
    #[error("size limit exceeded: {actual} > {limit}")]
    SizeLimitExceeded {
        /// The size that was requested.
        actual: i64,
        /// The configured ceiling.
        limit: i32,
    },

    /// An operation was called while the codec was in a phase that does not
    /// permit it. This indicates a caller bug, not a wire bug.
    #[error("invalid state: `{operation}` called in phase {phase:?}")]
    InvalidState {
        /// Name of the operation that was illegally called.
        operation: &'static str,
        /// The phase the codec was in at the time.
        phase: Phase,
    },

    /// Propagated unchanged from the underlying transport.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
