//! The codec's state machine phases.
//!
//! Phases are a tagged variant rather than integer constants so that the
//! data a phase carries (the pending bool field id, the decoded bool value)
//! lives where it is used instead of in a side channel the caller could
//! forget to clear.

/// Where a [`crate::CompactProtocol`] is in the legal operation sequence.
///
/// `messageBegin -> structBegin -> (fieldBegin -> value -> fieldEnd)* ->
/// structEnd -> messageEnd`, with struct nesting saved on `struct_stack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No message in flight. The only legal phase at construction and
    /// between whole messages.
    Clear,
    /// Inside a struct body, between fields (or before the first one).
    WriteStruct,
    /// `writeFieldBegin` has emitted a header for a non-bool value; the
    /// value writer is expected next.
    WriteValue,
    /// `writeFieldBegin(BOOL, field_id)` deferred its header; `writeBool`
    /// must consume this phase next and emit the fused header.
    WriteBool {
        /// The field id whose header is still unwritten.
        field_id: i16,
    },
    /// Inside a list/set/map body being written.
    WriteContainer,
    /// Inside a struct body, between fields, while reading.
    ReadStruct,
    /// `readFieldBegin` returned a non-bool type; the value reader is
    /// expected next.
    ReadValue,
    /// Inside a list/set/map body being read.
    ReadContainer,
    /// `readFieldBegin` decoded a fused bool header; `readBool` consumes
    /// this phase without reading further bytes.
    ReadBool {
        /// The value carried by the TRUE/FALSE tag itself.
        value: bool,
    },
}

impl Phase {
    /// Short operation-independent label used in trace logging.
    pub(crate) fn label(self) -> &'static str {
        match self {
            Phase::Clear => "clear",
            Phase::WriteStruct => "write_struct",
            Phase::WriteValue => "write_value",
            Phase::WriteBool { .. } => "write_bool",
            Phase::WriteContainer => "write_container",
            Phase::ReadStruct => "read_struct",
            Phase::ReadValue => "read_value",
            Phase::ReadContainer => "read_container",
            Phase::ReadBool { .. } => "read_bool",
        }
    }
}

/// One level of struct nesting: the phase and delta-compression `last_id`
/// to restore once the nested struct ends.
pub(crate) type StructFrame = (Phase, i16);
