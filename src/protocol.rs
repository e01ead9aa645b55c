//! The writer/reader state machine (C4/C5) and message envelope (C6).
//!
//! A single [`CompactProtocol`] drives both directions over one
//! bidirectional transport, mirroring how a generated Thrift protocol
//! object exposes both `write*` and `read*` methods against the same
//! underlying connection. The type itself is generic over `T: Read` and
//! `T: Write` independently; nothing about the codec is coupled to any
//! concrete transport.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::message::{self, MessageType};
use crate::phase::{Phase, StructFrame};
use crate::ttype::{abstract_to_compact, compact_to_abstract, CompactType, TType};
use crate::varint::{
    read_uvarint32, read_zigzag_16, read_zigzag_32, read_zigzag_64, write_uvarint,
    write_zigzag_16, write_zigzag_32, write_zigzag_64,
};

/// Compact binary protocol encoder/decoder over a transport `T`.
///
/// Not thread-safe: all mutable state (`phase`, the delta-compression
/// `last_field_id`, the struct and container nesting stacks) lives here and
/// is meant to be driven sequentially by one caller. Once an operation
/// returns `Err`, the instance must be discarded — the state machine gives
/// no guarantee of consistency past an error.
pub struct CompactProtocol<T> {
    transport: T,
    phase: Phase,
    last_field_id: i16,
    struct_stack: Vec<StructFrame>,
    container_stack: Vec<Phase>,
    limits: Limits,
}

impl<T> CompactProtocol<T> {
    /// Wraps `transport` with the default (wide) size limits.
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, Limits::default())
    }

    /// Wraps `transport`, enforcing `limits` on every string/container
    /// size this instance reads or writes.
    pub fn with_limits(transport: T, limits: Limits) -> Self {
        Self {
            transport,
            phase: Phase::Clear,
            last_field_id: 0,
            struct_stack: Vec::new(),
            container_stack: Vec::new(),
            limits,
        }
    }

    /// Current phase, exposed for tests and diagnostics.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consumes the codec, returning the wrapped transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn set_phase(&mut self, new: Phase) {
        log::trace!("phase: {} -> {}", self.phase.label(), new.label());
        self.phase = new;
    }

    fn check_size(&self, n: usize) -> Result<()> {
        if n as i64 > i64::from(self.limits.max_size) {
            return Err(Error::SizeLimitExceeded {
                actual: n as i64,
                limit: self.limits.max_size,
            });
        }
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            phase: self.phase,
        }
    }

    /// Phase to push onto a container/struct's enclosing-phase stack.
    /// `WriteValue`/`ReadValue` mean "one field's value", which a
    /// collection-begin consumes entirely — the enclosing struct is what
    /// must be restored, not the value phase itself. `WriteContainer`/
    /// `ReadContainer` mean "an element of another open collection" and
    /// pass through unchanged so nested containers unwind correctly.
    fn container_entry_phase(&self) -> Phase {
        match self.phase {
            Phase::WriteValue => Phase::WriteStruct,
            Phase::ReadValue => Phase::ReadStruct,
            other => other,
        }
    }
}

impl<T: Write> CompactProtocol<T> {
    /// Runs `f` against the transport iff the codec is in `WriteValue` or
    /// `WriteContainer`; restores `WriteStruct` afterward when it was in
    /// `WriteValue` (a top-level field), and leaves `WriteContainer`
    /// otherwise (an element of an open list/set/map stays open).
    fn write_value<F>(&mut self, op: &'static str, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let in_container = match self.phase {
            Phase::WriteValue => false,
            Phase::WriteContainer => true,
            _ => return Err(self.invalid_state(op)),
        };
        f(&mut self.transport)?;
        if !in_container {
            self.set_phase(Phase::WriteStruct);
        }
        Ok(())
    }

    fn write_field_header(&mut self, tag: CompactType, field_id: i16) -> Result<()> {
        let delta = i32::from(field_id) - i32::from(self.last_field_id);
        if self.last_field_id >= 0 && delta > 0 && delta <= 15 {
            self.transport
                .write_all(&[((delta as u8) << 4) | tag.as_u8()])
                .map_err(Error::from)?;
        } else {
            self.transport
                .write_all(&[tag.as_u8()])
                .map_err(Error::from)?;
            write_zigzag_16(&mut self.transport, field_id)?;
        }
        self.last_field_id = field_id;
        Ok(())
    }

    fn emit_stop_byte(&mut self) -> Result<()> {
        self.transport.write_all(&[0x00]).map_err(Error::from)
    }

    /// Writes the 2-byte preamble, varint seqid, and length-prefixed name.
    /// Requires `Clear`; sets `WriteStruct`.
    pub fn write_message_begin(
        &mut self,
        name: &[u8],
        message_type: MessageType,
        seqid: i32,
    ) -> Result<()> {
        if self.phase != Phase::Clear {
            return Err(self.invalid_state("writeMessageBegin"));
        }
        log::debug!(
            "writeMessageBegin name_len={} type={:?} seqid={}",
            name.len(),
            message_type,
            seqid
        );
        self.transport
            .write_all(&[message::PROTOCOL_ID])
            .map_err(Error::from)?;
        let second = message::VERSION | (message_type.to_u8() << message::TYPE_SHIFT);
        self.transport.write_all(&[second]).map_err(Error::from)?;
        write_uvarint(&mut self.transport, u64::from(seqid as u32))?;
        self.check_size(name.len())?;
        write_uvarint(&mut self.transport, name.len() as u64)?;
        self.transport.write_all(name).map_err(Error::from)?;
        self.set_phase(Phase::WriteStruct);
        Ok(())
    }

    /// Requires `WriteStruct` with an empty struct stack; sets `Clear`.
    pub fn write_message_end(&mut self) -> Result<()> {
        if self.phase != Phase::WriteStruct || !self.struct_stack.is_empty() {
            return Err(self.invalid_state("writeMessageEnd"));
        }
        log::debug!("writeMessageEnd");
        self.set_phase(Phase::Clear);
        Ok(())
    }

    /// Pushes `(phase, last_field_id)` and resets `last_field_id` to 0.
    /// The struct name is never written to the wire.
    pub fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        match self.phase {
            Phase::Clear | Phase::WriteStruct | Phase::WriteContainer => {}
            _ => return Err(self.invalid_state("writeStructBegin")),
        }
        log::debug!("writeStructBegin depth={}", self.struct_stack.len() + 1);
        self.struct_stack.push((self.phase, self.last_field_id));
        self.set_phase(Phase::WriteStruct);
        self.last_field_id = 0;
        Ok(())
    }

    /// Emits the STOP byte, then pops the enclosing `(phase, last_field_id)`.
    pub fn write_struct_end(&mut self) -> Result<()> {
        if self.phase != Phase::WriteStruct {
            return Err(self.invalid_state("writeStructEnd"));
        }
        self.emit_stop_byte()?;
        let (phase, last_field_id) = self
            .struct_stack
            .pop()
            .ok_or_else(|| self.invalid_state("writeStructEnd"))?;
        log::debug!("writeStructEnd depth={}", self.struct_stack.len() + 1);
        self.last_field_id = last_field_id;
        self.set_phase(phase);
        Ok(())
    }

    /// Emits a standalone STOP byte. `writeStructEnd` already calls this
    /// internally; exposed separately since generated code conventionally
    /// calls `writeFieldStop` before `writeStructEnd` rather than relying
    /// on the latter to emit it.
    pub fn write_field_stop(&mut self) -> Result<()> {
        if self.phase != Phase::WriteStruct {
            return Err(self.invalid_state("writeFieldStop"));
        }
        self.emit_stop_byte()
    }

    /// For `BOOL` fields, defers the header (see `writeBool`). For every
    /// other type, emits the delta-compressed header immediately.
    pub fn write_field_begin(&mut self, _name: &str, ty: TType, field_id: i16) -> Result<()> {
        if self.phase != Phase::WriteStruct {
            return Err(self.invalid_state("writeFieldBegin"));
        }
        if ty == TType::Bool {
            self.set_phase(Phase::WriteBool { field_id });
        } else {
            self.write_field_header(abstract_to_compact(ty), field_id)?;
            self.set_phase(Phase::WriteValue);
        }
        Ok(())
    }

    /// No-op on the wire; the transition back to `WriteStruct` already
    /// happens once the value writer (or `writeBool`) runs.
    pub fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn write_byte(&mut self, value: i8) -> Result<()> {
        self.write_value("writeByte", |t| {
            t.write_all(&[value as u8]).map_err(Error::from)
        })
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_value("writeI16", |t| write_zigzag_16(t, value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_value("writeI32", |t| write_zigzag_32(t, value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_value("writeI64", |t| write_zigzag_64(t, value))
    }

    /// 8 bytes, little-endian IEEE-754 (the compact-protocol spec mandates
    /// little-endian; a big-endian write here would be the classic source
    /// bug this codec does not replicate).
    pub fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_value("writeDouble", |t| {
            t.write_all(&value.to_le_bytes()).map_err(Error::from)
        })
    }

    /// UTF-8 is not enforced; `bytes` is written verbatim after its varint
    /// length prefix.
    pub fn write_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_size(bytes.len())?;
        self.write_value("writeString", |t| {
            write_uvarint(t, bytes.len() as u64)?;
            t.write_all(bytes).map_err(Error::from)
        })
    }

    /// In `WriteBool`, emits the deferred field header with tag
    /// `TRUE`/`FALSE` and the pending field id (zero body bytes). In
    /// `WriteContainer`, emits one byte, `0x01` or `0x00`.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        match self.phase {
            Phase::WriteBool { field_id } => {
                let tag = if value {
                    CompactType::True
                } else {
                    CompactType::False
                };
                self.write_field_header(tag, field_id)?;
                self.set_phase(Phase::WriteStruct);
                Ok(())
            }
            Phase::WriteContainer => self
                .transport
                .write_all(&[u8::from(value)])
                .map_err(Error::from),
            _ => Err(self.invalid_state("writeBool")),
        }
    }

    fn write_collection_begin(
        &mut self,
        op: &'static str,
        elem_type: TType,
        size: i32,
    ) -> Result<()> {
        match self.phase {
            Phase::WriteValue | Phase::WriteContainer => {}
            _ => return Err(self.invalid_state(op)),
        }
        let size_usize = usize::try_from(size).map_err(|_| self.invalid_state(op))?;
        self.check_size(size_usize)?;
        let tag = abstract_to_compact(elem_type).as_u8();
        if size <= 14 {
            self.transport
                .write_all(&[((size as u8) << 4) | tag])
                .map_err(Error::from)?;
        } else {
            self.transport
                .write_all(&[0xF0 | tag])
                .map_err(Error::from)?;
            write_uvarint(&mut self.transport, size as u64)?;
        }
        self.container_stack.push(self.container_entry_phase());
        self.set_phase(Phase::WriteContainer);
        Ok(())
    }

    /// If `size <= 14`, one byte `(size<<4)|elem_tag`; else `0xF0|elem_tag`
    /// followed by the varint size.
    pub fn write_list_begin(&mut self, elem_type: TType, size: i32) -> Result<()> {
        self.write_collection_begin("writeListBegin", elem_type, size)
    }

    pub fn write_set_begin(&mut self, elem_type: TType, size: i32) -> Result<()> {
        self.write_collection_begin("writeSetBegin", elem_type, size)
    }

    /// Empty maps serialize to exactly one `0x00` byte; otherwise the
    /// varint size followed by the packed key/value tag nibble.
    pub fn write_map_begin(
        &mut self,
        key_type: TType,
        value_type: TType,
        size: i32,
    ) -> Result<()> {
        match self.phase {
            Phase::WriteValue | Phase::WriteContainer => {}
            _ => return Err(self.invalid_state("writeMapBegin")),
        }
        let size_usize = usize::try_from(size).map_err(|_| self.invalid_state("writeMapBegin"))?;
        self.check_size(size_usize)?;
        if size == 0 {
            self.transport.write_all(&[0x00]).map_err(Error::from)?;
        } else {
            write_uvarint(&mut self.transport, size as u64)?;
            let kt = abstract_to_compact(key_type).as_u8();
            let vt = abstract_to_compact(value_type).as_u8();
            self.transport
                .write_all(&[(kt << 4) | vt])
                .map_err(Error::from)?;
        }
        self.container_stack.push(self.container_entry_phase());
        self.set_phase(Phase::WriteContainer);
        Ok(())
    }

    fn write_collection_end(&mut self, op: &'static str) -> Result<()> {
        if self.phase != Phase::WriteContainer {
            return Err(self.invalid_state(op));
        }
        let restore = self
            .container_stack
            .pop()
            .ok_or_else(|| self.invalid_state(op))?;
        self.set_phase(restore);
        Ok(())
    }

    pub fn write_list_end(&mut self) -> Result<()> {
        self.write_collection_end("writeListEnd")
    }

    pub fn write_set_end(&mut self) -> Result<()> {
        self.write_collection_end("writeSetEnd")
    }

    pub fn write_map_end(&mut self) -> Result<()> {
        self.write_collection_end("writeMapEnd")
    }
}

impl<T: Read> CompactProtocol<T> {
    /// Mirror of `write_value` for the read direction.
    fn read_value<F, V>(&mut self, op: &'static str, f: F) -> Result<V>
    where
        F: FnOnce(&mut T) -> Result<V>,
    {
        let in_container = match self.phase {
            Phase::ReadValue => false,
            Phase::ReadContainer => true,
            _ => return Err(self.invalid_state(op)),
        };
        let value = f(&mut self.transport)?;
        if !in_container {
            self.set_phase(Phase::ReadStruct);
        }
        Ok(value)
    }

    fn read_byte_raw(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.transport.read_exact(&mut byte).map_err(Error::from)?;
        Ok(byte[0])
    }

    /// Requires `Clear`. A first byte other than `0x82` is `BadProtocolId`;
    /// a version nibble other than 1 is `BadVersion`. Sets `ReadStruct`.
    pub fn read_message_begin(&mut self) -> Result<(Vec<u8>, MessageType, i32)> {
        if self.phase != Phase::Clear {
            return Err(self.invalid_state("readMessageBegin"));
        }
        let proto_id = self.read_byte_raw()?;
        if proto_id != message::PROTOCOL_ID {
            return Err(Error::BadProtocolId(proto_id));
        }
        let ver_type = self.read_byte_raw()?;
        let version = ver_type & message::VERSION_MASK;
        if version != message::VERSION {
            return Err(Error::BadVersion(version));
        }
        let message_type = MessageType::from_u8(ver_type >> message::TYPE_SHIFT)?;
        let seqid = read_uvarint32(&mut self.transport)? as i32;
        let name_len = read_uvarint32(&mut self.transport)?;
        self.check_size(name_len as usize)?;
        let mut name = vec![0u8; name_len as usize];
        self.transport.read_exact(&mut name).map_err(Error::from)?;
        log::debug!(
            "readMessageBegin name_len={} type={:?} seqid={}",
            name.len(),
            message_type,
            seqid
        );
        self.set_phase(Phase::ReadStruct);
        Ok((name, message_type, seqid))
    }

    /// Requires `ReadStruct` with an empty struct stack; sets `Clear`.
    pub fn read_message_end(&mut self) -> Result<()> {
        if self.phase != Phase::ReadStruct || !self.struct_stack.is_empty() {
            return Err(self.invalid_state("readMessageEnd"));
        }
        log::debug!("readMessageEnd");
        self.set_phase(Phase::Clear);
        Ok(())
    }

    /// Pushes `(phase, last_field_id)` and resets `last_field_id` to 0.
    pub fn read_struct_begin(&mut self) -> Result<()> {
        match self.phase {
            Phase::Clear | Phase::ReadStruct | Phase::ReadContainer => {}
            _ => return Err(self.invalid_state("readStructBegin")),
        }
        log::debug!("readStructBegin depth={}", self.struct_stack.len() + 1);
        self.struct_stack.push((self.phase, self.last_field_id));
        self.set_phase(Phase::ReadStruct);
        self.last_field_id = 0;
        Ok(())
    }

    /// Pops the enclosing `(phase, last_field_id)`, restoring it exactly.
    pub fn read_struct_end(&mut self) -> Result<()> {
        if self.phase != Phase::ReadStruct {
            return Err(self.invalid_state("readStructEnd"));
        }
        let (phase, last_field_id) = self
            .struct_stack
            .pop()
            .ok_or_else(|| self.invalid_state("readStructEnd"))?;
        log::debug!("readStructEnd depth={}", self.struct_stack.len() + 1);
        self.last_field_id = last_field_id;
        self.set_phase(phase);
        Ok(())
    }

    /// Reads one header byte. A STOP byte (`b & 0x0F == 0`) returns
    /// `(TType::Stop, 0)` without touching `last_field_id`. Otherwise a
    /// nonzero delta nibble reconstructs the field id from `last_field_id`;
    /// a zero delta nibble means the id follows as an absolute zig-zag
    /// varint. A fused `TRUE`/`FALSE` tag sets `ReadBool` so `readBool`
    /// can consume it without reading further bytes.
    pub fn read_field_begin(&mut self) -> Result<(TType, i16)> {
        if self.phase != Phase::ReadStruct {
            return Err(self.invalid_state("readFieldBegin"));
        }
        let byte = self.read_byte_raw()?;
        if byte & 0x0F == 0 {
            return Ok((TType::Stop, 0));
        }
        let delta = byte >> 4;
        let field_id = if delta == 0 {
            read_zigzag_16(&mut self.transport)?
        } else {
            self.last_field_id.wrapping_add(i16::from(delta))
        };
        self.last_field_id = field_id;
        let tag = byte & 0x0F;
        let ty = compact_to_abstract(tag).ok_or(Error::UnknownTypeTag(tag))?;
        match tag {
            t if t == CompactType::True.as_u8() => self.set_phase(Phase::ReadBool { value: true }),
            t if t == CompactType::False.as_u8() => {
                self.set_phase(Phase::ReadBool { value: false })
            }
            _ => self.set_phase(Phase::ReadValue),
        }
        Ok((ty, field_id))
    }

    /// No-op on the wire.
    pub fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        self.read_value("readByte", |t| {
            let mut b = [0u8; 1];
            t.read_exact(&mut b).map_err(Error::from)?;
            Ok(b[0] as i8)
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_value("readI16", |t| read_zigzag_16(t))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_value("readI32", |t| read_zigzag_32(t))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_value("readI64", |t| read_zigzag_64(t))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        self.read_value("readDouble", |t| {
            let mut buf = [0u8; 8];
            t.read_exact(&mut buf).map_err(Error::from)?;
            Ok(f64::from_le_bytes(buf))
        })
    }

    /// Varint length, then exactly that many raw bytes. UTF-8 is not
    /// enforced; the caller decides how to interpret the bytes.
    pub fn read_string(&mut self) -> Result<Vec<u8>> {
        let limits = self.limits;
        self.read_value("readString", move |t| {
            let len = read_uvarint32(t)?;
            if i64::from(len) > i64::from(limits.max_size) {
                return Err(Error::SizeLimitExceeded {
                    actual: i64::from(len),
                    limit: limits.max_size,
                });
            }
            let mut buf = vec![0u8; len as usize];
            t.read_exact(&mut buf).map_err(Error::from)?;
            Ok(buf)
        })
    }

    /// In `ReadBool`, returns the value carried by the header tag without
    /// reading further bytes. In `ReadContainer`, reads one byte
    /// (non-zero -> true).
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.phase {
            Phase::ReadBool { value } => {
                self.set_phase(Phase::ReadStruct);
                Ok(value)
            }
            Phase::ReadContainer => Ok(self.read_byte_raw()? != 0),
            _ => Err(self.invalid_state("readBool")),
        }
    }

    fn read_collection_begin(&mut self, op: &'static str) -> Result<(TType, i32)> {
        match self.phase {
            Phase::ReadValue | Phase::ReadContainer => {}
            _ => return Err(self.invalid_state(op)),
        }
        let byte = self.read_byte_raw()?;
        let size = if byte >> 4 == 15 {
            let s = read_uvarint32(&mut self.transport)?;
            self.check_size(s as usize)?;
            s as i32
        } else {
            i32::from(byte >> 4)
        };
        let elem_tag = byte & 0x0F;
        let ty = compact_to_abstract(elem_tag).ok_or(Error::UnknownTypeTag(elem_tag))?;
        self.container_stack.push(self.container_entry_phase());
        self.set_phase(Phase::ReadContainer);
        Ok((ty, size))
    }

    /// Reads one byte: `b >> 4 == 15` means the size follows as a varint;
    /// otherwise the size is `b >> 4` (0..=14).
    pub fn read_list_begin(&mut self) -> Result<(TType, i32)> {
        self.read_collection_begin("readListBegin")
    }

    pub fn read_set_begin(&mut self) -> Result<(TType, i32)> {
        self.read_collection_begin("readSetBegin")
    }

    /// Reads the varint size; `size == 0` returns `(Bool, Bool, 0)` with
    /// the types unused, matching the single-byte empty-map encoding.
    pub fn read_map_begin(&mut self) -> Result<(TType, TType, i32)> {
        match self.phase {
            Phase::ReadValue | Phase::ReadContainer => {}
            _ => return Err(self.invalid_state("readMapBegin")),
        }
        let size = read_uvarint32(&mut self.transport)?;
        self.check_size(size as usize)?;
        let (key_type, value_type) = if size == 0 {
            (TType::Bool, TType::Bool)
        } else {
            let byte = self.read_byte_raw()?;
            let kt = byte >> 4;
            let vt = byte & 0x0F;
            (
                compact_to_abstract(kt).ok_or(Error::UnknownTypeTag(kt))?,
                compact_to_abstract(vt).ok_or(Error::UnknownTypeTag(vt))?,
            )
        };
        self.container_stack.push(self.container_entry_phase());
        self.set_phase(Phase::ReadContainer);
        Ok((key_type, value_type, size as i32))
    }

    fn read_collection_end(&mut self, op: &'static str) -> Result<()> {
        if self.phase != Phase::ReadContainer {
            return Err(self.invalid_state(op));
        }
        let restore = self
            .container_stack
            .pop()
            .ok_or_else(|| self.invalid_state(op))?;
        self.set_phase(restore);
        Ok(())
    }

    pub fn read_list_end(&mut self) -> Result<()> {
        self.read_collection_end("readListEnd")
    }

    pub fn read_set_end(&mut self) -> Result<()> {
        self.read_collection_end("readSetEnd")
    }

    pub fn read_map_end(&mut self) -> Result<()> {
        self.read_collection_end("readMapEnd")
    }
}
