//! Per-message serialization and deserialization contexts.
//!
//! A context is created for one message, mutates during the pass, and is
//! dropped with the buffer it borrows; it never outlives the buffer.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use strait_core::version::INTERFACE_VERSION_UNDEFINED;
use strait_core::{BinWalker, CommonFlags, DataFlags, Id, Result, SerSink, Status};

/// Kind of message behind the common header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    #[default]
    Data = 0,
    Status = 1,
    GetSettings = 2,
    InOut = 3,
}

impl TryFrom<u8> for MessageType {
    type Error = Status;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MessageType::Data),
            1 => Ok(MessageType::Status),
            2 => Ok(MessageType::GetSettings),
            3 => Ok(MessageType::InOut),
            _ => Err(Status::ErrorDataCorrupted),
        }
    }
}

/// State shared by every message kind: the negotiated protocol version,
/// the message type, and the session common flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommonContext {
    pub protocol_version: u8,
    pub message_type: MessageType,
    pub common_flags: CommonFlags,
}

impl CommonContext {
    pub fn new(protocol_version: u8, message_type: MessageType, common_flags: CommonFlags) -> Self {
        Self {
            protocol_version,
            message_type,
            common_flags,
        }
    }

    pub fn big_endian(&self) -> bool {
        self.common_flags.contains(CommonFlags::BIG_ENDIAN_FORMAT)
    }

    pub fn bitness32(&self) -> bool {
        self.common_flags.contains(CommonFlags::BITNESS_32)
    }
}

/// Owns every pointee allocated while resolving pointer fields during one
/// deserialization pass. Whoever drains it (typically the handler, after
/// use) takes over the last reference the codec holds.
#[derive(Default)]
pub struct AddedPointers {
    items: Vec<Rc<dyn Any>>,
}

impl AddedPointers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pointee: Rc<dyn Any>) {
        self.items.push(pointee);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Any>> {
        self.items.iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Rc<dyn Any>> + '_ {
        self.items.drain(..)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl std::fmt::Debug for AddedPointers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddedPointers").field("len", &self.items.len()).finish()
    }
}

/// Context for one serialization pass.
pub struct SerContext<'a> {
    common: CommonContext,
    sink: &'a mut dyn SerSink,
    data_flags: DataFlags,
    interface_version: u32,
    output_interface_version: u32,
    interface_versions_differ: bool,
    /// Pointee address -> offset of its body in the buffer.
    pointers_map: Option<&'a mut HashMap<usize, u64>>,
    aux_heap: bool,
}

impl<'a> SerContext<'a> {
    pub fn new(
        sink: &'a mut dyn SerSink,
        protocol_version: u8,
        common_flags: CommonFlags,
        data_flags: DataFlags,
        interface_version: u32,
    ) -> Self {
        Self {
            common: CommonContext::new(protocol_version, MessageType::Data, common_flags),
            sink,
            data_flags,
            interface_version,
            output_interface_version: INTERFACE_VERSION_UNDEFINED,
            interface_versions_differ: false,
            pointers_map: None,
            aux_heap: false,
        }
    }

    #[must_use]
    pub fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.common.message_type = message_type;
        self
    }

    #[must_use]
    pub fn with_pointers_map(mut self, map: &'a mut HashMap<usize, u64>) -> Self {
        self.pointers_map = Some(map);
        self
    }

    #[must_use]
    pub fn with_output_interface_version(mut self, version: u32) -> Self {
        self.output_interface_version = version;
        self
    }

    pub fn common(&self) -> &CommonContext {
        &self.common
    }

    pub fn protocol_version(&self) -> u8 {
        self.common.protocol_version
    }

    pub fn message_type(&self) -> MessageType {
        self.common.message_type
    }

    pub fn common_flags(&self) -> CommonFlags {
        self.common.common_flags
    }

    pub fn data_flags(&self) -> DataFlags {
        self.data_flags
    }

    pub fn add_data_flags(&mut self, flags: DataFlags) {
        self.data_flags = self.data_flags.union(flags);
    }

    pub fn interface_version(&self) -> u32 {
        self.interface_version
    }

    pub fn set_interface_version(&mut self, version: u32) {
        self.interface_version = version;
    }

    pub fn output_interface_version(&self) -> u32 {
        self.output_interface_version
    }

    pub fn interface_versions_differ(&self) -> bool {
        self.interface_versions_differ
    }

    pub fn set_interface_versions_differ(&mut self, differ: bool) {
        self.interface_versions_differ = differ;
    }

    pub fn aux_heap(&self) -> bool {
        self.aux_heap
    }

    pub fn set_aux_heap(&mut self, aux_heap: bool) {
        self.aux_heap = aux_heap;
    }

    pub fn big_endian(&self) -> bool {
        self.common.big_endian()
    }

    pub fn bitness32(&self) -> bool {
        self.common.bitness32()
    }

    /// True when the session byte order differs from this build's native
    /// order, i.e. multi-byte scalars must be swapped.
    pub fn endianness_differs(&self) -> bool {
        self.big_endian() != cfg!(target_endian = "big")
    }

    pub fn alignment_may_differ(&self) -> bool {
        self.data_flags.contains(DataFlags::ALIGNMENT_MAY_DIFFER)
    }

    pub fn integer_sizes_may_differ(&self) -> bool {
        self.data_flags.contains(DataFlags::INTEGER_SIZES_MAY_DIFFER)
    }

    pub fn allow_unmanaged_pointers(&self) -> bool {
        self.data_flags.contains(DataFlags::ALLOW_UNMANAGED_POINTERS)
    }

    pub fn check_recursive_pointers(&self) -> bool {
        self.data_flags.contains(DataFlags::CHECK_RECURSIVE_POINTERS)
    }

    pub fn no_assignable_optimizations(&self) -> bool {
        self.data_flags.contains(DataFlags::NO_ASSIGNABLE_OPTIMIZATIONS)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result {
        self.sink.write_bytes(bytes)
    }

    /// Offset the next write lands at; pointer-map entries are recorded
    /// against this.
    pub fn position(&self) -> usize {
        self.sink.len()
    }

    pub fn has_pointers_map(&self) -> bool {
        self.pointers_map.is_some()
    }

    pub fn pointer_offset(&self, address: usize) -> Option<u64> {
        self.pointers_map.as_ref().and_then(|m| m.get(&address).copied())
    }

    pub fn record_pointer(&mut self, address: usize, offset: u64) -> Result {
        match &mut self.pointers_map {
            Some(map) => {
                map.insert(address, offset);
                Ok(())
            }
            None => Err(Status::ErrorInvalidArgument),
        }
    }
}

impl std::fmt::Debug for SerContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerContext")
            .field("common", &self.common)
            .field("data_flags", &self.data_flags)
            .field("interface_version", &self.interface_version)
            .finish_non_exhaustive()
    }
}

/// Context for one deserialization pass.
pub struct DeContext<'a> {
    common: CommonContext,
    walker: &'a mut BinWalker,
    data_flags: DataFlags,
    id: Id,
    interface_version: u32,
    output_interface_version: u32,
    interface_versions_differ: bool,
    /// Buffer offset of a pointee body -> the decoded pointee.
    pointers_map: Option<&'a mut HashMap<u64, Rc<dyn Any>>>,
    added_pointers: Option<&'a mut AddedPointers>,
    aux_heap: bool,
}

impl<'a> DeContext<'a> {
    pub fn new(walker: &'a mut BinWalker, common: CommonContext) -> Self {
        Self {
            common,
            walker,
            data_flags: DataFlags::NONE,
            id: Id::default(),
            interface_version: INTERFACE_VERSION_UNDEFINED,
            output_interface_version: INTERFACE_VERSION_UNDEFINED,
            interface_versions_differ: false,
            pointers_map: None,
            added_pointers: None,
            aux_heap: false,
        }
    }

    pub fn set_pointers_map(&mut self, map: &'a mut HashMap<u64, Rc<dyn Any>>) {
        self.pointers_map = Some(map);
    }

    pub fn set_added_pointers(&mut self, added: &'a mut AddedPointers) {
        self.added_pointers = Some(added);
    }

    pub fn common(&self) -> &CommonContext {
        &self.common
    }

    pub fn protocol_version(&self) -> u8 {
        self.common.protocol_version
    }

    pub fn message_type(&self) -> MessageType {
        self.common.message_type
    }

    pub fn common_flags(&self) -> CommonFlags {
        self.common.common_flags
    }

    pub fn data_flags(&self) -> DataFlags {
        self.data_flags
    }

    pub fn set_data_flags(&mut self, flags: DataFlags) {
        self.data_flags = flags;
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    pub fn interface_version(&self) -> u32 {
        self.interface_version
    }

    pub fn set_interface_version(&mut self, version: u32) {
        self.interface_version = version;
    }

    pub fn output_interface_version(&self) -> u32 {
        self.output_interface_version
    }

    pub fn set_output_interface_version(&mut self, version: u32) {
        self.output_interface_version = version;
    }

    pub fn interface_versions_differ(&self) -> bool {
        self.interface_versions_differ
    }

    pub fn set_interface_versions_differ(&mut self, differ: bool) {
        self.interface_versions_differ = differ;
    }

    pub fn aux_heap(&self) -> bool {
        self.aux_heap
    }

    pub fn set_aux_heap(&mut self, aux_heap: bool) {
        self.aux_heap = aux_heap;
    }

    pub fn big_endian(&self) -> bool {
        self.common.big_endian()
    }

    pub fn bitness32(&self) -> bool {
        self.common.bitness32()
    }

    pub fn endianness_differs(&self) -> bool {
        self.big_endian() != cfg!(target_endian = "big")
    }

    pub fn alignment_may_differ(&self) -> bool {
        self.data_flags.contains(DataFlags::ALIGNMENT_MAY_DIFFER)
    }

    pub fn integer_sizes_may_differ(&self) -> bool {
        self.data_flags.contains(DataFlags::INTEGER_SIZES_MAY_DIFFER)
    }

    pub fn allow_unmanaged_pointers(&self) -> bool {
        self.data_flags.contains(DataFlags::ALLOW_UNMANAGED_POINTERS)
    }

    pub fn check_recursive_pointers(&self) -> bool {
        self.data_flags.contains(DataFlags::CHECK_RECURSIVE_POINTERS)
    }

    pub fn no_assignable_optimizations(&self) -> bool {
        self.data_flags.contains(DataFlags::NO_ASSIGNABLE_OPTIMIZATIONS)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.walker.read_bytes(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.walker.read_array::<N>()
    }

    pub fn read_into(&mut self, dest: &mut [u8]) -> Result {
        self.walker.read_into(dest)
    }

    pub fn tell(&self) -> usize {
        self.walker.tell()
    }

    pub fn seek(&mut self, pos: usize) {
        self.walker.seek(pos);
    }

    pub fn remaining(&self) -> usize {
        self.walker.remaining()
    }

    pub fn has_pointers_map(&self) -> bool {
        self.pointers_map.is_some()
    }

    pub fn has_added_pointers(&self) -> bool {
        self.added_pointers.is_some()
    }

    pub fn added_pointers_mut(&mut self) -> Option<&mut AddedPointers> {
        self.added_pointers.as_deref_mut()
    }

    /// Reset per-pass pointer state so the same context can decode the
    /// body again from a rewound cursor.
    pub fn reset_pointer_state(&mut self) {
        if let Some(map) = &mut self.pointers_map {
            map.clear();
        }
        if let Some(added) = &mut self.added_pointers {
            added.clear();
        }
    }

    pub fn lookup_pointer(&self, offset: u64) -> Option<Rc<dyn Any>> {
        self.pointers_map.as_ref().and_then(|m| m.get(&offset).cloned())
    }

    pub fn record_decoded_pointer(&mut self, offset: u64, pointee: Rc<dyn Any>) -> Result {
        match &mut self.pointers_map {
            Some(map) => {
                map.insert(offset, pointee);
                Ok(())
            }
            None => Err(Status::ErrorInvalidArgument),
        }
    }

    /// Track an allocation so its ownership survives the pass.
    pub fn track_allocation(&mut self, pointee: Rc<dyn Any>) -> Result {
        match &mut self.added_pointers {
            Some(added) => {
                added.push(pointee);
                Ok(())
            }
            None => Err(Status::ErrorInvalidArgument),
        }
    }
}

impl std::fmt::Debug for DeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeContext")
            .field("common", &self.common)
            .field("data_flags", &self.data_flags)
            .field("id", &self.id)
            .field("interface_version", &self.interface_version)
            .finish_non_exhaustive()
    }
}
