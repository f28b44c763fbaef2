//! The test interface: a struct set covering every codec class, with
//! legacy revisions and converters for the version-negotiation scenarios.
//!
//! Current interface version is 3; individual structs carry their own
//! revision histories.

use std::cell::RefCell;
use std::rc::Rc;

use strait_codec::assignable::{Assignable, AssignableKind};
use strait_codec::body::Field;
use strait_codec::context::{DeContext, SerContext};
use strait_codec::{
    deserialize_assignable_field, deserialize_common, enum_field, serialize_assignable_field,
    serialize_common, Result, Serializable, Status,
};
use strait_core::{DataFlags, Id};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Always-assignable ────────────────────────────────────────────────────────

/// Two bytes, no padding, byte-order agnostic: copyable under every flag
/// combination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct BytePair {
    pub x: u8,
    pub y: u8,
}

impl Assignable for BytePair {
    const KIND: AssignableKind = AssignableKind::Always;
    const ENDIANNESS_TOLERANT: bool = true;
}

impl Field for BytePair {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(BytePair, self, ctx, assignable);
        self.x.serialize(ctx)?;
        self.y.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(BytePair, self, ctx, assignable);
        self.x.deserialize(ctx)?;
        self.y.deserialize(ctx)
    }

    fn serialize_slice(items: &[Self], ctx: &mut SerContext<'_>) -> Result {
        strait_codec::body::serialize_assignable_elements(
            items,
            Some(Self::INTERFACE_VERSION),
            ctx,
        )
    }

    fn deserialize_slice(items: &mut [Self], ctx: &mut DeContext<'_>) -> Result {
        strait_codec::body::deserialize_assignable_elements(
            items,
            Some(Self::INTERFACE_VERSION),
            ctx,
        )
    }
}

impl Serializable for BytePair {
    const ID: Id = Id::new(0x1b06_33c5_52d8_4e01, 0x92af_7d40_cc1e_5ba2);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}

// ── Fixed-size assignable ────────────────────────────────────────────────────

/// All fields fixed-width; copyable unless peer alignments may differ.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct FixedTriple {
    pub a: u32,
    pub b: u32,
    pub c: u64,
}

impl Assignable for FixedTriple {
    const KIND: AssignableKind = AssignableKind::FixedSize;
}

impl Field for FixedTriple {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(FixedTriple, self, ctx, assignable);
        self.a.serialize(ctx)?;
        self.b.serialize(ctx)?;
        self.c.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(FixedTriple, self, ctx, assignable);
        self.a.deserialize(ctx)?;
        self.b.deserialize(ctx)?;
        self.c.deserialize(ctx)
    }
}

impl Serializable for FixedTriple {
    const ID: Id = Id::new(0x5e77_0a1f_9c3d_2b64, 0x0d15_e9a8_74f2_c380);
    const INTERFACE_VERSION: u32 = 2;
    const PRIVATE_VERSIONS: &'static [u32] = &[2];
}

// ── Aligned-to-one with a revision history ───────────────────────────────────

/// Current layout, revision 3. Revision 1 lacked `z`; revision 0 packed
/// the counters into single bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct PackedCounters {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Assignable for PackedCounters {
    const KIND: AssignableKind = AssignableKind::AlignedToOne;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct PackedCountersV1 {
    pub x: u16,
    pub y: u16,
}

impl Assignable for PackedCountersV1 {
    const KIND: AssignableKind = AssignableKind::AlignedToOne;
}

impl Field for PackedCountersV1 {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_assignable_field!(PackedCountersV1, self, ctx, None);
        let (x, y) = (self.x, self.y);
        x.serialize(ctx)?;
        y.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_assignable_field!(PackedCountersV1, self, ctx, None);
        let mut x = 0u16;
        let mut y = 0u16;
        x.deserialize(ctx)?;
        y.deserialize(ctx)?;
        self.x = x;
        self.y = y;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackedCountersV0 {
    pub pair: BytePair,
}

impl Field for PackedCountersV0 {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.pair.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.pair.deserialize(ctx)
    }
}

impl Field for PackedCounters {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(PackedCounters, self, ctx, assignable);
        let (x, y, z) = (self.x, self.y, self.z);
        x.serialize(ctx)?;
        y.serialize(ctx)?;
        z.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(PackedCounters, self, ctx, assignable);
        let mut x = 0u16;
        let mut y = 0u16;
        let mut z = 0u16;
        x.deserialize(ctx)?;
        y.deserialize(ctx)?;
        z.deserialize(ctx)?;
        self.x = x;
        self.y = y;
        self.z = z;
        Ok(())
    }
}

impl Serializable for PackedCounters {
    const ID: Id = Id::new(0xa4c2_91d7_63f0_8b5e, 0x38e6_0b72_f915_ad4c);
    const INTERFACE_VERSION: u32 = 3;
    const PRIVATE_VERSIONS: &'static [u32] = &[3, 1, 0];

    fn to_version(&self, target: u32, ctx: &mut SerContext<'_>) -> Result {
        match target {
            1 => {
                let legacy = PackedCountersV1 {
                    x: self.x,
                    y: self.y,
                };
                legacy.serialize(ctx)?;
            }
            0 => {
                let legacy = PackedCountersV0 {
                    pair: BytePair {
                        x: self.x as u8,
                        y: self.y as u8,
                    },
                };
                legacy.serialize(ctx)?;
            }
            _ => return Err(Status::ErrorNotSupportedInterfaceVersion),
        }
        Err(Status::NoFurtherProcessingRequired)
    }

    fn from_version(&mut self, target: u32, ctx: &mut DeContext<'_>) -> Result {
        match target {
            1 => {
                let mut legacy = PackedCountersV1::default();
                legacy.deserialize(ctx)?;
                self.x = legacy.x;
                self.y = legacy.y;
                self.z = 0;
            }
            0 => {
                let mut legacy = PackedCountersV0::default();
                legacy.deserialize(ctx)?;
                self.x = u16::from(legacy.pair.x);
                self.y = u16::from(legacy.pair.y);
                self.z = 0;
            }
            _ => return Err(Status::ErrorNotSupportedInterfaceVersion),
        }
        Err(Status::NoFurtherProcessingRequired)
    }
}

// ── Plain assignable without converters ──────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct PlainMetrics {
    pub count: u64,
    pub total: u64,
}

impl Assignable for PlainMetrics {
    const KIND: AssignableKind = AssignableKind::Plain;
}

impl Field for PlainMetrics {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(PlainMetrics, self, ctx, assignable);
        self.count.serialize(ctx)?;
        self.total.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(PlainMetrics, self, ctx, assignable);
        self.count.deserialize(ctx)?;
        self.total.deserialize(ctx)
    }
}

impl Serializable for PlainMetrics {
    const ID: Id = Id::new(0xc7d9_4f02_eb11_76a3, 0x51b8_2c6e_09d4_f7e5);
    const INTERFACE_VERSION: u32 = 2;
    // Revision 0 is remembered but this build ships no converter for it.
    const PRIVATE_VERSIONS: &'static [u32] = &[2, 0];
}

// ── Field-by-field payload ───────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Unit {
    #[default]
    Meters = 1,
    Feet = 2,
}

enum_field!(Unit as u16 {
    Unit::Meters = 1,
    Unit::Feet = 2,
});

/// Strings, vectors, arrays, nested assignable structs, an enum, floats:
/// everything the slow path has to carry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MixedPayload {
    pub label: String,
    pub values: Vec<u32>,
    pub tags: [u16; 3],
    pub triple: FixedTriple,
    pub pair: BytePair,
    pub unit: Unit,
    pub active: bool,
    pub ratio: f64,
}

impl Field for MixedPayload {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(MixedPayload, self, ctx);
        self.label.serialize(ctx)?;
        self.values.serialize(ctx)?;
        self.tags.serialize(ctx)?;
        self.triple.serialize(ctx)?;
        self.pair.serialize(ctx)?;
        self.unit.serialize(ctx)?;
        self.active.serialize(ctx)?;
        self.ratio.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(MixedPayload, self, ctx);
        self.label.deserialize(ctx)?;
        self.values.deserialize(ctx)?;
        self.tags.deserialize(ctx)?;
        self.triple.deserialize(ctx)?;
        self.pair.deserialize(ctx)?;
        self.unit.deserialize(ctx)?;
        self.active.deserialize(ctx)?;
        self.ratio.deserialize(ctx)
    }
}

impl Serializable for MixedPayload {
    const ID: Id = Id::new(0x8f3a_b5d1_2476_c09e, 0x6e59_d83f_1ba0_42c7);
    const INTERFACE_VERSION: u32 = 3;
    const PRIVATE_VERSIONS: &'static [u32] = &[3];
}

// ── Diamond composition ──────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiamondBase {
    pub d0: u32,
}

impl Field for DiamondBase {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.d0.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.d0.deserialize(ctx)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiamondEdge1 {
    pub d1: u32,
}

impl Field for DiamondEdge1 {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.d1.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.d1.deserialize(ctx)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiamondEdge2 {
    pub d2: u32,
}

impl Field for DiamondEdge2 {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.d2.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.d2.deserialize(ctx)
    }
}

/// Two edges over one shared base. The base slice is emitted exactly once,
/// by the most-derived struct, before either edge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Diamond {
    pub base: DiamondBase,
    pub edge1: DiamondEdge1,
    pub edge2: DiamondEdge2,
}

impl Field for Diamond {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(Diamond, self, ctx);
        self.base.serialize(ctx)?;
        self.edge1.serialize(ctx)?;
        self.edge2.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(Diamond, self, ctx);
        self.base.deserialize(ctx)?;
        self.edge1.deserialize(ctx)?;
        self.edge2.deserialize(ctx)
    }
}

impl Serializable for Diamond {
    const ID: Id = Id::new(0x3d80_17ce_ff42_9ab1, 0xb2c4_6075_88e1_d90f);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}

// ── Tagged union ─────────────────────────────────────────────────────────────

/// Closed variant set with an explicit discriminator byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Circle { radius: u32 },
    Rect { width: u32, height: u32 },
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::Circle { radius: 0 }
    }
}

impl Field for Geometry {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        match self {
            Geometry::Circle { radius } => {
                1u8.serialize(ctx)?;
                radius.serialize(ctx)
            }
            Geometry::Rect { width, height } => {
                2u8.serialize(ctx)?;
                width.serialize(ctx)?;
                height.serialize(ctx)
            }
        }
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        let mut tag = 0u8;
        tag.deserialize(ctx)?;
        *self = match tag {
            1 => {
                let mut radius = 0u32;
                radius.deserialize(ctx)?;
                Geometry::Circle { radius }
            }
            2 => {
                let mut width = 0u32;
                let mut height = 0u32;
                width.deserialize(ctx)?;
                height.deserialize(ctx)?;
                Geometry::Rect { width, height }
            }
            _ => return Err(Status::ErrorDataCorrupted),
        };
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Drawing {
    pub title: String,
    pub shape: Geometry,
    pub extras: Vec<Geometry>,
}

impl Field for Drawing {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(Drawing, self, ctx);
        self.title.serialize(ctx)?;
        self.shape.serialize(ctx)?;
        self.extras.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(Drawing, self, ctx);
        self.title.deserialize(ctx)?;
        self.shape.deserialize(ctx)?;
        self.extras.deserialize(ctx)
    }
}

impl Serializable for Drawing {
    const ID: Id = Id::new(0xfa01_6b9d_4e28_c573, 0x19cd_83b6_a752_e04f);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}

// ── Pointer graphs ───────────────────────────────────────────────────────────

/// One node of a possibly shared, possibly cyclic graph.
#[derive(Debug, Default)]
pub struct HubNode {
    pub value: u32,
    pub left: Option<Rc<RefCell<HubNode>>>,
    pub right: Option<Rc<RefCell<HubNode>>>,
}

impl Field for HubNode {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.value.serialize(ctx)?;
        self.left.serialize(ctx)?;
        self.right.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.value.deserialize(ctx)?;
        self.left.deserialize(ctx)?;
        self.right.deserialize(ctx)
    }
}

/// Message payload carrying a graph. Pointer fields are meaningless
/// without unmanaged-pointer permission, so the struct demands it.
#[derive(Debug, Default)]
pub struct Graph {
    pub root: Option<Rc<RefCell<HubNode>>>,
}

impl Field for Graph {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(Graph, self, ctx);
        self.root.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(Graph, self, ctx);
        self.root.deserialize(ctx)
    }
}

impl Serializable for Graph {
    const ID: Id = Id::new(0x60b7_2a4e_d1c9_35f8, 0xe816_f5a3_07bd_9c42);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
    const MANDATORY_DATA_FLAGS: DataFlags = DataFlags::ALLOW_UNMANAGED_POINTERS;
}

// ── Request/response pair for dispatch tests ─────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    pub text: String,
    pub seq: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EchoRequestV1 {
    pub text: String,
}

impl Field for EchoRequestV1 {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.text.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.text.deserialize(ctx)
    }
}

impl Field for EchoRequest {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(EchoRequest, self, ctx);
        self.text.serialize(ctx)?;
        self.seq.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(EchoRequest, self, ctx);
        self.text.deserialize(ctx)?;
        self.seq.deserialize(ctx)
    }
}

impl Serializable for EchoRequest {
    const ID: Id = Id::new(0x72e5_c80b_a913_d64f, 0x4cf7_21d8_5e90_b3a6);
    const INTERFACE_VERSION: u32 = 3;
    const PRIVATE_VERSIONS: &'static [u32] = &[3, 1];

    fn to_version(&self, target: u32, ctx: &mut SerContext<'_>) -> Result {
        match target {
            1 => {
                let legacy = EchoRequestV1 {
                    text: self.text.clone(),
                };
                legacy.serialize(ctx)?;
                Err(Status::NoFurtherProcessingRequired)
            }
            _ => Err(Status::ErrorNotSupportedInterfaceVersion),
        }
    }

    fn from_version(&mut self, target: u32, ctx: &mut DeContext<'_>) -> Result {
        match target {
            1 => {
                let mut legacy = EchoRequestV1::default();
                legacy.deserialize(ctx)?;
                self.text = legacy.text;
                self.seq = 0;
                Err(Status::NoFurtherProcessingRequired)
            }
            _ => Err(Status::ErrorNotSupportedInterfaceVersion),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EchoResponse {
    pub text: String,
    pub seq: u32,
}

impl Field for EchoResponse {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(EchoResponse, self, ctx);
        self.text.serialize(ctx)?;
        self.seq.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(EchoResponse, self, ctx);
        self.text.deserialize(ctx)?;
        self.seq.deserialize(ctx)
    }
}

impl Serializable for EchoResponse {
    const ID: Id = Id::new(0x9b24_f6d0_37c1_85ea, 0xd5e0_9a4b_62cf_701d);
    const INTERFACE_VERSION: u32 = 3;
    const PRIVATE_VERSIONS: &'static [u32] = &[3];
}

pub fn sample_mixed_payload() -> MixedPayload {
    MixedPayload {
        label: "reading".to_string(),
        values: vec![3, 1, 4, 1, 5],
        tags: [11, 22, 33],
        triple: FixedTriple {
            a: 0x0102_0304,
            b: 0x0a0b_0c0d,
            c: 0x1122_3344_5566_7788,
        },
        pair: BytePair { x: 7, y: 9 },
        unit: Unit::Feet,
        active: true,
        ratio: 0.625,
    }
}
