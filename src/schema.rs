//! Declarative wire schema for the device/apps log format.
//!
//! The codec in [`encode`](crate::encode) and [`parse`](crate::parse) is
//! driven by these tables rather than by per-message hand-written routines.
//! Each field is identified on the wire by a tag carrying its field number
//! and wire kind, so decoders can skip fields they do not recognize.

/// Wire kinds used by the tag/length/value encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Base-128 varint. Not used by any schema field, but decoders must be
    /// able to skip over varint fields from newer schema revisions.
    Varint,
    /// Fixed 8-byte little-endian value.
    Fixed64,
    /// Varint byte-length prefix followed by that many bytes.
    LengthDelimited,
    /// Fixed 4-byte little-endian value.
    Fixed32,
}

impl WireKind {
    /// The wire kind id carried in the low three bits of a field tag.
    pub const fn id(self) -> u32 {
        match self {
            WireKind::Varint => 0,
            WireKind::Fixed64 => 1,
            WireKind::LengthDelimited => 2,
            WireKind::Fixed32 => 5,
        }
    }

    pub const fn from_id(id: u32) -> Option<WireKind> {
        match id {
            0 => Some(WireKind::Varint),
            1 => Some(WireKind::Fixed64),
            2 => Some(WireKind::LengthDelimited),
            5 => Some(WireKind::Fixed32),
            _ => None,
        }
    }
}

/// One field of a message schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub number: u32,
    pub kind: WireKind,
    /// Host-boundary key name, used in diagnostics.
    pub name: &'static str,
}

impl FieldDef {
    /// The tag value carried on the wire ahead of this field.
    pub const fn tag(&self) -> u32 {
        (self.number << 3) | self.kind.id()
    }
}

/// Fields of the top-level `DeviceApps` message.
pub mod device_apps {
    use super::{FieldDef, WireKind};

    pub const DEVICE: FieldDef = FieldDef {
        number: 1,
        kind: WireKind::LengthDelimited,
        name: "device",
    };

    pub const LAT: FieldDef = FieldDef {
        number: 2,
        kind: WireKind::Fixed64,
        name: "lat",
    };

    pub const LON: FieldDef = FieldDef {
        number: 3,
        kind: WireKind::Fixed64,
        name: "lon",
    };

    /// Packed repeated u32: one length-delimited run of fixed 4-byte values.
    pub const APPS: FieldDef = FieldDef {
        number: 4,
        kind: WireKind::LengthDelimited,
        name: "apps",
    };
}

/// Fields of the nested `Device` sub-message.
pub mod device {
    use super::{FieldDef, WireKind};

    pub const ID: FieldDef = FieldDef {
        number: 1,
        kind: WireKind::LengthDelimited,
        name: "id",
    };

    pub const KIND: FieldDef = FieldDef {
        number: 2,
        kind: WireKind::LengthDelimited,
        name: "type",
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_layout() {
        assert_eq!(device_apps::DEVICE.tag(), 0x0A);
        assert_eq!(device_apps::LAT.tag(), 0x11);
        assert_eq!(device_apps::LON.tag(), 0x19);
        assert_eq!(device_apps::APPS.tag(), 0x22);
        assert_eq!(device::ID.tag(), 0x0A);
        assert_eq!(device::KIND.tag(), 0x12);
    }

    #[test]
    fn test_wire_kind_ids_roundtrip() {
        for kind in [
            WireKind::Varint,
            WireKind::Fixed64,
            WireKind::LengthDelimited,
            WireKind::Fixed32,
        ] {
            assert_eq!(WireKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(WireKind::from_id(3), None);
        assert_eq!(WireKind::from_id(7), None);
    }
}
