/// Sentinel at the start of every frame header, used to detect stream
/// corruption or misalignment.
pub const MAGIC: u32 = 0xFFFF_FFFF;

/// Frame type id for the `DeviceApps` schema.
pub const DEVICE_APPS_TYPE: u16 = 1;

/// Largest payload one frame can carry; bounded by the 16-bit length field.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// The fixed 8-byte header preceding every payload in the stream.
///
/// Layout: `magic: u32 LE`, `frame_type: u16 LE`, `length: u16 LE`, where
/// `length` is the exact byte length of the payload that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u16,
    pub length: u16,
}

impl FrameHeader {
    pub const SIZE: usize = 8;

    pub const fn new(frame_type: u16, length: u16) -> FrameHeader {
        FrameHeader { frame_type, length }
    }

    /// A header for a `DeviceApps` payload of the given length.
    pub const fn device_apps(length: u16) -> FrameHeader {
        FrameHeader::new(DEVICE_APPS_TYPE, length)
    }
}
