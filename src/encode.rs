//! Sans-IO encoding primitives for the device/apps log format.
//!
//! These functions write to byte buffers without any I/O traits. The frame
//! header and payload of every record are built here; the sync frontends
//! only push the resulting bytes through the compressing sink.

use crate::header::{FrameHeader, MAGIC};
use crate::record::{Device, DeviceApps};
use crate::schema::{device, device_apps, FieldDef};

// ============================================================================
// PRIMITIVE ENCODERS
// ============================================================================

/// Encode a little-endian u32 to a buffer.
#[inline]
pub fn encode_u32_le(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Encode a little-endian f64 to a buffer.
#[inline]
pub fn encode_f64_le(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Encode a base-128 varint.
///
/// Returns the number of bytes written.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) -> usize {
    let start_len = buf.len();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
    buf.len() - start_len
}

/// Encode a field tag (field number and wire kind).
#[inline]
pub fn encode_tag(buf: &mut Vec<u8>, field: &FieldDef) {
    encode_varint(buf, field.tag() as u64);
}

// ============================================================================
// FIELD ENCODERS
// ============================================================================

/// Encode a length-delimited byte field.
pub fn encode_bytes_field(buf: &mut Vec<u8>, field: &FieldDef, data: &[u8]) {
    encode_tag(buf, field);
    encode_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Encode a UTF-8 string field.
pub fn encode_str_field(buf: &mut Vec<u8>, field: &FieldDef, s: &str) {
    encode_bytes_field(buf, field, s.as_bytes());
}

/// Encode a fixed 8-byte double field.
pub fn encode_f64_field(buf: &mut Vec<u8>, field: &FieldDef, value: f64) {
    encode_tag(buf, field);
    encode_f64_le(buf, value);
}

/// Encode a packed run of fixed 4-byte u32 values.
///
/// Nothing is written for an empty slice; absence of the packed field
/// decodes back to an empty sequence.
pub fn encode_packed_u32_field(buf: &mut Vec<u8>, field: &FieldDef, values: &[u32]) {
    if values.is_empty() {
        return;
    }
    encode_tag(buf, field);
    encode_varint(buf, (values.len() * 4) as u64);
    for value in values {
        encode_u32_le(buf, *value);
    }
}

// ============================================================================
// MESSAGE ENCODERS
// ============================================================================

/// Encode a `Device` sub-message body (without tag or length prefix).
pub fn encode_device(buf: &mut Vec<u8>, device: &Device) {
    if let Some(id) = &device.id {
        encode_str_field(buf, &device::ID, id);
    }
    if let Some(kind) = &device.kind {
        encode_str_field(buf, &device::KIND, kind);
    }
}

/// Encode a complete `DeviceApps` payload.
///
/// Absent optional fields are omitted entirely; omission on the wire is what
/// realizes the presence flags. The `device` sub-message is the exception:
/// it is always emitted, even with both of its fields absent.
pub fn encode_device_apps(record: &DeviceApps) -> Vec<u8> {
    let mut body = Vec::new();
    encode_device(&mut body, &record.device);

    let mut buf = Vec::with_capacity(body.len() + record.apps.len() * 4 + 24);
    encode_bytes_field(&mut buf, &device_apps::DEVICE, &body);
    if let Some(lat) = record.lat {
        encode_f64_field(&mut buf, &device_apps::LAT, lat);
    }
    if let Some(lon) = record.lon {
        encode_f64_field(&mut buf, &device_apps::LON, lon);
    }
    encode_packed_u32_field(&mut buf, &device_apps::APPS, &record.apps);
    buf
}

// ============================================================================
// FRAME HEADER ENCODER
// ============================================================================

/// Encode the 8-byte frame header to a fixed array.
pub fn encode_frame_header(header: &FrameHeader) -> [u8; FrameHeader::SIZE] {
    let mut buf = [0u8; FrameHeader::SIZE];
    buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    buf[4..6].copy_from_slice(&header.frame_type.to_le_bytes());
    buf[6..8].copy_from_slice(&header.length.to_le_bytes());
    buf
}

// ============================================================================
// TESTS
// ============================================================================
