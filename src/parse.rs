//! Sans-IO parsing primitives for the device/apps log format.
//!
//! These functions work on byte slices without any I/O traits. Primitive
//! parsers return `(value, bytes_consumed)` on success, allowing the caller
//! to manage buffer positions; whole-payload parsers consume their entire
//! slice.

use crate::header::{FrameHeader, MAGIC};
use crate::record::{Device, DeviceApps};
use crate::schema::{device, device_apps, FieldDef, WireKind};

/// Error type for parsing operations.
#[derive(Debug)]
pub enum ParseError {
    /// Need more bytes to complete parsing. Contains minimum additional bytes needed.
    NeedMoreBytes(usize),
    /// Invalid data encountered.
    InvalidData(&'static str),
    /// Invalid UTF-8 in a string field.
    InvalidUtf8,
    /// Frame header magic does not match the sentinel. Contains the value found.
    BadMagic(u32),
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::NeedMoreBytes(n) => write!(f, "need {} more bytes", n),
            ParseError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            ParseError::InvalidUtf8 => write!(f, "invalid UTF-8"),
            ParseError::BadMagic(found) => write!(f, "bad frame magic: 0x{:08x}", found),
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<(T, usize), ParseError>;

// ============================================================================
// PRIMITIVE PARSERS
// ============================================================================

/// Parse a little-endian u32.
#[inline]
pub fn parse_u32_le(data: &[u8]) -> ParseResult<u32> {
    if data.len() < 4 {
        return Err(ParseError::NeedMoreBytes(4 - data.len()));
    }
    let bytes: [u8; 4] = data[..4].try_into().unwrap();
    Ok((u32::from_le_bytes(bytes), 4))
}

/// Parse a little-endian f64.
#[inline]
pub fn parse_f64_le(data: &[u8]) -> ParseResult<f64> {
    if data.len() < 8 {
        return Err(ParseError::NeedMoreBytes(8 - data.len()));
    }
    let bytes: [u8; 8] = data[..8].try_into().unwrap();
    Ok((f64::from_le_bytes(bytes), 8))
}

/// Parse a base-128 varint.
pub fn parse_varint(data: &[u8]) -> ParseResult<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if shift >= 64 {
            return Err(ParseError::InvalidData("varint longer than 64 bits"));
        }
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(ParseError::NeedMoreBytes(1))
}

// ============================================================================
// STRING AND BYTES PARSERS
// ============================================================================

/// Parse a length-prefixed byte slice.
///
/// Returns the byte slice and total bytes consumed (including length prefix).
pub fn parse_bytes(data: &[u8]) -> ParseResult<&[u8]> {
    let (len, prefix_size) = parse_varint(data)?;
    let len = usize::try_from(len)
        .map_err(|_| ParseError::InvalidData("length prefix out of range"))?;

    // The prefix length is untrusted input; never let it drive arithmetic
    // past the slice bounds.
    let available = data.len() - prefix_size;
    if len > available {
        return Err(ParseError::NeedMoreBytes(len - available));
    }

    Ok((&data[prefix_size..prefix_size + len], prefix_size + len))
}

/// Parse a length-prefixed UTF-8 string.
pub fn parse_str(data: &[u8]) -> ParseResult<&str> {
    let (bytes, consumed) = parse_bytes(data)?;
    let s = core::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
    Ok((s, consumed))
}

/// Parse a packed run of fixed 4-byte u32 values.
pub fn parse_packed_u32(data: &[u8]) -> ParseResult<Vec<u32>> {
    let (bytes, consumed) = parse_bytes(data)?;
    if bytes.len() % 4 != 0 {
        return Err(ParseError::InvalidData(
            "packed u32 run is not a multiple of 4 bytes",
        ));
    }
    let values = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    Ok((values, consumed))
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// Parse a field tag into its field number and wire kind.
pub fn parse_tag(data: &[u8]) -> ParseResult<(u32, WireKind)> {
    let (tag, consumed) = parse_varint(data)?;
    let tag = u32::try_from(tag).map_err(|_| ParseError::InvalidData("field tag out of range"))?;
    let kind =
        WireKind::from_id(tag & 0x7).ok_or(ParseError::InvalidData("unknown wire kind"))?;
    Ok(((tag >> 3, kind), consumed))
}

/// Skip over one field value of the given wire kind.
///
/// This is how fields from newer schema revisions pass through a decoder
/// that does not know them.
pub fn skip_field(data: &[u8], kind: WireKind) -> ParseResult<()> {
    let consumed = match kind {
        WireKind::Varint => parse_varint(data)?.1,
        WireKind::Fixed64 => {
            if data.len() < 8 {
                return Err(ParseError::NeedMoreBytes(8 - data.len()));
            }
            8
        }
        WireKind::Fixed32 => {
            if data.len() < 4 {
                return Err(ParseError::NeedMoreBytes(4 - data.len()));
            }
            4
        }
        WireKind::LengthDelimited => parse_bytes(data)?.1,
    };
    Ok(((), consumed))
}

fn expect_kind(field: &FieldDef, found: WireKind) -> Result<(), ParseError> {
    if field.kind == found {
        Ok(())
    } else {
        Err(ParseError::InvalidData("wrong wire kind for field"))
    }
}

// ============================================================================
// MESSAGE PARSERS
// ============================================================================

/// Parse a `Device` sub-message body occupying the whole slice.
///
/// Fields may arrive in any order; presence is reconstructed purely from
/// which fields appear.
pub fn parse_device(data: &[u8]) -> Result<Device, ParseError> {
    let mut parsed = Device::default();
    let mut pos = 0;
    while pos < data.len() {
        let ((number, kind), consumed) = parse_tag(&data[pos..])?;
        pos += consumed;

        if number == device::ID.number {
            expect_kind(&device::ID, kind)?;
            let (id, consumed) = parse_str(&data[pos..])?;
            parsed.id = Some(id.to_string());
            pos += consumed;
        } else if number == device::KIND.number {
            expect_kind(&device::KIND, kind)?;
            let (value, consumed) = parse_str(&data[pos..])?;
            parsed.kind = Some(value.to_string());
            pos += consumed;
        } else {
            let (_, consumed) = skip_field(&data[pos..], kind)?;
            pos += consumed;
        }
    }
    Ok(parsed)
}

/// Parse a complete `DeviceApps` payload occupying the whole slice.
pub fn parse_device_apps(data: &[u8]) -> Result<DeviceApps, ParseError> {
    let mut record = DeviceApps::default();
    let mut pos = 0;
    while pos < data.len() {
        let ((number, kind), consumed) = parse_tag(&data[pos..])?;
        pos += consumed;

        if number == device_apps::DEVICE.number {
            expect_kind(&device_apps::DEVICE, kind)?;
            let (body, consumed) = parse_bytes(&data[pos..])?;
            record.device = parse_device(body)?;
            pos += consumed;
        } else if number == device_apps::LAT.number {
            expect_kind(&device_apps::LAT, kind)?;
            let (lat, consumed) = parse_f64_le(&data[pos..])?;
            record.lat = Some(lat);
            pos += consumed;
        } else if number == device_apps::LON.number {
            expect_kind(&device_apps::LON, kind)?;
            let (lon, consumed) = parse_f64_le(&data[pos..])?;
            record.lon = Some(lon);
            pos += consumed;
        } else if number == device_apps::APPS.number {
            expect_kind(&device_apps::APPS, kind)?;
            let (apps, consumed) = parse_packed_u32(&data[pos..])?;
            record.apps = apps;
            pos += consumed;
        } else {
            let (_, consumed) = skip_field(&data[pos..], kind)?;
            pos += consumed;
        }
    }
    Ok(record)
}

// ============================================================================
// FRAME HEADER PARSER
// ============================================================================

/// Parse the 8-byte frame header, validating the magic sentinel.
pub fn parse_frame_header(data: &[u8]) -> ParseResult<FrameHeader> {
    if data.len() < FrameHeader::SIZE {
        return Err(ParseError::NeedMoreBytes(FrameHeader::SIZE - data.len()));
    }

    let (magic, _) = parse_u32_le(data)?;
    if magic != MAGIC {
        return Err(ParseError::BadMagic(magic));
    }

    let frame_type = u16::from_le_bytes(data[4..6].try_into().unwrap());
    let length = u16::from_le_bytes(data[6..8].try_into().unwrap());

    Ok((FrameHeader { frame_type, length }, FrameHeader::SIZE))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn test_parse_varint_single_byte() {
        assert_eq!(parse_varint(&[0x00]).unwrap(), (0, 1));
        assert_eq!(parse_varint(&[0x01]).unwrap(), (1, 1));
        assert_eq!(parse_varint(&[0x7F]).unwrap(), (127, 1));
    }

    #[test]
    fn test_parse_varint_multi_byte() {
        assert_eq!(parse_varint(&[0x80, 0x01]).unwrap(), (128, 2));
        assert_eq!(parse_varint(&[0xAC, 0x02]).unwrap(), (300, 2));
    }

    #[test]
    fn test_parse_varint_unterminated() {
        assert!(matches!(
            parse_varint(&[0x80, 0x80]),
            Err(ParseError::NeedMoreBytes(1))
        ));
        assert!(matches!(parse_varint(&[]), Err(ParseError::NeedMoreBytes(1))));
    }

    #[test]
    fn test_parse_str() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o'];
        let (s, consumed) = parse_str(&data).unwrap();
        assert_eq!(s, "hello");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_str_truncated() {
        let data = [0x05, b'h', b'e'];
        assert!(matches!(
            parse_str(&data),
            Err(ParseError::NeedMoreBytes(3))
        ));
    }

    #[test]
    fn test_parse_bytes_huge_declared_length() {
        // A length prefix of u64::MAX must fail the bounds check, not
        // overflow it.
        let mut data = vec![0xFF; 9];
        data.push(0x01);
        data.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            parse_bytes(&data),
            Err(ParseError::NeedMoreBytes(_))
        ));
    }

    #[test]
    fn test_parse_device_apps_huge_length_prefix() {
        // Device field whose body claims to be u64::MAX bytes long.
        let mut data = vec![0x0A];
        data.extend_from_slice(&[0xFF; 9]);
        data.push(0x01);
        assert!(matches!(
            parse_device_apps(&data),
            Err(ParseError::NeedMoreBytes(_))
        ));
    }

    #[test]
    fn test_parse_packed_u32_ragged_length() {
        // Length 6 is not a multiple of 4.
        let data = [0x06, 1, 0, 0, 0, 2, 0];
        assert!(matches!(
            parse_packed_u32(&data),
            Err(ParseError::InvalidData(_))
        ));
    }

    #[test]
    fn test_parse_frame_header() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x30, 0x00];
        let (header, consumed) = parse_frame_header(&data).unwrap();
        assert_eq!(header.frame_type, 1);
        assert_eq!(header.length, 0x30);
        assert_eq!(consumed, FrameHeader::SIZE);
    }

    #[test]
    fn test_parse_frame_header_bad_magic() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            parse_frame_header(&data),
            Err(ParseError::BadMagic(0xEFBEADDE))
        ));
    }

    #[test]
    fn test_parse_frame_header_too_short() {
        assert!(matches!(
            parse_frame_header(&[0xFF, 0xFF, 0xFF]),
            Err(ParseError::NeedMoreBytes(5))
        ));
    }

    #[test]
    fn test_parse_device_apps_any_field_order() {
        // apps, lon, lat, device: reverse of the encoder's order.
        let mut data = vec![0x22, 0x04, 7, 0, 0, 0];
        data.push(0x19);
        data.extend_from_slice(&(-17.0f64).to_le_bytes());
        data.push(0x11);
        data.extend_from_slice(&67.7f64.to_le_bytes());
        data.extend_from_slice(&[0x0A, 0x04, 0x0A, 0x02, b'a', b'1']);

        let record = parse_device_apps(&data).unwrap();
        assert_eq!(record.apps, vec![7]);
        assert_eq!(record.lat, Some(67.7));
        assert_eq!(record.lon, Some(-17.0));
        assert_eq!(record.device.id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_parse_device_apps_skips_unknown_fields() {
        // Field 9 (varint) and field 10 (length-delimited) are not in the
        // schema and must be skipped without error.
        let mut data = vec![0x48, 0x2A]; // field 9, varint 42
        data.extend_from_slice(&[0x52, 0x03, 1, 2, 3]); // field 10, 3 bytes
        data.extend_from_slice(&[0x22, 0x04, 5, 0, 0, 0]); // apps [5]

        let record = parse_device_apps(&data).unwrap();
        assert_eq!(record.apps, vec![5]);
    }

    #[test]
    fn test_parse_device_apps_truncated_payload() {
        let record = DeviceApps {
            device: Device {
                id: Some("a1".to_string()),
                kind: None,
            },
            ..Default::default()
        };
        let buf = encode::encode_device_apps(&record);
        assert!(matches!(
            parse_device_apps(&buf[..buf.len() - 1]),
            Err(ParseError::NeedMoreBytes(_))
        ));
    }

    #[test]
    fn test_parse_device_apps_wrong_wire_kind() {
        // lat (field 2) declared as length-delimited instead of fixed64.
        let data = [0x12, 0x01, 0x00];
        assert!(matches!(
            parse_device_apps(&data),
            Err(ParseError::InvalidData(_))
        ));
    }

    #[test]
    fn test_parse_empty_payload_is_default_record() {
        let record = parse_device_apps(&[]).unwrap();
        assert_eq!(record, DeviceApps::default());
    }
}
