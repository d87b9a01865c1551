//! Minimal proto3 writer.
//!
//! Callers write fields in ascending field-number order. Scalar fields equal
//! to their default (0, false, empty) are omitted, matching what protobuf
//! encoders emit and therefore what the chain re-encodes when it verifies a
//! `SignDoc`. `oneof` members are written even when zero.

const WIRE_VARINT: u32 = 0;
const WIRE_LEN: u32 = 2;
const WIRE_FIXED32: u32 = 5;

/// Append `value` as a base-128 varint.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Buffer that protobuf fields are appended to.
#[derive(Debug, Default, Clone)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn tag(&mut self, field: u32, wire_type: u32) {
        encode_varint(&mut self.buf, u64::from((field << 3) | wire_type));
    }

    pub fn uint32(&mut self, field: u32, value: u32) -> &mut Self {
        if value != 0 {
            self.oneof_uint32(field, value);
        }
        self
    }

    /// `uint32` member of a oneof: written even when zero.
    pub fn oneof_uint32(&mut self, field: u32, value: u32) -> &mut Self {
        self.tag(field, WIRE_VARINT);
        encode_varint(&mut self.buf, u64::from(value));
        self
    }

    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.tag(field, WIRE_VARINT);
            encode_varint(&mut self.buf, value);
        }
        self
    }

    /// Enum values. Negative values are sign-extended to ten bytes.
    pub fn int32(&mut self, field: u32, value: i32) -> &mut Self {
        if value != 0 {
            self.tag(field, WIRE_VARINT);
            encode_varint(&mut self.buf, i64::from(value) as u64);
        }
        self
    }

    pub fn bool(&mut self, field: u32, value: bool) -> &mut Self {
        if value {
            self.tag(field, WIRE_VARINT);
            self.buf.push(1);
        }
        self
    }

    pub fn fixed32(&mut self, field: u32, value: u32) -> &mut Self {
        if value != 0 {
            self.oneof_fixed32(field, value);
        }
        self
    }

    pub fn oneof_fixed32(&mut self, field: u32, value: u32) -> &mut Self {
        self.tag(field, WIRE_FIXED32);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.length_delimited(field, value);
        }
        self
    }

    /// Embedded message or repeated element. Always written, even when
    /// empty.
    pub fn length_delimited(&mut self, field: u32, value: &[u8]) -> &mut Self {
        self.tag(field, WIRE_LEN);
        encode_varint(&mut self.buf, value.len() as u64);
        self.buf.extend_from_slice(value);
        self
    }

    /// Packed `repeated uint32`.
    pub fn packed_uint32(&mut self, field: u32, values: &[u32]) -> &mut Self {
        let mut packed = Vec::with_capacity(values.len() * 5);
        for v in values {
            encode_varint(&mut packed, u64::from(*v));
        }
        self.length_delimited(field, &packed)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}
