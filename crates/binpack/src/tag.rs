//! Wire tag registry.
//!
//! Every encoded unit starts with one tag byte. The byte values are part of
//! the public wire contract; consumers may assert on them directly.

/// Single-byte type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Return = 0x00,
    Flag = 0x01,
    // 0x02 reserved
    Undefined = 0x03,
    Null = 0x04,
    Unsupported = 0x05,
    Ref = 0x06,

    True = 0x07,
    False = 0x08,
    Bool = 0x09,
    SymbolUnknown = 0x0a,
    SymbolExtended = 0x0b,

    U8 = 0x10,
    I8 = 0x11,
    U16 = 0x12,
    I16 = 0x13,
    U32 = 0x14,
    I32 = 0x15,
    F32 = 0x16,
    U64 = 0x17,
    I64 = 0x18,
    F64 = 0x19,
    Nan = 0x2a,

    Object = 0x20,
    Array = 0x21,
    ArrayTyped = 0x22,
    Map = 0x23,
    MapTyped = 0x24,
    Set = 0x25,
    SetTyped = 0x26,

    String8 = 0x30,
    String16 = 0x31,
    String32 = 0x32,
    String64 = 0x33,

    Uint8Array8 = 0x34,
    Uint8Array16 = 0x35,
    Uint8Array32 = 0x36,
    Uint8Array64 = 0x37,

    ArrayBuffer8 = 0x38,
    ArrayBuffer16 = 0x39,
    ArrayBuffer32 = 0x3a,
    ArrayBuffer64 = 0x3b,
}

/// Payload family of a length-prefixed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// UTF-8 text.
    String,
    /// Byte view (`Uint8Array` family).
    View,
    /// Raw byte buffer (`ArrayBuffer` family).
    Buffer,
}

/// Container opened by a composite tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Object,
    Array,
    Map,
    Set,
}

/// Numeric payload read by a fixed-width scalar tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    U64,
    I64,
    F64,
}

impl Scalar {
    /// Payload width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Scalar::Bool | Scalar::U8 | Scalar::I8 => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::I64 | Scalar::F64 => 8,
        }
    }
}

/// What follows a tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Stream control: container terminator or a skippable marker.
    Control,
    /// Zero-payload value.
    Empty,
    /// Fixed-width scalar.
    Fixed(Scalar),
    /// 4-byte big-endian back-reference id.
    Reference,
    /// Length-prefixed blob; `width` is the size of the big-endian length.
    Blob { kind: BlobKind, width: usize },
    /// Composite opener, followed by children and a RETURN byte.
    Open(Container),
    /// Defined in the registry but not implemented; decoding it is an error.
    Reserved,
}

impl Tag {
    /// Returns the payload shape for this tag.
    pub const fn shape(self) -> Shape {
        match self {
            Tag::Return | Tag::Flag | Tag::Unsupported => Shape::Control,
            Tag::Undefined
            | Tag::Null
            | Tag::True
            | Tag::False
            | Tag::SymbolUnknown
            | Tag::Nan => Shape::Empty,
            Tag::Ref => Shape::Reference,
            Tag::Bool => Shape::Fixed(Scalar::Bool),
            Tag::U8 => Shape::Fixed(Scalar::U8),
            Tag::I8 => Shape::Fixed(Scalar::I8),
            Tag::U16 => Shape::Fixed(Scalar::U16),
            Tag::I16 => Shape::Fixed(Scalar::I16),
            Tag::U32 => Shape::Fixed(Scalar::U32),
            Tag::I32 => Shape::Fixed(Scalar::I32),
            Tag::F32 => Shape::Fixed(Scalar::F32),
            Tag::U64 => Shape::Fixed(Scalar::U64),
            Tag::I64 => Shape::Fixed(Scalar::I64),
            Tag::F64 => Shape::Fixed(Scalar::F64),
            Tag::Object => Shape::Open(Container::Object),
            Tag::Array => Shape::Open(Container::Array),
            Tag::Map => Shape::Open(Container::Map),
            Tag::Set => Shape::Open(Container::Set),
            Tag::SymbolExtended | Tag::ArrayTyped | Tag::MapTyped | Tag::SetTyped => {
                Shape::Reserved
            }
            Tag::String8 => blob(BlobKind::String, 1),
            Tag::String16 => blob(BlobKind::String, 2),
            Tag::String32 => blob(BlobKind::String, 4),
            Tag::String64 => blob(BlobKind::String, 8),
            Tag::Uint8Array8 => blob(BlobKind::View, 1),
            Tag::Uint8Array16 => blob(BlobKind::View, 2),
            Tag::Uint8Array32 => blob(BlobKind::View, 4),
            Tag::Uint8Array64 => blob(BlobKind::View, 8),
            Tag::ArrayBuffer8 => blob(BlobKind::Buffer, 1),
            Tag::ArrayBuffer16 => blob(BlobKind::Buffer, 2),
            Tag::ArrayBuffer32 => blob(BlobKind::Buffer, 4),
            Tag::ArrayBuffer64 => blob(BlobKind::Buffer, 8),
        }
    }

    /// Picks the smallest blob tag of `kind` whose length field fits `len`.
    ///
    /// Returns the tag together with the width of its length field.
    pub fn for_blob(kind: BlobKind, len: usize) -> (Tag, usize) {
        let len = len as u64;
        let class = if len <= 0xff {
            0
        } else if len <= 0xffff {
            1
        } else if len <= 0xffff_ffff {
            2
        } else {
            3
        };
        let family = match kind {
            BlobKind::String => [Tag::String8, Tag::String16, Tag::String32, Tag::String64],
            BlobKind::View => [
                Tag::Uint8Array8,
                Tag::Uint8Array16,
                Tag::Uint8Array32,
                Tag::Uint8Array64,
            ],
            BlobKind::Buffer => [
                Tag::ArrayBuffer8,
                Tag::ArrayBuffer16,
                Tag::ArrayBuffer32,
                Tag::ArrayBuffer64,
            ],
        };
        (family[class], 1 << class)
    }
}

const fn blob(kind: BlobKind, width: usize) -> Shape {
    Shape::Blob { kind, width }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        tag as u8
    }
}

impl TryFrom<u8> for Tag {
    /// The undefined byte is handed back unchanged.
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let tag = match byte {
            0x00 => Tag::Return,
            0x01 => Tag::Flag,
            0x03 => Tag::Undefined,
            0x04 => Tag::Null,
            0x05 => Tag::Unsupported,
            0x06 => Tag::Ref,
            0x07 => Tag::True,
            0x08 => Tag::False,
            0x09 => Tag::Bool,
            0x0a => Tag::SymbolUnknown,
            0x0b => Tag::SymbolExtended,
            0x10 => Tag::U8,
            0x11 => Tag::I8,
            0x12 => Tag::U16,
            0x13 => Tag::I16,
            0x14 => Tag::U32,
            0x15 => Tag::I32,
            0x16 => Tag::F32,
            0x17 => Tag::U64,
            0x18 => Tag::I64,
            0x19 => Tag::F64,
            0x20 => Tag::Object,
            0x21 => Tag::Array,
            0x22 => Tag::ArrayTyped,
            0x23 => Tag::Map,
            0x24 => Tag::MapTyped,
            0x25 => Tag::Set,
            0x26 => Tag::SetTyped,
            0x2a => Tag::Nan,
            0x30 => Tag::String8,
            0x31 => Tag::String16,
            0x32 => Tag::String32,
            0x33 => Tag::String64,
            0x34 => Tag::Uint8Array8,
            0x35 => Tag::Uint8Array16,
            0x36 => Tag::Uint8Array32,
            0x37 => Tag::Uint8Array64,
            0x38 => Tag::ArrayBuffer8,
            0x39 => Tag::ArrayBuffer16,
            0x3a => Tag::ArrayBuffer32,
            0x3b => Tag::ArrayBuffer64,
            other => return Err(other),
        };
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_maps_back_to_itself() {
        for byte in 0..=u8::MAX {
            if let Ok(tag) = Tag::try_from(byte) {
                assert_eq!(u8::from(tag), byte);
            }
        }
        assert_eq!(Tag::try_from(0x02), Err(0x02));
        assert_eq!(Tag::try_from(0xff), Err(0xff));
    }

    #[test]
    fn blob_class_boundaries() {
        assert_eq!(Tag::for_blob(BlobKind::String, 0), (Tag::String8, 1));
        assert_eq!(Tag::for_blob(BlobKind::String, 255), (Tag::String8, 1));
        assert_eq!(Tag::for_blob(BlobKind::String, 256), (Tag::String16, 2));
        assert_eq!(Tag::for_blob(BlobKind::View, 0xffff), (Tag::Uint8Array16, 2));
        assert_eq!(Tag::for_blob(BlobKind::View, 0x10000), (Tag::Uint8Array32, 4));
        assert_eq!(Tag::for_blob(BlobKind::Buffer, 0x10000), (Tag::ArrayBuffer32, 4));
    }

    #[test]
    fn blob_tags_report_their_width() {
        for kind in [BlobKind::String, BlobKind::View, BlobKind::Buffer] {
            for len in [1usize, 300, 70_000] {
                let (tag, width) = Tag::for_blob(kind, len);
                assert_eq!(tag.shape(), Shape::Blob { kind, width });
            }
        }
    }

    #[test]
    fn reserved_tags() {
        for tag in [Tag::SymbolExtended, Tag::ArrayTyped, Tag::MapTyped, Tag::SetTyped] {
            assert_eq!(tag.shape(), Shape::Reserved);
        }
    }
}
