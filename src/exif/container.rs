use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// TIFF field type codes
pub(crate) const TYPE_BYTE: u16 = 1;
pub(crate) const TYPE_ASCII: u16 = 2;
pub(crate) const TYPE_SHORT: u16 = 3;
pub(crate) const TYPE_LONG: u16 = 4;
pub(crate) const TYPE_RATIONAL: u16 = 5;
pub(crate) const TYPE_SBYTE: u16 = 6;
pub(crate) const TYPE_UNDEFINED: u16 = 7;
pub(crate) const TYPE_SSHORT: u16 = 8;
pub(crate) const TYPE_SLONG: u16 = 9;
pub(crate) const TYPE_SRATIONAL: u16 = 10;

/// Longest raw byte sequence rendered as hex by `Display`.
const HEX_DISPLAY_LIMIT: usize = 16;

/// One of the five namespaces inside an EXIF container.
///
/// The same numeric tag in two directories denotes two unrelated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directory {
    /// IFD0, the primary image directory.
    Primary,
    /// The Exif sub-IFD (exposure, lens, capture time).
    Capture,
    /// The GPS sub-IFD.
    Location,
    /// The interoperability sub-IFD.
    Interop,
    /// IFD1, describing the embedded thumbnail.
    Thumbnail,
}

impl Directory {
    pub const ALL: [Directory; 5] = [
        Directory::Primary,
        Directory::Capture,
        Directory::Location,
        Directory::Interop,
        Directory::Thumbnail,
    ];

    /// Directories shown to the user, in display order. The thumbnail is never projected.
    pub const USER_FACING: [Directory; 4] = [
        Directory::Primary,
        Directory::Capture,
        Directory::Location,
        Directory::Interop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Directory::Primary => "primary",
            Directory::Capture => "capture",
            Directory::Location => "location",
            Directory::Interop => "interop",
            Directory::Thumbnail => "thumbnail",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Directory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "0th" | "ifd0" => Ok(Directory::Primary),
            "capture" | "exif" => Ok(Directory::Capture),
            "location" | "gps" => Ok(Directory::Location),
            "interop" | "interoperability" => Ok(Directory::Interop),
            "thumbnail" | "1st" | "ifd1" => Ok(Directory::Thumbnail),
            other => Err(format!("unknown directory '{other}'")),
        }
    }
}

/// Byte order declared by the container's TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// `II`
    Little,
    /// `MM`
    #[default]
    Big,
}

impl ByteOrder {
    pub fn marker(self) -> &'static [u8; 2] {
        match self {
            ByteOrder::Little => b"II",
            ByteOrder::Big => b"MM",
        }
    }

    pub(crate) fn read_u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let b = data.get(offset..offset.checked_add(2)?)?;
        Some(self.u16_from([b[0], b[1]]))
    }

    pub(crate) fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let b = data.get(offset..offset.checked_add(4)?)?;
        Some(self.u32_from([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u16_from(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    pub(crate) fn u32_from(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    pub(crate) fn u16_bytes(self, v: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        }
    }

    pub(crate) fn u32_bytes(self, v: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        }
    }
}

/// Width in bytes of one element of a TIFF field type, or `None` when the
/// type is not one the codec admits.
pub(crate) fn type_width(type_code: u16) -> Option<usize> {
    match type_code {
        TYPE_BYTE | TYPE_ASCII | TYPE_SBYTE | TYPE_UNDEFINED => Some(1),
        TYPE_SHORT | TYPE_SSHORT => Some(2),
        TYPE_LONG | TYPE_SLONG => Some(4),
        TYPE_RATIONAL | TYPE_SRATIONAL => Some(8),
        _ => None,
    }
}

/// A typed EXIF value. Every variant is a sequence; single values have one element.
///
/// Widths are preserved exactly so a value re-serializes to the same bytes it
/// was decoded from. ASCII keeps its raw bytes, including the NUL terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Byte(Vec<u8>),
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
}

impl FieldValue {
    /// NUL-terminated ASCII value.
    pub fn ascii(text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        FieldValue::Ascii(bytes)
    }

    pub fn type_code(&self) -> u16 {
        match self {
            FieldValue::Byte(_) => TYPE_BYTE,
            FieldValue::Ascii(_) => TYPE_ASCII,
            FieldValue::Short(_) => TYPE_SHORT,
            FieldValue::Long(_) => TYPE_LONG,
            FieldValue::Rational(_) => TYPE_RATIONAL,
            FieldValue::SByte(_) => TYPE_SBYTE,
            FieldValue::Undefined(_) => TYPE_UNDEFINED,
            FieldValue::SShort(_) => TYPE_SSHORT,
            FieldValue::SLong(_) => TYPE_SLONG,
            FieldValue::SRational(_) => TYPE_SRATIONAL,
        }
    }

    /// Number of elements, as written in the IFD entry's count field.
    pub fn count(&self) -> usize {
        match self {
            FieldValue::Byte(v) | FieldValue::Ascii(v) | FieldValue::Undefined(v) => v.len(),
            FieldValue::Short(v) => v.len(),
            FieldValue::Long(v) => v.len(),
            FieldValue::Rational(v) => v.len(),
            FieldValue::SByte(v) => v.len(),
            FieldValue::SShort(v) => v.len(),
            FieldValue::SLong(v) => v.len(),
            FieldValue::SRational(v) => v.len(),
        }
    }

    /// First element as an unsigned integer, if the value is an unsigned integer type.
    pub fn first_unsigned(&self) -> Option<u32> {
        match self {
            FieldValue::Byte(v) => v.first().map(|&b| u32::from(b)),
            FieldValue::Short(v) => v.first().map(|&s| u32::from(s)),
            FieldValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Build a value from raw entry bytes. `raw.len()` must be a whole number
    /// of elements of `type_code`; anything else yields `None`.
    pub(crate) fn from_raw(type_code: u16, raw: &[u8], order: ByteOrder) -> Option<Self> {
        let width = type_width(type_code)?;
        if raw.len() % width != 0 {
            return None;
        }
        let u16s = || raw.chunks_exact(2).map(|c| order.u16_from([c[0], c[1]]));
        let u32s = || {
            raw.chunks_exact(4)
                .map(|c| order.u32_from([c[0], c[1], c[2], c[3]]))
        };
        let value = match type_code {
            TYPE_BYTE => FieldValue::Byte(raw.to_vec()),
            TYPE_ASCII => FieldValue::Ascii(raw.to_vec()),
            TYPE_UNDEFINED => FieldValue::Undefined(raw.to_vec()),
            TYPE_SBYTE => FieldValue::SByte(raw.iter().map(|&b| b as i8).collect()),
            TYPE_SHORT => FieldValue::Short(u16s().collect()),
            TYPE_SSHORT => FieldValue::SShort(u16s().map(|v| v as i16).collect()),
            TYPE_LONG => FieldValue::Long(u32s().collect()),
            TYPE_SLONG => FieldValue::SLong(u32s().map(|v| v as i32).collect()),
            TYPE_RATIONAL => {
                let parts: Vec<u32> = u32s().collect();
                FieldValue::Rational(parts.chunks_exact(2).map(|p| (p[0], p[1])).collect())
            }
            TYPE_SRATIONAL => {
                let parts: Vec<i32> = u32s().map(|v| v as i32).collect();
                FieldValue::SRational(parts.chunks_exact(2).map(|p| (p[0], p[1])).collect())
            }
            _ => return None,
        };
        Some(value)
    }

    /// Serialize the value's elements in the given byte order.
    pub(crate) fn to_raw(&self, order: ByteOrder) -> Vec<u8> {
        match self {
            FieldValue::Byte(v) | FieldValue::Ascii(v) | FieldValue::Undefined(v) => v.clone(),
            FieldValue::SByte(v) => v.iter().map(|&b| b as u8).collect(),
            FieldValue::Short(v) => v.iter().flat_map(|&s| order.u16_bytes(s)).collect(),
            FieldValue::SShort(v) => v.iter().flat_map(|&s| order.u16_bytes(s as u16)).collect(),
            FieldValue::Long(v) => v.iter().flat_map(|&l| order.u32_bytes(l)).collect(),
            FieldValue::SLong(v) => v.iter().flat_map(|&l| order.u32_bytes(l as u32)).collect(),
            FieldValue::Rational(v) => v
                .iter()
                .flat_map(|&(n, d)| [order.u32_bytes(n), order.u32_bytes(d)].concat())
                .collect(),
            FieldValue::SRational(v) => v
                .iter()
                .flat_map(|&(n, d)| [order.u32_bytes(n as u32), order.u32_bytes(d as u32)].concat())
                .collect(),
        }
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Ascii(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                f.write_str(text.trim_end_matches('\0'))
            }
            FieldValue::Undefined(bytes) if bytes.len() > HEX_DISPLAY_LIMIT => {
                write!(f, "<{} bytes>", bytes.len())
            }
            FieldValue::Undefined(bytes) => {
                let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
                f.write_str(&hex.join(" "))
            }
            FieldValue::Byte(v) => f.write_str(&join(v.iter())),
            FieldValue::Short(v) => f.write_str(&join(v.iter())),
            FieldValue::Long(v) => f.write_str(&join(v.iter())),
            FieldValue::SByte(v) => f.write_str(&join(v.iter())),
            FieldValue::SShort(v) => f.write_str(&join(v.iter())),
            FieldValue::SLong(v) => f.write_str(&join(v.iter())),
            FieldValue::Rational(v) => f.write_str(&join(v.iter().map(|(n, d)| format!("{n}/{d}")))),
            FieldValue::SRational(v) => {
                f.write_str(&join(v.iter().map(|(n, d)| format!("{n}/{d}"))))
            }
        }
    }
}

/// Tag-to-value entries of one directory, in ascending tag order.
pub type Entries = BTreeMap<u16, FieldValue>;

/// A parsed EXIF container: five independent directories plus the opaque
/// thumbnail bytes.
///
/// Callers never mutate a container in place; filtering builds a new one.
///
/// # Example
///
/// ```rust
/// use exif_redact::exif::{Directory, FieldValue, MetadataContainer};
///
/// let container = MetadataContainer::empty()
///     .with_field(Directory::Primary, 0x010F, FieldValue::ascii("Acme"))
///     .with_field(Directory::Primary, 0x0112, FieldValue::Short(vec![6]));
///
/// assert_eq!(container.directory(Directory::Primary).len(), 2);
/// assert!(container.directory(Directory::Location).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataContainer {
    byte_order: ByteOrder,
    directories: [Entries; 5],
    thumbnail: Option<Vec<u8>>,
}

impl MetadataContainer {
    /// The skeleton container: every directory present and empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty container that will serialize in the given byte order.
    pub fn with_byte_order(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            ..Self::default()
        }
    }

    /// Builder-style insert. An existing entry for the same tag is replaced.
    pub fn with_field(mut self, directory: Directory, tag: u16, value: FieldValue) -> Self {
        self.insert(directory, tag, value);
        self
    }

    /// Builder-style thumbnail attachment.
    pub fn with_thumbnail(mut self, bytes: Vec<u8>) -> Self {
        self.thumbnail = Some(bytes);
        self
    }

    pub(crate) fn insert(&mut self, directory: Directory, tag: u16, value: FieldValue) {
        self.directories[directory.index()].insert(tag, value);
    }

    pub(crate) fn set_thumbnail(&mut self, bytes: Vec<u8>) {
        self.thumbnail = Some(bytes);
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn directory(&self, directory: Directory) -> &Entries {
        &self.directories[directory.index()]
    }

    pub fn get(&self, directory: Directory, tag: u16) -> Option<&FieldValue> {
        self.directory(directory).get(&tag)
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    /// True when nothing would be serialized: no entries in any directory and no thumbnail.
    pub fn is_empty(&self) -> bool {
        self.directories.iter().all(|d| d.is_empty()) && self.thumbnail.is_none()
    }

    /// Total number of entries across all directories.
    pub fn len(&self) -> usize {
        self.directories.iter().map(|d| d.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── FieldValue ───────────────────────────────────────────────────

    #[test]
    fn raw_bytes_follow_byte_order() {
        let value = FieldValue::Short(vec![0x0102]);
        assert_eq!(value.to_raw(ByteOrder::Big), vec![0x01, 0x02]);
        assert_eq!(value.to_raw(ByteOrder::Little), vec![0x02, 0x01]);

        let rational = FieldValue::Rational(vec![(40, 1)]);
        assert_eq!(
            rational.to_raw(ByteOrder::Little),
            vec![40, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn from_raw_rejects_partial_elements() {
        assert_eq!(FieldValue::from_raw(TYPE_SHORT, &[1, 2, 3], ByteOrder::Big), None);
        assert_eq!(FieldValue::from_raw(TYPE_RATIONAL, &[0; 12], ByteOrder::Big), None);
    }

    #[test]
    fn from_raw_rejects_unknown_types() {
        // FLOAT, DOUBLE and IFD are not admitted
        for code in [0, 11, 12, 13, 99] {
            assert_eq!(FieldValue::from_raw(code, &[0; 8], ByteOrder::Big), None);
        }
    }

    #[test]
    fn signed_values_decode_as_signed() {
        let value = FieldValue::from_raw(TYPE_SRATIONAL, &[0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0, 3], ByteOrder::Big);
        assert_eq!(value, Some(FieldValue::SRational(vec![(-2, 3)])));
        let value = FieldValue::from_raw(TYPE_SSHORT, &[0xFF, 0xFF], ByteOrder::Little);
        assert_eq!(value, Some(FieldValue::SShort(vec![-1])));
    }

    #[test]
    fn count_and_type_code() {
        assert_eq!(FieldValue::ascii("Acme").count(), 5);
        assert_eq!(FieldValue::ascii("Acme").type_code(), TYPE_ASCII);
        assert_eq!(FieldValue::Rational(vec![(1, 2), (3, 4)]).count(), 2);
    }

    #[test]
    fn first_unsigned_only_for_unsigned_types() {
        assert_eq!(FieldValue::Short(vec![6]).first_unsigned(), Some(6));
        assert_eq!(FieldValue::Long(vec![8, 1]).first_unsigned(), Some(8));
        assert_eq!(FieldValue::SShort(vec![6]).first_unsigned(), None);
        assert_eq!(FieldValue::Short(vec![]).first_unsigned(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(FieldValue::ascii("Acme").to_string(), "Acme");
        assert_eq!(FieldValue::Rational(vec![(40, 1), (30, 1)]).to_string(), "40/1, 30/1");
        assert_eq!(FieldValue::Undefined(b"0230".to_vec()).to_string(), "30 32 33 30");
        assert_eq!(FieldValue::Undefined(vec![0; 40]).to_string(), "<40 bytes>");
        assert_eq!(FieldValue::Short(vec![1, 2, 3]).to_string(), "1, 2, 3");
    }

    // ── Directory ────────────────────────────────────────────────────

    #[test]
    fn directory_labels_parse_back() {
        for dir in Directory::ALL {
            assert_eq!(dir.label().parse::<Directory>(), Ok(dir));
        }
        assert_eq!("GPS".parse::<Directory>(), Ok(Directory::Location));
        assert!("maker".parse::<Directory>().is_err());
    }

    // ── MetadataContainer ────────────────────────────────────────────

    #[test]
    fn skeleton_is_empty() {
        let c = MetadataContainer::empty();
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
        for dir in Directory::ALL {
            assert!(c.directory(dir).is_empty());
        }
    }

    #[test]
    fn directories_are_independent_namespaces() {
        let c = MetadataContainer::empty()
            .with_field(Directory::Primary, 1, FieldValue::Short(vec![1]))
            .with_field(Directory::Location, 1, FieldValue::ascii("N"));
        assert_eq!(c.get(Directory::Primary, 1), Some(&FieldValue::Short(vec![1])));
        assert_eq!(c.get(Directory::Location, 1), Some(&FieldValue::ascii("N")));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn thumbnail_alone_is_not_empty() {
        let c = MetadataContainer::empty().with_thumbnail(vec![0xFF, 0xD8]);
        assert!(!c.is_empty());
        assert_eq!(c.thumbnail(), Some(&[0xFF, 0xD8][..]));
    }
}
