use img_parts::{Bytes, DynImage, ImageEXIF};

use super::container::{ByteOrder, Directory, FieldValue, MetadataContainer, TYPE_LONG, type_width};
use super::tags::{
    self, TAG_EXIF_POINTER, TAG_GPS_POINTER, TAG_INTEROP_POINTER, TAG_THUMBNAIL_LENGTH,
    TAG_THUMBNAIL_OFFSET,
};
use crate::error::MalformedMetadata;

const TIFF_MAGIC: u16 = 42;
const TIFF_HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;
// TIFF type 13 (IFD) is a LONG that points at a sub-directory
const TYPE_IFD: u16 = 13;

/// Decode the EXIF container embedded in an image.
///
/// Never fails: images without a container, and containers with structural
/// damage, both yield [`MetadataContainer::empty`]. Individual entries with
/// invalid types or out-of-range values are dropped without affecting the rest.
pub fn decode(bytes: &[u8]) -> MetadataContainer {
    let Some(tiff) = extract_tiff(bytes) else {
        log::debug!("No EXIF container found");
        return MetadataContainer::empty();
    };

    match parse_tiff(&tiff) {
        Ok(container) => {
            log::debug!("Decoded {} EXIF entries", container.len());
            container
        }
        Err(e) => {
            log::debug!("Malformed EXIF container, treating as empty: {e}");
            MetadataContainer::empty()
        }
    }
}

/// Pull the raw TIFF block out of a JPEG APP1, PNG eXIf or WebP EXIF chunk.
fn extract_tiff(bytes: &[u8]) -> Option<Bytes> {
    match DynImage::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(Some(image)) => image.exif().filter(|tiff| !tiff.is_empty()),
        Ok(None) => None,
        Err(e) => {
            log::debug!("Could not split image into segments: {e}");
            None
        }
    }
}

/// Parse a raw TIFF-structured EXIF block (the bytes after `Exif\0\0`).
///
/// Structural damage (bad header, directory offsets outside the block,
/// truncated entry tables, directory cycles) is an error. Per-entry damage is
/// not: such entries are skipped.
pub fn parse_tiff(data: &[u8]) -> Result<MetadataContainer, MalformedMetadata> {
    if data.len() < TIFF_HEADER_LEN {
        return Err(MalformedMetadata::BadHeader);
    }
    let order = match &data[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return Err(MalformedMetadata::BadHeader),
    };
    if order.read_u16(data, 2) != Some(TIFF_MAGIC) {
        return Err(MalformedMetadata::BadHeader);
    }
    let ifd0_offset = order
        .read_u32(data, 4)
        .ok_or(MalformedMetadata::BadHeader)? as usize;

    let mut walker = IfdWalker {
        data,
        order,
        visited: Vec::new(),
    };
    let mut container = MetadataContainer::with_byte_order(order);

    // === IFD0 ===
    let ifd0 = walker.read_ifd(ifd0_offset, "primary")?;
    let mut exif_offset = None;
    let mut gps_offset = None;
    for entry in &ifd0.entries {
        match entry.tag {
            TAG_EXIF_POINTER => exif_offset = walker.pointer(entry),
            TAG_GPS_POINTER => gps_offset = walker.pointer(entry),
            _ => walker.admit(&mut container, Directory::Primary, entry),
        }
    }

    // === Exif sub-IFD ===
    let mut interop_offset = None;
    if let Some(offset) = exif_offset {
        let ifd = walker.read_ifd(offset, "capture")?;
        for entry in &ifd.entries {
            match entry.tag {
                TAG_INTEROP_POINTER => interop_offset = walker.pointer(entry),
                _ => walker.admit(&mut container, Directory::Capture, entry),
            }
        }
    }

    // === GPS sub-IFD ===
    if let Some(offset) = gps_offset {
        let ifd = walker.read_ifd(offset, "location")?;
        for entry in &ifd.entries {
            walker.admit(&mut container, Directory::Location, entry);
        }
    }

    // === Interoperability sub-IFD ===
    if let Some(offset) = interop_offset {
        let ifd = walker.read_ifd(offset, "interop")?;
        for entry in &ifd.entries {
            walker.admit(&mut container, Directory::Interop, entry);
        }
    }

    // === IFD1 (thumbnail) ===
    if ifd0.next != 0 {
        let ifd1 = walker.read_ifd(ifd0.next as usize, "thumbnail")?;
        let mut thumb_offset = None;
        let mut thumb_length = None;
        for entry in &ifd1.entries {
            match entry.tag {
                TAG_THUMBNAIL_OFFSET => thumb_offset = walker.scalar(entry),
                TAG_THUMBNAIL_LENGTH => thumb_length = walker.scalar(entry),
                _ => walker.admit(&mut container, Directory::Thumbnail, entry),
            }
        }
        if let (Some(offset), Some(length)) = (thumb_offset, thumb_length) {
            let range = offset as usize..(offset as usize).saturating_add(length as usize);
            match data.get(range) {
                Some(thumb) => container.set_thumbnail(thumb.to_vec()),
                None => log::trace!("Thumbnail data out of bounds, dropped"),
            }
        }
    }

    Ok(container)
}

/// One 12-byte IFD entry, not yet validated.
struct RawEntry {
    tag: u16,
    type_code: u16,
    count: u32,
    /// The 4-byte value-or-offset field, in file byte order.
    value_field: [u8; 4],
}

struct RawIfd {
    entries: Vec<RawEntry>,
    next: u32,
}

struct IfdWalker<'a> {
    data: &'a [u8],
    order: ByteOrder,
    visited: Vec<usize>,
}

impl IfdWalker<'_> {
    fn read_ifd(&mut self, offset: usize, name: &'static str) -> Result<RawIfd, MalformedMetadata> {
        if self.visited.contains(&offset) {
            return Err(MalformedMetadata::Cycle(offset));
        }
        self.visited.push(offset);

        if offset < TIFF_HEADER_LEN {
            return Err(MalformedMetadata::OffsetOutOfBounds(name, offset));
        }
        let count = self
            .order
            .read_u16(self.data, offset)
            .ok_or(MalformedMetadata::OffsetOutOfBounds(name, offset))? as usize;

        let table_start = offset + 2;
        let table_end = table_start + count * ENTRY_LEN;
        let table = self
            .data
            .get(table_start..table_end)
            .ok_or(MalformedMetadata::Truncated(name))?;

        let entries = table
            .chunks_exact(ENTRY_LEN)
            .map(|e| RawEntry {
                tag: self.order.u16_from([e[0], e[1]]),
                type_code: self.order.u16_from([e[2], e[3]]),
                count: self.order.u32_from([e[4], e[5], e[6], e[7]]),
                value_field: [e[8], e[9], e[10], e[11]],
            })
            .collect();

        // Some writers omit the trailing next-IFD pointer on sub-directories
        let next = self.order.read_u32(self.data, table_end).unwrap_or(0);

        Ok(RawIfd { entries, next })
    }

    /// Decode an entry's value, or `None` if it fails validation.
    fn value(&self, directory: Directory, entry: &RawEntry) -> Option<FieldValue> {
        let Some(width) = type_width(entry.type_code) else {
            log::trace!(
                "{directory}: tag {:#06x} has unsupported type {}, dropped",
                entry.tag,
                entry.type_code
            );
            return None;
        };
        if !tags::catalog().accepts(directory, entry.tag, entry.type_code) {
            log::trace!(
                "{directory}: tag {:#06x} has unexpected type {}, dropped",
                entry.tag,
                entry.type_code
            );
            return None;
        }

        let len = width.checked_mul(entry.count as usize)?;
        let raw = if len <= 4 {
            &entry.value_field[..len]
        } else {
            let offset = self.order.u32_from(entry.value_field) as usize;
            match self.data.get(offset..offset.checked_add(len)?) {
                Some(raw) => raw,
                None => {
                    log::trace!(
                        "{directory}: tag {:#06x} value out of bounds, dropped",
                        entry.tag
                    );
                    return None;
                }
            }
        };
        FieldValue::from_raw(entry.type_code, raw, self.order)
    }

    fn admit(&self, container: &mut MetadataContainer, directory: Directory, entry: &RawEntry) {
        // First occurrence wins when a directory repeats a tag
        if container.get(directory, entry.tag).is_some() {
            return;
        }
        if let Some(value) = self.value(directory, entry) {
            container.insert(directory, entry.tag, value);
        }
    }

    /// A single SHORT or LONG, as used by the thumbnail location tags.
    fn scalar(&self, entry: &RawEntry) -> Option<u32> {
        if entry.count != 1 {
            return None;
        }
        FieldValue::from_raw(
            entry.type_code,
            &entry.value_field[..type_width(entry.type_code)?.min(4)],
            self.order,
        )?
        .first_unsigned()
    }

    /// Sub-directory offset from a pointer entry; malformed pointers are ignored.
    fn pointer(&self, entry: &RawEntry) -> Option<usize> {
        if entry.count != 1 || !(entry.type_code == TYPE_LONG || entry.type_code == TYPE_IFD) {
            log::trace!("Pointer tag {:#06x} has invalid type or count, ignored", entry.tag);
            return None;
        }
        Some(self.order.u32_from(entry.value_field) as usize)
    }
}
