use img_parts::{Bytes, DynImage, ImageEXIF};
use thiserror::Error;

use super::container::{ByteOrder, Directory, Entries, MetadataContainer, TYPE_LONG};
use super::tags::{
    self, TAG_EXIF_POINTER, TAG_GPS_POINTER, TAG_INTEROP_POINTER, TAG_THUMBNAIL_LENGTH,
    TAG_THUMBNAIL_OFFSET,
};

// A JPEG APP1 segment holds at most 65533 bytes of payload, 6 of which are `Exif\0\0`
const MAX_CONTAINER_LEN: usize = 65533 - 6;
const ENTRY_LEN: usize = 12;

/// Why a container could not be serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    #[error("{0} directory has too many entries")]
    TooManyEntries(Directory),
    #[error("serialized container is {0} bytes, over the {MAX_CONTAINER_LEN} byte limit")]
    TooLarge(usize),
}

/// Embed `container` into a copy of `carrier` and return the new image bytes.
///
/// A container with nothing to write (no entries besides the pointer and
/// thumbnail-location tags the writer regenerates, and no thumbnail) removes
/// the EXIF section entirely instead of writing an empty one. If the container
/// cannot be serialized, or the carrier cannot be split into segments, the
/// carrier is returned unchanged.
pub fn encode(container: &MetadataContainer, carrier: &[u8]) -> Vec<u8> {
    if !has_payload(container) {
        log::debug!("Container is empty, omitting EXIF section");
        return strip_all(carrier);
    }

    let tiff = match serialize(container) {
        Ok(tiff) => tiff,
        Err(e) => {
            log::warn!("Could not serialize EXIF, leaving output untouched: {e}");
            return carrier.to_vec();
        }
    };

    match DynImage::from_bytes(Bytes::copy_from_slice(carrier)) {
        Ok(Some(mut image)) => {
            image.set_exif(Some(Bytes::from(tiff)));
            image.encoder().bytes().to_vec()
        }
        Ok(None) => {
            log::warn!("Carrier format cannot hold EXIF, leaving output untouched");
            carrier.to_vec()
        }
        Err(e) => {
            log::warn!("Could not parse carrier image, leaving output untouched: {e}");
            carrier.to_vec()
        }
    }
}

/// True when serializing would write at least one field or a thumbnail.
fn has_payload(container: &MetadataContainer) -> bool {
    container.thumbnail().is_some()
        || Directory::ALL.iter().any(|&directory| {
            container
                .directory(directory)
                .keys()
                .any(|&tag| !tags::is_structural(directory, tag))
        })
}

/// Return `bytes` with no EXIF container at all.
///
/// Bytes that are not a JPEG, PNG or WebP are returned as-is.
pub fn strip_all(bytes: &[u8]) -> Vec<u8> {
    match DynImage::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(Some(mut image)) => {
            image.set_exif(None);
            image.encoder().bytes().to_vec()
        }
        Ok(None) => bytes.to_vec(),
        Err(e) => {
            log::debug!("Could not parse image for stripping: {e}");
            bytes.to_vec()
        }
    }
}

/// A fully resolved IFD entry ready to be laid out.
struct OutEntry {
    tag: u16,
    type_code: u16,
    count: u32,
    data: Vec<u8>,
}

impl OutEntry {
    fn long(tag: u16, value: u32, order: ByteOrder) -> Self {
        Self {
            tag,
            type_code: TYPE_LONG,
            count: 1,
            data: order.u32_bytes(value).to_vec(),
        }
    }

    /// Bytes this entry adds to the data area after the entry table.
    fn external_len(&self) -> usize {
        if self.data.len() <= 4 {
            0
        } else {
            self.data.len() + self.data.len() % 2
        }
    }
}

/// Entries of one directory, minus structural tags the writer regenerates.
fn out_entries(
    directory: Directory,
    entries: &Entries,
    order: ByteOrder,
) -> Result<Vec<OutEntry>, SerializeError> {
    let out: Vec<OutEntry> = entries
        .iter()
        .filter(|(tag, _)| !tags::is_structural(directory, **tag))
        .map(|(&tag, value)| OutEntry {
            tag,
            type_code: value.type_code(),
            count: value.count() as u32,
            data: value.to_raw(order),
        })
        .collect();
    // Room for up to two pointer entries added later
    if out.len() + 2 > u16::MAX as usize {
        return Err(SerializeError::TooManyEntries(directory));
    }
    Ok(out)
}

fn ifd_len(entries: &[OutEntry]) -> usize {
    2 + entries.len() * ENTRY_LEN + 4 + entries.iter().map(OutEntry::external_len).sum::<usize>()
}

/// Set the value of an already-inserted pointer entry.
fn patch_pointer(entries: &mut [OutEntry], tag: u16, value: u32, order: ByteOrder) {
    if let Some(entry) = entries.iter_mut().find(|e| e.tag == tag) {
        entry.data = order.u32_bytes(value).to_vec();
    }
}

/// Append one IFD, and its data area, at the current end of `out`.
fn write_ifd(out: &mut Vec<u8>, entries: &[OutEntry], next: u32, order: ByteOrder) {
    let start = out.len();
    let mut data_offset = start + 2 + entries.len() * ENTRY_LEN + 4;
    let mut data_area = Vec::new();

    out.extend_from_slice(&order.u16_bytes(entries.len() as u16));
    for entry in entries {
        out.extend_from_slice(&order.u16_bytes(entry.tag));
        out.extend_from_slice(&order.u16_bytes(entry.type_code));
        out.extend_from_slice(&order.u32_bytes(entry.count));
        if entry.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&order.u32_bytes(data_offset as u32));
            data_area.extend_from_slice(&entry.data);
            // Values start on a word boundary
            if entry.data.len() % 2 != 0 {
                data_area.push(0);
            }
            data_offset += entry.external_len();
        }
    }
    out.extend_from_slice(&order.u32_bytes(next));
    out.extend_from_slice(&data_area);
}

/// Serialize a container into a TIFF-structured EXIF block (without the
/// `Exif\0\0` prefix), in the container's byte order.
///
/// Layout: header, IFD0, Exif IFD, GPS IFD, Interop IFD, IFD1, thumbnail.
/// Sub-directories are only written when they have entries; pointer tags are
/// generated for exactly the sub-directories present.
pub fn serialize(container: &MetadataContainer) -> Result<Vec<u8>, SerializeError> {
    let order = container.byte_order();

    let mut ifd0 = out_entries(Directory::Primary, container.directory(Directory::Primary), order)?;
    let mut exif = out_entries(Directory::Capture, container.directory(Directory::Capture), order)?;
    let gps = out_entries(Directory::Location, container.directory(Directory::Location), order)?;
    let interop = out_entries(Directory::Interop, container.directory(Directory::Interop), order)?;
    let mut ifd1 =
        out_entries(Directory::Thumbnail, container.directory(Directory::Thumbnail), order)?;
    let thumbnail = container.thumbnail();

    let has_interop = !interop.is_empty();
    let has_exif = !exif.is_empty() || has_interop;
    let has_gps = !gps.is_empty();
    let has_ifd1 = !ifd1.is_empty() || thumbnail.is_some();

    // Pointer entries with placeholder values; their size is fixed so the
    // layout can be computed before the real offsets are known
    if has_exif {
        ifd0.push(OutEntry::long(TAG_EXIF_POINTER, 0, order));
    }
    if has_gps {
        ifd0.push(OutEntry::long(TAG_GPS_POINTER, 0, order));
    }
    if has_interop {
        exif.push(OutEntry::long(TAG_INTEROP_POINTER, 0, order));
    }
    if let Some(thumb) = thumbnail {
        ifd1.push(OutEntry::long(TAG_THUMBNAIL_OFFSET, 0, order));
        ifd1.push(OutEntry::long(TAG_THUMBNAIL_LENGTH, thumb.len() as u32, order));
    }
    for entries in [&mut ifd0, &mut exif, &mut ifd1] {
        entries.sort_by_key(|e| e.tag);
    }

    // === Layout ===
    let ifd0_offset = 8;
    let exif_offset = ifd0_offset + ifd_len(&ifd0);
    let gps_offset = exif_offset + if has_exif { ifd_len(&exif) } else { 0 };
    let interop_offset = gps_offset + if has_gps { ifd_len(&gps) } else { 0 };
    let ifd1_offset = interop_offset + if has_interop { ifd_len(&interop) } else { 0 };
    let thumb_offset = ifd1_offset + if has_ifd1 { ifd_len(&ifd1) } else { 0 };
    let total = thumb_offset + thumbnail.map_or(0, <[u8]>::len);

    if total > MAX_CONTAINER_LEN {
        return Err(SerializeError::TooLarge(total));
    }

    patch_pointer(&mut ifd0, TAG_EXIF_POINTER, exif_offset as u32, order);
    patch_pointer(&mut ifd0, TAG_GPS_POINTER, gps_offset as u32, order);
    patch_pointer(&mut exif, TAG_INTEROP_POINTER, interop_offset as u32, order);
    patch_pointer(&mut ifd1, TAG_THUMBNAIL_OFFSET, thumb_offset as u32, order);

    // === Write ===
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(order.marker());
    out.extend_from_slice(&order.u16_bytes(42));
    out.extend_from_slice(&order.u32_bytes(ifd0_offset as u32));

    let next = if has_ifd1 { ifd1_offset as u32 } else { 0 };
    write_ifd(&mut out, &ifd0, next, order);
    if has_exif {
        write_ifd(&mut out, &exif, 0, order);
    }
    if has_gps {
        write_ifd(&mut out, &gps, 0, order);
    }
    if has_interop {
        write_ifd(&mut out, &interop, 0, order);
    }
    if has_ifd1 {
        write_ifd(&mut out, &ifd1, 0, order);
    }
    if let Some(thumb) = thumbnail {
        out.extend_from_slice(thumb);
    }
    debug_assert_eq!(out.len(), total);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::container::FieldValue;
    use crate::exif::{decode, parse_tiff};
    use img_parts::jpeg::Jpeg;
    use std::io::Cursor;

    fn carrier_jpeg() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 10, 10]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn carrier_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 3, image::Rgba([0, 0, 255, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn has_exif_segment(bytes: &[u8]) -> bool {
        Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
            .unwrap()
            .exif()
            .is_some()
    }

    fn every_type(order: ByteOrder) -> MetadataContainer {
        MetadataContainer::with_byte_order(order)
            .with_field(Directory::Primary, 0x010F, FieldValue::ascii("Acme"))
            .with_field(Directory::Primary, 0x0112, FieldValue::Short(vec![1]))
            .with_field(Directory::Primary, 0x9C9B, FieldValue::Byte(vec![b'h', 0, b'i', 0, 0, 0]))
            .with_field(Directory::Primary, 0xF000, FieldValue::SByte(vec![-1, 2, -3]))
            .with_field(Directory::Capture, 0x9000, FieldValue::Undefined(b"0230".to_vec()))
            .with_field(Directory::Capture, 0x9204, FieldValue::SRational(vec![(-1, 3)]))
            .with_field(Directory::Capture, 0xF001, FieldValue::SShort(vec![-7, 7, 300]))
            .with_field(Directory::Capture, 0xF002, FieldValue::SLong(vec![-100_000]))
            .with_field(Directory::Capture, 0xA002, FieldValue::Long(vec![4000]))
            .with_field(
                Directory::Location,
                0x0002,
                FieldValue::Rational(vec![(40, 1), (26, 1), (4614, 100)]),
            )
            .with_field(Directory::Interop, 0x0001, FieldValue::ascii("R98"))
    }

    // ── serialize ────────────────────────────────────────────────────

    #[test]
    fn every_value_type_survives_serialization() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let original = every_type(order);
            let tiff = serialize(&original).unwrap();
            assert_eq!(&tiff[0..2], order.marker());
            assert_eq!(parse_tiff(&tiff).unwrap(), original);
        }
    }

    #[test]
    fn interop_alone_still_gets_an_exif_directory() {
        let c = MetadataContainer::empty().with_field(Directory::Interop, 0x0001, FieldValue::ascii("R98"));
        let parsed = parse_tiff(&serialize(&c).unwrap()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn no_pointers_for_absent_directories() {
        let c = MetadataContainer::empty().with_field(Directory::Primary, 0x010F, FieldValue::ascii("Acme"));
        let tiff = serialize(&c).unwrap();
        // Big-endian default: IFD0 count at offset 8 is a single entry
        assert_eq!(&tiff[8..10], &[0, 1]);
        // Next-IFD pointer is zero: no thumbnail directory
        assert_eq!(&tiff[22..26], &[0, 0, 0, 0]);
    }

    #[test]
    fn structural_tags_are_regenerated_not_copied() {
        let c = MetadataContainer::empty()
            .with_field(Directory::Primary, TAG_GPS_POINTER, FieldValue::Long(vec![9999]))
            .with_field(Directory::Primary, 0x010F, FieldValue::ascii("Acme"));
        let parsed = parse_tiff(&serialize(&c).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.directory(Directory::Location).is_empty());
    }

    #[test]
    fn thumbnail_round_trips() {
        let c = MetadataContainer::empty()
            .with_field(Directory::Thumbnail, 0x0103, FieldValue::Short(vec![6]))
            .with_thumbnail(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9]);
        let parsed = parse_tiff(&serialize(&c).unwrap()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn oversized_container_is_rejected() {
        let c = MetadataContainer::empty()
            .with_field(Directory::Capture, 0x927C, FieldValue::Undefined(vec![0; 70_000]));
        assert!(matches!(serialize(&c), Err(SerializeError::TooLarge(_))));
    }

    // ── encode / strip_all ───────────────────────────────────────────

    #[test]
    fn encode_embeds_a_decodable_container() {
        let c = every_type(ByteOrder::Little);
        let out = encode(&c, &carrier_jpeg());
        assert!(has_exif_segment(&out));
        assert_eq!(decode(&out), c);
        // Pixels are still a readable image
        assert!(image::load_from_memory(&out).is_ok());
    }

    #[test]
    fn encode_empty_container_omits_the_section() {
        let with_exif = encode(&every_type(ByteOrder::Big), &carrier_jpeg());
        assert!(has_exif_segment(&with_exif));

        let out = encode(&MetadataContainer::empty(), &with_exif);
        assert!(!has_exif_segment(&out));
        assert!(decode(&out).is_empty());
    }

    #[test]
    fn encode_structural_tags_alone_omit_the_section() {
        let with_exif = encode(&every_type(ByteOrder::Big), &carrier_jpeg());
        let c = MetadataContainer::empty()
            .with_field(Directory::Primary, TAG_GPS_POINTER, FieldValue::Long(vec![99]))
            .with_field(Directory::Thumbnail, TAG_THUMBNAIL_LENGTH, FieldValue::Long(vec![10]));
        assert!(!c.is_empty());

        let out = encode(&c, &with_exif);
        assert!(!has_exif_segment(&out));
        assert!(!has_exif_segment(&encode(&c, &carrier_jpeg())));
    }

    #[test]
    fn encode_passes_through_when_serialization_fails() {
        let carrier = carrier_jpeg();
        let c = MetadataContainer::empty()
            .with_field(Directory::Capture, 0x927C, FieldValue::Undefined(vec![0; 70_000]));
        assert_eq!(encode(&c, &carrier), carrier);
    }

    #[test]
    fn encode_passes_through_unknown_carriers() {
        let c = every_type(ByteOrder::Big);
        assert_eq!(encode(&c, b"plain text"), b"plain text".to_vec());
    }

    #[test]
    fn strip_all_removes_container() {
        let with_exif = encode(&every_type(ByteOrder::Big), &carrier_jpeg());
        let stripped = strip_all(&with_exif);
        assert!(!has_exif_segment(&stripped));
        assert!(image::load_from_memory(&stripped).is_ok());
    }

    #[test]
    fn strip_all_on_png_without_exif_is_harmless() {
        let png = carrier_png();
        let stripped = strip_all(&png);
        assert!(decode(&stripped).is_empty());
        assert!(image::load_from_memory(&stripped).is_ok());
    }
}
