use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::container::{Directory, TYPE_LONG, TYPE_SHORT};
#[cfg(feature = "tag-catalog")]
use super::container::{TYPE_ASCII, TYPE_BYTE, TYPE_RATIONAL, TYPE_SRATIONAL, TYPE_UNDEFINED};

pub const TAG_IMAGE_WIDTH: u16 = 0x0100;
pub const TAG_IMAGE_LENGTH: u16 = 0x0101;
pub const TAG_ORIENTATION: u16 = 0x0112;

// Structural tags: consumed by the codec, never admitted as fields
pub(crate) const TAG_EXIF_POINTER: u16 = 0x8769;
pub(crate) const TAG_GPS_POINTER: u16 = 0x8825;
pub(crate) const TAG_INTEROP_POINTER: u16 = 0xA005;
pub(crate) const TAG_THUMBNAIL_OFFSET: u16 = 0x0201;
pub(crate) const TAG_THUMBNAIL_LENGTH: u16 = 0x0202;

/// Accepted TIFF type codes for a tag. Empty means any admitted type.
type Rule = &'static [u16];

const SHORT_OR_LONG: Rule = &[TYPE_SHORT, TYPE_LONG];
#[cfg(feature = "tag-catalog")]
const ANY: Rule = &[];
#[cfg(feature = "tag-catalog")]
const ASCII: Rule = &[TYPE_ASCII];
#[cfg(feature = "tag-catalog")]
const BYTE: Rule = &[TYPE_BYTE];
#[cfg(feature = "tag-catalog")]
const SHORT: Rule = &[TYPE_SHORT];
#[cfg(feature = "tag-catalog")]
const LONG: Rule = &[TYPE_LONG];
#[cfg(feature = "tag-catalog")]
const RATIONAL: Rule = &[TYPE_RATIONAL];
#[cfg(feature = "tag-catalog")]
const SRATIONAL: Rule = &[TYPE_SRATIONAL];
#[cfg(feature = "tag-catalog")]
const UNDEFINED: Rule = &[TYPE_UNDEFINED];
// Some writers store version strings as ASCII
#[cfg(feature = "tag-catalog")]
const VERSION: Rule = &[TYPE_UNDEFINED, TYPE_ASCII];

/// Tags of IFD0; IFD1 (thumbnail) shares the same tag space.
#[cfg(feature = "tag-catalog")]
const IMAGE_TAGS: &[(u16, &str, Rule)] = &[
    (0x000B, "ProcessingSoftware", ASCII),
    (0x00FE, "NewSubfileType", LONG),
    (0x00FF, "SubfileType", SHORT),
    (0x0100, "ImageWidth", SHORT_OR_LONG),
    (0x0101, "ImageLength", SHORT_OR_LONG),
    (0x0102, "BitsPerSample", SHORT),
    (0x0103, "Compression", SHORT),
    (0x0106, "PhotometricInterpretation", SHORT),
    (0x0107, "Threshholding", SHORT),
    (0x0108, "CellWidth", SHORT),
    (0x0109, "CellLength", SHORT),
    (0x010A, "FillOrder", SHORT),
    (0x010D, "DocumentName", ASCII),
    (0x010E, "ImageDescription", ASCII),
    (0x010F, "Make", ASCII),
    (0x0110, "Model", ASCII),
    (0x0111, "StripOffsets", SHORT_OR_LONG),
    (0x0112, "Orientation", SHORT_OR_LONG),
    (0x0115, "SamplesPerPixel", SHORT),
    (0x0116, "RowsPerStrip", SHORT_OR_LONG),
    (0x0117, "StripByteCounts", SHORT_OR_LONG),
    (0x011A, "XResolution", RATIONAL),
    (0x011B, "YResolution", RATIONAL),
    (0x011C, "PlanarConfiguration", SHORT),
    (0x0122, "GrayResponseUnit", SHORT),
    (0x0123, "GrayResponseCurve", SHORT),
    (0x0128, "ResolutionUnit", SHORT),
    (0x012D, "TransferFunction", SHORT),
    (0x0131, "Software", ASCII),
    (0x0132, "DateTime", ASCII),
    (0x013B, "Artist", ASCII),
    (0x013C, "HostComputer", ASCII),
    (0x013D, "Predictor", SHORT),
    (0x013E, "WhitePoint", RATIONAL),
    (0x013F, "PrimaryChromaticities", RATIONAL),
    (0x0140, "ColorMap", SHORT),
    (0x0141, "HalftoneHints", SHORT),
    (0x0142, "TileWidth", SHORT_OR_LONG),
    (0x0143, "TileLength", SHORT_OR_LONG),
    (0x0150, "DotRange", BYTE),
    (0x0151, "TargetPrinter", ASCII),
    (0x0152, "ExtraSamples", SHORT),
    (0x0153, "SampleFormat", SHORT),
    (0x0156, "TransferRange", SHORT),
    (0x0200, "JPEGProc", LONG),
    (0x0211, "YCbCrCoefficients", RATIONAL),
    (0x0212, "YCbCrSubSampling", SHORT),
    (0x0213, "YCbCrPositioning", SHORT),
    (0x0214, "ReferenceBlackWhite", RATIONAL),
    (0x02BC, "XMLPacket", BYTE),
    (0x4746, "Rating", SHORT),
    (0x4749, "RatingPercent", SHORT),
    (0x800D, "ImageID", ASCII),
    (0x828D, "CFARepeatPatternDim", SHORT),
    (0x828E, "CFAPattern", BYTE),
    (0x828F, "BatteryLevel", RATIONAL),
    (0x8298, "Copyright", ASCII),
    (0x83BB, "IPTCNAA", ANY),
    (0x8773, "InterColorProfile", UNDEFINED),
    (0x8824, "SpectralSensitivity", ASCII),
    (0x8829, "Interlace", SHORT),
    (0x882A, "TimeZoneOffset", ANY),
    (0x882B, "SelfTimerMode", SHORT),
    (0x9003, "DateTimeOriginal", ASCII),
    (0x9102, "CompressedBitsPerPixel", RATIONAL),
    (0x9212, "SecurityClassification", ASCII),
    (0x9213, "ImageHistory", ASCII),
    (0x9C9B, "XPTitle", BYTE),
    (0x9C9C, "XPComment", BYTE),
    (0x9C9D, "XPAuthor", BYTE),
    (0x9C9E, "XPKeywords", BYTE),
    (0x9C9F, "XPSubject", BYTE),
    (0xC4A5, "PrintImageMatching", UNDEFINED),
    (0xC612, "DNGVersion", BYTE),
    (0xC613, "DNGBackwardVersion", BYTE),
    (0xC614, "UniqueCameraModel", ASCII),
    (0xC615, "LocalizedCameraModel", BYTE),
    (0xC62F, "CameraSerialNumber", ASCII),
];

#[cfg(feature = "tag-catalog")]
const CAPTURE_TAGS: &[(u16, &str, Rule)] = &[
    (0x829A, "ExposureTime", RATIONAL),
    (0x829D, "FNumber", RATIONAL),
    (0x8822, "ExposureProgram", SHORT),
    (0x8824, "SpectralSensitivity", ASCII),
    (0x8827, "ISOSpeedRatings", SHORT),
    (0x8828, "OECF", UNDEFINED),
    (0x8830, "SensitivityType", SHORT),
    (0x8831, "StandardOutputSensitivity", LONG),
    (0x8832, "RecommendedExposureIndex", LONG),
    (0x8833, "ISOSpeed", LONG),
    (0x8834, "ISOSpeedLatitudeyyy", LONG),
    (0x8835, "ISOSpeedLatitudezzz", LONG),
    (0x9000, "ExifVersion", VERSION),
    (0x9003, "DateTimeOriginal", ASCII),
    (0x9004, "DateTimeDigitized", ASCII),
    (0x9010, "OffsetTime", ASCII),
    (0x9011, "OffsetTimeOriginal", ASCII),
    (0x9012, "OffsetTimeDigitized", ASCII),
    (0x9101, "ComponentsConfiguration", UNDEFINED),
    (0x9102, "CompressedBitsPerPixel", RATIONAL),
    (0x9201, "ShutterSpeedValue", SRATIONAL),
    (0x9202, "ApertureValue", RATIONAL),
    (0x9203, "BrightnessValue", SRATIONAL),
    (0x9204, "ExposureBiasValue", SRATIONAL),
    (0x9205, "MaxApertureValue", RATIONAL),
    (0x9206, "SubjectDistance", RATIONAL),
    (0x9207, "MeteringMode", SHORT),
    (0x9208, "LightSource", SHORT),
    (0x9209, "Flash", SHORT),
    (0x920A, "FocalLength", RATIONAL),
    (0x9214, "SubjectArea", SHORT),
    (0x927C, "MakerNote", UNDEFINED),
    (0x9286, "UserComment", UNDEFINED),
    (0x9290, "SubSecTime", ASCII),
    (0x9291, "SubSecTimeOriginal", ASCII),
    (0x9292, "SubSecTimeDigitized", ASCII),
    (0x9400, "Temperature", SRATIONAL),
    (0x9401, "Humidity", RATIONAL),
    (0x9402, "Pressure", RATIONAL),
    (0x9403, "WaterDepth", SRATIONAL),
    (0x9404, "Acceleration", RATIONAL),
    (0x9405, "CameraElevationAngle", SRATIONAL),
    (0xA000, "FlashpixVersion", VERSION),
    (0xA001, "ColorSpace", SHORT),
    (0xA002, "PixelXDimension", SHORT_OR_LONG),
    (0xA003, "PixelYDimension", SHORT_OR_LONG),
    (0xA004, "RelatedSoundFile", ASCII),
    (0xA20B, "FlashEnergy", RATIONAL),
    (0xA20C, "SpatialFrequencyResponse", UNDEFINED),
    (0xA20E, "FocalPlaneXResolution", RATIONAL),
    (0xA20F, "FocalPlaneYResolution", RATIONAL),
    (0xA210, "FocalPlaneResolutionUnit", SHORT),
    (0xA214, "SubjectLocation", SHORT),
    (0xA215, "ExposureIndex", RATIONAL),
    (0xA217, "SensingMethod", SHORT),
    (0xA300, "FileSource", UNDEFINED),
    (0xA301, "SceneType", UNDEFINED),
    (0xA302, "CFAPattern", UNDEFINED),
    (0xA401, "CustomRendered", SHORT),
    (0xA402, "ExposureMode", SHORT),
    (0xA403, "WhiteBalance", SHORT),
    (0xA404, "DigitalZoomRatio", RATIONAL),
    (0xA405, "FocalLengthIn35mmFilm", SHORT),
    (0xA406, "SceneCaptureType", SHORT),
    (0xA407, "GainControl", SHORT),
    (0xA408, "Contrast", SHORT),
    (0xA409, "Saturation", SHORT),
    (0xA40A, "Sharpness", SHORT),
    (0xA40B, "DeviceSettingDescription", UNDEFINED),
    (0xA40C, "SubjectDistanceRange", SHORT),
    (0xA420, "ImageUniqueID", ASCII),
    (0xA430, "CameraOwnerName", ASCII),
    (0xA431, "BodySerialNumber", ASCII),
    (0xA432, "LensSpecification", RATIONAL),
    (0xA433, "LensMake", ASCII),
    (0xA434, "LensModel", ASCII),
    (0xA435, "LensSerialNumber", ASCII),
    (0xA500, "Gamma", RATIONAL),
];

#[cfg(feature = "tag-catalog")]
const LOCATION_TAGS: &[(u16, &str, Rule)] = &[
    (0x0000, "GPSVersionID", BYTE),
    (0x0001, "GPSLatitudeRef", ASCII),
    (0x0002, "GPSLatitude", RATIONAL),
    (0x0003, "GPSLongitudeRef", ASCII),
    (0x0004, "GPSLongitude", RATIONAL),
    (0x0005, "GPSAltitudeRef", BYTE),
    (0x0006, "GPSAltitude", RATIONAL),
    (0x0007, "GPSTimeStamp", RATIONAL),
    (0x0008, "GPSSatellites", ASCII),
    (0x0009, "GPSStatus", ASCII),
    (0x000A, "GPSMeasureMode", ASCII),
    (0x000B, "GPSDOP", RATIONAL),
    (0x000C, "GPSSpeedRef", ASCII),
    (0x000D, "GPSSpeed", RATIONAL),
    (0x000E, "GPSTrackRef", ASCII),
    (0x000F, "GPSTrack", RATIONAL),
    (0x0010, "GPSImgDirectionRef", ASCII),
    (0x0011, "GPSImgDirection", RATIONAL),
    (0x0012, "GPSMapDatum", ASCII),
    (0x0013, "GPSDestLatitudeRef", ASCII),
    (0x0014, "GPSDestLatitude", RATIONAL),
    (0x0015, "GPSDestLongitudeRef", ASCII),
    (0x0016, "GPSDestLongitude", RATIONAL),
    (0x0017, "GPSDestBearingRef", ASCII),
    (0x0018, "GPSDestBearing", RATIONAL),
    (0x0019, "GPSDestDistanceRef", ASCII),
    (0x001A, "GPSDestDistance", RATIONAL),
    (0x001B, "GPSProcessingMethod", UNDEFINED),
    (0x001C, "GPSAreaInformation", UNDEFINED),
    (0x001D, "GPSDateStamp", ASCII),
    (0x001E, "GPSDifferential", SHORT),
    (0x001F, "GPSHPositioningError", RATIONAL),
];

#[cfg(feature = "tag-catalog")]
const INTEROP_TAGS: &[(u16, &str, Rule)] = &[
    (0x0001, "InteroperabilityIndex", ASCII),
    (0x0002, "InteroperabilityVersion", VERSION),
    (0x1000, "RelatedImageFileFormat", ASCII),
    (0x1001, "RelatedImageWidth", SHORT_OR_LONG),
    (0x1002, "RelatedImageLength", SHORT_OR_LONG),
];

/// Names guaranteed even without the bundled table. Image directories only.
const FALLBACK_TAGS: &[(u16, &str, Rule)] = &[
    (TAG_IMAGE_WIDTH, "ImageWidth", SHORT_OR_LONG),
    (TAG_IMAGE_LENGTH, "ImageLength", SHORT_OR_LONG),
    (TAG_ORIENTATION, "Orientation", SHORT_OR_LONG),
];

#[derive(Debug, Clone, Copy)]
struct TagDef {
    name: &'static str,
    rule: Rule,
}

/// Read-only lookup from `(directory, tag)` to a name and a type rule.
///
/// Built once on first use and shared by every pipeline afterwards.
pub struct TagCatalog {
    defs: HashMap<(Directory, u16), TagDef>,
}

static CATALOG: LazyLock<TagCatalog> = LazyLock::new(TagCatalog::build);

impl TagCatalog {
    fn build() -> Self {
        let mut defs = HashMap::new();

        #[cfg(feature = "tag-catalog")]
        {
            let tables = [
                (Directory::Primary, IMAGE_TAGS),
                (Directory::Thumbnail, IMAGE_TAGS),
                (Directory::Capture, CAPTURE_TAGS),
                (Directory::Location, LOCATION_TAGS),
                (Directory::Interop, INTEROP_TAGS),
            ];
            for (dir, table) in tables {
                for &(tag, name, rule) in table {
                    defs.insert((dir, tag), TagDef { name, rule });
                }
            }
        }

        // Bundled entries win; the fallback only fills gaps
        for dir in [Directory::Primary, Directory::Thumbnail] {
            for &(tag, name, rule) in FALLBACK_TAGS {
                defs.entry((dir, tag)).or_insert(TagDef { name, rule });
            }
        }

        log::debug!("Tag catalog built with {} entries", defs.len());
        Self { defs }
    }

    /// Number of named tags across all directories.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Resolved name, or `None` when the tag is unknown in that directory.
    pub fn lookup(&self, directory: Directory, tag: u16) -> Option<&'static str> {
        self.defs.get(&(directory, tag)).map(|d| d.name)
    }

    /// Display name for a tag, falling back to its decimal ID.
    pub fn name_for(&self, directory: Directory, tag: u16) -> Cow<'static, str> {
        match self.lookup(directory, tag) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(tag.to_string()),
        }
    }

    /// Whether an entry of `type_code` may be admitted for this tag.
    /// Unknown tags accept any type the codec can represent.
    pub fn accepts(&self, directory: Directory, tag: u16, type_code: u16) -> bool {
        match self.defs.get(&(directory, tag)) {
            Some(def) => def.rule.is_empty() || def.rule.contains(&type_code),
            None => true,
        }
    }
}

/// The process-wide catalog.
pub fn catalog() -> &'static TagCatalog {
    &CATALOG
}

/// Display name for a tag. See [`TagCatalog::name_for`].
pub fn name_for(directory: Directory, tag: u16) -> Cow<'static, str> {
    catalog().name_for(directory, tag)
}

/// Tags the codec derives from container structure rather than storing as fields.
pub(crate) fn is_structural(directory: Directory, tag: u16) -> bool {
    match directory {
        Directory::Primary => tag == TAG_EXIF_POINTER || tag == TAG_GPS_POINTER,
        Directory::Capture => tag == TAG_INTEROP_POINTER,
        Directory::Thumbnail => tag == TAG_THUMBNAIL_OFFSET || tag == TAG_THUMBNAIL_LENGTH,
        Directory::Location | Directory::Interop => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::container::{TYPE_ASCII, TYPE_UNDEFINED};

    #[test]
    fn guaranteed_names_resolve() {
        assert_eq!(name_for(Directory::Primary, TAG_IMAGE_WIDTH), "ImageWidth");
        assert_eq!(name_for(Directory::Primary, TAG_IMAGE_LENGTH), "ImageLength");
        assert_eq!(name_for(Directory::Primary, TAG_ORIENTATION), "Orientation");
        assert_eq!(name_for(Directory::Thumbnail, TAG_ORIENTATION), "Orientation");
    }

    #[test]
    fn unknown_tags_fall_back_to_decimal() {
        assert_eq!(name_for(Directory::Primary, 0xFEED), "65261");
        // Fallback names never leak into unrelated namespaces
        assert_eq!(name_for(Directory::Location, TAG_ORIENTATION), "274");
    }

    #[cfg(feature = "tag-catalog")]
    #[test]
    fn bundled_names_are_per_directory() {
        assert_eq!(name_for(Directory::Primary, 0x010F), "Make");
        assert_eq!(name_for(Directory::Location, 0x0002), "GPSLatitude");
        assert_eq!(name_for(Directory::Capture, 0x829D), "FNumber");
        assert_eq!(name_for(Directory::Interop, 0x0001), "InteroperabilityIndex");
        // Tag 1 means different things in different directories
        assert_eq!(name_for(Directory::Location, 0x0001), "GPSLatitudeRef");
    }

    #[cfg(not(feature = "tag-catalog"))]
    #[test]
    fn without_bundled_table_only_fallback_names() {
        assert_eq!(catalog().len(), 6);
        assert_eq!(name_for(Directory::Primary, 0x010F), "271");
    }

    #[test]
    fn type_rules() {
        let cat = catalog();
        assert!(cat.accepts(Directory::Primary, TAG_ORIENTATION, TYPE_SHORT));
        assert!(cat.accepts(Directory::Primary, TAG_ORIENTATION, TYPE_LONG));
        assert!(!cat.accepts(Directory::Primary, TAG_ORIENTATION, TYPE_ASCII));
        assert!(cat.accepts(Directory::Primary, TAG_IMAGE_WIDTH, TYPE_LONG));
        // Unknown tags are not type-checked
        assert!(cat.accepts(Directory::Primary, 0xFEED, TYPE_UNDEFINED));
    }

    #[test]
    fn structural_tags() {
        assert!(is_structural(Directory::Primary, TAG_EXIF_POINTER));
        assert!(is_structural(Directory::Capture, TAG_INTEROP_POINTER));
        assert!(!is_structural(Directory::Capture, TAG_EXIF_POINTER));
        assert!(is_structural(Directory::Thumbnail, TAG_THUMBNAIL_OFFSET));
        assert!(!is_structural(Directory::Primary, TAG_THUMBNAIL_OFFSET));
    }
}
