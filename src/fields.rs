//! Field projection and selection.
//!
//! [`project`] flattens a [`MetadataContainer`] into the list of fields a user
//! can review; [`rebuild`] goes the other way, producing a new container that
//! holds only the fields the user chose to keep.
//!
//! Selection is keyed by `directory:Name` ([`FieldKey`]), not by numeric tag,
//! so two tags that resolve to the same name in one directory toggle together.
//! Keys missing from a [`SelectionMap`] are always stripped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::exif::{self, Directory, FieldValue, MetadataContainer, TAG_ORIENTATION};

const CAMERA_MARKERS: &[&str] = &["Make", "Model", "FNumber", "Focal", "Exposure", "Shutter", "ISO"];
const ATTRIBUTION_MARKERS: &[&str] = &["Software", "Artist", "Copyright"];

/// Selection identity of a field: its directory plus resolved name.
///
/// Written as `directory:Name`, e.g. `primary:Make` or `location:GPSLatitude`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FieldKey {
    directory: Directory,
    name: String,
}

impl FieldKey {
    pub fn new(directory: Directory, name: impl Into<String>) -> Self {
        Self {
            directory,
            name: name.into(),
        }
    }

    pub fn directory(&self) -> Directory {
        self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.directory, self.name)
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dir, name) = s
            .split_once(':')
            .ok_or_else(|| format!("field key '{s}' must look like directory:Name"))?;
        if name.is_empty() {
            return Err(format!("field key '{s}' has no name"));
        }
        Ok(Self::new(dir.parse()?, name))
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for FieldKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Display grouping for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Location,
    Time,
    Camera,
    Attribution,
    Orientation,
    Other,
}

impl Category {
    fn of(key: &str) -> Self {
        let has_any = |markers: &[&str]| markers.iter().any(|m| key.contains(m));
        if key.contains("GPS") {
            Category::Location
        } else if key.contains("DateTime") {
            Category::Time
        } else if has_any(CAMERA_MARKERS) {
            Category::Camera
        } else if has_any(ATTRIBUTION_MARKERS) {
            Category::Attribution
        } else if key.contains("Orientation") {
            Category::Orientation
        } else {
            Category::Other
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One reviewable metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub directory: Directory,
    pub tag: u16,
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn key(&self) -> FieldKey {
        FieldKey::new(self.directory, self.name.clone())
    }

    pub fn category(&self) -> Category {
        Category::of(&self.key().to_string())
    }
}

/// Per-field strip intent. `true` means strip.
///
/// Anything not in the map is stripped: preservation is opt-in.
///
/// # Example
///
/// ```rust
/// use exif_redact::exif::Directory;
/// use exif_redact::fields::{FieldKey, SelectionMap};
///
/// let make = FieldKey::new(Directory::Primary, "Make");
/// let mut selection = SelectionMap::new();
/// selection.set(make.clone(), false);
///
/// assert!(!selection.is_stripped(&make));
/// assert!(selection.is_stripped(&"location:GPSLatitude".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionMap {
    entries: BTreeMap<FieldKey, bool>,
}

impl SelectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `saved` and mark every projected field it does not mention for stripping.
    pub fn seeded(fields: &[Field], saved: &SelectionMap) -> Self {
        let mut map = saved.clone();
        for field in fields {
            map.entries.entry(field.key()).or_insert(true);
        }
        map
    }

    pub fn set(&mut self, key: FieldKey, strip: bool) {
        self.entries.insert(key, strip);
    }

    pub fn get(&self, key: &FieldKey) -> Option<bool> {
        self.entries.get(key).copied()
    }

    pub fn is_stripped(&self, key: &FieldKey) -> bool {
        self.get(key).unwrap_or(true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, bool)> {
        self.entries.iter().map(|(k, &strip)| (k, strip))
    }

    /// Keys explicitly marked keep, in key order.
    pub fn kept_keys(&self) -> Vec<&FieldKey> {
        self.iter().filter(|(_, strip)| !strip).map(|(k, _)| k).collect()
    }

    /// Keys marked strip, in key order.
    pub fn removed_keys(&self) -> Vec<&FieldKey> {
        self.iter().filter(|(_, strip)| *strip).map(|(k, _)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(FieldKey, bool)> for SelectionMap {
    fn from_iter<I: IntoIterator<Item = (FieldKey, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Canned selections over a projected field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Strip everything.
    StripAll,
    /// Strip location and timestamps, keep the rest.
    Safe,
    /// Keep camera and attribution fields, strip the rest.
    KeepCamera,
}

impl Preset {
    pub fn apply(self, fields: &[Field]) -> SelectionMap {
        fields
            .iter()
            .map(|field| {
                let key = field.key();
                let text = key.to_string();
                let strip = match self {
                    Preset::StripAll => true,
                    Preset::Safe => text.contains("GPS") || text.contains("DateTime"),
                    Preset::KeepCamera => !CAMERA_MARKERS
                        .iter()
                        .chain(ATTRIBUTION_MARKERS)
                        .any(|m| text.contains(m)),
                };
                (key, strip)
            })
            .collect()
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strip-all" => Ok(Preset::StripAll),
            "safe" => Ok(Preset::Safe),
            "keep-camera" => Ok(Preset::KeepCamera),
            other => Err(format!(
                "unknown preset '{other}' (expected strip-all, safe or keep-camera)"
            )),
        }
    }
}

/// Flatten the user-facing directories into a field list.
///
/// Order: primary, capture, location, interop; ascending tag within each.
/// The thumbnail directory is never projected.
pub fn project(container: &MetadataContainer) -> Vec<Field> {
    Directory::USER_FACING
        .iter()
        .flat_map(|&directory| {
            container
                .directory(directory)
                .iter()
                .map(move |(&tag, value)| Field {
                    directory,
                    tag,
                    name: exif::name_for(directory, tag).into_owned(),
                    value: value.clone(),
                })
        })
        .collect()
}

/// Build a new container holding only the fields selected for keeping.
///
/// Values are copied unchanged. When `reoriented` is true the primary
/// Orientation entry is never copied, whatever the selection says, because the
/// rotation is already in the pixels. The thumbnail is never carried over.
pub fn rebuild(
    container: &MetadataContainer,
    selection: &SelectionMap,
    reoriented: bool,
) -> MetadataContainer {
    let mut out = MetadataContainer::with_byte_order(container.byte_order());
    for directory in Directory::USER_FACING {
        for (&tag, value) in container.directory(directory) {
            if reoriented && directory == Directory::Primary && tag == TAG_ORIENTATION {
                continue;
            }
            let key = FieldKey::new(directory, exif::name_for(directory, tag));
            if !selection.is_stripped(&key) {
                out.insert(directory, tag, value.clone());
            }
        }
    }
    out
}

/// The "after" view: projected fields the selection keeps.
pub fn kept_fields(fields: &[Field], selection: &SelectionMap) -> Vec<Field> {
    fields
        .iter()
        .filter(|f| !selection.is_stripped(&f.key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAKE: u16 = 0x010F;
    const GPS_LATITUDE: u16 = 0x0002;

    fn key(s: &str) -> FieldKey {
        s.parse().unwrap()
    }

    fn scenario_a() -> MetadataContainer {
        MetadataContainer::empty()
            .with_field(Directory::Primary, MAKE, FieldValue::ascii("Acme"))
            .with_field(Directory::Primary, TAG_ORIENTATION, FieldValue::Short(vec![6]))
            .with_field(Directory::Location, GPS_LATITUDE, FieldValue::Rational(vec![(40, 1)]))
    }

    // ── FieldKey ─────────────────────────────────────────────────────

    #[test]
    fn key_text_round_trip() {
        let k = key("location:GPSLatitude");
        assert_eq!(k.directory(), Directory::Location);
        assert_eq!(k.name(), "GPSLatitude");
        assert_eq!(k.to_string(), "location:GPSLatitude");
    }

    #[test]
    fn key_parse_errors() {
        assert!("Make".parse::<FieldKey>().is_err());
        assert!("primary:".parse::<FieldKey>().is_err());
        assert!("nowhere:Make".parse::<FieldKey>().is_err());
    }

    #[test]
    fn selection_map_serializes_as_key_strings() {
        let mut sel = SelectionMap::new();
        sel.set(key("primary:Make"), false);
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"primary:Make":false}"#);
        let back: SelectionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }

    // ── project ──────────────────────────────────────────────────────

    #[test]
    fn project_orders_by_directory_then_tag() {
        let c = scenario_a()
            .with_field(Directory::Capture, 0x829D, FieldValue::Rational(vec![(28, 10)]))
            .with_field(Directory::Thumbnail, 0x0103, FieldValue::Short(vec![6]));
        let fields = project(&c);
        let tags: Vec<(Directory, u16)> = fields.iter().map(|f| (f.directory, f.tag)).collect();
        assert_eq!(
            tags,
            vec![
                (Directory::Primary, MAKE),
                (Directory::Primary, TAG_ORIENTATION),
                (Directory::Capture, 0x829D),
                (Directory::Location, GPS_LATITUDE),
            ]
        );
    }

    #[test]
    fn project_empty_container() {
        assert!(project(&MetadataContainer::empty()).is_empty());
    }

    #[test]
    fn unnamed_tags_use_decimal_id() {
        let c = MetadataContainer::empty().with_field(Directory::Capture, 0xFEED, FieldValue::Long(vec![1]));
        assert_eq!(project(&c)[0].key(), key("capture:65261"));
    }

    // ── rebuild ──────────────────────────────────────────────────────

    #[cfg(feature = "tag-catalog")]
    #[test]
    fn scenario_a_keeps_only_make() {
        let mut sel = SelectionMap::new();
        sel.set(key("primary:Make"), false);

        let rebuilt = rebuild(&scenario_a(), &sel, true);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.get(Directory::Primary, MAKE), Some(&FieldValue::ascii("Acme")));
        assert!(rebuilt.directory(Directory::Location).is_empty());
        assert_eq!(rebuilt.get(Directory::Primary, TAG_ORIENTATION), None);
    }

    #[test]
    fn absent_keys_are_stripped() {
        assert!(rebuild(&scenario_a(), &SelectionMap::new(), false).is_empty());
    }

    #[test]
    fn kept_values_are_identical() {
        let c = scenario_a();
        let sel = project(&c).iter().map(|f| (f.key(), false)).collect();
        let rebuilt = rebuild(&c, &sel, false);
        assert_eq!(rebuilt, c);
    }

    #[test]
    fn orientation_dropped_after_reorientation_even_when_kept() {
        let mut sel = SelectionMap::new();
        sel.set(key("primary:Orientation"), false);

        let rebuilt = rebuild(&scenario_a(), &sel, true);
        assert_eq!(rebuilt.get(Directory::Primary, TAG_ORIENTATION), None);

        let untouched = rebuild(&scenario_a(), &sel, false);
        assert_eq!(
            untouched.get(Directory::Primary, TAG_ORIENTATION),
            Some(&FieldValue::Short(vec![6]))
        );
    }

    #[test]
    fn thumbnail_never_carried() {
        let c = scenario_a()
            .with_field(Directory::Thumbnail, 0x0103, FieldValue::Short(vec![6]))
            .with_thumbnail(vec![1, 2, 3]);
        let sel = SelectionMap::from_iter([(key("thumbnail:Compression"), false)]);
        let rebuilt = rebuild(&c, &sel, false);
        assert!(rebuilt.is_empty());
    }

    #[test]
    fn preserves_byte_order() {
        let c = MetadataContainer::with_byte_order(exif::ByteOrder::Little);
        assert_eq!(rebuild(&c, &SelectionMap::new(), false).byte_order(), exif::ByteOrder::Little);
    }

    // ── selection helpers ────────────────────────────────────────────

    #[test]
    fn seeded_keeps_saved_choices_and_strips_new_fields() {
        let fields = project(&scenario_a());
        let mut saved = SelectionMap::new();
        saved.set(fields[0].key(), false);
        saved.set(key("capture:LensModel"), false);

        let seeded = SelectionMap::seeded(&fields, &saved);
        assert_eq!(seeded.len(), 4);
        assert_eq!(seeded.get(&fields[0].key()), Some(false));
        assert_eq!(seeded.get(&fields[1].key()), Some(true));
        assert_eq!(seeded.get(&fields[2].key()), Some(true));
        assert_eq!(seeded.get(&key("capture:LensModel")), Some(false));
    }

    #[test]
    fn kept_fields_filters_the_before_list() {
        let fields = project(&scenario_a());
        let mut sel = SelectionMap::new();
        sel.set(fields[2].key(), false);
        sel.set(fields[0].key(), true);
        let after = kept_fields(&fields, &sel);
        assert_eq!(after, vec![fields[2].clone()]);
    }

    #[test]
    fn kept_and_removed_keys() {
        let sel: SelectionMap = [
            (key("primary:Make"), false),
            (key("location:GPSLatitude"), true),
        ]
        .into_iter()
        .collect();
        assert_eq!(sel.kept_keys(), vec![&key("primary:Make")]);
        assert_eq!(sel.removed_keys(), vec![&key("location:GPSLatitude")]);
    }

    // ── categories & presets ─────────────────────────────────────────

    fn field(dir: Directory, name: &str) -> Field {
        Field {
            directory: dir,
            tag: 0,
            name: name.to_string(),
            value: FieldValue::Short(vec![0]),
        }
    }

    #[test]
    fn key_ignores_numeric_tag() {
        let a = Field { tag: 0x0132, ..field(Directory::Primary, "DateTime") };
        let b = Field { tag: 0xFFFF, ..field(Directory::Primary, "DateTime") };
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), field(Directory::Capture, "DateTime").key());
    }

    #[test]
    fn categories() {
        assert_eq!(field(Directory::Location, "GPSLatitude").category(), Category::Location);
        assert_eq!(field(Directory::Capture, "DateTimeOriginal").category(), Category::Time);
        assert_eq!(field(Directory::Primary, "Make").category(), Category::Camera);
        assert_eq!(field(Directory::Capture, "FocalLength").category(), Category::Camera);
        assert_eq!(field(Directory::Primary, "Artist").category(), Category::Attribution);
        assert_eq!(field(Directory::Primary, "Orientation").category(), Category::Orientation);
        assert_eq!(field(Directory::Primary, "XResolution").category(), Category::Other);
    }

    #[test]
    fn presets() {
        let fields = vec![
            field(Directory::Primary, "Make"),
            field(Directory::Primary, "DateTime"),
            field(Directory::Location, "GPSLatitude"),
            field(Directory::Primary, "Copyright"),
            field(Directory::Primary, "XResolution"),
        ];
        let strip = |sel: &SelectionMap| -> Vec<bool> {
            fields.iter().map(|f| sel.is_stripped(&f.key())).collect()
        };

        assert_eq!(strip(&Preset::StripAll.apply(&fields)), vec![true; 5]);
        assert_eq!(
            strip(&Preset::Safe.apply(&fields)),
            vec![false, true, true, false, false]
        );
        assert_eq!(
            strip(&Preset::KeepCamera.apply(&fields)),
            vec![false, true, true, false, true]
        );
    }

    #[test]
    fn preset_names() {
        assert_eq!("keep-camera".parse::<Preset>(), Ok(Preset::KeepCamera));
        assert!("everything".parse::<Preset>().is_err());
    }
}
