use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::exif::{self, MetadataContainer};
use crate::fields::{self, Field, SelectionMap};
use crate::orientation::{self, Orientation};
use crate::report::RedactionReport;

/// Supported input extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const DEFAULT_STEM: &str = "cleaned-photo";
pub const DEFAULT_QUALITY: u8 = 92;
const MIN_QUALITY: u8 = 70;
const MAX_QUALITY: u8 = 100;

/// Requested output format.
///
/// `Same` keeps PNG input as PNG; everything else becomes JPEG.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Same,
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Concrete format for an input detected as `input`.
    pub fn resolve(self, input: Option<ImageFormat>) -> EncodedFormat {
        match self {
            OutputFormat::Jpeg => EncodedFormat::Jpeg,
            OutputFormat::Png => EncodedFormat::Png,
            OutputFormat::Same if input == Some(ImageFormat::Png) => EncodedFormat::Png,
            OutputFormat::Same => EncodedFormat::Jpeg,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "same" => Ok(OutputFormat::Same),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unknown output format '{other}' (expected same, jpeg or png)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Same => "same",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        })
    }
}

/// The format output bytes are actually encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodedFormat {
    Jpeg,
    Png,
}

impl EncodedFormat {
    /// Whether kept fields can be written back into this format.
    ///
    /// Only JPEG output carries an EXIF container; PNG output is always stripped.
    pub fn carries_metadata(self) -> bool {
        matches!(self, EncodedFormat::Jpeg)
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodedFormat::Jpeg => "jpg",
            EncodedFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            EncodedFormat::Jpeg => "image/jpeg",
            EncodedFormat::Png => "image/png",
        }
    }
}

/// Caller choices applied when the pipeline resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// 1–100; clamped to 70–100 before encoding.
    pub quality: u8,
    pub include_report: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Same,
            quality: DEFAULT_QUALITY,
            include_report: false,
        }
    }
}

pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Decoded,
    Projected,
    AwaitingSelection,
    Transformed,
    Recomposed,
    Encoded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One image, decoded and projected, waiting for the caller's selection.
///
/// [`Redaction::open`] runs decode and projection, then stops. The caller
/// reviews [`fields`](Redaction::fields), builds a [`SelectionMap`] (and may
/// re-filter with [`after`](Redaction::after) as often as it likes), then calls
/// [`finish`](Redaction::finish). Dropping a `Redaction` abandons it.
///
/// # Example
///
/// ```rust,no_run
/// use exif_redact::fields::SelectionMap;
/// use exif_redact::pipeline::{OutputOptions, Redaction};
///
/// # fn example() -> anyhow::Result<()> {
/// let bytes = std::fs::read("photo.jpg")?;
/// let redaction = Redaction::open(Some("photo.jpg"), &bytes)?;
///
/// let mut selection = SelectionMap::new();
/// for field in redaction.fields() {
///     // Keep only the camera make
///     selection.set(field.key(), field.name != "Make");
/// }
///
/// let output = redaction.finish(&selection, &OutputOptions::default())?;
/// std::fs::write(&output.file_name, &output.bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Redaction {
    source_name: Option<String>,
    input_format: Option<ImageFormat>,
    image: DynamicImage,
    container: MetadataContainer,
    fields: Vec<Field>,
    orientation: Orientation,
}

impl Redaction {
    /// Decode `bytes` and project their metadata.
    ///
    /// Fails only when the bytes are not a readable image. Damaged metadata
    /// yields an empty field list.
    pub fn open(source_name: Option<&str>, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(Error::UnreadableInput)?;
        let input_format = image::guess_format(bytes).ok();
        let container = exif::decode(bytes);
        log::debug!(
            "{}: {}x{} {:?}, {} metadata entries",
            Stage::Decoded,
            image.width(),
            image.height(),
            input_format,
            container.len()
        );

        let fields = fields::project(&container);
        log::debug!("{}: {} fields", Stage::Projected, fields.len());

        let orientation = Orientation::from_container(&container);
        log::debug!("{}: orientation {}", Stage::AwaitingSelection, orientation.code());

        Ok(Self {
            source_name: source_name.map(str::to_string),
            input_format,
            image,
            container,
            fields,
            orientation,
        })
    }

    /// The "before" list.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The "after" list for `selection`. Pure re-filter of [`fields`](Self::fields).
    pub fn after(&self, selection: &SelectionMap) -> Vec<Field> {
        fields::kept_fields(&self.fields, selection)
    }

    pub fn container(&self) -> &MetadataContainer {
        &self.container
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn input_format(&self) -> Option<ImageFormat> {
        self.input_format
    }

    /// Width and height once orientation has been applied.
    pub fn preview_dimensions(&self) -> (u32, u32) {
        self.orientation
            .params()
            .output_dimensions(self.image.width(), self.image.height())
    }

    /// Resume with the caller's selection: reorient, rebuild, encode.
    pub fn finish(self, selection: &SelectionMap, options: &OutputOptions) -> Result<RedactionOutput> {
        let params = self.orientation.params();
        let reoriented = !params.is_identity();
        let image = orientation::apply_image(self.image, params);
        log::debug!(
            "{}: rotation {} flip_h {} flip_v {}",
            Stage::Transformed,
            params.rotation.degrees(),
            params.flip_horizontal,
            params.flip_vertical
        );

        let format = options.format.resolve(self.input_format);
        let quality = clamp_quality(options.quality);
        let rendered = render(&image, format, quality)?;

        let (bytes, container) = if format.carries_metadata() {
            let rebuilt = fields::rebuild(&self.container, selection, reoriented);
            log::debug!("{}: {} entries kept", Stage::Recomposed, rebuilt.len());
            (exif::encode(&rebuilt, &rendered), rebuilt)
        } else {
            log::debug!("{format:?} output cannot carry EXIF, stripping");
            (exif::strip_all(&rendered), MetadataContainer::empty())
        };
        log::debug!("{}: {} bytes as {format:?}", Stage::Encoded, bytes.len());

        let source_name = self.source_name.as_deref();
        let report = options.include_report.then(|| {
            RedactionReport::new(source_name, &SelectionMap::seeded(&self.fields, selection))
        });

        Ok(RedactionOutput {
            file_name: output_file_name(source_name, format),
            report_file_name: report_file_name(source_name),
            bytes,
            format,
            width: image.width(),
            height: image.height(),
            container,
            reoriented,
            report,
        })
    }
}

/// What a finished redaction produced.
#[derive(Debug)]
pub struct RedactionOutput {
    pub bytes: Vec<u8>,
    pub format: EncodedFormat,
    pub width: u32,
    pub height: u32,
    /// The container embedded in `bytes`; empty when nothing was kept.
    pub container: MetadataContainer,
    pub reoriented: bool,
    pub report: Option<RedactionReport>,
    pub file_name: String,
    pub report_file_name: String,
}

/// Decode, apply `selection` and encode in one call.
pub fn redact(
    source_name: Option<&str>,
    bytes: &[u8],
    selection: &SelectionMap,
    options: &OutputOptions,
) -> Result<RedactionOutput> {
    Redaction::open(source_name, bytes)?.finish(selection, options)
}

fn render(image: &DynamicImage, format: EncodedFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        EncodedFormat::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(Error::Encode)?;
        }
        EncodedFormat::Png => {
            image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(Error::Encode)?;
        }
    }
    Ok(buf)
}

fn stem(source_name: Option<&str>) -> String {
    source_name
        .and_then(|name| Path::new(name).file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}

/// `<stem>.clean.<jpg|png>`
pub fn output_file_name(source_name: Option<&str>, format: EncodedFormat) -> String {
    format!("{}.clean.{}", stem(source_name), format.extension())
}

/// `<stem>.redaction-report.json`
pub fn report_file_name(source_name: Option<&str>) -> String {
    format!("{}.redaction-report.json", stem(source_name))
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only JPEG, PNG and WebP files are kept.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
