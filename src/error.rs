use thiserror::Error;

/// Failures that cross the library boundary.
///
/// Everything confined to the metadata container degrades to an empty or
/// partial result instead of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    /// The carrier bytes do not decode as a supported image.
    #[error("could not process this file: {0}")]
    UnreadableInput(#[source] image::ImageError),
    /// The image encoder refused the rendered pixels.
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Structural problems inside an EXIF container.
///
/// Returned by [`parse_tiff`](crate::exif::parse_tiff). [`decode`](crate::exif::decode)
/// never returns it; it falls back to the empty container instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMetadata {
    #[error("invalid TIFF header")]
    BadHeader,
    #[error("{0} directory offset {1} is out of bounds")]
    OffsetOutOfBounds(&'static str, usize),
    #[error("{0} directory is truncated")]
    Truncated(&'static str),
    #[error("directory at offset {0} is referenced twice")]
    Cycle(usize),
}
