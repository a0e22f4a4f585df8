//! Orientation transform.
//!
//! Turns the EXIF Orientation code into rotation and mirroring, and applies it
//! to pixels so the image displays correctly once the tag is gone.
//!
//! The transform is: rotate clockwise about the centre, then mirror in the
//! rotated frame.

use image::DynamicImage;

use crate::exif::{Directory, MetadataContainer, TAG_ORIENTATION};

/// Clockwise rotation applied before mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl TransformParams {
    pub const IDENTITY: TransformParams = TransformParams {
        rotation: Rotation::None,
        flip_horizontal: false,
        flip_vertical: false,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True for quarter turns, where width and height trade places.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self.rotation, Rotation::Cw90 | Rotation::Cw270)
    }

    /// Output dimensions for a `width` x `height` input.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// EXIF orientation code, always within 1–8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation(u8);

impl Orientation {
    /// Codes outside 1–8 mean "no transform".
    pub fn from_code(code: u32) -> Self {
        match code {
            1..=8 => Orientation(code as u8),
            _ => Orientation(1),
        }
    }

    /// Orientation declared by a container's primary directory, 1 when absent.
    pub fn from_container(container: &MetadataContainer) -> Self {
        container
            .get(Directory::Primary, TAG_ORIENTATION)
            .and_then(|v| v.first_unsigned())
            .map_or(Orientation(1), Self::from_code)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn params(self) -> TransformParams {
        params_for(self.0 as u32)
    }
}

/// Rotation and mirroring for an orientation code.
///
/// | code | transform |
/// |------|-----------|
/// | 1 | none |
/// | 2 | flip horizontal |
/// | 3 | rotate 180 |
/// | 4 | flip vertical |
/// | 5 | rotate 90, then flip horizontal |
/// | 6 | rotate 90 |
/// | 7 | rotate 270, then flip horizontal |
/// | 8 | rotate 270 |
///
/// Any other code maps to code 1.
pub fn params_for(code: u32) -> TransformParams {
    let (rotation, flip_horizontal, flip_vertical) = match code {
        2 => (Rotation::None, true, false),
        3 => (Rotation::Cw180, false, false),
        4 => (Rotation::None, false, true),
        5 => (Rotation::Cw90, true, false),
        6 => (Rotation::Cw90, false, false),
        7 => (Rotation::Cw270, true, false),
        8 => (Rotation::Cw270, false, false),
        _ => (Rotation::None, false, false),
    };
    TransformParams {
        rotation,
        flip_horizontal,
        flip_vertical,
    }
}

/// Remap an interleaved pixel buffer (`channels` samples per pixel, row-major).
///
/// Nearest-pixel exact: every output pixel is a copy of one input pixel.
/// Returns the new buffer and its width and height.
pub fn apply<T: Copy>(
    pixels: &[T],
    channels: usize,
    width: u32,
    height: u32,
    params: TransformParams,
) -> (Vec<T>, u32, u32) {
    let (w, h) = (width as usize, height as usize);
    debug_assert_eq!(pixels.len(), w * h * channels);

    let (new_w, new_h) = params.output_dimensions(width, height);
    let (nw, nh) = (new_w as usize, new_h as usize);
    let mut out = Vec::with_capacity(pixels.len());

    for y in 0..nh {
        for x in 0..nw {
            // Undo the mirror first, then the rotation
            let rx = if params.flip_horizontal { nw - 1 - x } else { x };
            let ry = if params.flip_vertical { nh - 1 - y } else { y };
            let (sx, sy) = match params.rotation {
                Rotation::None => (rx, ry),
                Rotation::Cw90 => (ry, h - 1 - rx),
                Rotation::Cw180 => (w - 1 - rx, h - 1 - ry),
                Rotation::Cw270 => (w - 1 - ry, rx),
            };
            let src = (sy * w + sx) * channels;
            out.extend_from_slice(&pixels[src..src + channels]);
        }
    }

    (out, new_w, new_h)
}

/// Apply the transform to a decoded image, in the same rotate-then-mirror order.
pub fn apply_image(image: DynamicImage, params: TransformParams) -> DynamicImage {
    let rotated = match params.rotation {
        Rotation::None => image,
        Rotation::Cw90 => image.rotate90(),
        Rotation::Cw180 => image.rotate180(),
        Rotation::Cw270 => image.rotate270(),
    };
    let mirrored = if params.flip_horizontal {
        rotated.fliph()
    } else {
        rotated
    };
    if params.flip_vertical {
        mirrored.flipv()
    } else {
        mirrored
    }
}
