//! # exif-redact
//!
//! Selective EXIF redaction for photos. Decode the metadata container, review
//! its fields, keep only the ones you choose, bake the Orientation tag into the
//! pixels, and re-encode. Nothing is kept unless you ask for it.
//!
//! ## Quick Start
//!
//! The [`pipeline`] module handles the full decode → select → transform → encode flow:
//!
//! ```rust,no_run
//! use exif_redact::fields::{Preset, SelectionMap};
//! use exif_redact::pipeline::{OutputOptions, Redaction, collect_images};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Collect supported image files from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./photos")]);
//!
//!     for path in &images {
//!         let bytes = std::fs::read(path)?;
//!         let redaction = Redaction::open(path.to_str(), &bytes)?;
//!
//!         // Strip location and timestamps, keep everything else
//!         let selection = Preset::Safe.apply(redaction.fields());
//!
//!         let options = OutputOptions { include_report: true, ..OutputOptions::default() };
//!         let output = redaction.finish(&selection, &options)?;
//!         std::fs::write(path.with_file_name(&output.file_name), &output.bytes)?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The container codec, projector and orientation transform can be used on their own:
//!
//! ```rust,no_run
//! use exif_redact::exif;
//! use exif_redact::fields::{self, SelectionMap};
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("photo.jpg")?;
//!
//! // 1. Decode; damaged metadata comes back empty rather than failing
//! let container = exif::decode(&bytes);
//!
//! // 2. Review
//! for field in fields::project(&container) {
//!     println!("{} = {}", field.key(), field.value);
//! }
//!
//! // 3. Keep one field and write it back into the same carrier
//! let mut selection = SelectionMap::new();
//! selection.set("primary:Make".parse().unwrap(), false);
//! let rebuilt = fields::rebuild(&container, &selection, false);
//! let cleaned = exif::encode(&rebuilt, &bytes);
//! # let _ = cleaned;
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported Formats
//!
//! | Format | Input | Output |
//! |--------|-------|--------|
//! | JPEG (`.jpg`, `.jpeg`) | EXIF read | Kept fields re-embedded |
//! | PNG (`.png`) | EXIF read (`eXIf` chunk) | Always stripped |
//! | WebP (`.webp`) | EXIF read | Re-encoded as JPEG |
//!
//! ## Modules
//!
//! - [`exif`] — EXIF container codec and tag catalog
//! - [`fields`] — Field projection, selection maps and presets
//! - [`orientation`] — Orientation code to pixel transform
//! - [`pipeline`] — Per-image redaction pipeline and input discovery
//! - [`report`] — Redaction report document
//! - [`config`] — Remembered preferences for front ends

pub mod config;
pub mod error;
pub mod exif;
pub mod fields;
pub mod orientation;
pub mod pipeline;
pub mod report;

pub use error::{Error, Result};
