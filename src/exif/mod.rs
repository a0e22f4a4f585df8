//! EXIF container codec and tag catalog.
//!
//! This module provides the binary side of redaction:
//!
//! - [`decode`] — Parse the EXIF container embedded in JPEG, PNG or WebP bytes
//! - [`encode`] — Embed a (filtered) container into carrier image bytes
//! - [`strip_all`] — Remove the EXIF container altogether
//! - [`name_for`] — Resolve a numeric tag to a readable name
//!
//! Decoding never fails observably: damaged containers come back as
//! [`MetadataContainer::empty`]. Encoding never fails either: when a container
//! cannot be serialized the carrier is returned untouched.

mod container;
mod reader;
mod tags;
mod writer;

pub use container::{ByteOrder, Directory, Entries, FieldValue, MetadataContainer};
pub use reader::{decode, parse_tiff};
pub use tags::{TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH, TAG_ORIENTATION, TagCatalog, catalog, name_for};
pub use writer::{SerializeError, encode, serialize, strip_all};
