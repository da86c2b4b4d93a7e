//! ZIP archive streaming and extraction.
//!
//! This module reads ZIP archives sequentially from a byte stream and
//! materializes them on disk without ever holding the whole archive in
//! memory.
//!
//! ## Architecture
//!
//! The module is organized into three main components:
//!
//! - [`structures`]: Data structures representing ZIP format elements (local headers, entries)
//! - [`parser`]: Sequential parsing and decoding of entries from a byte stream
//! - [`extractor`]: Writing entries below a destination directory, with the zip-slip guard
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method, including sizes deferred to a data descriptor
//! - ZIP64 sizes in local headers and data descriptors
//! - CRC-32 verification of every entry
//!
//! ## Limitations
//!
//! - No encryption support
//! - No BZIP2, LZMA, or other compression methods
//! - A failing entry stops the run but earlier files are not rolled back

mod extractor;
mod parser;
mod structures;

pub use extractor::{ExtractionSummary, ZipExtractor, resolve_entry_path};
pub use parser::ZipStreamReader;
pub use structures::*;
