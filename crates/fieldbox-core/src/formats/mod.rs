//! # Formats Module
//!
//! On-disk representations: the top-level document and per-box data files.
//! File I/O lives in `store`; everything here is a pure transformation.

mod document;

pub use document::*;
