//! csvtoxml XML Export — templates in, timelines out
//!
//! Places a laid-out [`Timeline`](csvtoxml_timeline_model::Timeline) into
//! an NLE template:
//! - **Template:** Loading a template and reading its rate, media and lanes
//! - **Merge:** Rate conforming and the dialect seam
//! - **Premiere:** XMEML clipitems cut from each track's own clips
//! - **FCPXML:** Spine rewriting for DaVinci Resolve
//! - **Job:** The end-to-end conversion and all-or-nothing output
//!
//! Templates are never re-serialized: edits are spliced into the original
//! text, so everything the conversion does not touch stays byte-identical.

pub mod fcpxml;
pub mod job;
pub mod merge;
pub mod premiere;
pub mod splice;
pub mod template;

pub use job::{
    default_output_path, prepare, run_conversion, write_atomic, ConversionJob, PreparedConversion,
};
pub use merge::{conform, dialect_for, merge, TemplateDialect};
pub use template::TemplateDocument;
