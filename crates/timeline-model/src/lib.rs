//! csvtoxml Timeline Model
//!
//! Defines the core data contracts for a conversion:
//! - **Timecode:** `HH:MM:SS:FF` parsing and frame arithmetic at one rate
//! - **Color:** The fixed label set and `GAP_<N>` tags
//! - **Segment:** One validated CSV row
//! - **Clip:** Lane assignments and placed timeline clips
//! - **Template:** Media sources and lanes a template declares
//!
//! This crate is pure data; it performs no I/O.

pub mod clip;
pub mod color;
pub mod segment;
pub mod settings;
pub mod template;
pub mod timecode;

pub use clip::*;
pub use color::*;
pub use segment::*;
pub use settings::*;
pub use template::*;
pub use timecode::*;
