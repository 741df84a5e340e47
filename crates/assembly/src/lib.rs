//! csvtoxml Assembly — CSV rows to a laid-out timeline
//!
//! Turns edit-decision rows into placed clips:
//! - **Rows:** Header mapping and per-row validation into typed segments
//! - **Resolver:** Lane and media assignment for every segment
//! - **Builder:** Per-lane cursors, gaps, and clip placement
//!
//! Apart from [`rows::read_rows`], which reads from any `Read`, this crate
//! is pure computation.

pub mod builder;
pub mod resolver;
pub mod rows;

pub use builder::{build, BuildOptions};
pub use resolver::resolve;
pub use rows::{parse_csv, parse_row, parse_rows, read_rows, RawRow};

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{ConversionSettings, TemplateLayout, Timeline};

/// Run rows through parsing, lane resolution and layout.
///
/// Timecodes are read at the configured frame rate, or at the template's
/// own rate when none is configured.
pub fn plan(
    rows: &[RawRow],
    layout: &TemplateLayout,
    settings: &ConversionSettings,
) -> ConvertResult<Timeline> {
    settings
        .validate()
        .map_err(|e| ConvertError::config(e.to_string()))?;

    let rate = settings.frame_rate.unwrap_or(layout.rate);
    let segments = parse_rows(rows, rate)?;
    let assignments = resolve(&segments, layout, settings.fallback)?;
    let options = BuildOptions {
        rate,
        gap_seconds: settings.gap_seconds,
        block_spacing_seconds: settings.block_spacing_seconds,
    };
    build(&segments, &assignments, &options)
}
