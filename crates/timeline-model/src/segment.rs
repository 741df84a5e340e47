//! Typed segments built from CSV rows.
//!
//! Segments keep CSV row order; the builder lays them out strictly in
//! that order.

use serde::{Deserialize, Serialize};

use crate::color::{ColorLabel, GapTag};
use crate::timecode::Timecode;

/// One validated CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// A transcript line that references source media.
    Clip(ClipSegment),
    /// A row that only reserves empty timeline time.
    Gap(GapSegment),
}

/// A media-referencing segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSegment {
    /// 1-based CSV data row.
    pub row: usize,

    /// Speaker name (may be empty).
    pub speaker: String,

    /// Explicit media source name, when the CSV has one for this row.
    pub source_file: Option<String>,

    /// Source in-point.
    pub in_point: Timecode,

    /// Source out-point (exclusive).
    pub out_point: Timecode,

    /// Transcript text.
    pub text: String,

    /// Label color.
    pub color: ColorLabel,
}

/// A gap row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapSegment {
    /// 1-based CSV data row.
    pub row: usize,

    /// The `GAP_<N>` tag from the color column.
    pub tag: GapTag,

    /// In/out span, when both timecodes were given.
    pub span: Option<(Timecode, Timecode)>,

    /// Transcript column, kept only as a descriptive label.
    pub label: String,

    /// Explicit media source, used only to pick the lane to extend.
    pub source_file: Option<String>,
}

impl Segment {
    pub fn row(&self) -> usize {
        match self {
            Self::Clip(clip) => clip.row,
            Self::Gap(gap) => gap.row,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Self::Gap(_))
    }

    pub fn source_file(&self) -> Option<&str> {
        match self {
            Self::Clip(clip) => clip.source_file.as_deref(),
            Self::Gap(gap) => gap.source_file.as_deref(),
        }
    }
}
