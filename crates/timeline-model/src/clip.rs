//! Timeline output types: lane assignments and placed clips.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::ColorLabel;
use crate::timecode::{FrameRate, Timecode};

/// Where one segment goes: a lane, and for non-gap segments a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAssignment {
    /// 1-based CSV data row of the segment.
    pub row: usize,

    /// Target lane (index into the template's lane list).
    pub track: usize,

    /// Declared media source id; `None` for gaps.
    pub media_id: Option<String>,
}

/// One placed reference to source media on a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineClip {
    /// 1-based CSV data row this clip came from.
    pub row: usize,

    /// Lane index.
    pub track: usize,

    /// Timeline position of the first frame.
    pub start: Timecode,

    /// Clip length.
    pub duration: Timecode,

    /// In-point within the source media.
    pub source_in: Timecode,

    /// Declared media source id.
    pub media_id: String,

    pub color: ColorLabel,

    pub speaker: String,

    /// Transcript text, written as a marker annotation.
    pub text: String,
}

impl TimelineClip {
    pub fn end(&self) -> Timecode {
        self.start + self.duration
    }

    pub fn source_out(&self) -> Timecode {
        self.source_in + self.duration
    }
}

/// The builder's output: clips in row order plus each lane's final cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    /// Rate all positions are counted at.
    pub rate: FrameRate,

    /// Clips in CSV row order.
    pub clips: Vec<TimelineClip>,

    /// Final cursor per touched lane, trailing gaps included.
    pub track_ends: BTreeMap<usize, Timecode>,
}

impl Timeline {
    pub fn empty(rate: FrameRate) -> Self {
        Self {
            rate,
            clips: Vec::new(),
            track_ends: BTreeMap::new(),
        }
    }

    /// Overall length: the furthest lane end.
    pub fn duration(&self) -> Timecode {
        self.track_ends.values().copied().max().unwrap_or_default()
    }

    /// Clips on one lane, in timeline order.
    pub fn clips_on(&self, track: usize) -> impl Iterator<Item = &TimelineClip> {
        self.clips.iter().filter(move |clip| clip.track == track)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
