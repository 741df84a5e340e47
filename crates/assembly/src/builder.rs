//! Timeline layout: per-lane cursors over the ordered segment list.
//!
//! Every lane keeps its own cursor. A clip starts at its lane's cursor
//! and moves it forward by the clip's duration; a gap moves the cursor
//! without emitting anything. Lanes never influence each other.

use std::collections::BTreeMap;

use anyhow::anyhow;
use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    timecode, ColorLabel, FrameRate, GapSegment, Segment, Timecode, Timeline, TimelineClip,
    TrackAssignment,
};

/// Timing parameters for [`build`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Rate every timecode in the segments is counted at.
    pub rate: FrameRate,

    /// Gap length used when a gap row has no usable span.
    pub gap_seconds: f64,

    /// Empty time inserted before a clip whose color differs from the
    /// previous clip on the same lane.
    pub block_spacing_seconds: f64,
}

impl BuildOptions {
    pub fn new(rate: FrameRate, gap_seconds: f64) -> Self {
        Self {
            rate,
            gap_seconds,
            block_spacing_seconds: 0.0,
        }
    }
}

#[derive(Default)]
struct LaneState {
    cursor: Timecode,
    last_color: Option<ColorLabel>,
}

/// Lay out `segments` using the parallel `assignments`.
pub fn build(
    segments: &[Segment],
    assignments: &[TrackAssignment],
    options: &BuildOptions,
) -> ConvertResult<Timeline> {
    if segments.len() != assignments.len() {
        return Err(ConvertError::Other(anyhow!(
            "{} segments but {} lane assignments",
            segments.len(),
            assignments.len()
        )));
    }

    let rate = options.rate;
    let default_gap = Timecode::from_seconds(options.gap_seconds, rate);
    let block_spacing = Timecode::from_seconds(options.block_spacing_seconds, rate);

    let mut lanes: BTreeMap<usize, LaneState> = BTreeMap::new();
    let mut clips = Vec::new();
    let mut gaps = 0usize;
    let mut skipped = 0usize;

    for (segment, assignment) in segments.iter().zip(assignments) {
        match segment {
            Segment::Gap(gap) => {
                let length = gap_length(gap, default_gap, rate)?;
                lanes.entry(assignment.track).or_default().cursor += length;
                gaps += 1;
            }
            Segment::Clip(clip) => {
                let length = timecode::duration(clip.in_point, clip.out_point).map_err(|_| {
                    ConvertError::InvalidRange {
                        row: clip.row,
                        in_point: clip.in_point.format(rate),
                        out_point: clip.out_point.format(rate),
                    }
                })?;
                let media_id = assignment.media_id.clone().ok_or_else(|| {
                    ConvertError::Other(anyhow!("row {} has no media assignment", clip.row))
                })?;

                let lane = lanes.entry(assignment.track).or_default();
                if length.is_zero() {
                    tracing::warn!(
                        row = clip.row,
                        timecode = %clip.in_point.format(rate),
                        "Skipping zero-length clip"
                    );
                    skipped += 1;
                    continue;
                }

                if lane.last_color.is_some_and(|color| color != clip.color) {
                    lane.cursor += block_spacing;
                }
                lane.last_color = Some(clip.color);

                clips.push(TimelineClip {
                    row: clip.row,
                    track: assignment.track,
                    start: lane.cursor,
                    duration: length,
                    source_in: clip.in_point,
                    media_id,
                    color: clip.color,
                    speaker: clip.speaker.clone(),
                    text: clip.text.clone(),
                });
                lane.cursor += length;
            }
        }
    }

    let track_ends: BTreeMap<usize, Timecode> = lanes
        .into_iter()
        .map(|(track, lane)| (track, lane.cursor))
        .collect();

    let timeline = Timeline {
        rate,
        clips,
        track_ends,
    };
    tracing::info!(
        clips = timeline.clips.len(),
        gaps,
        skipped,
        lanes = timeline.track_ends.len(),
        duration = %timeline.duration().format(rate),
        "Built timeline"
    );
    Ok(timeline)
}

fn gap_length(gap: &GapSegment, default: Timecode, rate: FrameRate) -> ConvertResult<Timecode> {
    let Some((in_point, out_point)) = gap.span else {
        return Ok(default);
    };
    let length =
        timecode::duration(in_point, out_point).map_err(|_| ConvertError::InvalidRange {
            row: gap.row,
            in_point: in_point.format(rate),
            out_point: out_point.format(rate),
        })?;
    Ok(if length.is_zero() { default } else { length })
}
