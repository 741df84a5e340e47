//! Track resolution: which lane and media each segment uses.
//!
//! Rows that name a source file are matched against the template's
//! declared media by exact name. Everything else follows a
//! [`FallbackPolicy`]. Gaps never reference media; they only pick the
//! lane whose cursor they advance.

use std::collections::HashMap;

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    FallbackPolicy, MediaSource, Segment, TemplateLayout, TrackAssignment,
};

/// Assign a lane (and, for clips, a media source) to every segment.
///
/// The result is parallel to `segments`.
pub fn resolve(
    segments: &[Segment],
    layout: &TemplateLayout,
    policy: FallbackPolicy,
) -> ConvertResult<Vec<TrackAssignment>> {
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    if layout.lanes.is_empty() {
        return Err(ConvertError::template(
            "template has no track with a clip to place new clips on",
        ));
    }

    let mut fallback = FallbackLanes::new(policy, layout.lanes.len());
    let mut lanes: Vec<Option<usize>> = Vec::with_capacity(segments.len());
    let mut media: Vec<Option<String>> = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment {
            Segment::Clip(clip) => {
                let policy_lane = fallback.next(&clip.speaker);
                let (lane, media_id) = match clip.source_file.as_deref() {
                    Some(name) => {
                        let source = lookup(layout, clip.row, name)?;
                        let lane = layout
                            .lane_homed_on(&source.id)
                            .map(|lane| lane.index)
                            .unwrap_or(policy_lane);
                        (lane, source.id.clone())
                    }
                    None => (policy_lane, home_media(layout, policy_lane)?),
                };
                lanes.push(Some(lane));
                media.push(Some(media_id));
            }
            Segment::Gap(gap) => {
                let lane = match gap.source_file.as_deref() {
                    Some(name) => {
                        let source = lookup(layout, gap.row, name)?;
                        layout.lane_homed_on(&source.id).map(|lane| lane.index)
                    }
                    None => None,
                };
                lanes.push(lane);
                media.push(None);
            }
        }
    }

    let assignments: Vec<TrackAssignment> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| TrackAssignment {
            row: segment.row(),
            track: lanes[i].unwrap_or_else(|| gap_lane(&lanes, segments, i)),
            media_id: media[i].take(),
        })
        .collect();

    tracing::debug!(
        segments = assignments.len(),
        lanes = layout.lanes.len(),
        policy = %policy,
        "Resolved lanes"
    );
    Ok(assignments)
}

fn lookup<'a>(
    layout: &'a TemplateLayout,
    row: usize,
    name: &str,
) -> ConvertResult<&'a MediaSource> {
    layout
        .media_by_name(name)
        .ok_or_else(|| ConvertError::UnknownMediaSource {
            row,
            name: name.to_string(),
        })
}

/// Media a fallback-assigned clip on `lane` references.
fn home_media(layout: &TemplateLayout, lane: usize) -> ConvertResult<String> {
    layout
        .lanes
        .get(lane)
        .and_then(|lane| lane.home_media.clone())
        .or_else(|| layout.media.first().map(|media| media.id.clone()))
        .ok_or_else(|| ConvertError::template("template declares no media sources"))
}

/// Lane for a gap without an explicit source: the next clip's lane, else
/// the previous clip's lane, else lane 0.
fn gap_lane(lanes: &[Option<usize>], segments: &[Segment], index: usize) -> usize {
    let clip_lane = |i: usize| {
        if segments[i].is_gap() {
            None
        } else {
            lanes[i]
        }
    };
    (index + 1..segments.len())
        .find_map(clip_lane)
        .or_else(|| (0..index).rev().find_map(clip_lane))
        .unwrap_or(0)
}

/// Lane sequence for rows without a source file.
struct FallbackLanes<'a> {
    policy: FallbackPolicy,
    lane_count: usize,
    clips_seen: usize,
    speakers: HashMap<&'a str, usize>,
}

impl<'a> FallbackLanes<'a> {
    fn new(policy: FallbackPolicy, lane_count: usize) -> Self {
        Self {
            policy,
            lane_count,
            clips_seen: 0,
            speakers: HashMap::new(),
        }
    }

    /// Lane for the next clip row, in row order.
    fn next(&mut self, speaker: &'a str) -> usize {
        let ordinal = self.clips_seen;
        self.clips_seen += 1;
        match self.policy {
            FallbackPolicy::FirstTrack => 0,
            FallbackPolicy::RoundRobin => ordinal % self.lane_count,
            FallbackPolicy::Speaker => {
                let next_index = self.speakers.len();
                let index = *self.speakers.entry(speaker).or_insert(next_index);
                index % self.lane_count
            }
        }
    }
}
