//! Template merging.
//!
//! Both dialects consume the same [`Timeline`]. A dialect reads the
//! layout of its templates and turns a timeline into [`Edit`]s over the
//! template text; [`merge`] conforms the timeline to the template's rate
//! and applies the edits.

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    ConversionSettings, FrameRate, OutputFormat, TemplateLayout, Timecode, Timeline,
};
use roxmltree::Document;

use crate::fcpxml::Fcpxml;
use crate::premiere::Xmeml;
use crate::splice::{self, Edit};
use crate::template::{parse_xml, TemplateDocument};

/// Largest rounding error, in template frames, accepted when a timeline
/// is moved to the template's rate.
pub const FRAME_TOLERANCE: f64 = 0.001;

/// An NLE template dialect.
pub trait TemplateDialect: Send + Sync {
    /// Dialect name for logs.
    fn name(&self) -> &'static str;

    /// Read the rate, media and lanes a template declares.
    fn read_layout(&self, doc: &Document<'_>) -> ConvertResult<TemplateLayout>;

    /// Edits that place `timeline` (already at the template's rate) into
    /// the template.
    fn edits(
        &self,
        doc: &Document<'_>,
        layout: &TemplateLayout,
        timeline: &Timeline,
        settings: &ConversionSettings,
    ) -> ConvertResult<Vec<Edit>>;
}

/// The dialect for an output format.
pub fn dialect_for(format: OutputFormat) -> &'static dyn TemplateDialect {
    match format {
        OutputFormat::Premiere => &Xmeml,
        OutputFormat::Davinci => &Fcpxml,
    }
}

/// Render `timeline` into `template`.
///
/// Only the parts of the template that describe the rewritten tracks
/// change; every other byte is copied from the template text.
pub fn merge(
    template: &TemplateDocument,
    timeline: &Timeline,
    settings: &ConversionSettings,
) -> ConvertResult<String> {
    let layout = template.layout();
    let dialect = dialect_for(template.format());
    let timeline = conform(timeline, layout.rate)?;
    warn_on_short_media(&timeline, layout);

    let doc = parse_xml(template.text())?;
    let edits = dialect.edits(&doc, layout, &timeline, settings)?;
    tracing::debug!(dialect = dialect.name(), edits = edits.len(), "Merging into template");

    let mut output = splice::apply(template.text(), edits)?;
    if template.has_bom() {
        output.insert(0, '\u{feff}');
    }
    Ok(output)
}

/// Re-express a timeline at another rate.
///
/// Every clip start, duration and source in-point must land within
/// [`FRAME_TOLERANCE`] of a whole frame at the target rate; otherwise
/// the clip's row is reported as `IncompatibleFrameRate`.
pub fn conform(timeline: &Timeline, rate: FrameRate) -> ConvertResult<Timeline> {
    let from = timeline.rate;
    if from == rate {
        return Ok(timeline.clone());
    }

    let mut conformed = Timeline::empty(rate);
    for clip in &timeline.clips {
        let convert = |field: &str, value: Timecode| -> ConvertResult<Timecode> {
            let (converted, error) = value.rescale(from, rate);
            if error > FRAME_TOLERANCE {
                return Err(ConvertError::IncompatibleFrameRate {
                    row: clip.row,
                    message: format!(
                        "{field} {} at {from} fps is {error:.3} frames off the {rate} fps frame grid",
                        value.format(from)
                    ),
                });
            }
            Ok(converted)
        };

        let mut clip = clip.clone();
        clip.start = convert("start", clip.start)?;
        clip.duration = convert("duration", clip.duration)?;
        clip.source_in = convert("in point", clip.source_in)?;
        conformed.clips.push(clip);
    }
    conformed.track_ends = timeline
        .track_ends
        .iter()
        .map(|(track, end)| (*track, end.rescale(from, rate).0))
        .collect();

    tracing::info!(from = %from, to = %rate, clips = conformed.clips.len(), "Conformed timeline rate");
    Ok(conformed)
}

fn warn_on_short_media(timeline: &Timeline, layout: &TemplateLayout) {
    for clip in &timeline.clips {
        let Some(length) = layout
            .media_by_id(&clip.media_id)
            .and_then(|media| media.duration_frames)
        else {
            continue;
        };
        if clip.source_out().to_frames() > length {
            tracing::warn!(
                row = clip.row,
                media = %clip.media_id,
                out = clip.source_out().to_frames(),
                length,
                "Clip runs past the end of its media"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvtoxml_timeline_model::{ColorLabel, TimelineClip};

    fn timeline(rate: FrameRate, frames: &[(u64, u64, u64)]) -> Timeline {
        let mut timeline = Timeline::empty(rate);
        for (i, &(start, duration, source_in)) in frames.iter().enumerate() {
            timeline.clips.push(TimelineClip {
                row: i + 1,
                track: 0,
                start: Timecode::from_frames(start),
                duration: Timecode::from_frames(duration),
                source_in: Timecode::from_frames(source_in),
                media_id: "file-1".to_string(),
                color: ColorLabel::Rose,
                speaker: String::new(),
                text: String::new(),
            });
        }
        let end = timeline.clips.iter().map(|c| c.end()).max().unwrap_or_default();
        timeline.track_ends.insert(0, end);
        timeline
    }

    #[test]
    fn test_same_rate_is_identity() {
        let original = timeline(FrameRate::FPS_30, &[(0, 10, 5)]);
        assert_eq!(conform(&original, FrameRate::FPS_30).unwrap(), original);
    }

    #[test]
    fn test_exact_conversion() {
        let original = timeline(FrameRate::FPS_60, &[(0, 60, 120), (60, 30, 600)]);
        let conformed = conform(&original, FrameRate::FPS_30).unwrap();
        assert_eq!(conformed.rate, FrameRate::FPS_30);
        assert_eq!(conformed.clips[1].start.to_frames(), 30);
        assert_eq!(conformed.clips[1].duration.to_frames(), 15);
        assert_eq!(conformed.clips[1].source_in.to_frames(), 300);
        assert_eq!(conformed.track_ends[&0].to_frames(), 45);
    }

    #[test]
    fn test_lossy_conversion_names_row() {
        let original = timeline(FrameRate::FPS_60, &[(0, 60, 0), (60, 31, 0)]);
        let err = conform(&original, FrameRate::FPS_30).unwrap_err();
        match err {
            ConvertError::IncompatibleFrameRate { row, message } => {
                assert_eq!(row, 2);
                assert!(message.contains("duration"), "{message}");
            }
            other => panic!("expected incompatible rate, got {other:?}"),
        }
    }

    #[test]
    fn test_dialect_selection() {
        assert_eq!(dialect_for(OutputFormat::Premiere).name(), "xmeml");
        assert_eq!(dialect_for(OutputFormat::Davinci).name(), "fcpxml");
    }
}
