//! Lay out a conversion without merging or writing it.

use std::path::PathBuf;

use csvtoxml_common::config::AppConfig;
use csvtoxml_timeline_model::{FrameRate, Lane, MediaSource, Timeline, TimelineClip};
use csvtoxml_xml_export::{prepare, ConversionJob};
use serde::Serialize;

use super::SettingsArgs;

/// JSON form of a planned conversion.
#[derive(Serialize)]
struct PlanReport<'a> {
    format: String,
    rate: String,
    duration_frames: u64,
    duration: String,
    media: &'a [MediaSource],
    lanes: &'a [Lane],
    timeline: &'a Timeline,
}

pub fn run(
    csv: PathBuf,
    template: PathBuf,
    json: bool,
    args: &SettingsArgs,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let settings = args.resolve(config)?;
    let job = ConversionJob::new(csv, template, settings);
    let prepared = prepare(&job).map_err(|e| anyhow::anyhow!("Planning failed: {e}"))?;

    let timeline = &prepared.timeline;
    let layout = prepared.template.layout();
    let rate = timeline.rate;

    if json {
        let report = PlanReport {
            format: job.settings.format.to_string(),
            rate: rate.to_string(),
            duration_frames: timeline.duration().to_frames(),
            duration: timeline.duration().format(rate),
            media: &layout.media,
            lanes: &layout.lanes,
            timeline,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Timeline: {} clip(s) on {} lane(s) @ {} fps, {}",
        timeline.clips.len(),
        timeline.track_ends.len(),
        rate,
        timeline.duration().format(rate)
    );
    if rate != layout.rate {
        println!("  Template rate: {} fps (positions are conformed on merge)", layout.rate);
    }
    println!();

    for (lane, end) in &timeline.track_ends {
        println!("Lane {lane} (ends {}):", end.format(rate));
        for clip in timeline.clips_on(*lane) {
            println!("  {}", describe(clip, layout.media_by_id(&clip.media_id), rate));
        }
    }
    println!("\nOutput would be written to: {}", job.output_path().display());

    Ok(())
}

fn describe(clip: &TimelineClip, media: Option<&MediaSource>, rate: FrameRate) -> String {
    let name = media.map_or(clip.media_id.as_str(), |m| m.name.as_str());
    let speaker = if clip.speaker.is_empty() {
        String::new()
    } else {
        format!(" {}:", clip.speaker)
    };
    format!(
        "row {:>3}  {} +{}  {} [{} - {}] {}{} {}",
        clip.row,
        clip.start.format(rate),
        clip.duration.format(rate),
        name,
        clip.source_in.format(rate),
        clip.source_out().format(rate),
        clip.color,
        speaker,
        clip.text
    )
}
