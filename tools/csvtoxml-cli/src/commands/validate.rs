//! Validate the rows of an edit CSV.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use csvtoxml_common::config::AppConfig;
use csvtoxml_timeline_model::{FrameRate, Segment, Timecode};

use super::parse_rate;

pub fn run(csv: PathBuf, frame_rate: Option<String>, config: &AppConfig) -> anyhow::Result<()> {
    println!("Validating CSV at: {}", csv.display());

    let rate = parse_rate(
        frame_rate
            .as_deref()
            .or(config.defaults.frame_rate.as_deref()),
    )?
    .unwrap_or(FrameRate::FPS_30);

    let file = File::open(&csv).map_err(|e| anyhow::anyhow!("Failed to open CSV: {e}"))?;
    let rows = csvtoxml_assembly::read_rows(BufReader::new(file))?;
    let segments = csvtoxml_assembly::parse_rows(&rows, rate)?;

    let mut issues = Vec::new();
    let mut clips = 0;
    let mut gaps = 0;
    let mut total = 0;
    for segment in &segments {
        match segment {
            Segment::Clip(clip) => {
                clips += 1;
                match clip.out_point.checked_sub(clip.in_point) {
                    Some(length) if length.is_zero() => {
                        issues.push(format!("row {}: zero-length clip will be skipped", clip.row))
                    }
                    Some(length) => total += length.to_frames(),
                    None => issues.push(format!(
                        "row {}: out point {} is before in point {}",
                        clip.row,
                        clip.out_point.format(rate),
                        clip.in_point.format(rate)
                    )),
                }
            }
            Segment::Gap(gap) => {
                gaps += 1;
                if let Some((in_point, out_point)) = gap.span {
                    if out_point < in_point {
                        issues.push(format!(
                            "row {}: gap out point {} is before in point {}",
                            gap.row,
                            out_point.format(rate),
                            in_point.format(rate)
                        ));
                    }
                }
            }
        }
    }

    println!("  Rows: {}", rows.len());
    println!("  Clips: {clips}");
    println!("  Gaps: {gaps}");
    println!(
        "  Clip material: {} @ {} fps",
        Timecode::from_frames(total).format(rate),
        rate
    );

    if issues.is_empty() {
        println!("\nCSV is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("{} issue(s) found", issues.len())
}
