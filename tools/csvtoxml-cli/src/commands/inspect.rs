//! Show what a template declares.

use std::path::PathBuf;

use csvtoxml_common::config::AppConfig;
use csvtoxml_xml_export::TemplateDocument;

use super::parse_format;

pub fn run(template: PathBuf, format: Option<String>, config: &AppConfig) -> anyhow::Result<()> {
    let format = parse_format(format.as_deref().unwrap_or(&config.defaults.format))?;
    let document = TemplateDocument::load(&template, format)
        .map_err(|e| anyhow::anyhow!("Failed to load template: {e}"))?;
    let layout = document.layout();

    println!("Template: {}", template.display());
    println!("  Dialect: {format}");
    println!("  Rate: {} fps", layout.rate);
    println!();

    println!("Media:");
    for media in &layout.media {
        let length = media
            .duration_frames
            .map(|frames| format!(" ({frames} frames)"))
            .unwrap_or_default();
        match media.path_url.as_deref() {
            Some(url) => println!("  {}: {} <{url}>{length}", media.id, media.name),
            None => println!("  {}: {}{length}", media.id, media.name),
        }
    }
    println!();

    println!("Lanes:");
    for lane in &layout.lanes {
        let home = lane
            .home_media
            .as_deref()
            .and_then(|id| layout.media_by_id(id))
            .map_or("-", |media| media.name.as_str());
        println!("  {}: {home}", lane.index);
    }

    Ok(())
}
