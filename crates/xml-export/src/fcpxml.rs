//! DaVinci Resolve FCPXML templates.
//!
//! The template must hold exactly one project `sequence` with a `spine`;
//! compound-clip sequences among the resources are left alone. Lane 0
//! is the primary storyline; every positive `lane` number used by a
//! connected clip in the template is another lane. Merging rewrites the
//! spine: lane-0 clips become `asset-clip`s separated by `gap`s, and
//! clips on other lanes are connected to the primary item covering their
//! start.

use std::collections::BTreeSet;

use anyhow::anyhow;
use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    ConversionSettings, FrameRate, Lane, MediaSource, TemplateLayout, Timecode, Timeline,
    TimelineClip,
};
use roxmltree::{Document, Node};

use crate::merge::TemplateDialect;
use crate::splice::{self, attr, Edit};

/// Elements that place media on a lane.
const CLIP_ELEMENTS: [&str; 6] = ["asset-clip", "clip", "ref-clip", "sync-clip", "mc-clip", "video"];

/// The FCPXML dialect.
pub struct Fcpxml;

impl TemplateDialect for Fcpxml {
    fn name(&self) -> &'static str {
        "fcpxml"
    }

    fn read_layout(&self, doc: &Document<'_>) -> ConvertResult<TemplateLayout> {
        let (sequence, spine) = sequence(doc)?;
        let rate = read_rate(doc, sequence)?;

        let media = declared_assets(doc, rate);
        if media.is_empty() {
            return Err(ConvertError::template("template declares no assets"));
        }

        let media_ref = |node: Node<'_, '_>| -> Option<String> {
            let is_asset = |id: &&str| media.iter().any(|m| m.id == *id);
            node.attribute("ref")
                .filter(is_asset)
                .or_else(|| {
                    node.descendants()
                        .find_map(|d| d.attribute("ref").filter(is_asset))
                })
                .map(str::to_string)
        };

        let primary_home = spine
            .children()
            .find(is_clip)
            .and_then(media_ref)
            .or_else(|| media.first().map(|m| m.id.clone()));
        let mut lanes = vec![Lane {
            index: 0,
            home_media: primary_home,
        }];
        for (index, number) in connected_lanes(spine).into_iter().enumerate() {
            let home_media = spine
                .descendants()
                .find(|node| is_clip(node) && lane_number(*node) == Some(number))
                .and_then(media_ref);
            lanes.push(Lane {
                index: index + 1,
                home_media,
            });
        }

        Ok(TemplateLayout { rate, media, lanes })
    }

    fn edits(
        &self,
        doc: &Document<'_>,
        layout: &TemplateLayout,
        timeline: &Timeline,
        settings: &ConversionSettings,
    ) -> ConvertResult<Vec<Edit>> {
        let text = doc.input_text();
        let (sequence, spine) = sequence(doc)?;
        let mut lane_numbers = vec![0];
        lane_numbers.extend(connected_lanes(spine));

        let spine_indent = splice::indent_before(text, spine.range().start);
        let item_indent = spine
            .children()
            .find(|node| node.is_element())
            .map(|node| splice::indent_before(text, node.range().start))
            .filter(|indent| indent.len() > spine_indent.len())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{spine_indent}\t"));
        let unit = item_indent
            .strip_prefix(spine_indent)
            .filter(|unit| !unit.is_empty())
            .unwrap_or("\t")
            .to_string();

        let writer = SpineWriter {
            layout,
            rate: layout.rate,
            unit,
        };
        let items = writer.primary_items(timeline, &lane_numbers)?;
        let rendered = items
            .iter()
            .map(|item| writer.render_item(item, &item_indent))
            .collect::<ConvertResult<Vec<_>>>()?;

        let mut body: String = rendered
            .iter()
            .map(|item| format!("\n{item_indent}{item}"))
            .collect();
        if !body.is_empty() {
            body.push('\n');
            body.push_str(spine_indent);
        }

        let mut edits = Vec::new();
        match splice::inner_range(text, spine) {
            Some(inner) => edits.push(Edit::replace(inner, body)),
            None if !body.is_empty() => edits.push(Edit::replace(
                spine.range(),
                format!("{}{body}</spine>", splice::start_tag(spine, &[], false)),
            )),
            None => {}
        }

        let duration = time(timeline.duration(), layout.rate);
        let sequence_start = sequence.range().start;
        edits.push(Edit::replace(
            sequence_start..splice::start_tag_end(text, sequence_start),
            splice::start_tag(sequence, &[("duration", &duration)], false),
        ));

        if let Some(name) = settings.sequence_name.as_deref() {
            match sequence.parent_element().filter(|p| p.has_tag_name("project")) {
                Some(project) => {
                    let start = project.range().start;
                    edits.push(Edit::replace(
                        start..splice::start_tag_end(text, start),
                        splice::start_tag(project, &[("name", name)], false),
                    ));
                }
                None => tracing::warn!("Template sequence is not inside a <project>; name not replaced"),
            }
        }

        tracing::debug!(
            primary_items = items.len(),
            connected = timeline.clips.iter().filter(|c| c.track > 0).count(),
            "Rewrote spine"
        );
        Ok(edits)
    }
}

/// One item of the primary storyline and the clips connected to it.
struct PrimaryItem<'t> {
    offset: Timecode,
    duration: Timecode,
    /// `None` for a gap.
    clip: Option<&'t TimelineClip>,
    connected: Vec<(&'t TimelineClip, u32)>,
}

impl PrimaryItem<'_> {
    fn end(&self) -> Timecode {
        self.offset + self.duration
    }

    /// Local time at the item's first frame.
    fn local_start(&self) -> Timecode {
        self.clip.map_or(Timecode::ZERO, |clip| clip.source_in)
    }
}

struct SpineWriter<'a> {
    layout: &'a TemplateLayout,
    rate: FrameRate,
    unit: String,
}

impl SpineWriter<'_> {
    fn primary_items<'t>(
        &self,
        timeline: &'t Timeline,
        lane_numbers: &[u32],
    ) -> ConvertResult<Vec<PrimaryItem<'t>>> {
        let gap = |offset: Timecode, end: Timecode| PrimaryItem {
            offset,
            duration: end.checked_sub(offset).unwrap_or_default(),
            clip: None,
            connected: Vec::new(),
        };

        let mut items = Vec::new();
        let mut cursor = Timecode::ZERO;
        for clip in timeline.clips_on(0) {
            if clip.start > cursor {
                items.push(gap(cursor, clip.start));
            }
            items.push(PrimaryItem {
                offset: clip.start,
                duration: clip.duration,
                clip: Some(clip),
                connected: Vec::new(),
            });
            cursor = clip.end();
        }
        let total = timeline.duration();
        if total > cursor {
            items.push(gap(cursor, total));
        }

        for clip in timeline.clips.iter().filter(|clip| clip.track > 0) {
            let lane = *lane_numbers.get(clip.track).ok_or_else(|| {
                ConvertError::Other(anyhow!(
                    "row {} is on lane {} but the template has {} lanes",
                    clip.row,
                    clip.track,
                    lane_numbers.len()
                ))
            })?;
            let host = items
                .iter_mut()
                .find(|item| item.offset <= clip.start && clip.start < item.end())
                .ok_or_else(|| {
                    ConvertError::Other(anyhow!("row {} starts past the primary storyline", clip.row))
                })?;
            host.connected.push((clip, lane));
        }

        Ok(items)
    }

    fn render_item(&self, item: &PrimaryItem<'_>, indent: &str) -> ConvertResult<String> {
        let inner = format!("{indent}{}", self.unit);
        let mut children = Vec::with_capacity(item.connected.len());
        for (clip, lane) in &item.connected {
            let offset = item.local_start() + clip.start.checked_sub(item.offset).unwrap_or_default();
            children.push(self.asset_clip(clip, offset, Some(*lane), &[], &inner)?);
        }

        match item.clip {
            Some(clip) => self.asset_clip(clip, item.offset, None, &children, indent),
            None => {
                let tag = format!(
                    "<gap{}{}{}",
                    attr("name", "Gap"),
                    attr("offset", &time(item.offset, self.rate)),
                    attr("duration", &time(item.duration, self.rate)),
                );
                if children.is_empty() {
                    return Ok(format!("{tag}/>"));
                }
                Ok(format!("{tag}>{}\n{indent}</gap>", nest(&children, &inner)))
            }
        }
    }

    fn asset_clip(
        &self,
        clip: &TimelineClip,
        offset: Timecode,
        lane: Option<u32>,
        connected: &[String],
        indent: &str,
    ) -> ConvertResult<String> {
        let media = self.media(clip)?;
        let rate = self.rate;
        let mut tag = format!(
            "<asset-clip{}{}{}{}{}",
            attr("ref", &media.id),
            attr("offset", &time(offset, rate)),
            attr("name", &media.name),
            attr("start", &time(clip.source_in, rate)),
            attr("duration", &time(clip.duration, rate)),
        );
        if let Some(lane) = lane {
            tag.push_str(&attr("lane", &lane.to_string()));
        }
        tag.push('>');

        let mut marker = format!(
            "<marker{}{}{}",
            attr("start", &time(clip.source_in, rate)),
            attr("duration", &time(Timecode::from_frames(1), rate)),
            attr("value", &clip.text),
        );
        if !clip.speaker.is_empty() {
            marker.push_str(&attr("note", &clip.speaker));
        }
        marker.push_str("/>");
        let keyword = format!(
            "<keyword{}{}{}/>",
            attr("start", &time(clip.source_in, rate)),
            attr("duration", &time(clip.duration, rate)),
            attr("value", clip.color.davinci_color()),
        );

        let mut children = connected.to_vec();
        children.push(marker);
        children.push(keyword);
        let inner = format!("{indent}{}", self.unit);
        Ok(format!("{tag}{}\n{indent}</asset-clip>", nest(&children, &inner)))
    }

    fn media(&self, clip: &TimelineClip) -> ConvertResult<&MediaSource> {
        self.layout.media_by_id(&clip.media_id).ok_or_else(|| {
            ConvertError::Other(anyhow!(
                "row {} references undeclared asset '{}'",
                clip.row,
                clip.media_id
            ))
        })
    }
}

fn nest(children: &[String], indent: &str) -> String {
    children
        .iter()
        .map(|child| format!("\n{indent}{child}"))
        .collect()
}

/// FCPXML rational time for a frame count: `"{frames * den}/{num}s"`,
/// or `"0s"`.
pub fn time(frames: Timecode, rate: FrameRate) -> String {
    if frames.is_zero() {
        return "0s".to_string();
    }
    let numerator = u128::from(frames.to_frames()) * u128::from(rate.denominator());
    format!("{numerator}/{}s", rate.numerator())
}

/// Parse an FCPXML time (`"0s"`, `"5s"`, `"1001/30000s"`) into seconds
/// as a `(numerator, denominator)` pair.
pub fn parse_time(value: &str) -> Option<(u64, u64)> {
    let value = value.trim().strip_suffix('s')?;
    match value.split_once('/') {
        Some((num, den)) => {
            let den: u64 = den.parse().ok()?;
            if den == 0 {
                return None;
            }
            Some((num.parse().ok()?, den))
        }
        None => Some((value.parse().ok()?, 1)),
    }
}

/// Nearest whole frame to an FCPXML time.
fn time_to_frames(value: &str, rate: FrameRate) -> Option<u64> {
    let (num, den) = parse_time(value)?;
    let numerator = u128::from(num) * u128::from(rate.numerator());
    let denominator = u128::from(den) * u128::from(rate.denominator());
    u64::try_from((numerator + denominator / 2) / denominator).ok()
}

fn sequence<'a, 'i>(doc: &'a Document<'i>) -> ConvertResult<(Node<'a, 'i>, Node<'a, 'i>)> {
    let root = doc.root_element();
    if root.tag_name().name() != "fcpxml" {
        return Err(ConvertError::template(format!(
            "expected an <fcpxml> root element, found <{}>",
            root.tag_name().name()
        )));
    }
    // Compound clips keep their own sequences under <resources>.
    let mut sequences = root.descendants().filter(|node| {
        node.has_tag_name("sequence")
            && node.parent_element().is_some_and(|p| p.has_tag_name("project"))
    });
    let sequence = match (sequences.next(), sequences.next()) {
        (Some(sequence), None) => sequence,
        (None, _) => return Err(ConvertError::template("template has no project <sequence>")),
        (Some(_), Some(_)) => {
            return Err(ConvertError::template(
                "template has more than one project <sequence>",
            ))
        }
    };
    let spine = splice::child(sequence, "spine")
        .ok_or_else(|| ConvertError::template("<sequence> has no <spine>"))?;
    Ok((sequence, spine))
}

fn read_rate(doc: &Document<'_>, sequence: Node<'_, '_>) -> ConvertResult<FrameRate> {
    let format_id = sequence
        .attribute("format")
        .ok_or_else(|| ConvertError::template("<sequence> has no format attribute"))?;
    let format = doc
        .descendants()
        .find(|node| node.has_tag_name("format") && node.attribute("id") == Some(format_id))
        .ok_or_else(|| ConvertError::template(format!("format resource '{format_id}' not found")))?;
    let frame_duration = format.attribute("frameDuration").ok_or_else(|| {
        ConvertError::template(format!("format '{format_id}' has no frameDuration"))
    })?;

    let invalid = || ConvertError::template(format!("invalid frameDuration '{frame_duration}'"));
    let (num, den) = parse_time(frame_duration).ok_or_else(invalid)?;
    let num = u32::try_from(num).map_err(|_| invalid())?;
    let den = u32::try_from(den).map_err(|_| invalid())?;
    FrameRate::new(den, num).map_err(|_| invalid())
}

fn declared_assets(doc: &Document<'_>, rate: FrameRate) -> Vec<MediaSource> {
    let Some(resources) = splice::child(doc.root_element(), "resources") else {
        return Vec::new();
    };
    splice::children(resources, "asset")
        .filter_map(|asset| {
            let id = asset.attribute("id")?;
            let path_url = asset
                .attribute("src")
                .or_else(|| splice::child(asset, "media-rep").and_then(|rep| rep.attribute("src")))
                .map(str::to_string);
            Some(MediaSource {
                id: id.to_string(),
                name: asset.attribute("name").unwrap_or(id).to_string(),
                path_url,
                duration_frames: asset
                    .attribute("duration")
                    .and_then(|d| time_to_frames(d, rate)),
            })
        })
        .collect()
}

fn is_clip(node: &Node<'_, '_>) -> bool {
    node.is_element() && CLIP_ELEMENTS.contains(&node.tag_name().name())
}

fn lane_number(node: Node<'_, '_>) -> Option<u32> {
    node.attribute("lane")?.parse().ok()
}

/// Positive lane numbers used by clips in the template's spine.
fn connected_lanes(spine: Node<'_, '_>) -> Vec<u32> {
    spine
        .descendants()
        .filter(is_clip)
        .filter_map(lane_number)
        .filter(|lane| *lane > 0)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
