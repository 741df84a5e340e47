//! Premiere Pro XMEML (version 4) templates.
//!
//! The template must hold exactly one top-level `sequence`. Its video
//! tracks that contain at least one `clipitem` are the lanes, and each
//! lane's first clipitem is the pattern generated clipitems are cut from:
//! timing, naming, file and label children are rewritten, links and
//! markers are dropped, and everything else is copied as written.

use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    ConversionSettings, FrameRate, Lane, MediaSource, TemplateLayout, Timeline, TimelineClip,
};
use roxmltree::{Document, Node, NodeId};

use crate::merge::TemplateDialect;
use crate::splice::{self, Edit};

/// The XMEML dialect.
pub struct Xmeml;

impl TemplateDialect for Xmeml {
    fn name(&self) -> &'static str {
        "xmeml"
    }

    fn read_layout(&self, doc: &Document<'_>) -> ConvertResult<TemplateLayout> {
        let sequence = sequence(doc)?;
        let rate = read_rate(sequence)?;

        let media = declared_media(doc);
        if media.is_empty() {
            return Err(ConvertError::template(
                "template declares no media files",
            ));
        }

        let lanes = lane_tracks(sequence)
            .into_iter()
            .enumerate()
            .map(|(index, track)| Lane {
                index,
                home_media: splice::child(track, "clipitem")
                    .and_then(file_id)
                    .map(str::to_string),
            })
            .collect();

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
        let sequence = sequence(doc)?;
        let has_clips = |lane: usize| timeline.clips_on(lane).next().is_some();

        let video: Vec<(Node<'_, '_>, usize)> = lane_tracks(sequence)
            .into_iter()
            .enumerate()
            .filter(|(lane, _)| has_clips(*lane))
            .map(|(lane, track)| (track, lane))
            .collect();

        // Audio tracks follow the first lane showing the same media.
        let audio: Vec<(Node<'_, '_>, usize)> = tracks(sequence, "audio")
            .into_iter()
            .filter_map(|track| {
                let pattern = splice::child(track, "clipitem")?;
                let lane = file_id(pattern)
                    .and_then(|id| layout.lane_homed_on(id))
                    .map_or(0, |lane| lane.index);
                Some((track, lane))
            })
            .filter(|(_, lane)| has_clips(*lane))
            .collect();

        let replaced: HashSet<NodeId> = video
            .iter()
            .chain(&audio)
            .flat_map(|(track, _)| track_items(*track))
            .map(|node| node.id())
            .collect();

        let mut writer = ClipWriter {
            text,
            layout,
            rate: layout.rate,
            next_id: max_clip_number(doc) + 1,
            masterclips: masterclip_ids(doc),
            inline_files: inline_definitions(doc, &replaced),
            emitted: HashSet::new(),
        };

        let mut edits = Vec::new();
        for (kind, targets) in [(MediaKind::Video, &video), (MediaKind::Audio, &audio)] {
            for (track, lane) in targets {
                let pattern = splice::child(*track, "clipitem").ok_or_else(|| {
                    ConvertError::Other(anyhow!("lane {lane} lost its pattern clipitem"))
                })?;
                let items = timeline
                    .clips_on(*lane)
                    .map(|clip| writer.clipitem(pattern, clip, kind))
                    .collect::<ConvertResult<Vec<_>>>()?;
                tracing::debug!(lane, kind = ?kind, clips = items.len(), "Rewriting track");
                edits.extend(replace_items(text, *track, &items));
            }
        }
        edits.extend(writer.rehome_definitions(doc, &replaced));

        let duration = untouched_end(sequence, &replaced).max(timeline.duration().to_frames());
        match splice::child(sequence, "duration") {
            Some(node) => edits.push(Edit::replace(
                node.range(),
                splice::text_element("duration", &duration.to_string()),
            )),
            None => tracing::warn!("Template sequence has no <duration>; left unset"),
        }

        if let Some(name) = settings.sequence_name.as_deref() {
            match splice::child(sequence, "name") {
                Some(node) => edits.push(Edit::replace(
                    node.range(),
                    splice::text_element("name", name),
                )),
                None => tracing::warn!("Template sequence has no <name>; name not replaced"),
            }
        }

        Ok(edits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Video,
    Audio,
}

/// Generates clipitems from pattern clipitems.
struct ClipWriter<'a, 'i> {
    text: &'i str,
    layout: &'a TemplateLayout,
    rate: FrameRate,
    next_id: u64,
    /// Media id -> masterclip id used by the template's own clips.
    masterclips: HashMap<String, String>,
    /// Full `file` definitions that only lived inside replaced clips.
    inline_files: HashMap<String, Node<'a, 'i>>,
    emitted: HashSet<String>,
}

impl<'a, 'i> ClipWriter<'a, 'i> {
    fn clipitem(
        &mut self,
        pattern: Node<'a, 'i>,
        clip: &TimelineClip,
        kind: MediaKind,
    ) -> ConvertResult<String> {
        let layout = self.layout;
        let media = layout.media_by_id(&clip.media_id).ok_or_else(|| {
            ConvertError::Other(anyhow!(
                "row {} references undeclared media '{}'",
                clip.row,
                clip.media_id
            ))
        })?;
        let id = format!("clipitem-{}", self.next_id);
        self.next_id += 1;

        let fields = self.fields(clip, media);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut has_file = false;
        let mut has_labels = false;

        let mut body = String::new();
        let mut pending = "";
        let mut child_indent: Option<&str> = None;

        for node in pattern.children() {
            let raw = splice::source(self.text, node);
            if node.is_text() && raw.trim().is_empty() {
                if child_indent.is_none() {
                    child_indent = Some(raw.rsplit('\n').next().unwrap_or(raw));
                }
                pending = raw;
                continue;
            }

            let piece = if node.is_element() {
                match node.tag_name().name() {
                    "link" | "marker" => None,
                    "file" => {
                        has_file = true;
                        Some(self.file_ref(media))
                    }
                    "labels" => {
                        has_labels = true;
                        Some(self.labels(node, clip))
                    }
                    name => match fields.iter().find(|(field, _)| *field == name) {
                        Some((field, value)) => {
                            seen.insert(*field);
                            value.as_deref().map(|v| splice::text_element(field, v))
                        }
                        None => Some(raw.to_string()),
                    },
                }
            } else {
                Some(raw.to_string())
            };

            if let Some(piece) = piece {
                body.push_str(pending);
                body.push_str(&piece);
            }
            pending = "";
        }

        let mut extras: Vec<String> = fields
            .iter()
            .filter(|(field, _)| !seen.contains(field))
            .filter_map(|(field, value)| {
                value.as_deref().map(|v| splice::text_element(field, v))
            })
            .collect();
        if !has_file {
            extras.push(self.file_ref(media));
        }
        if !has_labels {
            extras.push(format!(
                "<labels>{}</labels>",
                splice::text_element("label2", clip.color.premiere_label())
            ));
        }
        if kind == MediaKind::Video {
            extras.push(marker(clip));
        }

        let base_indent = splice::indent_before(self.text, pattern.range().start);
        let child_indent = child_indent
            .map(str::to_string)
            .unwrap_or_else(|| format!("{base_indent}\t"));
        for extra in extras {
            body.push('\n');
            body.push_str(&child_indent);
            body.push_str(&extra);
        }
        if pending.is_empty() {
            body.push('\n');
            body.push_str(base_indent);
        } else {
            body.push_str(pending);
        }

        Ok(format!(
            "{}{body}</clipitem>",
            splice::start_tag(pattern, &[("id", &id)], false)
        ))
    }

    /// Regenerated children, in the order they are added when missing.
    fn fields(&self, clip: &TimelineClip, media: &MediaSource) -> [(&'static str, Option<String>); 9] {
        let rate = self.rate;
        let source_out = clip.source_out();
        [
            ("masterclipid", self.masterclips.get(&media.id).cloned()),
            ("name", Some(media.name.clone())),
            ("enabled", Some("TRUE".to_string())),
            ("start", Some(clip.start.to_frames().to_string())),
            ("end", Some(clip.end().to_frames().to_string())),
            ("in", Some(clip.source_in.to_frames().to_string())),
            ("out", Some(source_out.to_frames().to_string())),
            ("pproTicksIn", Some(clip.source_in.ppro_ticks(rate).to_string())),
            ("pproTicksOut", Some(source_out.ppro_ticks(rate).to_string())),
        ]
    }

    fn file_ref(&mut self, media: &MediaSource) -> String {
        if let Some(definition) = self.inline_files.get(&media.id) {
            if self.emitted.insert(media.id.clone()) {
                return splice::source(self.text, *definition).to_string();
            }
        }
        format!("<file{}/>", splice::attr("id", &media.id))
    }

    /// Definitions that lived in replaced clips but were not re-emitted by
    /// a generated clip move into the first surviving reference to them.
    fn rehome_definitions(&self, doc: &Document<'_>, replaced: &HashSet<NodeId>) -> Vec<Edit> {
        let mut pending: Vec<(&String, &Node<'a, 'i>)> = self
            .inline_files
            .iter()
            .filter(|(id, _)| !self.emitted.contains(*id))
            .collect();
        pending.sort_by_key(|(_, definition)| definition.range().start);

        let mut edits = Vec::new();
        for (id, definition) in pending {
            let reference = doc.descendants().find(|node| {
                node.has_tag_name("file")
                    && node.attribute("id") == Some(id.as_str())
                    && !is_definition(node)
                    && !node.ancestors().any(|a| replaced.contains(&a.id()))
            });
            match reference {
                Some(reference) => edits.push(Edit::replace(
                    reference.range(),
                    splice::source(self.text, *definition),
                )),
                None => tracing::debug!(media = %id, "Media no longer referenced; definition dropped"),
            }
        }
        edits
    }

    fn labels(&self, labels: Node<'_, '_>, clip: &TimelineClip) -> String {
        let label = splice::text_element("label2", clip.color.premiere_label());
        match splice::child(labels, "label2") {
            Some(label2) => {
                let outer = labels.range();
                let inner = label2.range();
                format!(
                    "{}{label}{}",
                    &self.text[outer.start..inner.start],
                    &self.text[inner.end..outer.end]
                )
            }
            None => format!("<labels>{label}</labels>"),
        }
    }
}

/// Clip marker: speaker as the name, transcript as the comment.
fn marker(clip: &TimelineClip) -> String {
    format!(
        "<marker>{}{}{}{}</marker>",
        splice::text_element("comment", &clip.text),
        splice::text_element("name", &clip.speaker),
        splice::text_element("in", &clip.source_in.to_frames().to_string()),
        splice::text_element("out", "-1"),
    )
}

/// Edits that swap a track's clip and transition items for `items`.
fn replace_items(text: &str, track: Node<'_, '_>, items: &[String]) -> Vec<Edit> {
    let removed: Vec<Node<'_, '_>> = track_items(track).collect();
    let Some((first, rest)) = removed.split_first() else {
        return Vec::new();
    };

    let indent = splice::indent_before(text, first.range().start);
    let mut edits = vec![Edit::replace(
        first.range(),
        items.join(&format!("\n{indent}")),
    )];
    edits.extend(
        rest.iter()
            .map(|node| Edit::delete(splice::removal_range(text, *node))),
    );
    edits
}

fn sequence<'a, 'i>(doc: &'a Document<'i>) -> ConvertResult<Node<'a, 'i>> {
    let root = doc.root_element();
    if root.tag_name().name() != "xmeml" {
        return Err(ConvertError::template(format!(
            "expected an <xmeml> root element, found <{}>",
            root.tag_name().name()
        )));
    }
    let mut sequences = splice::children(root, "sequence");
    match (sequences.next(), sequences.next()) {
        (Some(sequence), None) => Ok(sequence),
        (None, _) => Err(ConvertError::template("no <sequence> under <xmeml>")),
        (Some(_), Some(_)) => Err(ConvertError::template(
            "more than one <sequence> under <xmeml>",
        )),
    }
}

fn read_rate(sequence: Node<'_, '_>) -> ConvertResult<FrameRate> {
    let Some(rate) = splice::child(sequence, "rate") else {
        tracing::warn!("Template sequence has no <rate>; assuming 29.97 fps");
        return Ok(FrameRate::NTSC_30);
    };
    let timebase = match splice::child_text(rate, "timebase") {
        Some(text) => text.parse::<u32>().map_err(|_| {
            ConvertError::template(format!("invalid sequence timebase '{text}'"))
        })?,
        None => {
            tracing::warn!("Template sequence has no <timebase>; assuming 30");
            30
        }
    };
    let ntsc = splice::child_text(rate, "ntsc").map_or(true, |text| text.eq_ignore_ascii_case("TRUE"));
    FrameRate::from_timebase(timebase, ntsc).map_err(|e| ConvertError::template(e.to_string()))
}

fn tracks<'a, 'i>(sequence: Node<'a, 'i>, kind: &str) -> Vec<Node<'a, 'i>> {
    splice::child(sequence, "media")
        .and_then(|media| splice::child(media, kind))
        .map(|container| splice::children(container, "track").collect())
        .unwrap_or_default()
}

/// Video tracks able to serve as lanes.
fn lane_tracks<'a, 'i>(sequence: Node<'a, 'i>) -> Vec<Node<'a, 'i>> {
    tracks(sequence, "video")
        .into_iter()
        .filter(|track| splice::child(*track, "clipitem").is_some())
        .collect()
}

fn track_items<'a, 'i>(track: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    track.children().filter(|node| {
        node.is_element() && matches!(node.tag_name().name(), "clipitem" | "transitionitem")
    })
}

fn file_id<'a>(clipitem: Node<'a, '_>) -> Option<&'a str> {
    splice::child(clipitem, "file").and_then(|file| file.attribute("id"))
}

/// A `file` element that carries its definition, not just a reference.
fn is_definition(node: &Node<'_, '_>) -> bool {
    node.is_element()
        && node.tag_name().name() == "file"
        && (splice::child(*node, "name").is_some() || splice::child(*node, "pathurl").is_some())
}

fn declared_media(doc: &Document<'_>) -> Vec<MediaSource> {
    let mut seen = HashSet::new();
    let mut media = Vec::new();
    for file in doc.descendants().filter(is_definition) {
        let Some(id) = file.attribute("id") else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let mut source = MediaSource {
            id: id.to_string(),
            name: splice::child_text(file, "name").unwrap_or_default().to_string(),
            path_url: splice::child_text(file, "pathurl").map(str::to_string),
            duration_frames: splice::child_text(file, "duration").and_then(|d| d.parse().ok()),
        };
        if source.name.is_empty() {
            source.name = source.file_name().unwrap_or(id).to_string();
        }
        media.push(source);
    }
    media
}

/// Furthest `end` among the clipitems that survive the merge.
fn untouched_end(sequence: Node<'_, '_>, replaced: &HashSet<NodeId>) -> u64 {
    let video = tracks(sequence, "video");
    let audio = tracks(sequence, "audio");
    video
        .into_iter()
        .chain(audio)
        .flat_map(track_items)
        .filter(|node| node.has_tag_name("clipitem") && !replaced.contains(&node.id()))
        .filter_map(|node| splice::child_text(node, "end")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

fn max_clip_number(doc: &Document<'_>) -> u64 {
    doc.descendants()
        .filter(|node| node.has_tag_name("clipitem"))
        .filter_map(|node| node.attribute("id")?.strip_prefix("clipitem-")?.parse().ok())
        .max()
        .unwrap_or(0)
}

fn masterclip_ids(doc: &Document<'_>) -> HashMap<String, String> {
    let mut ids = HashMap::new();
    for clipitem in doc.descendants().filter(|node| node.has_tag_name("clipitem")) {
        if let (Some(file), Some(master)) = (
            file_id(clipitem),
            splice::child_text(clipitem, "masterclipid"),
        ) {
            ids.entry(file.to_string())
                .or_insert_with(|| master.to_string());
        }
    }
    ids
}

/// Media whose every full definition sits inside a replaced clipitem.
fn inline_definitions<'a, 'i>(
    doc: &'a Document<'i>,
    replaced: &HashSet<NodeId>,
) -> HashMap<String, Node<'a, 'i>> {
    let mut definitions: HashMap<&str, Vec<Node<'a, 'i>>> = HashMap::new();
    for file in doc.descendants().filter(is_definition) {
        if let Some(id) = file.attribute("id") {
            definitions.entry(id).or_default().push(file);
        }
    }
    definitions
        .into_iter()
        .filter(|(_, nodes)| {
            nodes
                .iter()
                .all(|node| node.ancestors().any(|a| replaced.contains(&a.id())))
        })
        .map(|(id, nodes)| (id.to_string(), nodes[0]))
        .collect()
}
