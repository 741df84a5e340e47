//! End-to-end conversions against the shared fixtures.

use std::path::{Path, PathBuf};

use csvtoxml_common::error::ConvertError;
use csvtoxml_timeline_model::{ColorLabel, ConversionSettings, FrameRate, OutputFormat};
use csvtoxml_xml_export::{run_conversion, ConversionJob};
use roxmltree::{Document, Node, ParsingOptions};

const HEADER: &str = "Speaker Name,イン点,アウト点,文字起こし,色選択";

fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(relative)
}

fn read_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixture(relative)).expect("fixture should be readable")
}

/// A scratch directory holding a template fixture and a CSV.
struct Workspace {
    dir: tempfile::TempDir,
    template: PathBuf,
    csv: PathBuf,
}

impl Workspace {
    fn new(template_fixture: &str, csv: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join(
            Path::new(template_fixture)
                .file_name()
                .expect("fixture has a file name"),
        );
        std::fs::write(&template, read_fixture(template_fixture)).unwrap();
        let csv_path = dir.path().join("edit.csv");
        std::fs::write(&csv_path, csv).unwrap();
        Self {
            dir,
            template,
            csv: csv_path,
        }
    }

    fn job(&self, settings: ConversionSettings) -> ConversionJob {
        ConversionJob::new(&self.csv, &self.template, settings)
    }

    fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn parse(xml: &str) -> Document<'_> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options).expect("output should be well-formed XML")
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Node<'a, 'i> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .unwrap_or_else(|| panic!("<{}> has no <{name}>", node.tag_name().name()))
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    child(node, name).text().unwrap_or_default().to_string()
}

/// Clipitems of the `index`-th video or audio track.
fn clipitems<'a, 'i>(doc: &'a Document<'i>, kind: &str, index: usize) -> Vec<Node<'a, 'i>> {
    let sequence = child(doc.root_element(), "sequence");
    let container = child(child(sequence, "media"), kind);
    let track = container
        .children()
        .filter(|c| c.has_tag_name("track"))
        .nth(index)
        .unwrap_or_else(|| panic!("no {kind} track {index}"));
    track
        .children()
        .filter(|c| c.has_tag_name("clipitem"))
        .collect()
}

fn frames(items: &[Node<'_, '_>], field: &str) -> Vec<u64> {
    items
        .iter()
        .map(|item| child_text(*item, field).parse().unwrap())
        .collect()
}

/// The text of the first element that starts with `open` and ends at the
/// next `close`.
fn block<'t>(text: &'t str, open: &str, close: &str) -> &'t str {
    let start = text.find(open).expect("block start");
    let end = start + text[start..].find(close).expect("block end") + close.len();
    &text[start..end]
}

#[test]
fn test_premiere_single_lane_interview() {
    let ws = Workspace::new("premiere/two-camera.xml", &read_fixture("csv/interview.csv"));
    let output_path = run_conversion(&ws.job(ConversionSettings::default())).unwrap();
    assert_eq!(output_path, ws.dir.path().join("edit_cut_from_two-camera.xml"));

    let output = std::fs::read_to_string(&output_path).unwrap();
    let doc = parse(&output);

    let video = clipitems(&doc, "video", 0);
    assert_eq!(frames(&video, "start"), vec![0, 443, 998]);
    assert_eq!(frames(&video, "end"), vec![443, 696, 1404]);
    assert_eq!(frames(&video, "in"), vec![877, 1320, 13069]);
    assert_eq!(frames(&video, "out"), vec![1320, 1573, 13475]);
    assert_eq!(child_text(video[0], "pproTicksIn"), "7425734400000");

    let ids: Vec<&str> = video.iter().filter_map(|c| c.attribute("id")).collect();
    assert_eq!(ids, vec!["clipitem-5", "clipitem-6", "clipitem-7"]);

    let labels: Vec<String> = video
        .iter()
        .map(|c| child_text(child(*c, "labels"), "label2"))
        .collect();
    assert_eq!(labels, vec!["Violet", "Violet", "Rose"]);

    let marker = child(video[2], "marker");
    assert_eq!(child_text(marker, "comment"), "なるほど、わかりました");
    assert_eq!(child_text(marker, "name"), "中島");
    assert!(video.iter().all(|c| !c.children().any(|n| n.has_tag_name("link"))));

    let sequence = child(doc.root_element(), "sequence");
    assert_eq!(child_text(sequence, "duration"), "1404");
    assert_eq!(child_text(sequence, "name"), "Interview Template");

    // Audio that shows the first camera follows lane 0.
    let audio = clipitems(&doc, "audio", 0);
    assert_eq!(frames(&audio, "start"), vec![0, 443, 998]);
    assert!(audio.iter().all(|c| child_text(child(*c, "sourcetrack"), "trackindex") == "1"));
    assert!(audio.iter().all(|c| !c.children().any(|n| n.has_tag_name("marker"))));
}

#[test]
fn test_premiere_untouched_parts_are_byte_identical() {
    let template = read_fixture("premiere/two-camera.xml");
    let ws = Workspace::new("premiere/two-camera.xml", &read_fixture("csv/interview.csv"));
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();

    let head = |text: &str| text[..text.find("<duration>").unwrap()].to_string();
    assert_eq!(head(&output), head(&template));

    let tail = |text: &str| text[text.find("<timecode>").unwrap()..].to_string();
    assert_eq!(tail(&output), tail(&template));

    for unchanged in [
        block(&template, "<format>", "</format>"),
        block(&template, "<clipitem id=\"clipitem-2\">", "</clipitem>"),
        block(&template, "<clipitem id=\"clipitem-4\"", "</clipitem>"),
    ] {
        assert!(output.contains(unchanged), "missing:\n{unchanged}");
    }
    assert!(!output.contains("clipitem-1\""));
    assert!(!output.contains("clipitem-3\""));
}

#[test]
fn test_premiere_file_definition_is_inlined_once() {
    let ws = Workspace::new("premiere/two-camera.xml", &read_fixture("csv/interview.csv"));
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();
    let doc = parse(&output);

    assert_eq!(output.matches("<pathurl>file://localhost/shoot/Cam1.mov</pathurl>").count(), 1);
    let video = clipitems(&doc, "video", 0);
    assert_eq!(child_text(child(video[0], "file"), "pathurl"), "file://localhost/shoot/Cam1.mov");
    for later in &video[1..] {
        let file = child(*later, "file");
        assert_eq!(file.attribute("id"), Some("file-1"));
        assert!(!file.has_children());
    }
    assert!(video.iter().all(|c| child_text(*c, "masterclipid") == "masterclip-1"));
}

#[test]
fn test_premiere_two_cameras() {
    let ws = Workspace::new("premiere/two-camera.xml", &read_fixture("csv/two-camera.csv"));
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();
    let doc = parse(&output);

    let cam1 = clipitems(&doc, "video", 0);
    assert_eq!(frames(&cam1, "start"), vec![0, 443]);

    // The gap takes the lane of the clip after it.
    let cam2 = clipitems(&doc, "video", 1);
    assert_eq!(frames(&cam2, "start"), vec![302]);
    assert_eq!(child_text(cam2[0], "name"), "Cam2.mov");
    assert_eq!(child_text(cam2[0], "masterclipid"), "masterclip-2");
    assert_eq!(child(cam2[0], "file").attribute("id"), Some("file-2"));
    assert_eq!(output.matches("<pathurl>file://localhost/shoot/Cam2.mov</pathurl>").count(), 1);

    assert_eq!(frames(&clipitems(&doc, "audio", 0), "start"), vec![0, 443]);
    assert_eq!(frames(&clipitems(&doc, "audio", 1), "start"), vec![302]);

    let sequence = child(doc.root_element(), "sequence");
    assert_eq!(child_text(sequence, "duration"), "708");
}

#[test]
fn test_every_color_reaches_both_dialects() {
    let mut csv = String::from("Speaker Name,In,Out,Transcript,Color\n");
    for (i, color) in ColorLabel::ALL.iter().enumerate() {
        csv.push_str(&format!("A,00:00:{i:02}:00,00:00:{i:02}:10,line {i},{color}\n"));
    }

    let ws = Workspace::new("premiere/two-camera.xml", &csv);
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();
    let doc = parse(&output);
    let labels: Vec<String> = clipitems(&doc, "video", 0)
        .iter()
        .map(|c| child_text(child(*c, "labels"), "label2"))
        .collect();
    let expected: Vec<&str> = ColorLabel::ALL.iter().map(|c| c.premiere_label()).collect();
    assert_eq!(labels, expected);

    let ws = Workspace::new("davinci/interview.fcpxml", &csv);
    let settings = ConversionSettings {
        format: OutputFormat::Davinci,
        ..Default::default()
    };
    let output = std::fs::read_to_string(run_conversion(&ws.job(settings)).unwrap()).unwrap();
    let doc = parse(&output);
    let keywords: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("keyword"))
        .filter_map(|n| n.attribute("value"))
        .collect();
    let expected: Vec<&str> = ColorLabel::ALL.iter().map(|c| c.davinci_color()).collect();
    assert_eq!(keywords, expected);
}

#[test]
fn test_davinci_spine_with_connected_lane() {
    let template = read_fixture("davinci/interview.fcpxml");
    let csv = "Speaker Name,In,Out,Transcript,Color,Source File\n\
               A,00:00:01:00,00:00:03:00,hello,Mango,Wide.mov\n\
               B,00:00:10:00,00:00:11:00,reply,Caribbean,Close.mov\n\
               ,,,pause,GAP_1,Wide.mov\n\
               A,00:00:05:00,00:00:06:00,again,Brown,Wide\n";
    let ws = Workspace::new("davinci/interview.fcpxml", csv);
    let settings = ConversionSettings {
        format: OutputFormat::Davinci,
        sequence_name: Some("Interview Cut".to_string()),
        ..Default::default()
    };
    let output_path = run_conversion(&ws.job(settings)).unwrap();
    assert_eq!(output_path, ws.dir.path().join("edit_davinci.fcpxml"));
    let output = std::fs::read_to_string(&output_path).unwrap();
    let doc = parse(&output);

    let sequence = doc.descendants().find(|n| n.has_tag_name("sequence")).unwrap();
    assert_eq!(sequence.attribute("duration"), Some("240/30s"));
    assert_eq!(sequence.attribute("tcFormat"), Some("NDF"));
    assert_eq!(sequence.parent_element().unwrap().attribute("name"), Some("Interview Cut"));

    let spine = child(sequence, "spine");
    let primary: Vec<Node<'_, '_>> = spine.children().filter(|n| n.is_element()).collect();
    let summary: Vec<(&str, Option<&str>, Option<&str>)> = primary
        .iter()
        .map(|n| (n.tag_name().name(), n.attribute("offset"), n.attribute("duration")))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("asset-clip", Some("0s"), Some("60/30s")),
            ("gap", Some("60/30s"), Some("150/30s")),
            ("asset-clip", Some("210/30s"), Some("30/30s")),
        ]
    );
    assert_eq!(primary[0].attribute("ref"), Some("r2"));
    assert_eq!(primary[0].attribute("start"), Some("30/30s"));
    assert_eq!(primary[2].attribute("name"), Some("Wide"));

    let connected = child(primary[0], "asset-clip");
    assert_eq!(connected.attribute("ref"), Some("r3"));
    assert_eq!(connected.attribute("lane"), Some("1"));
    assert_eq!(connected.attribute("offset"), Some("30/30s"));
    assert_eq!(connected.attribute("start"), Some("300/30s"));
    assert_eq!(child(connected, "keyword").attribute("value"), Some("cyan"));

    let marker = child(primary[0], "marker");
    assert_eq!(marker.attribute("value"), Some("hello"));
    assert_eq!(marker.attribute("note"), Some("A"));
    assert_eq!(marker.attribute("duration"), Some("1/30s"));
    assert_eq!(child(primary[2], "keyword").attribute("value"), Some("sepia"));

    assert!(output.contains(block(&template, "<resources>", "</resources>")));
    let head = |text: &str| text[..text.find("<library>").unwrap()].to_string();
    assert_eq!(head(&output), head(&template));
}

#[test]
fn test_reversed_range_writes_nothing() {
    let csv = format!(
        "{HEADER}\n\
         A,00:00:01:00,00:00:02:00,first,Rose\n\
         A,00:00:10:00,00:00:05:00,second,Rose\n"
    );
    let ws = Workspace::new("premiere/two-camera.xml", &csv);
    let before = ws.files();

    match run_conversion(&ws.job(Default::default())).unwrap_err() {
        ConvertError::InvalidRange { row, .. } => assert_eq!(row, 2),
        other => panic!("expected an invalid range, got {other:?}"),
    }
    assert_eq!(ws.files(), before);
}

#[test]
fn test_unknown_source_file_writes_nothing() {
    let csv = "Speaker Name,イン点,アウト点,文字起こし,色選択,ファイル名\n\
               A,00:00:01:00,00:00:02:00,first,Rose,Cam1.mov\n\
               A,00:00:02:00,00:00:03:00,second,Rose,Cam2.mov\n\
               A,00:00:03:00,00:00:04:00,third,Rose,Cam9.mov\n";
    let ws = Workspace::new("premiere/two-camera.xml", csv);
    let job = ws.job(Default::default());
    std::fs::write(job.output_path(), "previous output").unwrap();

    match run_conversion(&job).unwrap_err() {
        ConvertError::UnknownMediaSource { row, name } => {
            assert_eq!(row, 3);
            assert_eq!(name, "Cam9.mov");
        }
        other => panic!("expected an unknown media source, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(job.output_path()).unwrap(), "previous output");
}

#[test]
fn test_run_rate_conformed_to_template() {
    let exact = format!("{HEADER}\nA,00:00:01:00,00:00:02:00,even,Rose\n");
    let ws = Workspace::new("premiere/two-camera.xml", &exact);
    let settings = ConversionSettings {
        frame_rate: Some(FrameRate::FPS_60),
        ..Default::default()
    };
    let output = std::fs::read_to_string(run_conversion(&ws.job(settings.clone())).unwrap()).unwrap();
    let doc = parse(&output);
    let video = clipitems(&doc, "video", 0);
    assert_eq!(frames(&video, "in"), vec![30]);
    assert_eq!(frames(&video, "end"), vec![30]);

    let lossy = format!("{HEADER}\nA,00:00:01:01,00:00:02:01,odd,Rose\n");
    let ws = Workspace::new("premiere/two-camera.xml", &lossy);
    let before = ws.files();
    match run_conversion(&ws.job(settings)).unwrap_err() {
        ConvertError::IncompatibleFrameRate { row, .. } => assert_eq!(row, 1),
        other => panic!("expected an incompatible rate, got {other:?}"),
    }
    assert_eq!(ws.files(), before);
}

#[test]
fn test_sequence_name_replaced_in_premiere() {
    let ws = Workspace::new("premiere/two-camera.xml", &read_fixture("csv/interview.csv"));
    let settings = ConversionSettings {
        sequence_name: Some("Rough Cut & Notes".to_string()),
        ..Default::default()
    };
    let output = std::fs::read_to_string(run_conversion(&ws.job(settings)).unwrap()).unwrap();
    assert!(output.contains("<name>Rough Cut &amp; Notes</name>"));

    let doc = parse(&output);
    let sequence = child(doc.root_element(), "sequence");
    assert_eq!(child_text(sequence, "name"), "Rough Cut & Notes");
}

#[test]
fn test_premiere_definition_moves_to_surviving_reference() {
    let csv = format!("{HEADER}\nA,00:00:01:00,00:00:02:00,only,Rose\n");
    let ws = Workspace::new("premiere/shared-track.xml", &csv);
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();
    let doc = parse(&output);

    let generated = clipitems(&doc, "video", 0);
    assert_eq!(generated.len(), 1);
    assert_eq!(child(generated[0], "file").attribute("id"), Some("file-1"));

    // The only definition of file-2 lived in a replaced clipitem.
    assert_eq!(output.matches("<pathurl>file://localhost/shoot/Cam2.mov</pathurl>").count(), 1);
    let kept = clipitems(&doc, "video", 1);
    assert_eq!(kept[0].attribute("id"), Some("clipitem-3"));
    let file = child(kept[0], "file");
    assert_eq!(file.attribute("id"), Some("file-2"));
    assert_eq!(child_text(file, "pathurl"), "file://localhost/shoot/Cam2.mov");
}

#[test]
fn test_premiere_duration_covers_untouched_tracks() {
    let csv = format!("{HEADER}\nA,00:00:01:00,00:00:02:00,only,Rose\n");
    let ws = Workspace::new("premiere/shared-track.xml", &csv);
    let output = std::fs::read_to_string(run_conversion(&ws.job(Default::default())).unwrap()).unwrap();
    let doc = parse(&output);

    assert_eq!(frames(&clipitems(&doc, "video", 0), "end"), vec![30]);
    let sequence = child(doc.root_element(), "sequence");
    assert_eq!(child_text(sequence, "duration"), "900");
}

#[test]
fn test_davinci_compound_clip_resource_left_alone() {
    let template = read_fixture("davinci/compound.fcpxml");
    let csv = format!("{HEADER}\nA,00:00:02:00,00:00:04:00,hello,Rose\n");
    let ws = Workspace::new("davinci/compound.fcpxml", &csv);
    let settings = ConversionSettings {
        format: OutputFormat::Davinci,
        ..Default::default()
    };
    let output = std::fs::read_to_string(run_conversion(&ws.job(settings)).unwrap()).unwrap();
    let doc = parse(&output);

    assert!(output.contains(block(&template, "<media id=\"r9\"", "</media>")));

    let project = doc.descendants().find(|n| n.has_tag_name("project")).unwrap();
    let sequence = child(project, "sequence");
    assert_eq!(sequence.attribute("duration"), Some("60/30s"));
    let primary: Vec<Node<'_, '_>> = child(sequence, "spine")
        .children()
        .filter(|n| n.is_element())
        .collect();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].tag_name().name(), "asset-clip");
    assert_eq!(primary[0].attribute("ref"), Some("r2"));
    assert_eq!(primary[0].attribute("start"), Some("60/30s"));
}
