//! CSV row model.
//!
//! The CSV is header-driven: columns are found by name, in any order.
//! Each record becomes a [`RawRow`] of trimmed strings, which
//! [`parse_row`] validates into a typed [`Segment`].

use std::io::Read;

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{
    ClipSegment, ColorField, FrameRate, GapSegment, Segment, Timecode, TimecodeError,
};

/// A CSV column the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Speaker,
    InPoint,
    OutPoint,
    Transcript,
    Color,
    SourceFile,
}

impl Column {
    pub const REQUIRED: [Column; 5] = [
        Self::Speaker,
        Self::InPoint,
        Self::OutPoint,
        Self::Transcript,
        Self::Color,
    ];

    /// Name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Speaker => "Speaker Name",
            Self::InPoint => "in point",
            Self::OutPoint => "out point",
            Self::Transcript => "transcript",
            Self::Color => "color",
            Self::SourceFile => "source file",
        }
    }

    /// Accepted header spellings.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Speaker => &["Speaker Name"],
            Self::InPoint => &["イン点", "In", "In Point"],
            Self::OutPoint => &["アウト点", "Out", "Out Point"],
            Self::Transcript => &["文字起こし", "Transcript", "Text"],
            Self::Color => &["色選択", "Color", "Color Label"],
            Self::SourceFile => &["ファイル名", "File Name", "Source File"],
        }
    }
}

/// Trimmed fields of one CSV record. `None` means the record has no
/// value at that column (short record or column not in the header).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data row (the first record after the header is 1).
    pub row: usize,
    pub speaker: Option<String>,
    pub in_point: Option<String>,
    pub out_point: Option<String>,
    pub text: Option<String>,
    pub color: Option<String>,
    pub source_file: Option<String>,
}

impl RawRow {
    fn get(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::Speaker => &self.speaker,
            Column::InPoint => &self.in_point,
            Column::OutPoint => &self.out_point,
            Column::Transcript => &self.text,
            Column::Color => &self.color,
            Column::SourceFile => &self.source_file,
        };
        value.as_deref()
    }

    /// Value at `column` if present and non-empty.
    fn non_empty(&self, column: Column) -> Option<&str> {
        self.get(column).filter(|value| !value.is_empty())
    }

    /// True when every required field is absent or empty.
    pub fn is_blank(&self) -> bool {
        Column::REQUIRED
            .iter()
            .all(|&column| self.non_empty(column).is_none())
    }
}

/// Read every record of a CSV document.
///
/// Fails with `MissingColumn` when a required header is absent. A UTF-8
/// byte order mark is ignored.
pub fn read_rows(mut reader: impl Read) -> ConvertResult<Vec<RawRow>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_csv(&content)
}

/// [`read_rows`] over an in-memory document.
pub fn parse_csv(content: &str) -> ConvertResult<Vec<RawRow>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ConvertError::csv(format!("failed to read header: {e}")))?
        .clone();

    let position = |column: Column| {
        headers
            .iter()
            .position(|header| column.aliases().contains(&header))
    };

    for column in Column::REQUIRED {
        if position(column).is_none() {
            return Err(ConvertError::MissingColumn {
                column: column.aliases()[0].to_string(),
            });
        }
    }

    let speaker = position(Column::Speaker);
    let in_point = position(Column::InPoint);
    let out_point = position(Column::OutPoint);
    let text = position(Column::Transcript);
    let color = position(Column::Color);
    let source_file = position(Column::SourceFile);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| ConvertError::csv(format!("row {row}: {e}")))?;
        let field = |position: Option<usize>| {
            position
                .and_then(|i| record.get(i))
                .map(|value| value.trim().to_string())
        };

        rows.push(RawRow {
            row,
            speaker: field(speaker),
            in_point: field(in_point),
            out_point: field(out_point),
            text: field(text),
            color: field(color),
            source_file: field(source_file),
        });
    }

    tracing::debug!(rows = rows.len(), "Read CSV records");
    Ok(rows)
}

/// Validate one row into a segment.
///
/// Returns `Ok(None)` for a blank row (every required field empty).
/// A row whose color is a `GAP_<N>` tag is a gap whatever else it holds;
/// its timecodes are optional but must be well-formed when given.
pub fn parse_row(raw: &RawRow, rate: FrameRate) -> ConvertResult<Option<Segment>> {
    if raw.is_blank() {
        return Ok(None);
    }
    let row = raw.row;

    let color_value = raw
        .non_empty(Column::Color)
        .ok_or_else(|| ConvertError::missing_field(row, Column::Color.label()))?;

    let color = color_value
        .parse::<ColorField>()
        .map_err(|e| ConvertError::UnknownColor { row, value: e.0 })?;

    let source_file = raw.non_empty(Column::SourceFile).map(str::to_string);

    match color {
        ColorField::Gap(tag) => {
            let in_point = raw
                .non_empty(Column::InPoint)
                .map(|value| parse_timecode(row, Column::InPoint, value, rate))
                .transpose()?;
            let out_point = raw
                .non_empty(Column::OutPoint)
                .map(|value| parse_timecode(row, Column::OutPoint, value, rate))
                .transpose()?;

            Ok(Some(Segment::Gap(GapSegment {
                row,
                tag,
                span: in_point.zip(out_point),
                label: raw.get(Column::Transcript).unwrap_or_default().to_string(),
                source_file,
            })))
        }
        ColorField::Label(color) => {
            let speaker = raw
                .get(Column::Speaker)
                .ok_or_else(|| ConvertError::missing_field(row, Column::Speaker.label()))?;
            let required = |column: Column| {
                raw.non_empty(column)
                    .ok_or_else(|| ConvertError::missing_field(row, column.label()))
            };
            let in_point = required(Column::InPoint)?;
            let out_point = required(Column::OutPoint)?;
            let text = required(Column::Transcript)?;

            Ok(Some(Segment::Clip(ClipSegment {
                row,
                speaker: speaker.to_string(),
                source_file,
                in_point: parse_timecode(row, Column::InPoint, in_point, rate)?,
                out_point: parse_timecode(row, Column::OutPoint, out_point, rate)?,
                text: text.to_string(),
                color,
            })))
        }
    }
}

/// Validate every row, keeping CSV order and skipping blank rows.
pub fn parse_rows(rows: &[RawRow], rate: FrameRate) -> ConvertResult<Vec<Segment>> {
    let mut segments = Vec::with_capacity(rows.len());
    for raw in rows {
        match parse_row(raw, rate)? {
            Some(segment) => segments.push(segment),
            None => tracing::debug!(row = raw.row, "Skipping blank row"),
        }
    }

    let gaps = segments.iter().filter(|s| s.is_gap()).count();
    tracing::info!(
        clips = segments.len() - gaps,
        gaps,
        "Parsed timeline rows"
    );
    Ok(segments)
}

fn parse_timecode(
    row: usize,
    column: Column,
    value: &str,
    rate: FrameRate,
) -> ConvertResult<Timecode> {
    Timecode::parse(value, rate).map_err(|e| match e {
        TimecodeError::Malformed { value, reason } => ConvertError::MalformedTimecode {
            row,
            field: column.label().to_string(),
            value,
            reason,
        },
        other => ConvertError::MalformedTimecode {
            row,
            field: column.label().to_string(),
            value: value.to_string(),
            reason: other.to_string(),
        },
    })
}
