//! Conversion jobs: CSV + template in, one XML document out.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{ConversionSettings, OutputFormat, Timeline};

use crate::merge::merge;
use crate::template::TemplateDocument;

/// A conversion ready to run.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Edit-decision CSV.
    pub csv_path: PathBuf,

    /// Template project in the output dialect.
    pub template_path: PathBuf,

    /// Output file; derived from the input names when `None`.
    pub output_path: Option<PathBuf>,

    pub settings: ConversionSettings,
}

impl ConversionJob {
    pub fn new(
        csv_path: impl Into<PathBuf>,
        template_path: impl Into<PathBuf>,
        settings: ConversionSettings,
    ) -> Self {
        Self {
            csv_path: csv_path.into(),
            template_path: template_path.into(),
            output_path: None,
            settings,
        }
    }

    /// Where the document will be written.
    pub fn output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| {
            default_output_path(&self.csv_path, &self.template_path, self.settings.format)
        })
    }
}

/// Everything a job computes before merging.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    pub template: TemplateDocument,
    pub timeline: Timeline,
}

/// Default output next to the CSV: `<csv>_cut_from_<template>.xml` for
/// Premiere, `<csv>_davinci.fcpxml` for DaVinci.
pub fn default_output_path(csv_path: &Path, template_path: &Path, format: OutputFormat) -> PathBuf {
    let stem = |path: &Path| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let file_name = match format {
        OutputFormat::Premiere => format!("{}_cut_from_{}.xml", stem(csv_path), stem(template_path)),
        OutputFormat::Davinci => format!("{}_davinci.fcpxml", stem(csv_path)),
    };
    csv_path
        .parent()
        .map_or_else(|| PathBuf::from(&file_name), |dir| dir.join(&file_name))
}

/// Read the inputs and lay out the timeline, without producing output.
pub fn prepare(job: &ConversionJob) -> ConvertResult<PreparedConversion> {
    for path in [&job.csv_path, &job.template_path] {
        if !path.exists() {
            return Err(ConvertError::FileNotFound { path: path.clone() });
        }
    }

    let rows = csvtoxml_assembly::read_rows(BufReader::new(File::open(&job.csv_path)?))?;
    let template = TemplateDocument::load(&job.template_path, job.settings.format)?;
    let timeline = csvtoxml_assembly::plan(&rows, template.layout(), &job.settings)?;

    Ok(PreparedConversion { template, timeline })
}

/// Run a conversion and return the path written.
///
/// Nothing is written unless every row converts; the output file is
/// replaced in one step.
pub fn run_conversion(job: &ConversionJob) -> ConvertResult<PathBuf> {
    tracing::info!(
        csv = %job.csv_path.display(),
        template = %job.template_path.display(),
        format = %job.settings.format,
        "Starting conversion"
    );

    let prepared = prepare(job)?;
    let document = merge(&prepared.template, &prepared.timeline, &job.settings)?;

    let output_path = job.output_path();
    write_atomic(&output_path, &document)?;

    tracing::info!(
        path = %output_path.display(),
        clips = prepared.timeline.clips.len(),
        duration = %prepared.timeline.duration().format(prepared.timeline.rate),
        "Conversion complete"
    );
    Ok(output_path)
}

/// Write `contents` to a temporary file beside `path`, then rename it
/// over `path`.
pub fn write_atomic(path: &Path, contents: &str) -> ConvertResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| ConvertError::Io(e.error))?;
    Ok(())
}
