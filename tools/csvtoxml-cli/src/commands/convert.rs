//! Convert a CSV into a timeline inside a template project.

use std::path::PathBuf;

use csvtoxml_common::config::AppConfig;
use csvtoxml_xml_export::{run_conversion, ConversionJob};

use super::SettingsArgs;

pub fn run(
    csv: PathBuf,
    template: PathBuf,
    output: Option<PathBuf>,
    args: &SettingsArgs,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let settings = args.resolve(config)?;
    let mut job = ConversionJob::new(csv, template, settings);
    job.output_path = output;

    let written = run_conversion(&job).map_err(|e| anyhow::anyhow!("Conversion failed: {e}"))?;
    println!("{}", written.display());
    Ok(())
}
