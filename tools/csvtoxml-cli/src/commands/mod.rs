//! Subcommands and the conversion flags they share.

pub mod convert;
pub mod inspect;
pub mod plan;
pub mod validate;

use clap::Args;
use csvtoxml_common::config::AppConfig;
use csvtoxml_timeline_model::{ConversionSettings, FallbackPolicy, FrameRate, OutputFormat};

/// Conversion flags. Anything left unset comes from the config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Output dialect: premiere|davinci
    #[arg(short, long)]
    pub format: Option<String>,

    /// Length of gap rows without a usable span (seconds)
    #[arg(short, long)]
    pub gap_seconds: Option<f64>,

    /// Run frame rate, e.g. 30, 29.97 or 30000/1001 (default: the template's)
    #[arg(long)]
    pub frame_rate: Option<String>,

    /// Lane policy for rows without a source file: first-track|round-robin|speaker
    #[arg(long)]
    pub fallback: Option<String>,

    /// Empty time between clips of different colors (seconds)
    #[arg(long)]
    pub block_spacing: Option<f64>,

    /// Name for the generated sequence
    #[arg(long)]
    pub sequence_name: Option<String>,
}

impl SettingsArgs {
    /// Typed settings: flags first, then config defaults.
    pub fn resolve(&self, config: &AppConfig) -> anyhow::Result<ConversionSettings> {
        let defaults = &config.defaults;
        let settings = ConversionSettings {
            format: parse_format(self.format.as_deref().unwrap_or(&defaults.format))?,
            gap_seconds: self.gap_seconds.unwrap_or(defaults.gap_seconds),
            frame_rate: parse_rate(self.frame_rate.as_deref().or(defaults.frame_rate.as_deref()))?,
            fallback: self
                .fallback
                .as_deref()
                .unwrap_or(&defaults.fallback)
                .parse::<FallbackPolicy>()?,
            block_spacing_seconds: self.block_spacing.unwrap_or(defaults.block_spacing_seconds),
            sequence_name: self.sequence_name.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

pub fn parse_format(value: &str) -> anyhow::Result<OutputFormat> {
    Ok(value.parse::<OutputFormat>()?)
}

pub fn parse_rate(value: Option<&str>) -> anyhow::Result<Option<FrameRate>> {
    value
        .map(|rate| rate.parse::<FrameRate>().map_err(anyhow::Error::from))
        .transpose()
}
