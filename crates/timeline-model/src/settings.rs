//! Conversion settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::timecode::FrameRate;

/// Output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Premiere Pro XMEML (Final Cut Pro 7 XML).
    #[default]
    Premiere,
    /// DaVinci Resolve FCPXML.
    Davinci,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Premiere => "premiere",
            Self::Davinci => "davinci",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "premiere" => Ok(Self::Premiere),
            "davinci" => Ok(Self::Davinci),
            other => Err(SettingsError(format!(
                "unknown format '{other}' (expected premiere or davinci)"
            ))),
        }
    }
}

/// Lane choice for rows that do not name a source file.
///
/// Every policy is deterministic: the same rows and template always give
/// the same lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Everything on lane 0.
    #[default]
    FirstTrack,
    /// The k-th clip row goes to lane `k mod lanes`.
    RoundRobin,
    /// Each distinct speaker, in order of first appearance, takes the
    /// next lane (wrapping).
    Speaker,
}

impl FallbackPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstTrack => "first-track",
            Self::RoundRobin => "round-robin",
            Self::Speaker => "speaker",
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-track" => Ok(Self::FirstTrack),
            "round-robin" => Ok(Self::RoundRobin),
            "speaker" => Ok(Self::Speaker),
            other => Err(SettingsError(format!(
                "unknown fallback policy '{other}' (expected first-track, round-robin or speaker)"
            ))),
        }
    }
}

/// An invalid setting value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SettingsError(pub String);

/// Typed parameters for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Output dialect.
    pub format: OutputFormat,

    /// Fallback gap length for gap rows without a usable span (seconds).
    pub gap_seconds: f64,

    /// Run rate; `None` uses the template's rate.
    pub frame_rate: Option<FrameRate>,

    /// Lane policy for rows without a source file.
    pub fallback: FallbackPolicy,

    /// Empty time inserted on a lane when the clip color changes (seconds).
    pub block_spacing_seconds: f64,

    /// Replacement name for the generated sequence.
    pub sequence_name: Option<String>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Premiere,
            gap_seconds: 5.0,
            frame_rate: None,
            fallback: FallbackPolicy::FirstTrack,
            block_spacing_seconds: 0.0,
            sequence_name: None,
        }
    }
}

impl ConversionSettings {
    /// Check numeric settings are usable.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, value) in [
            ("gap_seconds", self.gap_seconds),
            ("block_spacing_seconds", self.block_spacing_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
