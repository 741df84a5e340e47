//! Color labels and gap tags from the CSV color column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of clip label colors a row may carry.
///
/// Names match Premiere Pro's label vocabulary exactly; matching is
/// case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorLabel {
    Violet,
    Rose,
    Mango,
    Yellow,
    Lavender,
    Caribbean,
    Tan,
    Forest,
    Blue,
    Purple,
    Teal,
    Brown,
    Gray,
    Iris,
    Cerulean,
    Magenta,
}

impl ColorLabel {
    pub const ALL: [ColorLabel; 16] = [
        Self::Violet,
        Self::Rose,
        Self::Mango,
        Self::Yellow,
        Self::Lavender,
        Self::Caribbean,
        Self::Tan,
        Self::Forest,
        Self::Blue,
        Self::Purple,
        Self::Teal,
        Self::Brown,
        Self::Gray,
        Self::Iris,
        Self::Cerulean,
        Self::Magenta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Violet => "Violet",
            Self::Rose => "Rose",
            Self::Mango => "Mango",
            Self::Yellow => "Yellow",
            Self::Lavender => "Lavender",
            Self::Caribbean => "Caribbean",
            Self::Tan => "Tan",
            Self::Forest => "Forest",
            Self::Blue => "Blue",
            Self::Purple => "Purple",
            Self::Teal => "Teal",
            Self::Brown => "Brown",
            Self::Gray => "Gray",
            Self::Iris => "Iris",
            Self::Cerulean => "Cerulean",
            Self::Magenta => "Magenta",
        }
    }

    /// Label name in XMEML (`labels/label2`).
    pub fn premiere_label(self) -> &'static str {
        self.as_str()
    }

    /// Nearest DaVinci Resolve clip color.
    pub fn davinci_color(self) -> &'static str {
        match self {
            Self::Violet | Self::Iris => "violet",
            Self::Rose => "rose",
            Self::Mango => "orange",
            Self::Yellow => "yellow",
            Self::Lavender => "lavender",
            Self::Caribbean | Self::Teal => "cyan",
            Self::Tan | Self::Gray => "sand",
            Self::Forest => "green",
            Self::Blue | Self::Cerulean => "blue",
            Self::Purple => "purple",
            Self::Brown => "sepia",
            Self::Magenta => "pink",
        }
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A color value that is not a known label and not a gap tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for ColorLabel {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

/// A `GAP_<N>` marker. `N` only disambiguates rows; it carries no order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GapTag(String);

impl GapTag {
    /// Parse the exact form `GAP_` followed by one or more ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix("GAP_")?;
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The disambiguating suffix (`"1"` for `GAP_1`).
    pub fn suffix(&self) -> &str {
        &self.0["GAP_".len()..]
    }
}

impl fmt::Display for GapTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the color column of a row says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorField {
    Label(ColorLabel),
    Gap(GapTag),
}

impl FromStr for ColorField {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(tag) = GapTag::parse(s) {
            return Ok(Self::Gap(tag));
        }
        s.parse().map(Self::Label)
    }
}
