//! Loading template documents.

use std::path::Path;

use csvtoxml_common::error::{ConvertError, ConvertResult};
use csvtoxml_timeline_model::{OutputFormat, TemplateLayout};

use crate::merge::dialect_for;

const BOM: char = '\u{feff}';

/// A template's text together with the layout read from it.
///
/// The text is kept verbatim; merging splices into it rather than
/// re-serializing a tree.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    text: String,
    bom: bool,
    format: OutputFormat,
    layout: TemplateLayout,
}

impl TemplateDocument {
    /// Read and inspect a template file.
    pub fn load(path: &Path, format: OutputFormat) -> ConvertResult<Self> {
        if !path.exists() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let document = Self::parse(text, format)?;

        tracing::info!(
            path = %path.display(),
            format = %format,
            rate = %document.layout.rate,
            media = document.layout.media.len(),
            lanes = document.layout.lanes.len(),
            "Loaded template"
        );
        Ok(document)
    }

    /// Inspect template text in the given dialect.
    pub fn parse(text: impl Into<String>, format: OutputFormat) -> ConvertResult<Self> {
        let mut text = text.into();
        let bom = text.starts_with(BOM);
        if bom {
            text.drain(..BOM.len_utf8());
        }

        let layout = {
            let doc = parse_xml(&text)?;
            dialect_for(format).read_layout(&doc)?
        };
        for media in &layout.media {
            tracing::debug!(id = %media.id, name = %media.name, "Template media");
        }

        Ok(Self {
            text,
            bom,
            format,
            layout,
        })
    }

    /// Template text (without a byte order mark).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub(crate) fn has_bom(&self) -> bool {
        self.bom
    }
}

/// Parse XML text, allowing the `<!DOCTYPE>` both dialects carry.
pub(crate) fn parse_xml(text: &str) -> ConvertResult<roxmltree::Document<'_>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| ConvertError::template(format!("XML parse error: {e}")))
}
