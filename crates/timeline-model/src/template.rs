//! What a template declares: media sources and lanes.
//!
//! The conversion never creates media; it only points at sources
//! listed here.

use serde::{Deserialize, Serialize};

use crate::timecode::FrameRate;

/// A media source declared by the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    /// Dialect-specific identifier (`file` id or FCPXML asset id).
    pub id: String,

    /// Declared display name.
    pub name: String,

    /// Location URL, when declared.
    pub path_url: Option<String>,

    /// Source length in template frames, when declared.
    pub duration_frames: Option<u64>,
}

impl MediaSource {
    /// Last path component of the location URL.
    pub fn file_name(&self) -> Option<&str> {
        let url = self.path_url.as_deref()?;
        let name = url.rsplit('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// Exact match against the declared name or the URL's file name.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.file_name() == Some(name)
    }
}

/// A track that can receive generated clips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    /// Lane index (0 = primary).
    pub index: usize,

    /// Media referenced by the lane's existing clips.
    pub home_media: Option<String>,
}

/// Media and lane declarations read from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLayout {
    /// The template's native rate.
    pub rate: FrameRate,

    /// Declared media, in document order, unique by id.
    pub media: Vec<MediaSource>,

    /// Lanes able to receive clips, in index order.
    pub lanes: Vec<Lane>,
}

impl TemplateLayout {
    pub fn media_by_id(&self, id: &str) -> Option<&MediaSource> {
        self.media.iter().find(|media| media.id == id)
    }

    pub fn media_by_name(&self, name: &str) -> Option<&MediaSource> {
        self.media.iter().find(|media| media.matches(name))
    }

    /// First lane whose existing clips reference `media_id`.
    pub fn lane_homed_on(&self, media_id: &str) -> Option<&Lane> {
        self.lanes
            .iter()
            .find(|lane| lane.home_media.as_deref() == Some(media_id))
    }
}
