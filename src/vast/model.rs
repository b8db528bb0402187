use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::vast::time::INVALID_DURATION;

/// Top-level parse result: the ads of one VAST document plus the document's
/// own error-tracking URL templates.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct VastResponse {
    /// The Ad elements, in document order
    pub ads: Vec<Ad>,

    /// Top-level `<Error>` URL templates
    pub error_url_templates: Vec<String>,
}

/// One advertisement. Wrapper ads carry `next_wrapper_url` and are replaced
/// in place by their resolved inline ads during wrapper resolution, which
/// prefixes the wrapper's tracking lists onto the children's.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Ad {
    /// The ad ID attribute
    pub id: Option<String>,

    /// The ad system that served this ad
    pub system: Option<AdSystem>,

    /// The ad title (inline ads only)
    pub title: Option<String>,

    /// Error-tracking URL templates
    pub error_url_templates: Vec<String>,

    /// Impression URL templates
    pub impression_url_templates: Vec<String>,

    /// Creative elements, in document order
    pub creatives: Vec<Creative>,

    /// For wrapper ads, the next VAST document to fetch and merge
    pub next_wrapper_url: Option<String>,
}

/// The ad system name and version
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AdSystem {
    pub name: String,
    pub version: Option<String>,
}

/// A creative element: a linear (in-stream video) ad or a set of companion
/// banner variations.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum Creative {
    Linear(LinearCreative),
    Companion(CompanionCreative),
}

impl Creative {
    pub fn as_linear(&self) -> Option<&LinearCreative> {
        match self {
            Creative::Linear(l) => Some(l),
            Creative::Companion(_) => None,
        }
    }

    pub fn as_linear_mut(&mut self) -> Option<&mut LinearCreative> {
        match self {
            Creative::Linear(l) => Some(l),
            Creative::Companion(_) => None,
        }
    }
}

/// A linear video-ad creative
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LinearCreative {
    /// The creative ID attribute
    pub id: Option<String>,

    /// Duration in seconds; `-1` when the `<Duration>` text did not parse
    pub duration: f64,

    /// Seconds of playback before the ad becomes skipable; `-1` when absent
    pub skip_delay: f64,

    /// Playable renditions, in document order
    pub media_files: Vec<MediaFile>,

    /// The click-through destination URL
    pub video_click_through_url: Option<String>,

    /// Click-tracking URL templates
    pub video_click_tracking_url_templates: Vec<String>,

    /// Raw `<AdParameters>` payload, passed through to VPAID-style creatives
    pub ad_parameters: Option<String>,

    /// Tracking-event name -> URL templates
    pub tracking_events: HashMap<String, Vec<String>>,
}

impl Default for LinearCreative {
    fn default() -> Self {
        LinearCreative {
            id: None,
            duration: INVALID_DURATION,
            skip_delay: INVALID_DURATION,
            media_files: Vec::new(),
            video_click_through_url: None,
            video_click_tracking_url_templates: Vec::new(),
            ad_parameters: None,
            tracking_events: HashMap::new(),
        }
    }
}

impl LinearCreative {
    /// A linear creative outside a wrapper must carry a parseable duration.
    pub fn is_valid(&self, in_wrapper: bool) -> bool {
        in_wrapper || self.duration != INVALID_DURATION
    }

    /// `<AdParameters>` as key/value pairs when the payload is shaped like a
    /// query string; empty otherwise.
    pub fn ad_parameters_map(&self) -> Vec<(String, String)> {
        let Some(raw) = &self.ad_parameters else {
            return Vec::new();
        };
        raw.split('&')
            .filter_map(|pair| {
                let (k, v) = pair.split_once('=')?;
                if k.is_empty() {
                    return None;
                }
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }
}

/// A set of companion banner variations sharing one creative slot
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct CompanionCreative {
    /// The creative ID attribute
    pub id: Option<String>,

    /// The banner variations
    pub variations: Vec<Companion>,
}

/// How a companion banner's asset is delivered
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum CompanionResourceKind {
    Static,
    IFrame,
    Html,
}

/// One companion banner variation
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Companion {
    pub id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub resource_kind: CompanionResourceKind,
    /// Resource URL, or markup for HTML resources
    pub resource: String,
    pub click_through_url: Option<String>,
    /// Tracking-event name -> URL templates
    pub tracking_events: HashMap<String, Vec<String>>,
}

/// One playable rendition of a linear creative
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct MediaFile {
    /// The media file URL
    pub url: String,

    /// The media file MIME type
    pub mime_type: String,

    /// The media file codec
    pub codec: Option<String>,

    /// Delivery type: progressive or streaming
    pub delivery: Option<String>,

    /// The media file bitrate in kbps
    pub bitrate: Option<u32>,

    pub min_bitrate: Option<u32>,
    pub max_bitrate: Option<u32>,

    pub width: Option<u32>,
    pub height: Option<u32>,

    pub scalable: Option<bool>,
    pub maintain_aspect_ratio: Option<bool>,

    /// API framework the rendition requires (e.g. VPAID)
    pub api_framework: Option<String>,
}

/// Pick the first media file matching the player's ordered MIME-type
/// preference. Renditions demanding an API framework the player cannot run
/// are never picked.
pub fn select_media_file<'a>(
    media_files: &'a [MediaFile],
    preferred_mime_types: &[&str],
) -> Option<&'a MediaFile> {
    for mime in preferred_mime_types {
        if let Some(found) = media_files
            .iter()
            .filter(|m| m.api_framework.is_none())
            .find(|m| m.mime_type.eq_ignore_ascii_case(mime))
        {
            return Some(found);
        }
    }
    None
}
