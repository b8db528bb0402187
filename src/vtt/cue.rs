//! Timed text cues, regions and tracks.
//!
//! A cue caches its computed display box; the cache is invalidated whenever
//! a rendering-relevant setting changes, so layout only recomputes boxes for
//! cues that actually moved.

use crate::vtt::layout::BoxPosition;
use std::rc::Rc;

/// Cue writing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingDirection {
    #[default]
    Horizontal,
    /// `vertical:rl`, columns grow leftward
    VerticalGrowingLeft,
    /// `vertical:lr`, columns grow rightward
    VerticalGrowingRight,
}

/// Text alignment within the cue box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueAlign {
    Start,
    #[default]
    Center,
    End,
    Left,
    Right,
}

/// The `line` setting: a line index (snap-to-lines) or a free percentage
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CueLine {
    #[default]
    Auto,
    Number(f64),
}

/// The `position` setting along the writing axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CuePosition {
    #[default]
    Auto,
    Percent(f64),
}

/// One timed caption with WebVTT rendering settings.
#[derive(Debug, Clone)]
pub struct Cue {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    text: String,
    region: Option<String>,
    vertical: WritingDirection,
    snap_to_lines: bool,
    line: CueLine,
    position: CuePosition,
    size: f64,
    align: CueAlign,
    has_been_reset: bool,
    display_state: Option<Rc<BoxPosition>>,
}

impl Default for Cue {
    fn default() -> Self {
        Cue::new(0.0, 0.0, "")
    }
}

impl Cue {
    pub fn new(start_time: f64, end_time: f64, text: &str) -> Self {
        Cue {
            id: String::new(),
            start_time,
            end_time,
            text: text.to_string(),
            region: None,
            vertical: WritingDirection::default(),
            snap_to_lines: true,
            line: CueLine::Auto,
            position: CuePosition::Auto,
            size: 100.0,
            align: CueAlign::default(),
            has_been_reset: false,
            display_state: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.has_been_reset = true;
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region;
        self.has_been_reset = true;
    }

    pub fn vertical(&self) -> WritingDirection {
        self.vertical
    }

    pub fn set_vertical(&mut self, vertical: WritingDirection) {
        self.vertical = vertical;
        self.has_been_reset = true;
    }

    pub fn snap_to_lines(&self) -> bool {
        self.snap_to_lines
    }

    pub fn set_snap_to_lines(&mut self, snap: bool) {
        self.snap_to_lines = snap;
        self.has_been_reset = true;
    }

    pub fn line(&self) -> CueLine {
        self.line
    }

    pub fn set_line(&mut self, line: CueLine) {
        self.line = line;
        self.has_been_reset = true;
    }

    pub fn position(&self) -> CuePosition {
        self.position
    }

    pub fn set_position(&mut self, position: CuePosition) {
        self.position = position;
        self.has_been_reset = true;
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn set_size(&mut self, size: f64) {
        self.size = size;
        self.has_been_reset = true;
    }

    pub fn align(&self) -> CueAlign {
        self.align
    }

    pub fn set_align(&mut self, align: CueAlign) {
        self.align = align;
        self.has_been_reset = true;
    }

    /// Number of rendered text lines
    pub fn text_line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }

    /// Whether layout must recompute this cue's box
    pub fn needs_layout(&self) -> bool {
        self.has_been_reset || self.display_state.is_none()
    }

    pub fn display_state(&self) -> Option<&Rc<BoxPosition>> {
        self.display_state.as_ref()
    }

    /// Store a freshly computed box and mark the cue clean.
    pub fn set_display_state(&mut self, state: Rc<BoxPosition>) {
        self.display_state = Some(state);
        self.has_been_reset = false;
    }

    /// Whether `time` falls inside the cue's interval.
    pub fn is_active_at(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

/// Scroll behavior of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionScroll {
    #[default]
    None,
    Up,
}

/// A named rendering region declared in the document header.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    /// Width as a percentage of the viewport
    pub width: f64,
    /// Height in lines
    pub lines: u32,
    /// Anchor point within the region, `(x%, y%)`
    pub region_anchor: (f64, f64),
    /// Where the region anchor is pinned in the viewport, `(x%, y%)`
    pub viewport_anchor: (f64, f64),
    pub scroll: RegionScroll,
}

impl Default for Region {
    fn default() -> Self {
        Region {
            id: String::new(),
            width: 100.0,
            lines: 3,
            region_anchor: (0.0, 100.0),
            viewport_anchor: (0.0, 100.0),
            scroll: RegionScroll::None,
        }
    }
}

/// Track display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackMode {
    Disabled,
    #[default]
    Hidden,
    Showing,
}

/// An ordered list of cues (document order) plus a display mode.
#[derive(Debug, Default)]
pub struct TextTrack {
    pub label: String,
    pub language: String,
    pub mode: TrackMode,
    cues: Vec<Cue>,
}

impl TextTrack {
    pub fn new(label: &str, language: &str) -> Self {
        TextTrack {
            label: label.to_string(),
            language: language.to_string(),
            mode: TrackMode::default(),
            cues: Vec::new(),
        }
    }

    pub fn add_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn cues_mut(&mut self) -> &mut [Cue] {
        &mut self.cues
    }

    /// Indices of cues active at `time`, in document order. Empty while the
    /// track is disabled.
    pub fn active_cue_indices(&self, time: f64) -> Vec<usize> {
        if self.mode == TrackMode::Disabled {
            return Vec::new();
        }
        self.cues
            .iter()
            .enumerate()
            .filter(|(_, cue)| cue.is_active_at(time))
            .map(|(i, _)| i)
            .collect()
    }
}
