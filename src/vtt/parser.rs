//! Streaming line-oriented WebVTT parser.
//!
//! Text may arrive in arbitrary chunks: [`WebVttParser::parse`] consumes as
//! many complete lines as the buffer holds and keeps the partial tail for
//! the next call; [`WebVttParser::flush`] drains the remainder and commits
//! any cue still being collected.
//!
//! A bad signature poisons the whole document. A malformed timing line only
//! discards that cue: the error is reported through the error handler and
//! input is skipped until the next blank line.

use crate::vtt::cue::{Cue, CueAlign, CueLine, CuePosition, Region, RegionScroll, WritingDirection};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

/// Parse failures reported through the error handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("malformed WebVTT signature")]
    BadSignature,
    #[error("malformed cue timing line: {0}")]
    BadTiming(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Waiting for the signature line
    Initial,
    /// Between the signature and the first blank line
    Header,
    /// Between cues: expecting an identifier, a timing line or a NOTE
    Id,
    /// Inside a NOTE block
    Note,
    /// Identifier consumed, expecting the timing line
    Cue,
    /// Collecting cue text lines
    CueText,
    /// Skipping a malformed cue until the next blank line
    BadCue,
    /// The document is not WebVTT; everything else is ignored
    BadWebVtt,
}

type ErrorHandler = Box<dyn FnMut(&ParsingError)>;

pub struct WebVttParser {
    state: ParserState,
    buffer: String,
    pending_id: String,
    pending: Option<Cue>,
    cues: Vec<Cue>,
    regions: HashMap<String, Region>,
    on_error: Option<ErrorHandler>,
}

impl Default for WebVttParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WebVttParser {
    pub fn new() -> Self {
        WebVttParser {
            state: ParserState::Initial,
            buffer: String::new(),
            pending_id: String::new(),
            pending: None,
            cues: Vec::new(),
            regions: HashMap::new(),
            on_error: None,
        }
    }

    /// Install a handler for recoverable parse errors.
    pub fn set_error_handler(&mut self, handler: impl FnMut(&ParsingError) + 'static) {
        self.on_error = Some(Box::new(handler));
    }

    /// Completed cues so far, in document order. Draining.
    pub fn take_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    /// Regions declared in the document header, by id.
    pub fn regions(&self) -> &HashMap<String, Region> {
        &self.regions
    }

    /// Whether the signature check rejected the document.
    pub fn is_poisoned(&self) -> bool {
        self.state == ParserState::BadWebVtt
    }

    /// Feed one chunk. Only complete lines are consumed; the partial tail
    /// waits for more input.
    pub fn parse(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        while let Some(line) = self.next_line() {
            self.handle_line(&line);
        }
    }

    /// Consume the buffered tail and finalize the cue being collected.
    pub fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            self.handle_line(&line);
        }
        if self.state == ParserState::CueText {
            self.commit_cue();
        }
        self.pending = None;
        if self.state != ParserState::BadWebVtt {
            self.state = ParserState::Id;
        }
    }

    /// Pop the next complete line off the buffer, normalizing `\r\n`, `\r`
    /// and `\n` endings.
    fn next_line(&mut self) -> Option<String> {
        let bytes = self.buffer.as_bytes();
        let mut end = None;
        for (i, b) in bytes.iter().enumerate() {
            match b {
                b'\n' => {
                    end = Some((i, i + 1));
                    break;
                }
                b'\r' => {
                    if i + 1 == bytes.len() {
                        // might be the first half of \r\n; wait for more
                        return None;
                    }
                    let skip = if bytes[i + 1] == b'\n' { i + 2 } else { i + 1 };
                    end = Some((i, skip));
                    break;
                }
                _ => {}
            }
        }
        let (line_end, rest_start) = end?;
        let line = self.buffer[..line_end].to_string();
        self.buffer.drain(..rest_start);
        Some(line)
    }

    fn handle_line(&mut self, line: &str) {
        match self.state {
            ParserState::Initial => self.handle_signature(line),
            ParserState::Header => self.handle_header(line),
            ParserState::Id => self.handle_id(line),
            ParserState::Note => {
                if line.trim().is_empty() {
                    self.state = ParserState::Id;
                }
            }
            ParserState::Cue => self.handle_timing(line),
            ParserState::CueText => self.handle_cue_text(line),
            ParserState::BadCue => {
                if line.trim().is_empty() {
                    self.state = ParserState::Id;
                }
            }
            ParserState::BadWebVtt => {}
        }
    }

    fn handle_signature(&mut self, line: &str) {
        let line = line.strip_prefix('\u{feff}').unwrap_or(line);
        let valid = line.starts_with("WEBVTT")
            && (line.len() == 6 || matches!(line.as_bytes()[6], b' ' | b'\t'));
        if valid {
            self.state = ParserState::Header;
        } else {
            self.report(&ParsingError::BadSignature);
            self.state = ParserState::BadWebVtt;
        }
    }

    fn handle_header(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.state = ParserState::Id;
            return;
        }
        if let Some(value) = line.strip_prefix("Region:") {
            if let Some(region) = parse_region(value) {
                debug!("declared region {}", region.id);
                self.regions.insert(region.id.clone(), region);
            }
        }
        // other header lines are metadata, ignored
    }

    fn handle_id(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if line.starts_with("NOTE") {
            self.state = ParserState::Note;
            return;
        }
        if line.contains("-->") {
            self.handle_timing(line);
            return;
        }
        self.pending_id = line.to_string();
        self.state = ParserState::Cue;
    }

    fn handle_timing(&mut self, line: &str) {
        match parse_timing_line(line, &self.regions) {
            Some(mut cue) => {
                cue.id = std::mem::take(&mut self.pending_id);
                self.pending = Some(cue);
                self.state = ParserState::CueText;
            }
            None => {
                self.pending_id.clear();
                self.report(&ParsingError::BadTiming(line.to_string()));
                self.state = ParserState::BadCue;
            }
        }
    }

    fn handle_cue_text(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.commit_cue();
            self.state = ParserState::Id;
            return;
        }
        if line.contains("-->") {
            // the next cue started without a separating blank line;
            // finish this one and reprocess the line as its timing
            self.commit_cue();
            self.handle_timing(line);
            return;
        }
        if let Some(cue) = &mut self.pending {
            let mut text = cue.text().to_string();
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(line);
            cue.set_text(&text);
        }
    }

    fn commit_cue(&mut self) {
        if let Some(cue) = self.pending.take() {
            self.cues.push(cue);
        }
    }

    fn report(&mut self, error: &ParsingError) {
        debug!("webvtt parse error: {}", error);
        if let Some(handler) = &mut self.on_error {
            handler(error);
        }
    }
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
pub fn parse_timestamp(input: &str) -> Option<f64> {
    let input = input.trim();
    let (clock, millis) = input.split_once('.')?;
    if millis.len() != 3 {
        return None;
    }
    let millis: u32 = millis.parse().ok()?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0u64, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [h, m, s] => (
            h.parse::<u64>().ok()?,
            m.parse::<u64>().ok()?,
            s.parse::<u64>().ok()?,
        ),
        _ => return None,
    };
    if minutes > 59 || seconds > 59 {
        return None;
    }
    Some((hours * 3600 + minutes * 60 + seconds) as f64 + f64::from(millis) / 1000.0)
}

/// Parse `<start> --> <end> [settings...]` into a cue with settings applied.
fn parse_timing_line(line: &str, regions: &HashMap<String, Region>) -> Option<Cue> {
    let (start_part, rest) = line.split_once("-->")?;
    let start = parse_timestamp(start_part)?;

    let rest = rest.trim_start();
    let (end_part, settings) = match rest.split_once(char::is_whitespace) {
        Some((end, settings)) => (end, settings),
        None => (rest, ""),
    };
    let end = parse_timestamp(end_part)?;
    if end <= start {
        return None;
    }

    let mut cue = Cue::new(start, end, "");
    apply_settings(&mut cue, settings, regions);
    Some(cue)
}

/// Apply `key:value` settings. Unknown keys and unparsable values are
/// ignored so the cue keeps its defaults.
fn apply_settings(cue: &mut Cue, settings: &str, regions: &HashMap<String, Region>) {
    for setting in settings.split_whitespace() {
        let Some((key, value)) = setting.split_once(':') else {
            continue;
        };
        match key {
            "line" => {
                // "line:0" snaps to line indices; "line:10%" is a free
                // percentage; an optional ",<align>" suffix is tolerated
                let value = value.split(',').next().unwrap_or(value);
                if let Some(percent) = parse_percentage(value) {
                    cue.set_snap_to_lines(false);
                    cue.set_line(CueLine::Number(percent));
                } else if let Ok(number) = value.parse::<f64>() {
                    cue.set_snap_to_lines(true);
                    cue.set_line(CueLine::Number(number));
                }
            }
            "position" => {
                let value = value.split(',').next().unwrap_or(value);
                if let Some(percent) = parse_percentage(value) {
                    cue.set_position(CuePosition::Percent(percent));
                }
            }
            "size" => {
                if let Some(percent) = parse_percentage(value) {
                    cue.set_size(percent);
                }
            }
            "align" => match value {
                "start" => cue.set_align(CueAlign::Start),
                // "middle" is the pre-standard spelling
                "center" | "middle" => cue.set_align(CueAlign::Center),
                "end" => cue.set_align(CueAlign::End),
                "left" => cue.set_align(CueAlign::Left),
                "right" => cue.set_align(CueAlign::Right),
                _ => {}
            },
            "vertical" => match value {
                "rl" => cue.set_vertical(WritingDirection::VerticalGrowingLeft),
                "lr" => cue.set_vertical(WritingDirection::VerticalGrowingRight),
                _ => {}
            },
            "region" => {
                if regions.contains_key(value) {
                    cue.set_region(Some(value.to_string()));
                }
            }
            _ => {}
        }
    }
}

/// `"NN%"` with `0 <= NN <= 100`
fn parse_percentage(value: &str) -> Option<f64> {
    let number = value.strip_suffix('%')?;
    let percent: f64 = number.parse().ok()?;
    if (0.0..=100.0).contains(&percent) {
        Some(percent)
    } else {
        None
    }
}

/// Parse the space-separated `key=value` settings of a `Region:` header.
fn parse_region(value: &str) -> Option<Region> {
    let mut region = Region::default();
    for setting in value.split_whitespace() {
        let (key, value) = setting.split_once('=')?;
        match key {
            "id" => region.id = value.to_string(),
            "width" => {
                if let Some(percent) = parse_percentage(value) {
                    region.width = percent;
                }
            }
            "lines" => {
                if let Ok(lines) = value.parse() {
                    region.lines = lines;
                }
            }
            "regionanchor" => {
                if let Some(anchor) = parse_anchor(value) {
                    region.region_anchor = anchor;
                }
            }
            "viewportanchor" => {
                if let Some(anchor) = parse_anchor(value) {
                    region.viewport_anchor = anchor;
                }
            }
            "scroll" => {
                if value == "up" {
                    region.scroll = RegionScroll::Up;
                }
            }
            _ => {}
        }
    }
    if region.id.is_empty() {
        None
    } else {
        Some(region)
    }
}

/// `"X%,Y%"`
fn parse_anchor(value: &str) -> Option<(f64, f64)> {
    let (x, y) = value.split_once(',')?;
    Some((parse_percentage(x)?, parse_percentage(y)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn parse_all(text: &str) -> Vec<Cue> {
        let mut parser = WebVttParser::new();
        parser.parse(text);
        parser.flush();
        parser.take_cues()
    }

    #[test]
    fn parses_cue_with_settings() {
        let cues = parse_all(
            "WEBVTT\n\n00:00:01.000 --> 00:00:04.000 align:start line:0\nHello world\n",
        );
        assert_eq!(cues.len(), 1);
        let cue = &cues[0];
        assert_eq!(cue.start_time, 1.0);
        assert_eq!(cue.end_time, 4.0);
        assert_eq!(cue.align(), CueAlign::Start);
        assert_eq!(cue.line(), CueLine::Number(0.0));
        assert!(cue.snap_to_lines());
        assert_eq!(cue.text(), "Hello world");
    }

    #[test]
    fn accepts_input_split_at_arbitrary_points() {
        let text = "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nfirst line\nsecond line\n\n";
        let mut parser = WebVttParser::new();
        for chunk in text.as_bytes().chunks(7) {
            parser.parse(std::str::from_utf8(chunk).unwrap());
        }
        parser.flush();
        let cues = parser.take_cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "first line\nsecond line");
    }

    #[test]
    fn bad_signature_poisons_document() {
        let mut parser = WebVttParser::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        parser.set_error_handler(move |e| sink.borrow_mut().push(e.clone()));

        parser.parse("WEBVT\n\n00:00:01.000 --> 00:00:04.000\nHello\n");
        parser.flush();

        assert!(parser.is_poisoned());
        assert!(parser.take_cues().is_empty());
        assert_eq!(*errors.borrow(), vec![ParsingError::BadSignature]);
    }

    #[test]
    fn signature_allows_trailing_text() {
        let cues = parse_all("WEBVTT - subtitles\n\n00:00.000 --> 00:01.000\nhi\n\n");
        assert_eq!(cues.len(), 1);
    }

    #[test]
    fn malformed_timing_discards_only_that_cue() {
        let mut parser = WebVttParser::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        parser.set_error_handler(move |e| sink.borrow_mut().push(e.clone()));

        parser.parse(
            "WEBVTT\n\n00:00:junk --> 00:00:04.000\nskipped\nmore skipped\n\n00:00:05.000 --> 00:00:06.000\nkept\n\n",
        );
        parser.flush();

        let cues = parser.take_cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "kept");
        assert!(matches!(errors.borrow()[0], ParsingError::BadTiming(_)));
    }

    #[test]
    fn arrow_in_cue_text_starts_next_cue() {
        let cues = parse_all(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nfirst\n00:00:03.000 --> 00:00:04.000\nsecond\n\n",
        );
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text(), "first");
        assert_eq!(cues[1].start_time, 3.0);
        assert_eq!(cues[1].text(), "second");
    }

    #[test]
    fn identifier_lines_are_kept() {
        let cues = parse_all("WEBVTT\n\nintro\n00:00:01.000 --> 00:00:02.000\nhello\n\n");
        assert_eq!(cues[0].id, "intro");
    }

    #[test]
    fn note_blocks_are_skipped() {
        let cues = parse_all(
            "WEBVTT\n\nNOTE this is a comment\nstill the comment\n\n00:00:01.000 --> 00:00:02.000\nhello\n\n",
        );
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "hello");
    }

    #[test]
    fn flush_commits_unterminated_cue() {
        let mut parser = WebVttParser::new();
        parser.parse("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nno trailing newline");
        parser.flush();
        let cues = parser.take_cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text(), "no trailing newline");
    }

    #[test]
    fn region_header_is_parsed_and_referenced() {
        let mut parser = WebVttParser::new();
        parser.parse(
            "WEBVTT\nRegion: id=fred width=40% lines=3 regionanchor=0%,100% viewportanchor=10%,90% scroll=up\n\n00:00:01.000 --> 00:00:02.000 region:fred\nhi\n\n",
        );
        parser.flush();

        let region = parser.regions().get("fred").unwrap();
        assert_eq!(region.width, 40.0);
        assert_eq!(region.lines, 3);
        assert_eq!(region.viewport_anchor, (10.0, 90.0));
        assert_eq!(region.scroll, RegionScroll::Up);

        let cues = parser.take_cues();
        assert_eq!(cues[0].region(), Some("fred"));
    }

    #[test]
    fn unknown_settings_keep_defaults() {
        let cues = parse_all(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000 align:diagonal size:banana wobble:9\nhi\n\n",
        );
        assert_eq!(cues[0].align(), CueAlign::Center);
        assert_eq!(cues[0].size(), 100.0);
    }

    #[test]
    fn percent_line_disables_snapping() {
        let cues = parse_all("WEBVTT\n\n00:00:01.000 --> 00:00:02.000 line:10%\nhi\n\n");
        assert!(!cues[0].snap_to_lines());
        assert_eq!(cues[0].line(), CueLine::Number(10.0));
    }

    #[test]
    fn end_not_after_start_is_malformed() {
        let mut parser = WebVttParser::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        parser.set_error_handler(move |e| sink.borrow_mut().push(e.clone()));
        parser.parse("WEBVTT\n\n00:00:04.000 --> 00:00:01.000\nhi\n\n");
        parser.flush();
        assert!(parser.take_cues().is_empty());
        assert_eq!(errors.borrow().len(), 1);
    }

    #[test]
    fn timestamps_parse_both_clock_shapes() {
        assert_eq!(parse_timestamp("00:00:01.000"), Some(1.0));
        assert_eq!(parse_timestamp("01:02:03.500"), Some(3723.5));
        assert_eq!(parse_timestamp("02:03.500"), Some(123.5));
        assert_eq!(parse_timestamp("00:61:00.000"), None);
        assert_eq!(parse_timestamp("00:00:01.00"), None);
        assert_eq!(parse_timestamp("garbage"), None);
    }
}
