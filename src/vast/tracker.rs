//! Lifecycle tracking for one playing creative.
//!
//! Binds an `(Ad, LinearCreative)` pair to a live playback session: the host
//! feeds it playback time and state toggles, and it emits typed lifecycle
//! events plus tracking pixels for every event name the creative defines
//! URLs for. Events that fire "once" have their tracking-map entry deleted
//! after the fire, so the map only ever shrinks.

use crate::bus::EventBus;
use crate::vast::model::{Ad, LinearCreative};
use crate::vast::pixel::{PixelSink, fire_templates};
use crate::vast::time::INVALID_DURATION;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Lifecycle events a tracker emits locally on every firing, whether or not
/// the creative carries tracking URLs for them.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    CreativeView,
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    /// Whole-percent playback bucket
    Progress(u32),
    /// Seconds left until the ad becomes skipable; `0.0` exactly once when
    /// the threshold is crossed
    SkipCountdown(f64),
    Rewind,
    Mute,
    Unmute,
    Pause,
    Resume,
    Fullscreen,
    ExitFullscreen,
    Skip,
    Close,
    /// Carries the resolved click-through destination, if any
    ClickThrough(Option<String>),
    Error(u32),
}

pub struct Tracker {
    ad: Ad,
    creative: LinearCreative,
    /// Working copy of the creative's tracking map; once-fired entries are
    /// removed
    tracking: HashMap<String, Vec<String>>,
    fired_once: HashSet<&'static str>,
    bus: EventBus<TrackerEvent>,
    sink: Rc<dyn PixelSink>,

    progress: f64,
    asset_duration: f64,
    skip_delay: f64,
    skipable: bool,
    muted: bool,
    paused: bool,
    fullscreen: bool,
    impressions_fired: bool,
}

impl Tracker {
    pub fn new(ad: Ad, creative: LinearCreative, sink: Rc<dyn PixelSink>) -> Self {
        let tracking = creative.tracking_events.clone();
        let asset_duration = creative.duration;
        let skip_delay = creative.skip_delay;
        Tracker {
            ad,
            creative,
            tracking,
            fired_once: HashSet::new(),
            bus: EventBus::new(),
            sink,
            progress: 0.0,
            asset_duration,
            skip_delay,
            skipable: false,
            muted: false,
            paused: false,
            fullscreen: false,
            impressions_fired: false,
        }
    }

    pub fn events(&self) -> &EventBus<TrackerEvent> {
        &self.bus
    }

    pub fn creative(&self) -> &LinearCreative {
        &self.creative
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_skipable(&self) -> bool {
        self.skipable
    }

    /// The player reports a new playhead position. Drives skip countdown,
    /// `start`, whole-percent progress, quartiles and rewind detection.
    pub fn set_progress(&mut self, progress: f64) {
        if self.skip_delay != INVALID_DURATION && !self.skipable {
            if self.skip_delay > progress {
                self.bus
                    .emit(&TrackerEvent::SkipCountdown(self.skip_delay - progress));
            } else {
                self.skipable = true;
                self.bus.emit(&TrackerEvent::SkipCountdown(0.0));
            }
        }

        if progress > 0.0 {
            self.track_once("start", TrackerEvent::Start);

            if self.asset_duration > 0.0 {
                let percent = ((progress / self.asset_duration) * 100.0).round() as u32;
                self.track(
                    &format!("progress-{}%", percent.min(100)),
                    TrackerEvent::Progress(percent.min(100)),
                );

                let quartiles: [(&'static str, f64, TrackerEvent); 3] = [
                    (
                        "firstQuartile",
                        self.asset_duration * 0.25,
                        TrackerEvent::FirstQuartile,
                    ),
                    ("midpoint", self.asset_duration * 0.5, TrackerEvent::Midpoint),
                    (
                        "thirdQuartile",
                        self.asset_duration * 0.75,
                        TrackerEvent::ThirdQuartile,
                    ),
                ];
                for (name, target, event) in quartiles {
                    if progress >= target && progress <= target + 1.0 {
                        self.track_once(name, event);
                    }
                }
            }
        }

        if progress < self.progress {
            self.track("rewind", TrackerEvent::Rewind);
        }
        self.progress = progress;
    }

    pub fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            if muted {
                self.track("mute", TrackerEvent::Mute);
            } else {
                self.track("unmute", TrackerEvent::Unmute);
            }
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            self.paused = paused;
            if paused {
                self.track("pause", TrackerEvent::Pause);
            } else {
                self.track("resume", TrackerEvent::Resume);
            }
        }
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.fullscreen != fullscreen {
            self.fullscreen = fullscreen;
            if fullscreen {
                self.track("fullscreen", TrackerEvent::Fullscreen);
            } else {
                self.track("exitFullscreen", TrackerEvent::ExitFullscreen);
            }
        }
    }

    /// The creative's media has loaded: fire impressions and `creativeView`.
    pub fn load(&mut self) {
        if !self.impressions_fired {
            self.impressions_fired = true;
            fire_templates(
                self.sink.as_ref(),
                &self.ad.impression_url_templates,
                self.progress,
                None,
            );
        }
        self.track_once("creativeView", TrackerEvent::CreativeView);
    }

    /// Playback reached the end of the creative.
    pub fn complete(&mut self) {
        self.track_once("complete", TrackerEvent::Complete);
    }

    /// The ad was torn down before completing.
    pub fn stop(&mut self) {
        self.track("close", TrackerEvent::Close);
    }

    /// The viewer used the skip control. Only honored once skipable.
    pub fn skip(&mut self) {
        if self.skipable {
            self.track_once("skip", TrackerEvent::Skip);
        }
    }

    /// The viewer clicked the ad surface. Fires click-tracking pixels and
    /// hands the click-through destination to the host.
    pub fn click(&mut self) {
        fire_templates(
            self.sink.as_ref(),
            &self.creative.video_click_tracking_url_templates,
            self.progress,
            None,
        );
        self.bus.emit(&TrackerEvent::ClickThrough(
            self.creative.video_click_through_url.clone(),
        ));
    }

    /// Report a playback error against the ad's error templates.
    pub fn error_with_code(&mut self, code: u32) {
        fire_templates(
            self.sink.as_ref(),
            &self.ad.error_url_templates,
            self.progress,
            Some(code),
        );
        self.bus.emit(&TrackerEvent::Error(code));
    }

    /// Emit `event` locally and fire any tracking URLs registered for
    /// `name`.
    fn track(&mut self, name: &str, event: TrackerEvent) {
        self.bus.emit(&event);
        if let Some(urls) = self.tracking.get(name) {
            fire_templates(self.sink.as_ref(), urls, self.progress, None);
        }
    }

    /// As [`track`], but never fires a second time; the tracking-map entry
    /// is deleted after the first fire.
    fn track_once(&mut self, name: &'static str, event: TrackerEvent) {
        if !self.fired_once.insert(name) {
            return;
        }
        self.track(name, event);
        self.tracking.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vast::pixel::testing::RecordingSink;
    use std::cell::RefCell;

    fn creative(duration: f64, skip_delay: f64) -> LinearCreative {
        let mut tracking: HashMap<String, Vec<String>> = HashMap::new();
        for name in [
            "start",
            "firstQuartile",
            "midpoint",
            "thirdQuartile",
            "complete",
            "rewind",
        ] {
            tracking.insert(
                name.to_string(),
                vec![format!("http://t.example/{name}?t=[CONTENTPLAYHEAD]")],
            );
        }
        LinearCreative {
            duration,
            skip_delay,
            tracking_events: tracking,
            video_click_through_url: Some("http://landing.example".to_string()),
            video_click_tracking_url_templates: vec!["http://t.example/click".to_string()],
            ..Default::default()
        }
    }

    fn tracker_with_sink(duration: f64, skip_delay: f64) -> (Tracker, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::default());
        let ad = Ad {
            impression_url_templates: vec!["http://t.example/imp".to_string()],
            error_url_templates: vec!["http://t.example/err?c=[ERRORCODE]".to_string()],
            ..Default::default()
        };
        let tracker = Tracker::new(ad, creative(duration, skip_delay), sink.clone());
        (tracker, sink)
    }

    fn collect_events(tracker: &Tracker) -> Rc<RefCell<Vec<TrackerEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        tracker.events().subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn monotonic_progress_fires_start_and_quartiles_once() {
        let (mut tracker, pixels) = tracker_with_sink(20.0, INVALID_DURATION);
        let events = collect_events(&tracker);

        let mut t = 0.0;
        while t <= 20.0 {
            tracker.set_progress(t);
            t += 0.25;
        }
        tracker.complete();

        let seen = events.borrow();
        let count = |e: &TrackerEvent| seen.iter().filter(|s| *s == e).count();
        assert_eq!(count(&TrackerEvent::Start), 1);
        assert_eq!(count(&TrackerEvent::FirstQuartile), 1);
        assert_eq!(count(&TrackerEvent::Midpoint), 1);
        assert_eq!(count(&TrackerEvent::ThirdQuartile), 1);
        assert_eq!(count(&TrackerEvent::Complete), 1);
        assert_eq!(count(&TrackerEvent::Rewind), 0);

        let fired = pixels.urls();
        assert_eq!(
            fired.iter().filter(|u| u.contains("/midpoint")).count(),
            1
        );
        // once-fired entries are deleted from the working map
        assert!(!tracker.tracking.contains_key("start"));
        assert!(!tracker.tracking.contains_key("complete"));
        assert!(tracker.tracking.contains_key("rewind"));
    }

    #[test]
    fn refiring_complete_is_a_no_op() {
        let (mut tracker, pixels) = tracker_with_sink(10.0, INVALID_DURATION);
        tracker.complete();
        tracker.complete();
        assert_eq!(
            pixels.urls().iter().filter(|u| u.contains("/complete")).count(),
            1
        );
    }

    #[test]
    fn rewind_fires_on_backward_progress() {
        let (mut tracker, _pixels) = tracker_with_sink(60.0, INVALID_DURATION);
        let events = collect_events(&tracker);
        tracker.set_progress(10.0);
        tracker.set_progress(5.0);
        assert!(events.borrow().contains(&TrackerEvent::Rewind));
    }

    #[test]
    fn skip_countdown_crosses_threshold_exactly_once() {
        let (mut tracker, _pixels) = tracker_with_sink(30.0, 5.0);
        let events = collect_events(&tracker);

        tracker.set_progress(2.0);
        tracker.set_progress(6.0);
        tracker.set_progress(8.0);

        let seen = events.borrow();
        let countdowns: Vec<&TrackerEvent> = seen
            .iter()
            .filter(|e| matches!(e, TrackerEvent::SkipCountdown(_)))
            .collect();
        assert_eq!(countdowns.len(), 2);
        assert_eq!(*countdowns[0], TrackerEvent::SkipCountdown(3.0));
        assert_eq!(*countdowns[1], TrackerEvent::SkipCountdown(0.0));
        assert!(tracker.is_skipable());
    }

    #[test]
    fn skip_before_threshold_is_ignored() {
        let (mut tracker, pixels) = tracker_with_sink(30.0, 5.0);
        tracker.set_progress(2.0);
        tracker.skip();
        assert!(pixels.urls().iter().all(|u| !u.contains("skip")));
    }

    #[test]
    fn load_fires_impressions_once() {
        let (mut tracker, pixels) = tracker_with_sink(10.0, INVALID_DURATION);
        tracker.load();
        tracker.load();
        assert_eq!(
            pixels.urls().iter().filter(|u| *u == "http://t.example/imp").count(),
            1
        );
    }

    #[test]
    fn click_fires_tracking_and_reports_destination() {
        let (mut tracker, pixels) = tracker_with_sink(10.0, INVALID_DURATION);
        let events = collect_events(&tracker);
        tracker.click();
        assert!(pixels.urls().contains(&"http://t.example/click".to_string()));
        assert_eq!(
            events.borrow()[0],
            TrackerEvent::ClickThrough(Some("http://landing.example".to_string()))
        );
    }

    #[test]
    fn error_substitutes_code_macro() {
        let (mut tracker, pixels) = tracker_with_sink(10.0, INVALID_DURATION);
        tracker.error_with_code(405);
        assert_eq!(pixels.urls(), vec!["http://t.example/err?c=405"]);
    }

    #[test]
    fn progress_pixels_carry_playhead_macro() {
        let (mut tracker, pixels) = tracker_with_sink(20.0, INVALID_DURATION);
        tracker.set_progress(5.0);
        assert!(
            pixels
                .urls()
                .iter()
                .any(|u| u == "http://t.example/firstQuartile?t=00:00:05.000")
        );
    }
}
