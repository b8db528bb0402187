//! Preroll integration: glue between a resolved VAST response, the ad
//! session machine and the lifecycle tracker.
//!
//! The controller owns the session. Hosts forward named player events to it
//! (`request_play`, `notify_time_update`, ...); it decides when to start a
//! preroll, swaps the ad rendition into the player, drives the tracker, and
//! hands control back to content when the ad finishes, errors or is skipped.

use crate::bus::EventBus;
use crate::player::Playable;
use crate::vast::model::{Ad, Companion, Creative, LinearCreative, VastResponse, select_media_file};
use crate::vast::pixel::PixelSink;
use crate::vast::tracker::{Tracker, TrackerEvent};
use log::{debug, warn};
use std::rc::Rc;

use super::{AdSession, AdState, PlayerEvent, SessionConfig};

/// VAST error code: problem displaying the media file
const ERROR_MEDIA_PLAYBACK: u32 = 405;

/// What the controller reports to the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PrerollEvent {
    /// A resolved VAST response was attached
    VastReady,
    /// An ad rendition was loaded into the player and started
    PrerollStarted,
    /// The ad was torn down; content is being restored
    PrerollRemoved,
    /// Ads were abandoned for this content (no playable rendition, or the
    /// host canceled them)
    AdsCanceled,
    /// The viewer clicked the ad; carries the click-through destination
    AdClick(Option<String>),
}

pub struct PrerollConfig {
    pub session: SessionConfig,
    /// Ordered MIME-type preference for rendition selection
    pub preferred_mime_types: Vec<String>,
}

impl Default for PrerollConfig {
    fn default() -> Self {
        PrerollConfig {
            session: SessionConfig::default(),
            preferred_mime_types: vec![
                "video/mp4".to_string(),
                "video/webm".to_string(),
                "video/ogg".to_string(),
            ],
        }
    }
}

struct ActivePreroll {
    tracker: Tracker,
    ad: Ad,
}

pub struct PrerollController {
    session: AdSession,
    config: PrerollConfig,
    response: Option<VastResponse>,
    active: Option<ActivePreroll>,
    sink: Rc<dyn PixelSink>,
    bus: EventBus<PrerollEvent>,
}

impl PrerollController {
    pub fn new(config: PrerollConfig, sink: Rc<dyn PixelSink>) -> Self {
        PrerollController {
            session: AdSession::new(config.session),
            config,
            response: None,
            active: None,
            sink,
            bus: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus<PrerollEvent> {
        &self.bus
    }

    pub fn session(&self) -> &AdSession {
        &self.session
    }

    pub fn is_ad_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Companion banners of the ad currently playing, for the host to render.
    pub fn current_companions(&self) -> Vec<&Companion> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        active
            .ad
            .creatives
            .iter()
            .filter_map(|c| match c {
                Creative::Companion(cc) => Some(&cc.variations),
                Creative::Linear(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Attach a resolved VAST response for the current content.
    pub fn ads_ready(&mut self, response: VastResponse, player: &mut dyn Playable, now_ms: u64) {
        self.response = Some(response);
        self.bus.emit(&PrerollEvent::VastReady);
        self.session.dispatch(PlayerEvent::AdsReady, player, now_ms);
        self.maybe_start_preroll(player, now_ms);
    }

    /// The host gave up on ads for this content (e.g. the VAST request
    /// resolved to nothing).
    pub fn ads_canceled(&mut self, player: &mut dyn Playable, now_ms: u64) {
        self.response = None;
        self.bus.emit(&PrerollEvent::AdsCanceled);
        self.session.dispatch(PlayerEvent::AdTimeout, player, now_ms);
    }

    /// The viewer (or host) requested playback.
    pub fn request_play(&mut self, player: &mut dyn Playable, now_ms: u64) {
        if let Some(active) = &mut self.active {
            active.tracker.set_paused(false);
            return;
        }
        self.session.dispatch(PlayerEvent::Play, player, now_ms);
        self.maybe_start_preroll(player, now_ms);
    }

    pub fn notify_pause(&mut self) {
        if let Some(active) = &mut self.active {
            active.tracker.set_paused(true);
        }
    }

    pub fn notify_time_update(&mut self, time: f64) {
        if let Some(active) = &mut self.active {
            active.tracker.set_progress(time);
        }
    }

    /// The current media finished loading enough to play.
    pub fn notify_loaded(&mut self) {
        if let Some(active) = &mut self.active {
            active.tracker.load();
        }
    }

    pub fn notify_mute(&mut self, muted: bool) {
        if let Some(active) = &mut self.active {
            active.tracker.set_muted(muted);
        }
    }

    pub fn notify_fullscreen(&mut self, fullscreen: bool) {
        if let Some(active) = &mut self.active {
            active.tracker.set_fullscreen(fullscreen);
        }
    }

    /// Playback reached the end of the current media.
    pub fn notify_ended(&mut self, player: &mut dyn Playable, now_ms: u64) {
        if let Some(active) = &mut self.active {
            active.tracker.complete();
            self.end_preroll(player, now_ms);
        }
    }

    /// The media element reported a playback error.
    pub fn notify_media_error(&mut self, player: &mut dyn Playable, now_ms: u64) {
        if let Some(active) = &mut self.active {
            warn!("media error during ad playback");
            active.tracker.error_with_code(ERROR_MEDIA_PLAYBACK);
            self.end_preroll(player, now_ms);
        }
    }

    /// The content source changed.
    pub fn content_changed(&mut self, player: &mut dyn Playable, now_ms: u64) {
        self.response = None;
        self.session
            .dispatch(PlayerEvent::ContentUpdate, player, now_ms);
    }

    /// The viewer clicked the ad surface.
    pub fn click(&mut self) {
        if let Some(active) = &mut self.active {
            active.tracker.click();
        }
    }

    /// The viewer used the skip control. Ignored until the creative's skip
    /// threshold has been crossed.
    pub fn skip(&mut self, player: &mut dyn Playable, now_ms: u64) {
        let Some(active) = &mut self.active else {
            return;
        };
        if !active.tracker.is_skipable() {
            return;
        }
        active.tracker.skip();
        self.end_preroll(player, now_ms);
    }

    /// Fire any due timers. Call regularly with the current clock.
    pub fn tick(&mut self, now_ms: u64, player: &mut dyn Playable) {
        self.session.tick(now_ms, player);
    }

    pub fn dispose(&mut self) {
        self.session.dispose();
        self.active = None;
        self.response = None;
    }

    /// Start an ad if the session just moved into the preroll-wait state and
    /// the response holds a playable rendition.
    fn maybe_start_preroll(&mut self, player: &mut dyn Playable, now_ms: u64) {
        if self.session.state() != AdState::PrerollPending || self.active.is_some() {
            return;
        }

        let Some(picked) = self.pick_playable() else {
            debug!("no playable rendition in VAST response, resuming content");
            self.response = None;
            self.bus.emit(&PrerollEvent::AdsCanceled);
            self.session.dispatch(PlayerEvent::AdTimeout, player, now_ms);
            return;
        };
        let (ad, creative, media_url, mime_type) = picked;

        // Snapshot happens on entering ad playback, so the machine moves
        // first and the rendition is swapped in after.
        self.session.dispatch(PlayerEvent::AdStart, player, now_ms);
        if self.session.state() != AdState::AdPlayback {
            return;
        }

        player.set_src(&media_url, &mime_type);
        player.load();
        player.play();

        let tracker = Tracker::new(ad.clone(), creative, Rc::clone(&self.sink));
        let forward = self.bus.clone();
        tracker.events().subscribe(move |e| {
            if let TrackerEvent::ClickThrough(url) = e {
                forward.emit(&PrerollEvent::AdClick(url.clone()));
            }
        });

        self.active = Some(ActivePreroll { tracker, ad });
        self.bus.emit(&PrerollEvent::PrerollStarted);
    }

    /// First ad with a linear creative whose media files include a rendition
    /// matching the MIME preference.
    fn pick_playable(&self) -> Option<(Ad, LinearCreative, String, String)> {
        let response = self.response.as_ref()?;
        let prefs: Vec<&str> = self
            .config
            .preferred_mime_types
            .iter()
            .map(String::as_str)
            .collect();
        for ad in &response.ads {
            for creative in &ad.creatives {
                let Some(linear) = creative.as_linear() else {
                    continue;
                };
                if let Some(media) = select_media_file(&linear.media_files, &prefs) {
                    return Some((
                        ad.clone(),
                        linear.clone(),
                        media.url.clone(),
                        media.mime_type.clone(),
                    ));
                }
            }
        }
        None
    }

    fn end_preroll(&mut self, player: &mut dyn Playable, now_ms: u64) {
        self.active = None;
        self.bus.emit(&PrerollEvent::PrerollRemoved);
        self.session.dispatch(PlayerEvent::AdEnd, player, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::FakePlayer;
    use crate::vast::model::{Ad, MediaFile};
    use crate::vast::pixel::testing::RecordingSink;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn response_with_media(url: &str, mime: &str) -> VastResponse {
        let mut tracking = HashMap::new();
        tracking.insert(
            "start".to_string(),
            vec!["http://t.example/start".to_string()],
        );
        VastResponse {
            ads: vec![Ad {
                id: Some("ad-1".to_string()),
                impression_url_templates: vec!["http://t.example/imp".to_string()],
                error_url_templates: vec!["http://t.example/err?c=[ERRORCODE]".to_string()],
                creatives: vec![Creative::Linear(LinearCreative {
                    duration: 10.0,
                    skip_delay: 5.0,
                    media_files: vec![MediaFile {
                        url: url.to_string(),
                        mime_type: mime.to_string(),
                        ..Default::default()
                    }],
                    video_click_through_url: Some("http://landing.example".to_string()),
                    tracking_events: tracking,
                    ..Default::default()
                })],
                ..Default::default()
            }],
            error_url_templates: Vec::new(),
        }
    }

    fn controller() -> (PrerollController, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::default());
        let controller = PrerollController::new(PrerollConfig::default(), sink.clone());
        (controller, sink)
    }

    fn collect_events(controller: &PrerollController) -> Rc<RefCell<Vec<PrerollEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        controller
            .events()
            .subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn full_preroll_flow_plays_ad_then_restores_content() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, pixels) = controller();
        let events = collect_events(&controller);

        controller.request_play(&mut player, 0);
        controller.ads_ready(response_with_media("ad.mp4", "video/mp4"), &mut player, 10);

        assert!(controller.is_ad_playing());
        assert_eq!(player.src, "ad.mp4");
        assert!(player.playing);
        assert!(events.borrow().contains(&PrerollEvent::VastReady));
        assert!(events.borrow().contains(&PrerollEvent::PrerollStarted));

        controller.notify_loaded();
        assert!(pixels.urls().contains(&"http://t.example/imp".to_string()));

        controller.notify_time_update(1.0);
        assert!(pixels.urls().contains(&"http://t.example/start".to_string()));

        player.current_time = 10.0;
        player.ended = true;
        controller.notify_ended(&mut player, 10_000);

        assert!(!controller.is_ad_playing());
        assert!(events.borrow().contains(&PrerollEvent::PrerollRemoved));
        assert_eq!(controller.session().state(), AdState::ContentPlayback);
        assert_eq!(player.src, "content.mp4");
    }

    #[test]
    fn ads_ready_before_play_starts_on_play() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, _pixels) = controller();

        controller.ads_ready(response_with_media("ad.mp4", "video/mp4"), &mut player, 0);
        assert!(!controller.is_ad_playing());
        assert_eq!(controller.session().state(), AdState::AdsReady);

        controller.request_play(&mut player, 10);
        assert!(controller.is_ad_playing());
        assert_eq!(player.src, "ad.mp4");
    }

    #[test]
    fn unplayable_response_falls_back_to_content() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, _pixels) = controller();
        let events = collect_events(&controller);

        controller.request_play(&mut player, 0);
        controller.ads_ready(response_with_media("ad.mov", "video/quicktime"), &mut player, 10);

        assert!(!controller.is_ad_playing());
        assert!(events.borrow().contains(&PrerollEvent::AdsCanceled));
        assert_eq!(controller.session().state(), AdState::ContentPlayback);
        assert!(player.playing);
        assert_eq!(player.src, "content.mp4");
    }

    #[test]
    fn media_error_during_ad_fires_405_and_resumes_content() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, pixels) = controller();

        controller.request_play(&mut player, 0);
        controller.ads_ready(response_with_media("ad.mp4", "video/mp4"), &mut player, 10);
        assert!(controller.is_ad_playing());

        controller.notify_media_error(&mut player, 500);

        assert!(!controller.is_ad_playing());
        assert!(pixels.urls().contains(&"http://t.example/err?c=405".to_string()));
        assert_eq!(controller.session().state(), AdState::ContentPlayback);
        assert_eq!(player.src, "content.mp4");
    }

    #[test]
    fn click_reports_destination() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, _pixels) = controller();
        let events = collect_events(&controller);

        controller.request_play(&mut player, 0);
        controller.ads_ready(response_with_media("ad.mp4", "video/mp4"), &mut player, 10);
        controller.click();

        assert!(events.borrow().contains(&PrerollEvent::AdClick(Some(
            "http://landing.example".to_string()
        ))));
    }

    #[test]
    fn skip_only_works_past_threshold() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, _pixels) = controller();

        controller.request_play(&mut player, 0);
        controller.ads_ready(response_with_media("ad.mp4", "video/mp4"), &mut player, 10);

        controller.notify_time_update(2.0);
        controller.skip(&mut player, 100);
        assert!(controller.is_ad_playing());

        controller.notify_time_update(6.0);
        controller.skip(&mut player, 200);
        assert!(!controller.is_ad_playing());
        assert_eq!(controller.session().state(), AdState::ContentPlayback);
    }

    #[test]
    fn preroll_timeout_abandons_waiting_ad() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, _pixels) = controller();

        controller.request_play(&mut player, 0);
        controller.tick(1, &mut player);
        // integration never calls ads_ready; readiness times out
        controller.tick(5001, &mut player);

        assert_eq!(controller.session().state(), AdState::AdTimeoutPlayback);
        assert!(player.playing);
    }

    #[test]
    fn pause_and_resume_forward_to_tracker() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let (mut controller, pixels) = controller();

        controller.request_play(&mut player, 0);
        let mut response = response_with_media("ad.mp4", "video/mp4");
        if let Creative::Linear(linear) = &mut response.ads[0].creatives[0] {
            linear.tracking_events.insert(
                "pause".to_string(),
                vec!["http://t.example/pause".to_string()],
            );
        }
        controller.ads_ready(response, &mut player, 10);

        controller.notify_pause();
        controller.request_play(&mut player, 20);
        assert!(controller.is_ad_playing());
        assert!(pixels.urls().contains(&"http://t.example/pause".to_string()));
    }
}
