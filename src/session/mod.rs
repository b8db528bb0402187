//! Ad-session state machine.
//!
//! One [`AdSession`] per player coordinates the hand-off between content
//! playback and ad playback. It is driven exclusively by named player events
//! dispatched through [`AdSession::dispatch`] and by its own timers, fired
//! from [`AdSession::tick`] with the caller's clock. Every transition runs
//! the old state's leave actions and the new state's enter actions.

pub mod preroll;
pub mod snapshot;

use crate::bus::EventBus;
use crate::player::Playable;
use crate::timer::{TimerId, TimerWheel};
use log::debug;
use snapshot::{PlayerSnapshot, PollOutcome, RESTORE_POLL_INTERVAL_MS, RestorePoll, RestoreStart};

/// Machine states. `AdsReadyPending` and `PrerollPending` are the waiting
/// states ("ads-ready?" / "preroll?") with timeouts attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdState {
    /// Initial: content source set, no ad activity yet
    ContentSet,
    /// The ad integration signaled readiness before play was requested
    AdsReady,
    /// Play was requested; waiting (bounded) for the ad integration
    AdsReadyPending,
    /// Waiting (bounded) for a preroll to start
    PrerollPending,
    /// An ad is playing; content state is snapshotted
    AdPlayback,
    /// Normal content playback
    ContentPlayback,
    /// Readiness timed out; content plays, ads may still attach later
    AdTimeoutPlayback,
}

/// Player events the machine consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Play,
    AdsReady,
    AdStart,
    AdEnd,
    AdTimeout,
    /// The content source changed outside ad playback
    ContentUpdate,
}

/// Events the machine publishes to the ad integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The integration may begin linear ad playback now
    ReadyForPreroll,
    /// The machine gave up waiting for the integration
    AdTimedOut,
    /// Content playback resumed after an ad (or after restore gave up)
    ContentResumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    AdsReadyTimeout,
    PrerollTimeout,
    CancelContentPlay,
    RestorePoll,
}

/// Timeouts for the two waiting states.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long to wait for `adsready` after a play request
    pub timeout_ms: u64,
    /// How long to wait for `adstart` after `ReadyForPreroll`
    pub preroll_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            timeout_ms: 5000,
            preroll_timeout_ms: 1000,
        }
    }
}

pub struct AdSession {
    state: AdState,
    config: SessionConfig,
    timers: TimerWheel<TimerKind>,
    ads_ready_timer: Option<TimerId>,
    preroll_timer: Option<TimerId>,
    cancel_play_timer: Option<TimerId>,
    restore_timer: Option<TimerId>,
    snapshot: Option<PlayerSnapshot>,
    pending_restore: Option<RestorePoll>,
    /// Spinner-equivalent flag while a preroll is being prepared
    ad_loading: bool,
    /// Set for the duration of ad playback
    ad_playing: bool,
    bus: EventBus<SessionEvent>,
}

impl AdSession {
    pub fn new(config: SessionConfig) -> Self {
        AdSession {
            state: AdState::ContentSet,
            config,
            timers: TimerWheel::new(),
            ads_ready_timer: None,
            preroll_timer: None,
            cancel_play_timer: None,
            restore_timer: None,
            snapshot: None,
            pending_restore: None,
            ad_loading: false,
            ad_playing: false,
            bus: EventBus::new(),
        }
    }

    pub fn state(&self) -> AdState {
        self.state
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.bus
    }

    pub fn is_ad_loading(&self) -> bool {
        self.ad_loading
    }

    pub fn is_ad_playing(&self) -> bool {
        self.ad_playing
    }

    /// Dispatch one player event: run the current state's handler for it
    /// (no-op if the state does not handle it), then run leave/enter actions
    /// if the handler moved the machine.
    pub fn dispatch(&mut self, event: PlayerEvent, player: &mut dyn Playable, now_ms: u64) {
        let old = self.state;
        let next = self.handle(event, player, now_ms);
        if let Some(next) = next {
            if next != old {
                debug!("ad session: {:?} -> {:?} on {:?}", old, next, event);
                self.leave(old, player, now_ms);
                self.state = next;
                self.enter(next, player, now_ms);
            }
        }
    }

    /// Fire any due timers. Call regularly with the current clock.
    pub fn tick(&mut self, now_ms: u64, player: &mut dyn Playable) {
        for kind in self.timers.due(now_ms) {
            match kind {
                TimerKind::AdsReadyTimeout => {
                    self.ads_ready_timer = None;
                    if self.state == AdState::AdsReadyPending {
                        debug!("ad session: readiness timeout");
                        self.bus.emit(&SessionEvent::AdTimedOut);
                        self.transition(AdState::AdTimeoutPlayback, player, now_ms);
                        player.play();
                    }
                }
                TimerKind::PrerollTimeout => {
                    self.preroll_timer = None;
                    if self.state == AdState::PrerollPending {
                        debug!("ad session: preroll timeout");
                        self.bus.emit(&SessionEvent::AdTimedOut);
                        self.transition(AdState::ContentPlayback, player, now_ms);
                        player.play();
                    }
                }
                TimerKind::CancelContentPlay => {
                    self.cancel_play_timer = None;
                    player.pause();
                }
                TimerKind::RestorePoll => {
                    self.restore_timer = None;
                    self.step_restore(player, now_ms);
                }
            }
        }
    }

    /// Cancel all outstanding timers and drop any in-flight restore.
    pub fn dispose(&mut self) {
        self.timers.clear();
        self.ads_ready_timer = None;
        self.preroll_timer = None;
        self.cancel_play_timer = None;
        self.restore_timer = None;
        self.pending_restore = None;
    }

    fn handle(
        &mut self,
        event: PlayerEvent,
        player: &mut dyn Playable,
        now_ms: u64,
    ) -> Option<AdState> {
        use AdState as S;
        use PlayerEvent as E;
        match (self.state, event) {
            (S::ContentSet, E::Play) => {
                self.cancel_content_play(now_ms);
                Some(S::AdsReadyPending)
            }
            (S::ContentSet, E::AdsReady) => Some(S::AdsReady),

            (S::AdsReady, E::Play) => {
                self.cancel_content_play(now_ms);
                Some(S::PrerollPending)
            }

            (S::AdsReadyPending, E::Play) | (S::PrerollPending, E::Play) => {
                self.cancel_content_play(now_ms);
                None
            }

            (S::AdsReadyPending, E::AdsReady) => Some(S::PrerollPending),
            (S::AdsReadyPending, E::AdTimeout) => {
                player.play();
                Some(S::ContentPlayback)
            }

            (S::PrerollPending, E::AdStart) => Some(S::AdPlayback),
            (S::PrerollPending, E::AdTimeout) => {
                player.play();
                Some(S::ContentPlayback)
            }

            (S::AdPlayback, E::AdEnd) => Some(S::ContentPlayback),

            (S::ContentPlayback, E::AdStart) => Some(S::AdPlayback),
            (S::ContentPlayback, E::ContentUpdate) | (S::AdTimeoutPlayback, E::ContentUpdate) => {
                if player.paused() {
                    Some(S::ContentSet)
                } else {
                    Some(S::AdsReadyPending)
                }
            }

            (S::AdTimeoutPlayback, E::AdsReady) => {
                if player.paused() {
                    Some(S::AdsReady)
                } else {
                    Some(S::PrerollPending)
                }
            }

            // unhandled event in this state
            _ => None,
        }
    }

    fn transition(&mut self, next: AdState, player: &mut dyn Playable, now_ms: u64) {
        let old = self.state;
        if next == old {
            return;
        }
        self.leave(old, player, now_ms);
        self.state = next;
        self.enter(next, player, now_ms);
    }

    fn enter(&mut self, state: AdState, player: &mut dyn Playable, now_ms: u64) {
        match state {
            AdState::AdsReadyPending => {
                let id =
                    self.timers
                        .schedule(now_ms, self.config.timeout_ms, TimerKind::AdsReadyTimeout);
                self.ads_ready_timer = Some(id);
            }
            AdState::PrerollPending => {
                self.ad_loading = true;
                let id = self.timers.schedule(
                    now_ms,
                    self.config.preroll_timeout_ms,
                    TimerKind::PrerollTimeout,
                );
                self.preroll_timer = Some(id);
                self.bus.emit(&SessionEvent::ReadyForPreroll);
            }
            AdState::AdPlayback => {
                self.clear_cancel_play();
                self.snapshot = Some(PlayerSnapshot::capture(player));
                // strip the native poster so it cannot flash over the ad
                player.set_poster(None);
                self.ad_playing = true;
            }
            AdState::ContentPlayback => {
                self.clear_cancel_play();
                self.bus.emit(&SessionEvent::ContentResumed);
            }
            AdState::AdTimeoutPlayback => {
                self.clear_cancel_play();
            }
            _ => (),
        }
    }

    /// A scheduled speculative pause is obsolete once the machine has
    /// decided playback should proceed.
    fn clear_cancel_play(&mut self) {
        if let Some(id) = self.cancel_play_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn leave(&mut self, state: AdState, player: &mut dyn Playable, now_ms: u64) {
        match state {
            AdState::AdsReadyPending => {
                if let Some(id) = self.ads_ready_timer.take() {
                    self.timers.cancel(id);
                }
            }
            AdState::PrerollPending => {
                if let Some(id) = self.preroll_timer.take() {
                    self.timers.cancel(id);
                }
                self.ad_loading = false;
            }
            AdState::AdPlayback => {
                self.ad_playing = false;
                if let Some(snapshot) = self.snapshot.take() {
                    self.begin_restore(&snapshot, player, now_ms);
                }
            }
            _ => (),
        }
    }

    /// Speculatively block the native play that raced ahead of ad readiness.
    /// Repeated play/pause churn coalesces into a single pause on the next
    /// tick; a no-op while a cancellation is already scheduled.
    fn cancel_content_play(&mut self, now_ms: u64) {
        if self
            .cancel_play_timer
            .is_some_and(|id| self.timers.is_pending(id))
        {
            return;
        }
        let id = self.timers.schedule(now_ms, 0, TimerKind::CancelContentPlay);
        self.cancel_play_timer = Some(id);
    }

    fn begin_restore(&mut self, snapshot: &PlayerSnapshot, player: &mut dyn Playable, now_ms: u64) {
        let (start, poll) = snapshot::begin_restore(snapshot, player);
        if start == RestoreStart::Polling {
            self.pending_restore = poll;
            let id = self
                .timers
                .schedule(now_ms, RESTORE_POLL_INTERVAL_MS, TimerKind::RestorePoll);
            self.restore_timer = Some(id);
        }
    }

    fn step_restore(&mut self, player: &mut dyn Playable, now_ms: u64) {
        let Some(poll) = self.pending_restore.as_mut() else {
            return;
        };
        match poll.poll(player) {
            PollOutcome::Retry => {
                let id =
                    self.timers
                        .schedule(now_ms, RESTORE_POLL_INTERVAL_MS, TimerKind::RestorePoll);
                self.restore_timer = Some(id);
            }
            PollOutcome::Done | PollOutcome::GaveUp => {
                self.pending_restore = None;
            }
        }
    }
}
