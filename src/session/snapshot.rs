//! Player-state snapshot and restore around ad playback.
//!
//! Reloading a media element after swapping its source back is asynchronous
//! and has no single completion event, so restore polls for a non-empty
//! seekable range on a fixed 50 ms back-off with a capped attempt budget
//! before seeking to the saved position.

use crate::player::Playable;
use log::warn;

/// How often the restore poll re-checks the reloaded element
pub const RESTORE_POLL_INTERVAL_MS: u64 = 50;
/// How many polls before giving up and resuming without a seek
pub const RESTORE_POLL_ATTEMPTS: u32 = 20;

/// Player state captured on entering ad playback, consumed on leaving it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub src: String,
    pub content_type: String,
    pub current_time: f64,
    pub poster: Option<String>,
}

impl PlayerSnapshot {
    pub fn capture(player: &dyn Playable) -> Self {
        PlayerSnapshot {
            src: player.src().to_string(),
            content_type: player.content_type().to_string(),
            current_time: player.current_time(),
            poster: player.poster().map(str::to_string),
        }
    }
}

/// What beginning a restore asks of the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum RestoreStart {
    /// Source was swapped back and reloaded; poll until seekable.
    Polling,
    /// Source never changed; playback was resumed in place.
    Resumed,
    /// Content had already ended; nothing to resume.
    Finished,
}

/// In-flight restore of a reloaded content source.
#[derive(Debug)]
pub struct RestorePoll {
    target_time: f64,
    attempts_left: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Seekable range appeared; position restored and playback resumed.
    Done,
    /// Not ready yet; poll again after the interval.
    Retry,
    /// Attempt budget exhausted; playback resumed without the seek.
    GaveUp,
}

/// Begin restoring `snapshot` onto `player`. When the effective source
/// differs from the snapshot (the common case, since the ad replaced it)
/// the source is reset and reloaded and the caller must drive the returned
/// poll; otherwise playback simply resumes in place.
pub fn begin_restore(
    snapshot: &PlayerSnapshot,
    player: &mut dyn Playable,
) -> (RestoreStart, Option<RestorePoll>) {
    player.set_poster(snapshot.poster.as_deref());

    if player.src() != snapshot.src {
        player.set_src(&snapshot.src, &snapshot.content_type);
        player.load();
        (
            RestoreStart::Polling,
            Some(RestorePoll {
                target_time: snapshot.current_time,
                attempts_left: RESTORE_POLL_ATTEMPTS,
            }),
        )
    } else if !player.ended() {
        player.play();
        (RestoreStart::Resumed, None)
    } else {
        (RestoreStart::Finished, None)
    }
}

impl RestorePoll {
    /// One poll step. Call every [`RESTORE_POLL_INTERVAL_MS`] until it stops
    /// returning [`PollOutcome::Retry`].
    pub fn poll(&mut self, player: &mut dyn Playable) -> PollOutcome {
        if player.seekable_end().is_some() {
            player.seek(self.target_time);
            player.play();
            return PollOutcome::Done;
        }
        self.attempts_left = self.attempts_left.saturating_sub(1);
        if self.attempts_left == 0 {
            warn!("content source never became seekable after ad; resuming without seek");
            player.play();
            return PollOutcome::GaveUp;
        }
        PollOutcome::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::fake::FakePlayer;

    #[test]
    fn unchanged_source_resumes_without_reload() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        player.current_time = 12.0;
        let snapshot = PlayerSnapshot::capture(&player);

        let (start, poll) = begin_restore(&snapshot, &mut player);
        assert_eq!(start, RestoreStart::Resumed);
        assert!(poll.is_none());
        assert_eq!(player.play_calls, 1);
        assert_eq!(player.load_calls, 0);
        assert!(player.set_src_log.is_empty());
    }

    #[test]
    fn ended_content_is_left_alone() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let snapshot = PlayerSnapshot::capture(&player);
        player.ended = true;

        let (start, _) = begin_restore(&snapshot, &mut player);
        assert_eq!(start, RestoreStart::Finished);
        assert_eq!(player.play_calls, 0);
    }

    #[test]
    fn changed_source_reloads_and_polls_until_seekable() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        player.current_time = 30.0;
        let snapshot = PlayerSnapshot::capture(&player);

        // ad media was swapped in
        player.set_src("ad.mp4", "video/mp4");
        player.current_time = 3.0;

        let (start, poll) = begin_restore(&snapshot, &mut player);
        assert_eq!(start, RestoreStart::Polling);
        assert_eq!(player.src, "content.mp4");
        assert_eq!(player.load_calls, 1);

        let mut poll = poll.unwrap();
        assert_eq!(poll.poll(&mut player), PollOutcome::Retry);
        player.seekable = true;
        assert_eq!(poll.poll(&mut player), PollOutcome::Done);
        assert_eq!(player.current_time, 30.0);
        assert!(player.playing);
    }

    #[test]
    fn poll_gives_up_after_attempt_budget() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        let snapshot = PlayerSnapshot::capture(&player);
        player.set_src("ad.mp4", "video/mp4");

        let (_, poll) = begin_restore(&snapshot, &mut player);
        let mut poll = poll.unwrap();
        let mut outcome = PollOutcome::Retry;
        let mut steps = 0;
        while outcome == PollOutcome::Retry {
            outcome = poll.poll(&mut player);
            steps += 1;
            assert!(steps <= RESTORE_POLL_ATTEMPTS);
        }
        assert_eq!(outcome, PollOutcome::GaveUp);
        assert!(player.playing);
    }

    #[test]
    fn restore_puts_poster_back() {
        let mut player = FakePlayer::with_content("content.mp4", "video/mp4");
        player.poster = Some("poster.png".to_string());
        let snapshot = PlayerSnapshot::capture(&player);

        player.set_poster(None);
        player.set_src("ad.mp4", "video/mp4");
        begin_restore(&snapshot, &mut player);
        assert_eq!(player.poster.as_deref(), Some("poster.png"));
    }
}
