//! VAST ad insertion and WebVTT caption toolkit.
//!
//! Two subsystems share this crate:
//!
//! - [`vast`] resolves VAST documents (wrapper chasing, tracking merge),
//!   tracks ad playback lifecycle events, and fires tracking pixels;
//!   [`session`] coordinates the hand-off between content and ad playback
//!   over the [`player::Playable`] capability trait.
//! - [`vtt`] parses WebVTT caption text into cues and lays the active cues
//!   out as non-overlapping boxes.

pub mod bus;
pub mod error;
pub mod player;
pub mod session;
pub mod timer;
pub mod vast;
pub mod vtt;
