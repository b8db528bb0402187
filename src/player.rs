//! Capability boundary to the host media element.
//!
//! Everything the ad session needs from the player that actually decodes
//! media goes through [`Playable`]; the widget framework, DOM and tech
//! selection behind it are out of scope here.

/// Playback operations the ad session drives on the host player.
pub trait Playable {
    fn play(&mut self);
    fn pause(&mut self);
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;

    fn src(&self) -> &str;
    fn content_type(&self) -> &str;
    /// Swaps the media source. Does not implicitly reload.
    fn set_src(&mut self, src: &str, content_type: &str);
    /// Asks the element to reload the current source.
    fn load(&mut self);

    fn current_time(&self) -> f64;
    fn seek(&mut self, time: f64);
    /// End of the seekable range, `None` while the element has no seekable
    /// data (e.g. right after a reload).
    fn seekable_end(&self) -> Option<f64>;

    fn poster(&self) -> Option<&str>;
    fn set_poster(&mut self, poster: Option<&str>);
}
