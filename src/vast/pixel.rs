//! Tracking-pixel dispatch and URL macro substitution.
//!
//! A tracking pixel is a fire-and-forget GET whose response body is never
//! read; only the side effect matters. Everything that fires pixels goes
//! through [`PixelSink`] so tests can assert on the exact URLs hit.

use crate::vast::time::format_playhead;
use log::debug;
use rand::Rng;

/// Fire-and-forget sink for tracking requests.
pub trait PixelSink {
    fn fire(&self, url: &str);
}

/// Sink that issues real GETs on the ambient tokio runtime, ignoring the
/// response entirely.
pub struct HttpPixelSink {
    client: reqwest::Client,
}

impl Default for HttpPixelSink {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPixelSink {
    pub fn new() -> Self {
        HttpPixelSink {
            client: reqwest::Client::new(),
        }
    }
}

impl PixelSink for HttpPixelSink {
    fn fire(&self, url: &str) {
        debug!("firing tracking pixel: {}", url);
        let request = self.client.get(url).send();
        tokio::spawn(async move {
            let _ = request.await;
        });
    }
}

/// Sink that drops every request, for hosts that disable tracking.
pub struct NullPixelSink;

impl PixelSink for NullPixelSink {
    fn fire(&self, _url: &str) {}
}

/// Substitute the standard VAST URL macros into a template.
///
/// `[CACHEBUSTING]` becomes a fresh random 8-digit number, `[CONTENTPLAYHEAD]`
/// the zero-padded playhead position, and `[ERRORCODE]` the supplied code
/// (left untouched when no code applies).
pub fn resolve_url(template: &str, playhead: f64, error_code: Option<u32>) -> String {
    let cachebuster: u32 = rand::thread_rng().gen_range(10_000_000..100_000_000);
    let mut resolved = template
        .replace("[CACHEBUSTING]", &cachebuster.to_string())
        .replace("[CONTENTPLAYHEAD]", &format_playhead(playhead));
    if let Some(code) = error_code {
        resolved = resolved.replace("[ERRORCODE]", &code.to_string());
    }
    resolved
}

/// Resolve and fire every template in a list.
pub fn fire_templates(
    sink: &dyn PixelSink,
    templates: &[String],
    playhead: f64,
    error_code: Option<u32>,
) {
    for template in templates {
        sink.fire(&resolve_url(template, playhead, error_code));
    }
}
