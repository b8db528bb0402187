//! Wrapper-chain resolution.
//!
//! Takes a VAST endpoint URL and produces a flat, fully-inline ad list:
//! wrapper ads are fetched, their children resolved recursively, and the
//! wrapper's tracking URLs folded onto the resolved creatives. Every failure
//! degrades to "fewer ads" plus an error pixel; nothing here surfaces an
//! error to the caller beyond an empty result.

use crate::vast::fetch::Fetcher;
use crate::vast::model::{Ad, Creative, VastResponse};
use crate::vast::parser::parse_vast;
use crate::vast::pixel::{PixelSink, fire_templates};
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;

/// Maximum number of wrapper hops to follow before pruning a branch
pub const MAX_WRAPPER_DEPTH: usize = 10;

/// VAST error code: XML parsing error
const ERROR_XML_PARSE: u32 = 101;
/// VAST error code: wrapper fetch timeout/failure
const ERROR_WRAPPER_FETCH: u32 = 301;
/// VAST error code: wrapper limit reached (cycle or depth)
const ERROR_WRAPPER_LIMIT: u32 = 302;
/// VAST error code: no ads after resolution
const ERROR_NO_ADS: u32 = 303;

pub struct Resolver<'a> {
    fetcher: &'a dyn Fetcher,
    pixels: &'a dyn PixelSink,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, pixels: &'a dyn PixelSink) -> Self {
        Resolver { fetcher, pixels }
    }

    /// Fetch and fully resolve the VAST document at `url`.
    ///
    /// Resolves to `None` when the fetch fails, the document is not VAST, or
    /// zero ads survive wrapper resolution (the no-ads case also fires the
    /// top-level error pixels with code 303).
    pub async fn resolve(&self, url: &str) -> Option<VastResponse> {
        let xml = match self.fetcher.fetch(url).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!("failed to fetch VAST document {}: {}", url, e);
                return None;
            }
        };

        let chain = vec![url.to_string()];
        let response = self.resolve_document(&xml, url.to_string(), chain).await?;

        if response.ads.is_empty() {
            debug!("no ads after wrapper resolution of {}", url);
            fire_templates(
                self.pixels,
                &response.error_url_templates,
                0.0,
                Some(ERROR_NO_ADS),
            );
            return None;
        }
        Some(response)
    }

    /// Resolve one document's ads, recursing into wrappers. `chain` holds
    /// every URL fetched along this branch, for cycle and depth guards.
    fn resolve_document<'f>(
        &'f self,
        xml: &'f str,
        base_url: String,
        chain: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Option<VastResponse>> + 'f>> {
        Box::pin(async move {
            let outcome = match parse_vast(xml) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("failed to parse VAST document {}: {}", base_url, e);
                    return None;
                }
            };

            let mut response = VastResponse {
                ads: Vec::new(),
                error_url_templates: outcome.response.error_url_templates,
            };

            for _ in 0..outcome.malformed_ads {
                fire_templates(
                    self.pixels,
                    &response.error_url_templates,
                    0.0,
                    Some(ERROR_XML_PARSE),
                );
            }

            for ad in outcome.response.ads {
                match &ad.next_wrapper_url {
                    None => response.ads.push(ad),
                    Some(next) => {
                        let next = next.clone();
                        let resolved = self.resolve_wrapper(&ad, &next, &base_url, &chain).await;
                        response.ads.extend(resolved);
                    }
                }
            }

            Some(response)
        })
    }

    /// Chase one wrapper ad. Returns the resolved child ads with the
    /// wrapper's tracking merged in, or nothing when the branch is pruned.
    async fn resolve_wrapper(
        &self,
        wrapper: &Ad,
        next_url: &str,
        base_url: &str,
        chain: &[String],
    ) -> Vec<Ad> {
        let target = resolve_relative(base_url, next_url);

        if chain.iter().any(|seen| *seen == target) {
            warn!("wrapper cycle detected at {}, pruning", target);
            self.fire_ad_errors(wrapper, ERROR_WRAPPER_LIMIT);
            return Vec::new();
        }
        if chain.len() >= MAX_WRAPPER_DEPTH {
            warn!("wrapper depth limit reached at {}, pruning", target);
            self.fire_ad_errors(wrapper, ERROR_WRAPPER_LIMIT);
            return Vec::new();
        }

        debug!("following wrapper: {}", target);
        let xml = match self.fetcher.fetch(&target).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!("wrapper fetch failed for {}: {}", target, e);
                self.fire_ad_errors(wrapper, ERROR_WRAPPER_FETCH);
                return Vec::new();
            }
        };

        let mut next_chain = chain.to_vec();
        next_chain.push(target.clone());

        let child = self.resolve_document(&xml, target, next_chain).await;
        let child_ads = match child {
            Some(response) if !response.ads.is_empty() => response.ads,
            _ => {
                self.fire_ad_errors(wrapper, ERROR_NO_ADS);
                return Vec::new();
            }
        };

        child_ads
            .into_iter()
            .map(|mut ad| {
                merge_wrapper_into_ad(wrapper, &mut ad);
                ad
            })
            .collect()
    }

    fn fire_ad_errors(&self, ad: &Ad, code: u32) {
        fire_templates(self.pixels, &ad.error_url_templates, 0.0, Some(code));
    }
}

/// Resolve a possibly-relative wrapper URL against the document it came from.
fn resolve_relative(base_url: &str, next_url: &str) -> String {
    match url::Url::parse(next_url) {
        Ok(absolute) => absolute.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => match url::Url::parse(base_url) {
            Ok(base) => base
                .join(next_url)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| next_url.to_string()),
            Err(_) => next_url.to_string(),
        },
        Err(_) => next_url.to_string(),
    }
}

/// Prefix the wrapper's tracking onto a resolved child ad: error and
/// impression templates at the ad level, tracking-event and click-tracking
/// templates onto every creative.
fn merge_wrapper_into_ad(wrapper: &Ad, child: &mut Ad) {
    prefix(&mut child.error_url_templates, &wrapper.error_url_templates);
    prefix(
        &mut child.impression_url_templates,
        &wrapper.impression_url_templates,
    );

    for wrapper_creative in &wrapper.creatives {
        match wrapper_creative {
            Creative::Linear(wl) => {
                for child_creative in &mut child.creatives {
                    if let Some(cl) = child_creative.as_linear_mut() {
                        for (event, urls) in &wl.tracking_events {
                            let entry = cl.tracking_events.entry(event.clone()).or_default();
                            prefix(entry, urls);
                        }
                        prefix(
                            &mut cl.video_click_tracking_url_templates,
                            &wl.video_click_tracking_url_templates,
                        );
                    }
                }
            }
            Creative::Companion(wc) => {
                for wrapper_variation in &wc.variations {
                    for child_creative in &mut child.creatives {
                        if let Creative::Companion(cc) = child_creative {
                            for child_variation in &mut cc.variations {
                                for (event, urls) in &wrapper_variation.tracking_events {
                                    let entry = child_variation
                                        .tracking_events
                                        .entry(event.clone())
                                        .or_default();
                                    prefix(entry, urls);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn prefix(dest: &mut Vec<String>, head: &[String]) {
    if head.is_empty() {
        return;
    }
    let mut merged = head.to_vec();
    merged.append(dest);
    *dest = merged;
}
