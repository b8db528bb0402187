use crate::error::{Result, VastError};
use crate::vast::model::*;
use crate::vast::time::{parse_duration, parse_skip_delay};
use log::warn;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::str::from_utf8;

/// Result of parsing one VAST document. `malformed_ads` counts `<Ad>`
/// elements that were dropped for being unparsable; the resolver turns each
/// into an error-pixel fire (code 101).
#[derive(Debug)]
pub struct ParseOutcome {
    pub response: VastResponse,
    pub malformed_ads: u32,
}

/// Parse a VAST XML string.
///
/// Fails hard only when the document root is not a `VAST` element or the XML
/// itself is broken at the top level; a malformed `<Ad>` child is skipped
/// and counted instead of aborting the document.
pub fn parse_vast(xml: &str) -> Result<ParseOutcome> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    // Look for the VAST root element
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"VAST" => {
                return parse_document(&mut reader);
            }
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) => return Err(VastError::NotVast),
            Ok(Event::Eof) => return Err(VastError::NotVast),
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }
}

/// Parse the children of the VAST root: top-level `<Error>` templates and
/// `<Ad>` elements.
fn parse_document(reader: &mut Reader<&[u8]>) -> Result<ParseOutcome> {
    let mut response = VastResponse::default();
    let mut malformed_ads = 0;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Ad" => match parse_ad_element(reader, e) {
                    Ok(Some(ad)) => response.ads.push(ad),
                    Ok(None) => malformed_ads += 1,
                    Err(e) => return Err(e),
                },
                b"Error" => {
                    response.error_url_templates.push(read_text_element(reader)?);
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"VAST" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(ParseOutcome {
        response,
        malformed_ads,
    })
}

/// Parse a single Ad element. Returns `Ok(None)` for an ad that carries
/// neither a usable InLine nor a Wrapper.
fn parse_ad_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Option<Ad>> {
    let mut ad = Ad {
        id: attr_string(start, b"id"),
        ..Default::default()
    };
    let mut has_unit = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"InLine" => {
                    parse_inline_element(reader, &mut ad)?;
                    has_unit = true;
                }
                b"Wrapper" => {
                    parse_wrapper_element(reader, &mut ad)?;
                    has_unit = ad.next_wrapper_url.is_some();
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Ad" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    if !has_unit {
        warn!("dropping Ad {:?}: no InLine or Wrapper unit", ad.id);
        return Ok(None);
    }
    Ok(Some(ad))
}

/// Parse an InLine element into the flat ad
fn parse_inline_element(reader: &mut Reader<&[u8]>, ad: &mut Ad) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"AdSystem" => {
                    ad.system = Some(parse_ad_system(reader, e)?);
                }
                b"AdTitle" => {
                    ad.title = Some(read_text_element(reader)?);
                }
                b"Impression" => {
                    push_nonempty(&mut ad.impression_url_templates, read_text_element(reader)?);
                }
                b"Error" => {
                    push_nonempty(&mut ad.error_url_templates, read_text_element(reader)?);
                }
                b"Creatives" => {
                    ad.creatives = parse_creatives(reader, false)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"InLine" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

/// Parse a Wrapper element into the flat ad. Wrapper creatives exist only to
/// contribute tracking URLs to the resolved child, so their durations are
/// allowed to be absent.
fn parse_wrapper_element(reader: &mut Reader<&[u8]>, ad: &mut Ad) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"AdSystem" => {
                    ad.system = Some(parse_ad_system(reader, e)?);
                }
                b"VASTAdTagURI" => {
                    let uri = read_text_element(reader)?;
                    if !uri.is_empty() {
                        ad.next_wrapper_url = Some(uri);
                    }
                }
                b"Impression" => {
                    push_nonempty(&mut ad.impression_url_templates, read_text_element(reader)?);
                }
                b"Error" => {
                    push_nonempty(&mut ad.error_url_templates, read_text_element(reader)?);
                }
                b"Creatives" => {
                    ad.creatives = parse_creatives(reader, true)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Wrapper" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

/// Parse a Creatives element
fn parse_creatives(reader: &mut Reader<&[u8]>, in_wrapper: bool) -> Result<Vec<Creative>> {
    let mut creatives = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Creative" => {
                let id = attr_string(e, b"id");
                if let Some(creative) = parse_creative(reader, id, in_wrapper)? {
                    creatives.push(creative);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Creatives" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(creatives)
}

/// Parse a Creative element into a Linear or Companion creative
fn parse_creative(
    reader: &mut Reader<&[u8]>,
    id: Option<String>,
    in_wrapper: bool,
) -> Result<Option<Creative>> {
    let mut creative = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Linear" => {
                    let linear = parse_linear(reader, e, id.clone())?;
                    if linear.is_valid(in_wrapper) {
                        creative = Some(Creative::Linear(linear));
                    } else {
                        warn!("dropping linear creative {:?}: unparsable duration", id);
                    }
                }
                b"CompanionAds" => {
                    creative = Some(Creative::Companion(parse_companion_ads(reader, id.clone())?));
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Creative" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(creative)
}

/// Parse a Linear element
fn parse_linear(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    id: Option<String>,
) -> Result<LinearCreative> {
    let mut linear = LinearCreative {
        id,
        ..Default::default()
    };
    let skip_offset = attr_string(start, b"skipoffset");

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Duration" => {
                    linear.duration = parse_duration(&read_text_element(reader)?);
                }
                b"MediaFiles" => {
                    linear.media_files = parse_media_files(reader)?;
                }
                b"VideoClicks" => {
                    parse_video_clicks(reader, &mut linear)?;
                }
                b"TrackingEvents" => {
                    linear.tracking_events = parse_tracking_events(reader)?;
                }
                b"AdParameters" => {
                    linear.ad_parameters = Some(read_text_element(reader)?);
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Linear" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    // skipoffset may be a percentage of the duration, so resolve it last
    if let Some(offset) = skip_offset {
        linear.skip_delay = parse_skip_delay(&offset, linear.duration);
    }

    Ok(linear)
}

/// Parse a MediaFiles element
fn parse_media_files(reader: &mut Reader<&[u8]>) -> Result<Vec<MediaFile>> {
    let mut media_files = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"MediaFile" => {
                let media_file = parse_media_file(reader, e)?;
                if !media_file.url.is_empty() {
                    media_files.push(media_file);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"MediaFiles" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(media_files)
}

/// Parse a MediaFile element
fn parse_media_file(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<MediaFile> {
    let mut media_file = MediaFile::default();

    for attr in start.attributes().flatten() {
        let Ok(value) = from_utf8(&attr.value) else {
            continue;
        };
        match attr.key.as_ref() {
            b"type" => media_file.mime_type = value.to_string(),
            b"codec" => media_file.codec = Some(value.to_string()),
            b"delivery" => media_file.delivery = Some(value.to_string()),
            b"bitrate" => media_file.bitrate = value.parse().ok(),
            b"minBitrate" => media_file.min_bitrate = value.parse().ok(),
            b"maxBitrate" => media_file.max_bitrate = value.parse().ok(),
            b"width" => media_file.width = value.parse().ok(),
            b"height" => media_file.height = value.parse().ok(),
            b"scalable" => media_file.scalable = Some(value.eq_ignore_ascii_case("true")),
            b"maintainAspectRatio" => {
                media_file.maintain_aspect_ratio = Some(value.eq_ignore_ascii_case("true"));
            }
            b"apiFramework" => media_file.api_framework = Some(value.to_string()),
            _ => (),
        }
    }

    media_file.url = read_text_element(reader)?;
    Ok(media_file)
}

/// Parse a VideoClicks element
fn parse_video_clicks(reader: &mut Reader<&[u8]>, linear: &mut LinearCreative) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"ClickThrough" => {
                    linear.video_click_through_url = Some(read_text_element(reader)?);
                }
                b"ClickTracking" => {
                    push_nonempty(
                        &mut linear.video_click_tracking_url_templates,
                        read_text_element(reader)?,
                    );
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"VideoClicks" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

/// Parse a TrackingEvents element into an event-name -> URL-list map
fn parse_tracking_events(reader: &mut Reader<&[u8]>) -> Result<HashMap<String, Vec<String>>> {
    let mut events: HashMap<String, Vec<String>> = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Tracking" => {
                let name = attr_string(e, b"event");
                let url = read_text_element(reader)?;
                if let Some(name) = name {
                    if !url.is_empty() {
                        events.entry(name).or_default().push(url);
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"TrackingEvents" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(events)
}

/// Parse a CompanionAds element
fn parse_companion_ads(
    reader: &mut Reader<&[u8]>,
    id: Option<String>,
) -> Result<CompanionCreative> {
    let mut creative = CompanionCreative {
        id,
        ..Default::default()
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Companion" => {
                if let Some(companion) = parse_companion(reader, e)? {
                    creative.variations.push(companion);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"CompanionAds" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(creative)
}

/// Parse a Companion element. A variation without any resource is dropped.
fn parse_companion(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Option<Companion>> {
    let id = attr_string(start, b"id");
    let width = attr_string(start, b"width").and_then(|v| v.parse().ok());
    let height = attr_string(start, b"height").and_then(|v| v.parse().ok());

    let mut resource: Option<(CompanionResourceKind, String)> = None;
    let mut click_through_url = None;
    let mut tracking_events = HashMap::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"StaticResource" => {
                    resource = Some((CompanionResourceKind::Static, read_text_element(reader)?));
                }
                b"IFrameResource" => {
                    resource = Some((CompanionResourceKind::IFrame, read_text_element(reader)?));
                }
                b"HTMLResource" => {
                    resource = Some((CompanionResourceKind::Html, read_text_element(reader)?));
                }
                b"CompanionClickThrough" => {
                    click_through_url = Some(read_text_element(reader)?);
                }
                b"TrackingEvents" => {
                    tracking_events = parse_tracking_events(reader)?;
                }
                _ => {
                    skip_element(reader, e.name().as_ref())?;
                }
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Companion" => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    let Some((resource_kind, resource)) = resource else {
        return Ok(None);
    };
    Ok(Some(Companion {
        id,
        width: width.unwrap_or(0),
        height: height.unwrap_or(0),
        resource_kind,
        resource,
        click_through_url,
        tracking_events,
    }))
}

/// Parse an AdSystem element
fn parse_ad_system(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<AdSystem> {
    Ok(AdSystem {
        version: attr_string(start, b"version"),
        name: read_text_element(reader)?,
    })
}

/// Helper function to read the text content of an XML element
fn read_text_element(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Text(e)) => {
                text = e.unescape()?.trim().to_string();
            }
            Ok(Event::CData(e)) => {
                if let Ok(value) = from_utf8(&e) {
                    text = value.trim().to_string();
                }
            }
            Ok(Event::End(_)) => break,
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(text)
}

/// Helper function to skip an XML element and all its children
fn skip_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(ref e)) => {
                depth -= 1;
                if depth == 0 {
                    if e.name().as_ref() != name {
                        return Err(VastError::Other(format!(
                            "mismatched close tag while skipping {}",
                            String::from_utf8_lossy(name)
                        )));
                    }
                    break;
                }
            }
            Ok(Event::Eof) => {
                return Err(VastError::Other("Unexpected end of file".to_string()));
            }
            Err(e) => return Err(VastError::XmlParseError(e)),
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

fn push_nonempty(dest: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        dest.push(value);
    }
}

/// Read one attribute as an owned string
fn attr_string(start: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == key {
            if let Ok(value) = from_utf8(&attr.value) {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VAST version="3.0">
  <Error><![CDATA[http://example.com/error?code=[ERRORCODE]]]></Error>
  <Ad id="ad-1">
    <InLine>
      <AdSystem version="1.0">TestServer</AdSystem>
      <AdTitle>Sample Preroll</AdTitle>
      <Impression><![CDATA[http://example.com/imp]]></Impression>
      <Error><![CDATA[http://example.com/ad-error]]></Error>
      <Creatives>
        <Creative id="cr-1">
          <Linear skipoffset="25%">
            <Duration>00:00:16</Duration>
            <TrackingEvents>
              <Tracking event="start"><![CDATA[http://example.com/start]]></Tracking>
              <Tracking event="midpoint"><![CDATA[http://example.com/mid]]></Tracking>
            </TrackingEvents>
            <VideoClicks>
              <ClickThrough><![CDATA[http://example.com/landing]]></ClickThrough>
              <ClickTracking><![CDATA[http://example.com/click]]></ClickTracking>
            </VideoClicks>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="640" height="360" bitrate="500">
                <![CDATA[http://example.com/ad.mp4]]>
              </MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
        <Creative id="cr-2">
          <CompanionAds>
            <Companion id="banner" width="300" height="250">
              <StaticResource creativeType="image/png"><![CDATA[http://example.com/banner.png]]></StaticResource>
              <CompanionClickThrough><![CDATA[http://example.com/banner-click]]></CompanionClickThrough>
              <TrackingEvents>
                <Tracking event="creativeView"><![CDATA[http://example.com/view]]></Tracking>
              </TrackingEvents>
            </Companion>
          </CompanionAds>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#;

    #[test]
    fn parses_inline_document() {
        let outcome = parse_vast(INLINE_DOC).unwrap();
        assert_eq!(outcome.malformed_ads, 0);
        let response = outcome.response;
        assert_eq!(
            response.error_url_templates,
            vec!["http://example.com/error?code=[ERRORCODE]"]
        );
        assert_eq!(response.ads.len(), 1);

        let ad = &response.ads[0];
        assert_eq!(ad.id.as_deref(), Some("ad-1"));
        assert_eq!(ad.title.as_deref(), Some("Sample Preroll"));
        assert_eq!(ad.system.as_ref().unwrap().name, "TestServer");
        assert_eq!(ad.impression_url_templates, vec!["http://example.com/imp"]);
        assert_eq!(ad.error_url_templates, vec!["http://example.com/ad-error"]);
        assert!(ad.next_wrapper_url.is_none());
        assert_eq!(ad.creatives.len(), 2);

        let linear = ad.creatives[0].as_linear().unwrap();
        assert_eq!(linear.duration, 16.0);
        assert_eq!(linear.skip_delay, 4.0);
        assert_eq!(
            linear.video_click_through_url.as_deref(),
            Some("http://example.com/landing")
        );
        assert_eq!(
            linear.tracking_events.get("start").unwrap(),
            &vec!["http://example.com/start".to_string()]
        );
        assert_eq!(linear.media_files.len(), 1);
        assert_eq!(linear.media_files[0].url, "http://example.com/ad.mp4");
        assert_eq!(linear.media_files[0].mime_type, "video/mp4");
        assert_eq!(linear.media_files[0].bitrate, Some(500));

        let Creative::Companion(companions) = &ad.creatives[1] else {
            panic!("expected companion creative");
        };
        assert_eq!(companions.variations.len(), 1);
        let banner = &companions.variations[0];
        assert_eq!(banner.width, 300);
        assert_eq!(banner.resource_kind, CompanionResourceKind::Static);
        assert_eq!(banner.resource, "http://example.com/banner.png");
    }

    #[test]
    fn parses_wrapper_document() {
        let xml = r#"<VAST version="2.0">
  <Ad id="w-1">
    <Wrapper>
      <AdSystem>Wrapper Server</AdSystem>
      <VASTAdTagURI><![CDATA[http://example.com/next.xml]]></VASTAdTagURI>
      <Impression><![CDATA[http://example.com/wrapper-imp]]></Impression>
      <Error><![CDATA[http://example.com/wrapper-error]]></Error>
      <Creatives>
        <Creative>
          <Linear>
            <TrackingEvents>
              <Tracking event="complete"><![CDATA[http://example.com/wrapper-complete]]></Tracking>
            </TrackingEvents>
          </Linear>
        </Creative>
      </Creatives>
    </Wrapper>
  </Ad>
</VAST>"#;
        let outcome = parse_vast(xml).unwrap();
        let ad = &outcome.response.ads[0];
        assert_eq!(
            ad.next_wrapper_url.as_deref(),
            Some("http://example.com/next.xml")
        );
        // wrapper linear kept despite missing duration
        let linear = ad.creatives[0].as_linear().unwrap();
        assert!(linear.tracking_events.contains_key("complete"));
    }

    #[test]
    fn non_vast_root_is_an_error() {
        assert!(matches!(
            parse_vast("<html><body/></html>"),
            Err(VastError::NotVast)
        ));
    }

    #[test]
    fn inline_linear_without_duration_is_dropped() {
        let xml = r#"<VAST version="3.0">
  <Ad>
    <InLine>
      <AdSystem>S</AdSystem>
      <AdTitle>T</AdTitle>
      <Creatives>
        <Creative>
          <Linear>
            <Duration>bad</Duration>
            <MediaFiles>
              <MediaFile type="video/mp4"><![CDATA[http://example.com/a.mp4]]></MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#;
        let outcome = parse_vast(xml).unwrap();
        assert!(outcome.response.ads[0].creatives.is_empty());
    }

    #[test]
    fn ad_without_unit_counts_as_malformed() {
        let xml = r#"<VAST version="3.0"><Ad id="empty"><Unknown/></Ad></VAST>"#;
        let outcome = parse_vast(xml).unwrap();
        assert!(outcome.response.ads.is_empty());
        assert_eq!(outcome.malformed_ads, 1);
    }
}
