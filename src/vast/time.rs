//! Duration and playhead time handling for VAST documents.

/// Sentinel for a duration that failed to parse. A non-wrapper linear
/// creative carrying this value is invalid.
pub const INVALID_DURATION: f64 = -1.0;

/// Parse a `H:MM:SS` or `H:MM:SS.mmm` duration string into seconds.
///
/// Any other shape yields [`INVALID_DURATION`].
pub fn parse_duration(s: &str) -> f64 {
    let s = s.trim();
    let (hms, millis) = match s.split_once('.') {
        Some((hms, frac)) => {
            if frac.is_empty() || frac.len() > 3 || frac.chars().any(|c| !c.is_ascii_digit()) {
                return INVALID_DURATION;
            }
            // ".5" means 500ms, ".05" means 50ms
            let padded = format!("{:0<3}", frac);
            match padded.parse::<u32>() {
                Ok(ms) => (hms, ms),
                Err(_) => return INVALID_DURATION,
            }
        }
        None => (s, 0),
    };

    let parts: Vec<&str> = hms.split(':').collect();
    if parts.len() != 3 {
        return INVALID_DURATION;
    }
    let field = |p: &str| -> Option<u64> {
        if p.is_empty() || p.chars().any(|c| !c.is_ascii_digit()) {
            None
        } else {
            p.parse().ok()
        }
    };
    let (Some(h), Some(m), Some(sec)) = (field(parts[0]), field(parts[1]), field(parts[2])) else {
        return INVALID_DURATION;
    };
    if m > 59 || sec > 59 {
        return INVALID_DURATION;
    }

    (h * 3600 + m * 60 + sec) as f64 + f64::from(millis) / 1000.0
}

/// Format a playhead position as zero-padded `HH:MM:SS.mmm`, the shape the
/// `[CONTENTPLAYHEAD]` macro substitutes.
pub fn format_playhead(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs / 60) % 60;
    let s = total_secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Parse a skip-delay value: either an absolute duration string or a
/// percentage (`"NN%"`) of the creative's duration. Returns seconds, or
/// [`INVALID_DURATION`] when the value is unusable.
pub fn parse_skip_delay(s: &str, creative_duration: f64) -> f64 {
    let s = s.trim();
    if let Some(pct) = s.strip_suffix('%') {
        if creative_duration < 0.0 {
            return INVALID_DURATION;
        }
        return match pct.trim().parse::<f64>() {
            Ok(p) if (0.0..=100.0).contains(&p) => creative_duration * p / 100.0,
            _ => INVALID_DURATION,
        };
    }
    parse_duration(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_duration() {
        assert_eq!(parse_duration("00:00:30"), 30.0);
        assert_eq!(parse_duration("01:02:03.450"), 3723.45);
        assert_eq!(parse_duration("0:00:05.5"), 5.5);
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration("bad"), INVALID_DURATION);
        assert_eq!(parse_duration("00:30"), INVALID_DURATION);
        assert_eq!(parse_duration("00:61:00"), INVALID_DURATION);
        assert_eq!(parse_duration("00:00:30.12345"), INVALID_DURATION);
        assert_eq!(parse_duration(""), INVALID_DURATION);
    }

    #[test]
    fn duration_round_trips_within_a_millisecond() {
        for s in ["0:00:01.000", "1:59:59.999", "10:00:00.001", "0:07:12.080"] {
            let secs = parse_duration(s);
            assert!(secs >= 0.0, "{s} should parse");
            let back = parse_duration(&format_playhead(secs));
            assert!((secs - back).abs() < 0.001, "{s}: {secs} vs {back}");
        }
    }

    #[test]
    fn formats_playhead_zero_padded() {
        assert_eq!(format_playhead(0.0), "00:00:00.000");
        assert_eq!(format_playhead(7.25), "00:00:07.250");
        assert_eq!(format_playhead(3723.45), "01:02:03.450");
    }

    #[test]
    fn skip_delay_accepts_percent_or_absolute() {
        assert_eq!(parse_skip_delay("00:00:05", 30.0), 5.0);
        assert_eq!(parse_skip_delay("10%", 30.0), 3.0);
        assert_eq!(parse_skip_delay("10%", INVALID_DURATION), INVALID_DURATION);
        assert_eq!(parse_skip_delay("150%", 30.0), INVALID_DURATION);
    }
}
