//! Line-oriented media playlist parser.
//!
//! Only what the classifier needs is extracted; unknown tags are ignored here and
//! preserved verbatim by the rebuilder.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use crate::line::{LineKind, is_ad_date_range};

static EXTINF_DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#EXTINF:\s*([0-9.]+)").unwrap());

/// One media segment reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position among all `#EXTINF` declarations of the playlist.
    pub index: usize,
    /// Declared duration in seconds, `0.0` when missing or unparseable.
    pub duration: f64,
    /// A discontinuity tag immediately preceded this segment.
    pub discontinuity: bool,
    /// The segment sits inside an open cue-out / SCTE35-OUT span.
    pub in_ad_break: bool,
    /// An ad date-range was declared since the last discontinuity.
    pub has_ad_date_range: bool,
    pub uri: String,
    /// Last path component of `uri`, without query string.
    pub filename: String,
    /// `uri` resolved against the playlist URL, or `uri` itself if that fails.
    pub full_url: String,
    pub hostname: String,
    pub different_domain: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedPlaylist {
    pub segments: Vec<Segment>,
    pub base_hostname: String,
}

impl ParsedPlaylist {
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }
}

/// Segment whose URI line has not been seen yet.
struct PendingSegment {
    index: usize,
    duration: f64,
    discontinuity: bool,
    in_ad_break: bool,
    has_ad_date_range: bool,
}

impl PendingSegment {
    fn complete(self, uri: &str, base: Option<&Url>, base_hostname: &str) -> Segment {
        let filename = uri
            .rsplit('/')
            .next()
            .unwrap_or(uri)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        let resolved = match base {
            Some(base) => base.join(uri),
            None => Url::parse(uri),
        };
        let (full_url, hostname, different_domain) = match resolved {
            Ok(url) => {
                let hostname = url.host_str().unwrap_or_default().to_string();
                // Without a known base host there is nothing to compare against.
                let different = !base_hostname.is_empty() && hostname != base_hostname;
                (url.to_string(), hostname, different)
            }
            Err(e) => {
                trace!(uri, error = %e, "Segment URI could not be resolved");
                (uri.to_string(), String::new(), false)
            }
        };

        Segment {
            index: self.index,
            duration: self.duration,
            discontinuity: self.discontinuity,
            in_ad_break: self.in_ad_break,
            has_ad_date_range: self.has_ad_date_range,
            uri: uri.to_string(),
            filename,
            full_url,
            hostname,
            different_domain,
        }
    }
}

/// Parse a media playlist. Never fails: malformed lines degrade to defaults.
pub fn parse_media_playlist(content: &str, base_url: &str) -> ParsedPlaylist {
    let base = Url::parse(base_url).ok();
    let base_hostname = base
        .as_ref()
        .and_then(|u| u.host_str())
        .unwrap_or_default()
        .to_string();

    let mut segments = Vec::new();
    let mut pending: Option<PendingSegment> = None;
    let mut segment_index = 0;
    let mut has_discontinuity = false;
    let mut in_ad_break = false;
    let mut has_ad_date_range = false;

    for raw in content.split('\n') {
        let line = raw.trim();
        match LineKind::classify(line) {
            LineKind::CueOut => in_ad_break = true,
            LineKind::CueIn => in_ad_break = false,
            LineKind::DateRange => {
                if is_ad_date_range(line) {
                    has_ad_date_range = true;
                }
            }
            LineKind::Discontinuity => {
                has_discontinuity = true;
                has_ad_date_range = false;
            }
            LineKind::SegmentInfo => {
                pending = Some(PendingSegment {
                    index: segment_index,
                    duration: parse_extinf_duration(line),
                    discontinuity: has_discontinuity,
                    in_ad_break,
                    has_ad_date_range,
                });
                segment_index += 1;
                has_discontinuity = false;
            }
            LineKind::Uri => {
                if let Some(segment) = pending.take() {
                    segments.push(segment.complete(line, base.as_ref(), &base_hostname));
                }
            }
            LineKind::Empty | LineKind::StreamInf | LineKind::EndList | LineKind::OtherTag => {}
        }
    }

    ParsedPlaylist {
        segments,
        base_hostname,
    }
}

/// Duration of an `#EXTINF:` line, taking the longest numeric prefix (`4.5.1` → `4.5`).
fn parse_extinf_duration(line: &str) -> f64 {
    let Some(raw) = EXTINF_DURATION_REGEX
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return 0.0;
    };

    let end = raw
        .char_indices()
        .filter(|&(_, c)| c == '.')
        .nth(1)
        .map_or(raw.len(), |(i, _)| i);
    raw[..end]
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
}
