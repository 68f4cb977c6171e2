//! Rewrites playlist text with ad groups excised.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::classifier::ClassificationResult;
use crate::line::LineKind;

const DISCONTINUITY_TAG: &str = "#EXT-X-DISCONTINUITY";

static REPEATED_DISCONTINUITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(#EXT-X-DISCONTINUITY\n){2,}").unwrap());
static HEADER_DISCONTINUITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#EXTM3U\n(?:#[^\n]*\n)*)#EXT-X-DISCONTINUITY\n").unwrap());
static ENDLIST_DISCONTINUITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#EXT-X-DISCONTINUITY\n(#EXT-X-ENDLIST)").unwrap());
static BLANK_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Remove every segment that belongs to a strong-ad group from `content`.
///
/// Lines are emitted verbatim; only `#EXTINF`/URI pairs of ad segments and the
/// discontinuity tags around them are touched.
pub fn rebuild_playlist(content: &str, results: &[ClassificationResult<'_>]) -> String {
    let ad_segments: HashSet<usize> = results
        .iter()
        .filter(|r| r.is_ad())
        .flat_map(|r| r.group.segments().iter().map(|s| s.index))
        .collect();

    let mut out: Vec<&str> = Vec::with_capacity(content.len() / 16);
    let mut segment_index = 0;
    let mut skip_next_uri = false;
    let mut pending_discontinuity = false;
    let mut last_was_segment = false;

    for line in content.split('\n') {
        match LineKind::classify(line) {
            LineKind::Discontinuity => {
                // Re-emitted in front of the next kept segment, so boundaries around a
                // removed group collapse into one and never dangle.
                if last_was_segment {
                    pending_discontinuity = true;
                }
            }
            LineKind::SegmentInfo => {
                let is_ad = ad_segments.contains(&segment_index);
                segment_index += 1;
                if is_ad {
                    skip_next_uri = true;
                    continue;
                }
                if pending_discontinuity {
                    out.push(DISCONTINUITY_TAG);
                    pending_discontinuity = false;
                }
                out.push(line);
                last_was_segment = false;
            }
            LineKind::Uri => {
                if skip_next_uri {
                    skip_next_uri = false;
                    continue;
                }
                out.push(line);
                last_was_segment = true;
            }
            _ => out.push(line),
        }
    }

    normalize(&out.join("\n"))
}

/// Clean up control-line noise left behind by removals.
pub fn normalize(playlist: &str) -> String {
    let text = REPEATED_DISCONTINUITY_REGEX.replace_all(playlist, "#EXT-X-DISCONTINUITY\n");
    let text = HEADER_DISCONTINUITY_REGEX.replace(&text, "${1}");
    let text = ENDLIST_DISCONTINUITY_REGEX.replace(&text, "${1}");
    BLANK_RUN_REGEX.replace_all(&text, "\n\n").into_owned()
}
