/// Kind of a single playlist line, as far as ad filtering is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    /// `#EXTINF:` segment duration declaration.
    SegmentInfo,
    /// `#EXT-X-DISCONTINUITY`.
    Discontinuity,
    /// `#EXT-X-CUE-OUT...` or any SCTE35-OUT marker.
    CueOut,
    /// `#EXT-X-CUE-IN...` or any SCTE35-IN marker.
    CueIn,
    /// `#EXT-X-DATERANGE:...`.
    DateRange,
    /// `#EXT-X-STREAM-INF:` (master playlist variant).
    StreamInf,
    /// `#EXT-X-ENDLIST`.
    EndList,
    /// Any other tag or comment; passed through untouched.
    OtherTag,
    Uri,
}

impl LineKind {
    /// Classify a line. Leading and trailing whitespace is ignored.
    pub fn classify(line: &str) -> Self {
        let line = line.trim();

        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('#') {
            return Self::Uri;
        }

        if line.starts_with("#EXT-X-CUE-OUT") || line.contains("SCTE35-OUT") {
            Self::CueOut
        } else if line.starts_with("#EXT-X-CUE-IN") || line.contains("SCTE35-IN") {
            Self::CueIn
        } else if line.starts_with("#EXT-X-DATERANGE") {
            Self::DateRange
        } else if line.starts_with("#EXT-X-DISCONTINUITY-SEQUENCE") {
            // Header tag, not a boundary.
            Self::OtherTag
        } else if line.starts_with("#EXT-X-DISCONTINUITY") {
            Self::Discontinuity
        } else if line.starts_with("#EXTINF:") {
            Self::SegmentInfo
        } else if line.starts_with("#EXT-X-STREAM-INF") {
            Self::StreamInf
        } else if line.starts_with("#EXT-X-ENDLIST") {
            Self::EndList
        } else {
            Self::OtherTag
        }
    }
}

/// Whether a date-range tag carries an ad classification.
pub fn is_ad_date_range(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    ["class=\"ad\"", "class='ad'", "scte35", "advertisement"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Whether the text is a master playlist (it lists variant streams).
pub fn is_master_playlist(content: &str) -> bool {
    content.contains("#EXT-X-STREAM-INF")
}

/// Whether the text is a media playlist (it declares at least one segment).
pub fn is_media_playlist(content: &str) -> bool {
    content.contains("#EXTINF:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ad_markers() {
        assert_eq!(LineKind::classify("#EXT-X-CUE-OUT:30"), LineKind::CueOut);
        assert_eq!(LineKind::classify("#EXT-X-CUE-OUT-CONT:10/30"), LineKind::CueOut);
        assert_eq!(
            LineKind::classify("#EXT-X-SCTE35:CUE=\"...\",SCTE35-OUT=0xFC"),
            LineKind::CueOut
        );
        assert_eq!(LineKind::classify("#EXT-X-CUE-IN"), LineKind::CueIn);
        assert_eq!(LineKind::classify("  #EXT-X-DISCONTINUITY \r"), LineKind::Discontinuity);
    }

    #[test]
    fn discontinuity_sequence_is_a_plain_tag() {
        assert_eq!(
            LineKind::classify("#EXT-X-DISCONTINUITY-SEQUENCE:3"),
            LineKind::OtherTag
        );
    }

    #[test]
    fn classifies_segments_and_uris() {
        assert_eq!(LineKind::classify("#EXTINF:4.000,"), LineKind::SegmentInfo);
        assert_eq!(LineKind::classify("seg1.ts"), LineKind::Uri);
        assert_eq!(LineKind::classify(""), LineKind::Empty);
        assert_eq!(LineKind::classify("#EXT-X-ENDLIST"), LineKind::EndList);
        assert_eq!(LineKind::classify("# comment"), LineKind::OtherTag);
    }

    #[test]
    fn detects_ad_date_ranges() {
        assert!(is_ad_date_range(
            r#"#EXT-X-DATERANGE:ID="a",CLASS="ad",START-DATE="2024-01-01T00:00:00Z""#
        ));
        assert!(is_ad_date_range("#EXT-X-DATERANGE:ID=\"b\",SCTE35-CMD=0xFC"));
        assert!(is_ad_date_range("#EXT-X-DATERANGE:ID=\"c\",CLASS='AD'"));
        assert!(!is_ad_date_range(
            r#"#EXT-X-DATERANGE:ID="chapter",CLASS="chapter""#
        ));
    }
}
