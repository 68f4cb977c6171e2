//! URI rewriting for playlists that are served from somewhere other than their origin.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::line::LineKind;

static URI_ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"URI="([^"]*)""#).unwrap());

/// Which lines a rewrite is being asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriSite {
    /// A bare URI line (segment or variant playlist).
    Line,
    /// A `URI="..."` attribute inside a tag (`#EXT-X-KEY`, `#EXT-X-MAP`, `#EXT-X-MEDIA`, ...).
    Attribute,
}

/// Apply `rewrite` to every URI in the playlist. Returning `None` keeps the URI as is.
pub fn rewrite_uris<F>(content: &str, mut rewrite: F) -> String
where
    F: FnMut(&str, UriSite) -> Option<String>,
{
    content
        .split('\n')
        .map(|line| match LineKind::classify(line) {
            LineKind::Uri => rewrite(line.trim(), UriSite::Line).unwrap_or_else(|| line.to_string()),
            LineKind::Empty => line.to_string(),
            _ if line.contains("URI=\"") => URI_ATTRIBUTE_REGEX
                .replace_all(line, |caps: &Captures<'_>| match rewrite(&caps[1], UriSite::Attribute) {
                    Some(uri) => format!("URI=\"{uri}\""),
                    None => caps[0].to_string(),
                })
                .into_owned(),
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve relative `.ts` segment lines against the directory of `playlist_url`.
///
/// Lines already starting with `http` are left alone, as are tags.
pub fn absolutize_ts_segments(content: &str, playlist_url: &Url) -> String {
    rewrite_uris(content, |uri, site| {
        if site != UriSite::Line || uri.starts_with("http") || !uri.contains(".ts") {
            return None;
        }
        playlist_url.join(uri).ok().map(String::from)
    })
}

/// Resolve every relative URI (lines and attributes) against `playlist_url`.
pub fn absolutize_all(content: &str, playlist_url: &Url) -> String {
    rewrite_uris(content, |uri, _| {
        if Url::parse(uri).is_ok() {
            return None;
        }
        playlist_url.join(uri).ok().map(String::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn absolutizes_only_relative_ts_lines() {
        let playlist = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n#EXTINF:4,\nseg1.ts\n#EXTINF:4,\nhttps://x.example/seg2.ts\n#EXTINF:4,\ninit.m4s\n";
        let out = absolutize_ts_segments(playlist, &url("https://cdn.example.com/a/b/index.m3u8?t=1"));
        assert_eq!(
            out,
            "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n#EXTINF:4,\nhttps://cdn.example.com/a/b/seg1.ts\n#EXTINF:4,\nhttps://x.example/seg2.ts\n#EXTINF:4,\ninit.m4s\n"
        );
    }

    #[test]
    fn absolutize_all_touches_attributes() {
        let playlist = "#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4,\n../s/1.m4s\n";
        let out = absolutize_all(playlist, &url("https://cdn.example.com/a/b/index.m3u8"));
        assert_eq!(
            out,
            "#EXT-X-MAP:URI=\"https://cdn.example.com/a/b/init.mp4\"\n#EXTINF:4,\nhttps://cdn.example.com/a/s/1.m4s\n"
        );
    }

    #[test]
    fn rewrite_keeps_untouched_lines_verbatim() {
        let playlist = "#EXTM3U\r\n#EXTINF:4,\r\nseg.ts\r\n";
        let out = rewrite_uris(playlist, |_, _| None);
        assert_eq!(out, playlist);
    }
}
