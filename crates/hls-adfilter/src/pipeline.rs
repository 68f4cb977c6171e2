//! parse → group → classify → rebuild, with the removal safety valve.

use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{GroupClassifier, GroupKind, Reason};
use crate::config::ScoringConfig;
use crate::grouper::group_by_discontinuity;
use crate::line::is_master_playlist;
use crate::parser::parse_media_playlist;
use crate::rebuilder::rebuild_playlist;

/// Why the pipeline did not look at a playlist at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MasterPlaylist,
    NoSegments,
    SingleGroup,
}

/// Summary of a successful removal.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterReport {
    pub playlist: String,
    pub removed_duration: f64,
    pub removed_segments: usize,
    pub removed_groups: usize,
    pub original_duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Nothing to analyze; the input should be used as-is.
    Skipped(SkipReason),
    /// Analyzed, but no strong ad groups were found.
    NoAds,
    /// Ad groups were found but exceed the allowed share of the playlist.
    SafetyValve {
        ad_duration: f64,
        total_duration: f64,
    },
    Filtered(FilterReport),
}

impl PipelineOutcome {
    /// The playlist text to hand to the player.
    pub fn into_playlist(self, original: &str) -> String {
        match self {
            Self::Filtered(report) => report.playlist,
            _ => original.to_string(),
        }
    }
}

/// Per-group line of an [`AnalysisReport`].
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub index: usize,
    pub first_segment: usize,
    pub segment_count: usize,
    pub duration: f64,
    pub score: i32,
    pub kind: GroupKind,
    pub reasons: Vec<Reason>,
    pub first_uri: String,
}

/// Read-only view of how a playlist would be classified.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub base_hostname: String,
    pub segment_count: usize,
    pub total_duration: f64,
    pub groups: Vec<GroupReport>,
    pub skipped: Option<SkipReason>,
}

impl AnalysisReport {
    pub fn ad_duration(&self) -> f64 {
        self.groups
            .iter()
            .filter(|g| g.kind == GroupKind::StrongAd)
            .map(|g| g.duration)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct AdFilterPipeline {
    scoring: ScoringConfig,
    max_removed_ratio: f64,
}

impl Default for AdFilterPipeline {
    fn default() -> Self {
        Self::new(ScoringConfig::default(), 0.5)
    }
}

impl AdFilterPipeline {
    pub fn new(scoring: ScoringConfig, max_removed_ratio: f64) -> Self {
        Self {
            scoring,
            max_removed_ratio,
        }
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Run the full pipeline on one playlist.
    pub fn process(&self, content: &str, base_url: &str) -> PipelineOutcome {
        if is_master_playlist(content) {
            return PipelineOutcome::Skipped(SkipReason::MasterPlaylist);
        }

        let parsed = parse_media_playlist(content, base_url);
        if parsed.segments.is_empty() {
            return PipelineOutcome::Skipped(SkipReason::NoSegments);
        }
        let groups = group_by_discontinuity(&parsed.segments);
        if groups.len() <= 1 {
            return PipelineOutcome::Skipped(SkipReason::SingleGroup);
        }

        let results = GroupClassifier::new(&self.scoring).classify(&groups);
        let ads: Vec<_> = results.iter().filter(|r| r.is_ad()).collect();
        if ads.is_empty() {
            debug!(url = base_url, groups = groups.len(), "No ad groups detected");
            return PipelineOutcome::NoAds;
        }

        let ad_duration: f64 = ads.iter().map(|r| r.group.total_duration()).sum();
        let total_duration = parsed.total_duration();
        if ad_duration > total_duration * self.max_removed_ratio {
            info!(
                url = base_url,
                ad_duration, total_duration, "Ad groups exceed removal limit, keeping playlist"
            );
            return PipelineOutcome::SafetyValve {
                ad_duration,
                total_duration,
            };
        }

        let playlist = rebuild_playlist(content, &results);
        let report = FilterReport {
            playlist,
            removed_duration: ad_duration,
            removed_segments: ads.iter().map(|r| r.group.len()).sum(),
            removed_groups: ads.len(),
            original_duration: total_duration,
        };
        info!(
            url = base_url,
            groups = report.removed_groups,
            segments = report.removed_segments,
            duration = report.removed_duration,
            "Removed ad groups from playlist"
        );
        PipelineOutcome::Filtered(report)
    }

    /// Classify without rewriting.
    pub fn analyze(&self, content: &str, base_url: &str) -> AnalysisReport {
        let parsed = parse_media_playlist(content, base_url);
        let groups = group_by_discontinuity(&parsed.segments);
        let skipped = if is_master_playlist(content) {
            Some(SkipReason::MasterPlaylist)
        } else if parsed.segments.is_empty() {
            Some(SkipReason::NoSegments)
        } else if groups.len() <= 1 {
            Some(SkipReason::SingleGroup)
        } else {
            None
        };

        let groups = GroupClassifier::new(&self.scoring)
            .classify(&groups)
            .into_iter()
            .map(|r| GroupReport {
                index: r.index,
                first_segment: r.group.first().map_or(0, |s| s.index),
                segment_count: r.group.len(),
                duration: r.group.total_duration(),
                score: r.score,
                kind: r.kind,
                first_uri: r.group.first().map(|s| s.uri.clone()).unwrap_or_default(),
                reasons: r.reasons,
            })
            .collect();

        AnalysisReport {
            base_hostname: parsed.base_hostname.clone(),
            segment_count: parsed.segments.len(),
            total_duration: parsed.total_duration(),
            groups,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example.com/vod/index.m3u8";

    #[test]
    fn master_playlist_is_skipped() {
        let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000\nlow/index.m3u8\n";
        assert_eq!(
            AdFilterPipeline::default().process(master, BASE),
            PipelineOutcome::Skipped(SkipReason::MasterPlaylist)
        );
    }

    #[test]
    fn empty_playlist_is_skipped() {
        assert_eq!(
            AdFilterPipeline::default().process("#EXTM3U\n#EXT-X-ENDLIST\n", BASE),
            PipelineOutcome::Skipped(SkipReason::NoSegments)
        );
    }

    #[test]
    fn outcome_falls_back_to_original_text() {
        let original = "#EXTM3U\n#EXTINF:4,\na.ts\n";
        let outcome = AdFilterPipeline::default().process(original, BASE);
        assert_eq!(outcome, PipelineOutcome::Skipped(SkipReason::SingleGroup));
        assert_eq!(outcome.into_playlist(original), original);
    }

    #[test]
    fn analyze_reports_every_group() {
        let playlist = "#EXTM3U\n#EXTINF:10,\na1.ts\n#EXTINF:9,\na2.ts\n#EXT-X-DISCONTINUITY\n#EXT-X-CUE-OUT\n#EXTINF:4,\nad1.ts\n#EXTINF:4,\nad2.ts\n#EXT-X-CUE-IN\n#EXT-X-DISCONTINUITY\n#EXTINF:10,\na3.ts\n#EXTINF:8,\na4.ts\n";
        let report = AdFilterPipeline::default().analyze(playlist, BASE);
        assert_eq!(report.skipped, None);
        assert_eq!(report.segment_count, 6);
        assert_eq!(report.groups.len(), 3);
        assert_eq!(report.groups[1].first_segment, 2);
        assert_eq!(report.groups[1].kind, GroupKind::StrongAd);
        assert_eq!(report.groups[1].first_uri, "ad1.ts");
        assert_eq!(report.ad_duration(), 8.0);
    }
}
