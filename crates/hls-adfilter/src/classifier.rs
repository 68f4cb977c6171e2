//! Multi-signal ad scoring for discontinuity groups.
//!
//! Every signal is evaluated independently and adds its configured weight to the
//! group's score. The resulting kind is a pure function of the score.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::ScoringConfig;
use crate::grouper::SegmentGroup;
use crate::naming::{dominant_prefix, filename_prefix, levenshtein, sequence_number};

/// Ad-break lengths commonly sold by ad servers, in seconds (inclusive bounds).
const TYPICAL_AD_DURATIONS: [(f64, f64); 4] = [(13.0, 17.0), (24.0, 28.0), (28.0, 32.0), (58.0, 62.0)];
/// Segment lengths packagers use for ad creatives.
const FIXED_SEGMENT_DURATIONS: [f64; 3] = [2.0, 4.0, 6.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Normal,
    Suspect,
    StrongAd,
}

impl GroupKind {
    pub fn from_score(score: i32, config: &ScoringConfig) -> Self {
        if score >= config.strong_ad_score {
            Self::StrongAd
        } else if score >= config.suspect_score {
            Self::Suspect
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Suspect => "suspect",
            Self::StrongAd => "strong_ad",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal that contributed to a group's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum Reason {
    Scte35,
    AdDateRange,
    DifferentDomain,
    UniformShort,
    VeryShort,
    TypicalAdDuration,
    ConsecutiveShort,
    FixedDuration,
    HighPrecisionEqual,
    EqualDuration,
    SequenceJump,
    FilenameJump,
    FilenamePattern,
    PrefixAnomaly,
    AdPath,
    EdgePosition,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scte35 => "SCTE-35",
            Self::AdDateRange => "DATERANGE",
            Self::DifferentDomain => "different domain",
            Self::UniformShort => "uniform short",
            Self::VeryShort => "very short",
            Self::TypicalAdDuration => "typical ad duration",
            Self::ConsecutiveShort => "consecutive short",
            Self::FixedDuration => "fixed duration",
            Self::HighPrecisionEqual => "high precision equal",
            Self::EqualDuration => "equal duration",
            Self::SequenceJump => "sequence jump",
            Self::FilenameJump => "filename jump",
            Self::FilenamePattern => "filename pattern",
            Self::PrefixAnomaly => "prefix anomaly",
            Self::AdPath => "ad path",
            Self::EdgePosition => "edge position",
        }
    }
}

impl From<Reason> for &'static str {
    fn from(reason: Reason) -> Self {
        reason.as_str()
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationResult<'a> {
    pub group: SegmentGroup<'a>,
    pub score: i32,
    pub kind: GroupKind,
    pub reasons: Vec<Reason>,
    /// Position of the group within the playlist.
    pub index: usize,
}

impl ClassificationResult<'_> {
    pub fn is_ad(&self) -> bool {
        self.kind == GroupKind::StrongAd
    }
}

/// Accumulates score and reasons for one group.
struct Scorecard {
    score: i32,
    reasons: Vec<Reason>,
}

impl Scorecard {
    fn add(&mut self, weight: i32, reason: Reason) {
        self.score += weight;
        self.reasons.push(reason);
    }
}

pub struct GroupClassifier<'c> {
    config: &'c ScoringConfig,
}

impl<'c> GroupClassifier<'c> {
    pub fn new(config: &'c ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every group of one playlist.
    ///
    /// With fewer than two groups there is nothing to compare against and every group is
    /// reported as normal with a zero score.
    pub fn classify<'a>(&self, groups: &[SegmentGroup<'a>]) -> Vec<ClassificationResult<'a>> {
        if groups.len() <= 1 {
            return groups
                .iter()
                .enumerate()
                .map(|(index, group)| ClassificationResult {
                    group: *group,
                    score: 0,
                    kind: GroupKind::Normal,
                    reasons: Vec::new(),
                    index,
                })
                .collect();
        }

        let base_prefix = dominant_prefix(
            groups
                .iter()
                .flat_map(|g| g.segments().iter().map(|s| s.filename.as_str())),
        );

        groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let card = self.score_group(groups, index, base_prefix);
                let kind = GroupKind::from_score(card.score, self.config);
                debug!(
                    group = index,
                    segments = group.len(),
                    duration = group.total_duration(),
                    score = card.score,
                    kind = %kind,
                    reasons = ?card.reasons,
                    "Scored segment group"
                );
                ClassificationResult {
                    group: *group,
                    score: card.score,
                    kind,
                    reasons: card.reasons,
                    index,
                }
            })
            .collect()
    }

    fn score_group(
        &self,
        groups: &[SegmentGroup<'_>],
        index: usize,
        base_prefix: Option<&str>,
    ) -> Scorecard {
        let weights = &self.config.weights;
        let group = &groups[index];
        let mut card = Scorecard {
            score: 0,
            reasons: Vec::new(),
        };

        if group.segments().iter().any(|s| s.in_ad_break) {
            card.add(weights.scte35, Reason::Scte35);
        }
        if group.segments().iter().any(|s| s.has_ad_date_range) {
            card.add(weights.ad_date_range, Reason::AdDateRange);
        }
        if !group.is_empty() && group.segments().iter().all(|s| s.different_domain) {
            card.add(weights.different_domain, Reason::DifferentDomain);
        }

        self.score_durations(group, &mut card);

        if index > 0 && index + 1 < groups.len() {
            self.score_neighbors(&groups[index - 1], group, &groups[index + 1], &mut card);
        }

        if let Some(base_prefix) = base_prefix
            && !group.is_empty()
            && group
                .segments()
                .iter()
                .all(|s| filename_prefix(&s.filename) != base_prefix)
        {
            card.add(weights.prefix_anomaly, Reason::PrefixAnomaly);
        }

        if let Some(first) = group.first() {
            let url = first.full_url.to_lowercase();
            if self
                .config
                .ad_path_keywords
                .iter()
                .any(|keyword| url.contains(keyword.as_str()))
            {
                card.add(weights.ad_path, Reason::AdPath);
            }
        }

        if index == 0 || index + 1 == groups.len() {
            card.add(-weights.edge_penalty, Reason::EdgePosition);
        }

        card
    }

    fn score_durations(&self, group: &SegmentGroup<'_>, card: &mut Scorecard) {
        let weights = &self.config.weights;
        let len = group.len();
        let total = group.total_duration();

        if total > 0.0 && total < 60.0 {
            // Tenths, with halves rounded up.
            let distinct: HashSet<i64> = group
                .durations()
                .map(|d| (d * 10.0).round() as i64)
                .collect();
            if distinct.len() <= 2 && len > 1 {
                card.add(weights.uniform_short, Reason::UniformShort);
            } else if total < 35.0 {
                card.add(weights.very_short, Reason::VeryShort);
            }
            if TYPICAL_AD_DURATIONS
                .iter()
                .any(|&(lo, hi)| total >= lo && total <= hi)
            {
                card.add(weights.typical_ad_duration, Reason::TypicalAdDuration);
            }
        }

        let short = group.durations().filter(|d| (2.0..=4.5).contains(d)).count();
        if short >= 4 && short == len {
            card.add(weights.consecutive_short, Reason::ConsecutiveShort);
        }

        let fixed = group
            .durations()
            .filter(|d| {
                FIXED_SEGMENT_DURATIONS
                    .iter()
                    .any(|fixed| (d - fixed).abs() < 0.01)
            })
            .count();
        if fixed as f64 >= len as f64 * 0.8 && len >= 3 {
            card.add(weights.fixed_duration, Reason::FixedDuration);
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for d in group.durations() {
            *counts.entry(format!("{d:.5}")).or_default() += 1;
        }
        let max_same = counts.values().copied().max().unwrap_or(0);
        let ratio = if len == 0 {
            0.0
        } else {
            max_same as f64 / len as f64
        };
        if ratio >= 0.9 && len >= 5 {
            card.add(weights.high_precision_equal, Reason::HighPrecisionEqual);
        } else if ratio >= 0.8 && len >= 4 {
            card.add(weights.equal_duration, Reason::EqualDuration);
        }
    }

    /// Signals that compare a group with the groups on either side of it: if removing the
    /// group makes the surrounding filenames line up again, it was likely spliced in.
    fn score_neighbors(
        &self,
        prev: &SegmentGroup<'_>,
        group: &SegmentGroup<'_>,
        next: &SegmentGroup<'_>,
        card: &mut Scorecard,
    ) {
        let weights = &self.config.weights;
        let thresholds = &self.config.thresholds;

        let (Some(prev_last), Some(curr_first), Some(curr_last), Some(next_first)) = (
            prev.last().map(|s| s.filename.as_str()),
            group.first().map(|s| s.filename.as_str()),
            group.last().map(|s| s.filename.as_str()),
            next.first().map(|s| s.filename.as_str()),
        ) else {
            return;
        };
        if [prev_last, curr_first, curr_last, next_first]
            .iter()
            .any(|name| name.is_empty())
        {
            return;
        }

        if let (Some(prev_n), Some(first_n), Some(last_n), Some(next_n)) = (
            sequence_number(prev_last),
            sequence_number(curr_first),
            sequence_number(curr_last),
            sequence_number(next_first),
        ) {
            let neighbor_gap = i128::from(thresholds.sequence_neighbor_gap);
            let jump_gap = i128::from(thresholds.sequence_jump_gap);
            if (next_n - prev_n).abs() < neighbor_gap
                && ((first_n - prev_n).abs() > jump_gap || (last_n - next_n).abs() > jump_gap)
            {
                card.add(weights.sequence_jump, Reason::SequenceJump);
            }
        }

        let dist_prev = levenshtein(prev_last, curr_first);
        let dist_next = levenshtein(curr_last, next_first);
        let dist_around = levenshtein(prev_last, next_first);
        if dist_around < thresholds.filename_jump_reconnect
            && (dist_prev > thresholds.filename_jump_distance
                || dist_next > thresholds.filename_jump_distance)
        {
            card.add(weights.filename_jump, Reason::FilenameJump);
        } else if dist_around < thresholds.filename_pattern_reconnect
            && (dist_prev > thresholds.filename_pattern_distance
                || dist_next > thresholds.filename_pattern_distance)
        {
            card.add(weights.filename_pattern, Reason::FilenamePattern);
        }
    }
}
